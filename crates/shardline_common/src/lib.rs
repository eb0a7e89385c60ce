//! Shared building blocks for the shardline routing stage: scalar values used
//! as sharding values and SQL parameters, the error taxonomy, and the TOML
//! configuration model.

pub mod config;
pub mod datum;
pub mod error;

pub use config::{AlgorithmConfig, DataSourceConfig, RouteProps, ShardingRuleConfig, ShardlineConfig, StrategyConfig, TableRuleConfig};
pub use datum::Datum;
pub use error::{
    AbsentNodeError, AlgorithmError, ConfigError, ErrorKind, RouteError, ShardError, ShardResult,
};
