//! Routing stage for the shardline middleware.
//!
//! Given a bound statement, its sharding conditions and a sharding rule, this
//! crate decides which physical data sources and tables must execute the
//! statement:
//!
//! - `selector` : classifies the statement and picks one `RouteStrategy`
//! - `engine`   : one routing function per strategy, producing a `RouteContext`
//! - `validator`: checks every routed node against storage metadata and the
//!              rule's actual data nodes; the only way to obtain a `ValidatedRoute`
//! - `pipeline` : select → route → validate in one call
//! - `rule`     : the read-only sharding rule model, built from configuration
//! - `snapshot` : copy-on-write registry handing out rule snapshots

pub mod condition;
pub mod context;
pub mod engine;
pub mod metadata;
pub mod pipeline;
pub mod rule;
pub mod selector;
pub mod snapshot;
pub mod statement;
pub mod validator;

pub use condition::{ConditionOperator, ConditionValue, ShardingCondition, ShardingConditions, ValueRange};
pub use context::{RouteContext, RouteMapper, RouteUnit};
pub use engine::RouteStrategy;
pub use metadata::{ResourceMetadata, StorageMetadata, StorageUnit};
pub use pipeline::RoutingPipeline;
pub use rule::algorithm::{AlgorithmRegistry, ShardingAlgorithm, ShardingValue};
pub use rule::{BindingTableGroup, DataNode, ShardingRule, ShardingStrategy, TableRule};
pub use selector::RouteEngineSelector;
pub use snapshot::RuleRegistry;
pub use statement::{DalKind, DclKind, DdlKind, DmlKind, StatementContext, StatementKind, TableRef};
pub use validator::{RouteValidator, ValidatedRoute};
