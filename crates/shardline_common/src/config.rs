use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration: routing properties, physical data sources and the
/// sharding rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardlineConfig {
    #[serde(default)]
    pub props: RouteProps,
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,
    #[serde(default)]
    pub rule: ShardingRuleConfig,
}

/// Routing behaviour switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteProps {
    /// Allow SELECTs with subqueries, HAVING, partial DISTINCT aggregation or
    /// cross-data-source joins to route through the federated engine.
    pub sql_federation_enabled: bool,
    /// Accept a routed node when live storage metadata contains it.
    /// When false, only the rule's actual data nodes are consulted.
    pub check_table_metadata_enabled: bool,
    /// Log every produced execution unit at info level.
    pub sql_show: bool,
}

impl Default for RouteProps {
    fn default() -> Self {
        Self {
            sql_federation_enabled: true,
            check_table_metadata_enabled: false,
            sql_show: false,
        }
    }
}

/// One physical data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    /// Connection URL, e.g. `mysql://127.0.0.1:3306/demo_ds_0`.
    pub url: String,
    /// Actual tables known to exist on this data source (storage catalog).
    #[serde(default)]
    pub tables: Vec<String>,
}

impl DataSourceConfig {
    /// `host:port` of the physical instance behind this data source.
    /// Two data sources with the same endpoint share one instance.
    pub fn endpoint(&self) -> String {
        let rest = match self.url.find("://") {
            Some(idx) => &self.url[idx + 3..],
            None => self.url.as_str(),
        };
        let rest = rest.rsplit('@').next().unwrap_or(rest);
        let end = rest.find(['/', '?']).unwrap_or(rest.len());
        rest[..end].to_ascii_lowercase()
    }
}

/// Sharding rule configuration section (`[rule]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardingRuleConfig {
    #[serde(default)]
    pub tables: Vec<TableRuleConfig>,
    /// Each entry is a comma separated group, e.g. `"t_order, t_order_item"`.
    #[serde(default)]
    pub binding_tables: Vec<String>,
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
    #[serde(default)]
    pub default_database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub default_table_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub algorithms: BTreeMap<String, AlgorithmConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRuleConfig {
    pub logic_table: String,
    /// Inline expression such as `ds_${0..1}.t_order_${0..1}`.
    /// When omitted the table lives on every data source under its own name.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,
    #[serde(default)]
    pub database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub table_strategy: Option<StrategyConfig>,
}

/// How one routing axis (database or table) is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StrategyConfig {
    Standard {
        sharding_column: String,
        algorithm: String,
    },
    Complex {
        sharding_columns: Vec<String>,
        algorithm: String,
    },
    None,
}

impl StrategyConfig {
    pub fn algorithm(&self) -> Option<&str> {
        match self {
            StrategyConfig::Standard { algorithm, .. } | StrategyConfig::Complex { algorithm, .. } => {
                Some(algorithm)
            }
            StrategyConfig::None => None,
        }
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyConfig::Standard {
                sharding_column,
                algorithm,
            } => write!(f, "standard(column={}, algorithm={})", sharding_column, algorithm),
            StrategyConfig::Complex {
                sharding_columns,
                algorithm,
            } => write!(
                f,
                "complex(columns={}, algorithm={})",
                sharding_columns.join("+"),
                algorithm
            ),
            StrategyConfig::None => write!(f, "none"),
        }
    }
}

/// Built-in sharding algorithms, selected by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlgorithmConfig {
    /// `value % sharding_count`, matched against target name suffixes.
    Mod { sharding_count: u64 },
    /// xxh3 hash of the value, then modulo.
    HashMod { sharding_count: u64 },
    /// Ascending boundaries; n boundaries yield n + 1 partitions.
    BoundaryRange { sharding_ranges: Vec<i64> },
    /// `prefix${column % n}suffix` or `prefix${column}suffix`.
    Inline { algorithm_expression: String },
}

impl AlgorithmConfig {
    /// Validate algorithm properties.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAlgorithm {
            algorithm: name.to_string(),
            reason: reason.to_string(),
        };
        match self {
            AlgorithmConfig::Mod { sharding_count } | AlgorithmConfig::HashMod { sharding_count } => {
                if *sharding_count == 0 {
                    return Err(invalid("sharding_count must be >= 1"));
                }
            }
            AlgorithmConfig::BoundaryRange { sharding_ranges } => {
                if sharding_ranges.is_empty() {
                    return Err(invalid("sharding_ranges must not be empty"));
                }
                if sharding_ranges.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(invalid("sharding_ranges must be strictly ascending"));
                }
            }
            AlgorithmConfig::Inline {
                algorithm_expression,
            } => {
                if !algorithm_expression.contains("${") {
                    return Err(invalid("algorithm_expression must contain a ${...} placeholder"));
                }
            }
        }
        Ok(())
    }
}

impl ShardlineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ShardlineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded config from {} ({} data sources, {} table rules)",
            path.display(),
            config.data_sources.len(),
            config.rule.tables.len()
        );
        Ok(config)
    }

    /// Structural checks that do not need a built rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for ds in &self.data_sources {
            if ds.name.trim().is_empty() {
                return Err(ConfigError::Invalid("data source name must not be empty".into()));
            }
            if !names.insert(ds.name.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate data source `{}`",
                    ds.name
                )));
            }
        }
        for table in &self.rule.tables {
            if table.logic_table.trim().is_empty() {
                return Err(ConfigError::Invalid("logic_table must not be empty".into()));
            }
        }
        for (name, algorithm) in &self.rule.algorithms {
            algorithm.validate(name)?;
        }
        Ok(())
    }

    /// Data source names in configuration order.
    pub fn data_source_names(&self) -> Vec<String> {
        self.data_sources.iter().map(|ds| ds.name.clone()).collect()
    }
}
