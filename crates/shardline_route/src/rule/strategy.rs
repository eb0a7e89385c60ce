use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use shardline_common::{ConfigError, RouteError, StrategyConfig};

use super::algorithm::{AlgorithmRegistry, ShardingAlgorithm, ShardingValue};
use crate::condition::ShardingCondition;

/// Resolves one routing axis (data source or table) of a table rule.
#[derive(Debug, Clone)]
pub enum ShardingStrategy {
    /// One sharding column.
    Standard {
        column: String,
        algorithm_name: String,
        algorithm: Arc<dyn ShardingAlgorithm>,
    },
    /// Several sharding columns; candidates of different columns are intersected.
    Complex {
        columns: Vec<String>,
        algorithm_name: String,
        algorithm: Arc<dyn ShardingAlgorithm>,
    },
    /// Never resolved: the axis always fans out to every target.
    None,
}

impl ShardingStrategy {
    pub fn from_config(
        config: Option<&StrategyConfig>,
        registry: &AlgorithmRegistry,
        referenced_by: &str,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &str| {
            registry.get(name).ok_or_else(|| ConfigError::UnknownAlgorithm {
                algorithm: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
        };
        Ok(match config {
            None | Some(StrategyConfig::None) => ShardingStrategy::None,
            Some(StrategyConfig::Standard {
                sharding_column,
                algorithm,
            }) => ShardingStrategy::Standard {
                column: sharding_column.clone(),
                algorithm_name: algorithm.clone(),
                algorithm: lookup(algorithm)?,
            },
            Some(StrategyConfig::Complex {
                sharding_columns,
                algorithm,
            }) => {
                if sharding_columns.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "complex strategy of `{}` has no sharding columns",
                        referenced_by
                    )));
                }
                ShardingStrategy::Complex {
                    columns: sharding_columns.clone(),
                    algorithm_name: algorithm.clone(),
                    algorithm: lookup(algorithm)?,
                }
            }
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ShardingStrategy::None)
    }

    pub fn sharding_columns(&self) -> Vec<&str> {
        match self {
            ShardingStrategy::Standard { column, .. } => vec![column.as_str()],
            ShardingStrategy::Complex { columns, .. } => columns.iter().map(String::as_str).collect(),
            ShardingStrategy::None => Vec::new(),
        }
    }

    /// Route one axis of `logic_table` over `available` targets.
    ///
    /// Returns `Ok(None)` when no condition touches a sharding column (the
    /// axis is unresolved and the caller fans out). Conditions on the same
    /// column are unioned; columns of a complex strategy are intersected.
    /// The result keeps the order of `available`.
    pub fn route(
        &self,
        logic_table: &str,
        available: &[String],
        conditions: &[&ShardingCondition],
    ) -> Result<Option<Vec<String>>, RouteError> {
        let (algorithm_name, algorithm) = match self {
            ShardingStrategy::None => return Ok(None),
            ShardingStrategy::Standard {
                algorithm_name,
                algorithm,
                ..
            }
            | ShardingStrategy::Complex {
                algorithm_name,
                algorithm,
                ..
            } => (algorithm_name, algorithm),
        };

        let mut resolved: Option<IndexSet<String>> = None;
        for column in self.sharding_columns() {
            let matching: Vec<&&ShardingCondition> = conditions
                .iter()
                .filter(|c| c.column.eq_ignore_ascii_case(column))
                .collect();
            if matching.is_empty() {
                continue;
            }
            let mut candidates = IndexSet::new();
            for condition in matching {
                let value = ShardingValue {
                    logic_table,
                    column,
                    value: &condition.value,
                };
                let targets = algorithm.do_sharding(available, &value)?;
                check_targets(algorithm_name, logic_table, &targets, available)?;
                candidates.extend(targets);
            }
            resolved = Some(match resolved {
                None => candidates,
                Some(previous) => previous.intersection(&candidates).cloned().collect(),
            });
        }

        Ok(resolved.map(|set| available.iter().filter(|t| set.contains(*t)).cloned().collect()))
    }
}

fn check_targets(
    algorithm_name: &str,
    logic_table: &str,
    targets: &[String],
    available: &[String],
) -> Result<(), RouteError> {
    let unknown: Vec<String> = targets
        .iter()
        .filter(|t| !available.contains(t))
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(RouteError::InvalidRouteTarget {
            algorithm: algorithm_name.to_string(),
            logic_table: logic_table.to_string(),
            targets: unknown,
            available: available.to_vec(),
        })
    }
}

impl fmt::Display for ShardingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingStrategy::Standard {
                column,
                algorithm_name,
                ..
            } => write!(f, "standard(column={}, algorithm={})", column, algorithm_name),
            ShardingStrategy::Complex {
                columns,
                algorithm_name,
                ..
            } => write!(f, "complex(columns={}, algorithm={})", columns.join("+"), algorithm_name),
            ShardingStrategy::None => write!(f, "none"),
        }
    }
}
