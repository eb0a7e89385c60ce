use std::fmt;

use thiserror::Error;

/// Convenience alias for `Result<T, ShardError>`.
pub type ShardResult<T> = Result<T, ShardError>;

/// Error classification for the caller (proxy/driver layer).
///
/// - `UserError`       : the statement itself cannot be routed as written
/// - `Misconfiguration`: rule configuration disagrees with storage topology;
///                      needs an operator fix, never retried
/// - `AlgorithmFailure`: a sharding algorithm failed or returned bad targets
/// - `InternalBug`     : should never happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserError,
    Misconfiguration,
    AlgorithmFailure,
    InternalBug,
}

/// Top-level error type that all crate-specific errors convert into.
#[derive(Error, Debug)]
pub enum ShardError {
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while computing or validating a route.
#[derive(Error, Debug)]
pub enum RouteError {
    /// One or more route targets exist neither in storage metadata nor in the
    /// rule's actual data nodes.
    #[error(transparent)]
    AbsentNode(Box<AbsentNodeError>),

    /// Raised by a sharding algorithm; passed through untouched.
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error("Sharding algorithm `{algorithm}` routed `{logic_table}` to unknown target(s) {targets:?}, available: {available:?}")]
    InvalidRouteTarget {
        algorithm: String,
        logic_table: String,
        targets: Vec<String>,
        available: Vec<String>,
    },

    #[error("Cannot find sharding table rule for logic table `{0}`")]
    TableRuleNotFound(String),

    #[error("No database route for logic table `{0}`")]
    NoDatabaseRoute(String),

    #[error("No table route for logic table `{logic_table}` in data source `{data_source}`")]
    NoTableRoute {
        logic_table: String,
        data_source: String,
    },

    #[error("Cannot find actual table of binding table `{bound_table}` for `{data_source}.{actual_table}`")]
    BindingActualTableNotFound {
        data_source: String,
        actual_table: String,
        bound_table: String,
    },

    #[error("Cannot find a data source shared by tables {0:?}")]
    NoDataSourceIntersection(Vec<String>),
}

impl From<AbsentNodeError> for RouteError {
    fn from(e: AbsentNodeError) -> Self {
        RouteError::AbsentNode(Box::new(e))
    }
}

/// Failure reported by a `ShardingAlgorithm`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Sharding algorithm `{algorithm}` failed: {message}")]
pub struct AlgorithmError {
    pub algorithm: String,
    pub message: String,
}

impl AlgorithmError {
    pub fn new(algorithm: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            message: message.into(),
        }
    }
}

/// Routed nodes that do not exist. Carries everything needed to identify the
/// misconfigured table/strategy from the client-side message alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbsentNodeError {
    /// `data_source.actual_table` pairs, in route order.
    pub absent_nodes: Vec<String>,
    /// Data sources of the route units that carried absent nodes.
    pub data_sources: Vec<String>,
    pub logic_table: Option<String>,
    pub database_strategy: Option<String>,
    pub table_strategy: Option<String>,
    /// Rendered sharding conditions that produced the route.
    pub sharding_values: Vec<String>,
}

impl fmt::Display for AbsentNodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Actual table(s) `{}` absent in data source(s) `{}`",
            self.absent_nodes.join(", "),
            self.data_sources.join(", ")
        )?;
        if let Some(table) = &self.logic_table {
            write!(f, "; logic table `{}`", table)?;
        }
        if let Some(strategy) = &self.database_strategy {
            write!(f, ", database strategy {}", strategy)?;
        }
        if let Some(strategy) = &self.table_strategy {
            write!(f, ", table strategy {}", strategy)?;
        }
        if !self.sharding_values.is_empty() {
            write!(f, ", sharding values [{}]", self.sharding_values.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for AbsentNodeError {}

/// Configuration loading and rule-building errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown data source `{data_source}` referenced by `{referenced_by}`")]
    UnknownDataSource {
        data_source: String,
        referenced_by: String,
    },

    #[error("Unknown sharding algorithm `{algorithm}` referenced by `{referenced_by}`")]
    UnknownAlgorithm {
        algorithm: String,
        referenced_by: String,
    },

    #[error("Invalid algorithm `{algorithm}`: {reason}")]
    InvalidAlgorithm { algorithm: String, reason: String },

    #[error("Table `{0}` belongs to more than one binding group")]
    DuplicateBinding(String),

    #[error("Binding table `{0}` is not a sharding table")]
    BindingNotSharded(String),

    #[error("Table `{0}` is configured both as broadcast and as sharding table")]
    BroadcastShardingOverlap(String),

    #[error("Duplicate table rule for `{0}`")]
    DuplicateTableRule(String),

    #[error("Invalid inline expression `{expression}`: {reason}")]
    InvalidInlineExpression { expression: String, reason: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ── ShardError classification & helpers ──────────────────────────────────────

impl ShardError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShardError::Route(RouteError::AbsentNode(_)) => ErrorKind::Misconfiguration,
            ShardError::Route(RouteError::TableRuleNotFound(_)) => ErrorKind::Misconfiguration,
            ShardError::Route(RouteError::BindingActualTableNotFound { .. }) => {
                ErrorKind::Misconfiguration
            }
            ShardError::Route(RouteError::NoDataSourceIntersection(_)) => ErrorKind::UserError,
            ShardError::Route(RouteError::Algorithm(_)) => ErrorKind::AlgorithmFailure,
            ShardError::Route(RouteError::InvalidRouteTarget { .. }) => ErrorKind::AlgorithmFailure,
            ShardError::Route(RouteError::NoDatabaseRoute(_)) => ErrorKind::AlgorithmFailure,
            ShardError::Route(RouteError::NoTableRoute { .. }) => ErrorKind::AlgorithmFailure,
            ShardError::Config(_) => ErrorKind::Misconfiguration,
            ShardError::Internal(_) => ErrorKind::InternalBug,
        }
    }

    /// Routing failures are deterministic for a given rule snapshot, so a
    /// blind retry can never succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn is_absent_node(&self) -> bool {
        matches!(self, ShardError::Route(RouteError::AbsentNode(_)))
    }

    /// Borrow the absent-node report, if this is one.
    pub fn absent_node(&self) -> Option<&AbsentNodeError> {
        match self {
            ShardError::Route(RouteError::AbsentNode(e)) => Some(e),
            _ => None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ShardError::Internal(message.into())
    }
}

impl From<AlgorithmError> for ShardError {
    fn from(e: AlgorithmError) -> Self {
        ShardError::Route(RouteError::Algorithm(e))
    }
}

impl From<AbsentNodeError> for ShardError {
    fn from(e: AbsentNodeError) -> Self {
        ShardError::Route(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_node_message_carries_diagnostics() {
        let err = AbsentNodeError {
            absent_nodes: vec!["bar_ds.t_absent".into()],
            data_sources: vec!["bar_ds".into()],
            logic_table: Some("t_order".into()),
            database_strategy: Some("standard(user_id, db_mod)".into()),
            table_strategy: None,
            sharding_values: vec!["t_order.order_id = 5".into()],
        };
        let msg = ShardError::from(err).to_string();
        assert!(msg.contains("bar_ds.t_absent"));
        assert!(msg.contains("data source(s) `bar_ds`"));
        assert!(msg.contains("standard(user_id, db_mod)"));
        assert!(msg.contains("t_order.order_id = 5"));
    }

    #[test]
    fn test_algorithm_error_passes_through_unchanged() {
        let original = AlgorithmError::new("custom", "boom");
        let err: ShardError = original.clone().into();
        assert_eq!(err.kind(), ErrorKind::AlgorithmFailure);
        match err {
            ShardError::Route(RouteError::Algorithm(inner)) => assert_eq!(inner, original),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classification() {
        let absent: ShardError = AbsentNodeError::default().into();
        assert!(absent.is_absent_node());
        assert_eq!(absent.kind(), ErrorKind::Misconfiguration);
        assert!(!absent.is_retryable());

        let internal = ShardError::internal("oops");
        assert_eq!(internal.kind(), ErrorKind::InternalBug);
        assert!(internal.absent_node().is_none());
    }
}
