//! Sharding algorithms: the `ShardingAlgorithm` capability, the built-in
//! MOD / HASH_MOD / BOUNDARY_RANGE / INLINE implementations, and a registry
//! resolving configured algorithm names.
//!
//! Built-ins map a value to a partition index and pick the available target
//! whose trailing digits equal that index (`t_order_1` for index 1).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use shardline_common::{AlgorithmConfig, AlgorithmError, ConfigError, Datum};
use xxhash_rust::xxh3::xxh3_64;

use crate::condition::{ConditionValue, ValueRange};

/// One sharding value handed to an algorithm.
#[derive(Debug, Clone, Copy)]
pub struct ShardingValue<'a> {
    pub logic_table: &'a str,
    pub column: &'a str,
    pub value: &'a ConditionValue,
}

/// Computes candidate shard names for one sharding value.
///
/// Implementations must be pure: identical input yields identical output.
/// Every returned name must be one of `available_targets`.
pub trait ShardingAlgorithm: Send + Sync + fmt::Debug {
    fn algorithm_type(&self) -> &str;

    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError>;
}

/// Trailing decimal digits of a target name, e.g. `t_order_12` → 12.
pub fn trailing_number(name: &str) -> Option<u64> {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.len() == name.len() {
        return None;
    }
    name[stem.len()..].parse().ok()
}

fn target_by_suffix(
    algorithm: &str,
    available: &[String],
    index: u64,
) -> Result<String, AlgorithmError> {
    available
        .iter()
        .find(|t| trailing_number(t) == Some(index))
        .cloned()
        .ok_or_else(|| {
            AlgorithmError::new(
                algorithm,
                format!("no target with suffix {} among {:?}", index, available),
            )
        })
}

fn integral(algorithm: &str, value: &Datum) -> Result<i64, AlgorithmError> {
    value.as_i64().ok_or_else(|| {
        AlgorithmError::new(algorithm, format!("sharding value {} is not an integer", value))
    })
}

fn push_unique(out: &mut Vec<String>, target: String) {
    if !out.contains(&target) {
        out.push(target);
    }
}

/// Range bounds narrow enough to enumerate against `count` partitions.
fn enumerable_span(range: &ValueRange, count: u64) -> Option<(i64, i64)> {
    match range.int_bounds() {
        (Some(lo), Some(hi)) if lo <= hi && ((hi as i128 - lo as i128) as u128) < count as u128 => {
            Some((lo, hi))
        }
        _ => None,
    }
}

// ── MOD ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModShardingAlgorithm {
    name: String,
    sharding_count: u64,
}

impl ModShardingAlgorithm {
    /// Unchecked; `AlgorithmRegistry::build` validates the properties first.
    pub(crate) fn new(name: impl Into<String>, sharding_count: u64) -> Self {
        Self {
            name: name.into(),
            sharding_count,
        }
    }

    fn index_of(&self, value: &Datum) -> Result<u64, AlgorithmError> {
        let v = integral(&self.name, value)?;
        Ok(v.rem_euclid(self.sharding_count as i64) as u64)
    }
}

impl ShardingAlgorithm for ModShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "MOD"
    }

    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError> {
        let mut out = Vec::new();
        match value.value {
            ConditionValue::Equal(v) => {
                out.push(target_by_suffix(&self.name, available_targets, self.index_of(v)?)?);
            }
            ConditionValue::In(values) => {
                for v in values {
                    let target = target_by_suffix(&self.name, available_targets, self.index_of(v)?)?;
                    push_unique(&mut out, target);
                }
            }
            ConditionValue::Range(range) => match enumerable_span(range, self.sharding_count) {
                Some((lo, hi)) => {
                    for v in lo..=hi {
                        let index = v.rem_euclid(self.sharding_count as i64) as u64;
                        push_unique(&mut out, target_by_suffix(&self.name, available_targets, index)?);
                    }
                }
                None => out.extend(available_targets.iter().cloned()),
            },
        }
        Ok(out)
    }
}

// ── HASH_MOD ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HashModShardingAlgorithm {
    name: String,
    sharding_count: u64,
}

impl HashModShardingAlgorithm {
    /// Unchecked; `AlgorithmRegistry::build` validates the properties first.
    pub(crate) fn new(name: impl Into<String>, sharding_count: u64) -> Self {
        Self {
            name: name.into(),
            sharding_count,
        }
    }

    fn index_of(&self, value: &Datum) -> u64 {
        let mut buf = Vec::with_capacity(16);
        value.encode_for_hash(&mut buf);
        xxh3_64(&buf) % self.sharding_count
    }
}

impl ShardingAlgorithm for HashModShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "HASH_MOD"
    }

    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError> {
        let mut out = Vec::new();
        match value.value {
            ConditionValue::Equal(v) => {
                out.push(target_by_suffix(&self.name, available_targets, self.index_of(v))?);
            }
            ConditionValue::In(values) => {
                for v in values {
                    let target = target_by_suffix(&self.name, available_targets, self.index_of(v))?;
                    push_unique(&mut out, target);
                }
            }
            // Hashing destroys order; every partition may hold part of the range.
            ConditionValue::Range(_) => out.extend(available_targets.iter().cloned()),
        }
        Ok(out)
    }
}

// ── BOUNDARY_RANGE ───────────────────────────────────────────────────────────

/// Ascending boundaries `[b0, b1, ..]`: partition 0 holds `v < b0`,
/// partition i holds `b(i-1) <= v < b(i)`, the last holds `v >= b(n-1)`.
#[derive(Debug, Clone)]
pub struct BoundaryRangeShardingAlgorithm {
    name: String,
    boundaries: Vec<i64>,
}

impl BoundaryRangeShardingAlgorithm {
    /// Unchecked; `AlgorithmRegistry::build` validates the properties first.
    pub(crate) fn new(name: impl Into<String>, boundaries: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            boundaries,
        }
    }

    fn partition_of(&self, v: i64) -> u64 {
        self.boundaries.iter().filter(|b| v >= **b).count() as u64
    }

    fn last_partition(&self) -> u64 {
        self.boundaries.len() as u64
    }
}

impl ShardingAlgorithm for BoundaryRangeShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "BOUNDARY_RANGE"
    }

    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError> {
        let mut out = Vec::new();
        match value.value {
            ConditionValue::Equal(v) => {
                let partition = self.partition_of(integral(&self.name, v)?);
                out.push(target_by_suffix(&self.name, available_targets, partition)?);
            }
            ConditionValue::In(values) => {
                for v in values {
                    let partition = self.partition_of(integral(&self.name, v)?);
                    push_unique(&mut out, target_by_suffix(&self.name, available_targets, partition)?);
                }
            }
            ConditionValue::Range(range) => {
                let first = match &range.lower {
                    Some(lo) => self.partition_of(integral(&self.name, lo)?),
                    None => 0,
                };
                let last = match &range.upper {
                    Some(hi) => self.partition_of(integral(&self.name, hi)?),
                    None => self.last_partition(),
                };
                if first > last {
                    out.extend(available_targets.iter().cloned());
                } else {
                    for partition in first..=last {
                        push_unique(&mut out, target_by_suffix(&self.name, available_targets, partition)?);
                    }
                }
            }
        }
        Ok(out)
    }
}

// ── INLINE ───────────────────────────────────────────────────────────────────

/// `prefix${column % n}suffix` or `prefix${column}suffix`.
#[derive(Debug, Clone)]
pub struct InlineShardingAlgorithm {
    name: String,
    prefix: String,
    column: String,
    modulo: Option<u64>,
    suffix: String,
}

impl InlineShardingAlgorithm {
    pub fn parse(name: impl Into<String>, expression: &str) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason: &str| ConfigError::InvalidAlgorithm {
            algorithm: name.clone(),
            reason: format!("{} in `{}`", reason, expression),
        };
        let open = expression.find("${").ok_or_else(|| invalid("missing ${...}"))?;
        let close = expression[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| invalid("unclosed ${"))?;
        let suffix = &expression[close + 1..];
        if suffix.contains("${") {
            return Err(invalid("only one placeholder is supported"));
        }
        let body = expression[open + 2..close].trim();
        let (column, modulo) = match body.split_once('%') {
            Some((column, n)) => {
                let n: u64 = n.trim().parse().map_err(|_| invalid("modulo is not an integer"))?;
                if n == 0 {
                    return Err(invalid("modulo must be >= 1"));
                }
                (column.trim(), Some(n))
            }
            None => (body, None),
        };
        if column.is_empty() {
            return Err(invalid("missing column"));
        }
        Ok(Self {
            prefix: expression[..open].to_string(),
            column: column.to_string(),
            modulo,
            suffix: suffix.to_string(),
            name,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    fn render(&self, value: &Datum) -> Result<String, AlgorithmError> {
        let middle = match self.modulo {
            Some(n) => integral(&self.name, value)?.rem_euclid(n as i64).to_string(),
            None => match value {
                Datum::Text(s) => s.clone(),
                Datum::Int32(_) | Datum::Int64(_) => value.to_string(),
                other => {
                    return Err(AlgorithmError::new(
                        &self.name,
                        format!("cannot render sharding value {}", other),
                    ))
                }
            },
        };
        Ok(format!("{}{}{}", self.prefix, middle, self.suffix))
    }
}

impl ShardingAlgorithm for InlineShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "INLINE"
    }

    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError> {
        let mut out = Vec::new();
        match value.value {
            ConditionValue::Equal(v) => out.push(self.render(v)?),
            ConditionValue::In(values) => {
                for v in values {
                    push_unique(&mut out, self.render(v)?);
                }
            }
            ConditionValue::Range(range) => match self.modulo.and_then(|n| enumerable_span(range, n)) {
                Some((lo, hi)) => {
                    for v in lo..=hi {
                        push_unique(&mut out, self.render(&Datum::Int64(v))?);
                    }
                }
                None => out.extend(available_targets.iter().cloned()),
            },
        }
        Ok(out)
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Named algorithms available to strategies.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    algorithms: HashMap<String, Arc<dyn ShardingAlgorithm>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured algorithm.
    pub fn from_config(configs: &BTreeMap<String, AlgorithmConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, config) in configs {
            registry.register(name.clone(), Self::build(name, config)?);
        }
        Ok(registry)
    }

    pub fn build(name: &str, config: &AlgorithmConfig) -> Result<Arc<dyn ShardingAlgorithm>, ConfigError> {
        config.validate(name)?;
        Ok(match config {
            AlgorithmConfig::Mod { sharding_count } => {
                Arc::new(ModShardingAlgorithm::new(name, *sharding_count))
            }
            AlgorithmConfig::HashMod { sharding_count } => {
                Arc::new(HashModShardingAlgorithm::new(name, *sharding_count))
            }
            AlgorithmConfig::BoundaryRange { sharding_ranges } => {
                Arc::new(BoundaryRangeShardingAlgorithm::new(name, sharding_ranges.clone()))
            }
            AlgorithmConfig::Inline {
                algorithm_expression,
            } => Arc::new(InlineShardingAlgorithm::parse(name, algorithm_expression)?),
        })
    }

    /// Register (or replace) an algorithm under `name`.
    pub fn register(&mut self, name: impl Into<String>, algorithm: Arc<dyn ShardingAlgorithm>) {
        self.algorithms.insert(name.into(), algorithm);
    }

    /// Add every algorithm of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: &AlgorithmRegistry) {
        for (name, algorithm) in &other.algorithms {
            self.algorithms.insert(name.clone(), Arc::clone(algorithm));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ShardingAlgorithm>> {
        self.algorithms.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn shard(algo: &dyn ShardingAlgorithm, available: &[String], value: ConditionValue) -> Vec<String> {
        algo.do_sharding(
            available,
            &ShardingValue {
                logic_table: "t_order",
                column: "order_id",
                value: &value,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_trailing_number() {
        assert_eq!(trailing_number("t_order_12"), Some(12));
        assert_eq!(trailing_number("ds0"), Some(0));
        assert_eq!(trailing_number("t_order"), None);
    }

    #[test]
    fn test_mod_equal_in_and_range() {
        let algo = ModShardingAlgorithm::new("m", 2);
        let available = targets(&["t_order_0", "t_order_1"]);
        assert_eq!(shard(&algo, &available, ConditionValue::Equal(Datum::Int64(5))), vec!["t_order_1"]);
        assert_eq!(
            shard(&algo, &available, ConditionValue::In(vec![Datum::Int32(2), Datum::Int32(4)])),
            vec!["t_order_0"]
        );
        assert_eq!(
            shard(&algo, &available, ConditionValue::Range(ValueRange::closed(3, 3))),
            vec!["t_order_1"]
        );
        assert_eq!(
            shard(&algo, &available, ConditionValue::Range(ValueRange::closed(3, 100))),
            available
        );
    }

    #[test]
    fn test_mod_negative_value_uses_euclidean_remainder() {
        let algo = ModShardingAlgorithm::new("m", 4);
        let available = targets(&["t_0", "t_1", "t_2", "t_3"]);
        assert_eq!(shard(&algo, &available, ConditionValue::Equal(Datum::Int64(-1))), vec!["t_3"]);
    }

    #[test]
    fn test_mod_rejects_non_integral_value() {
        let algo = ModShardingAlgorithm::new("m", 2);
        let err = algo
            .do_sharding(
                &targets(&["t_0", "t_1"]),
                &ShardingValue {
                    logic_table: "t",
                    column: "c",
                    value: &ConditionValue::Equal(Datum::Text("abc".into())),
                },
            )
            .unwrap_err();
        assert_eq!(err.algorithm, "m");
    }

    #[test]
    fn test_hash_mod_is_deterministic() {
        let algo = HashModShardingAlgorithm::new("h", 4);
        let available = targets(&["ds_0", "ds_1", "ds_2", "ds_3"]);
        let a = shard(&algo, &available, ConditionValue::Equal(Datum::Text("alice".into())));
        let b = shard(&algo, &available, ConditionValue::Equal(Datum::Text("alice".into())));
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(
            shard(&algo, &available, ConditionValue::Range(ValueRange::at_least(1))),
            available
        );
    }

    #[test]
    fn test_boundary_range_includes_every_spanned_partition() {
        let algo = BoundaryRangeShardingAlgorithm::new("r", vec![100, 200]);
        let available = targets(&["t_0", "t_1", "t_2"]);
        assert_eq!(shard(&algo, &available, ConditionValue::Equal(Datum::Int64(99))), vec!["t_0"]);
        assert_eq!(shard(&algo, &available, ConditionValue::Equal(Datum::Int64(100))), vec!["t_1"]);
        assert_eq!(
            shard(&algo, &available, ConditionValue::Range(ValueRange::closed(50, 200))),
            vec!["t_0", "t_1", "t_2"]
        );
        assert_eq!(
            shard(&algo, &available, ConditionValue::Range(ValueRange::at_least(150))),
            vec!["t_1", "t_2"]
        );
        assert_eq!(
            shard(&algo, &available, ConditionValue::Range(ValueRange::at_most(10))),
            vec!["t_0"]
        );
    }

    #[test]
    fn test_inline_expression() {
        let algo = InlineShardingAlgorithm::parse("i", "t_order_${order_id % 2}").unwrap();
        assert_eq!(algo.column(), "order_id");
        let available = targets(&["t_order_0", "t_order_1"]);
        assert_eq!(shard(&algo, &available, ConditionValue::Equal(Datum::Int64(7))), vec!["t_order_1"]);

        let raw = InlineShardingAlgorithm::parse("r", "ds_${region}").unwrap();
        assert_eq!(
            shard(&raw, &targets(&["ds_eu", "ds_us"]), ConditionValue::Equal(Datum::Text("eu".into()))),
            vec!["ds_eu"]
        );
    }

    #[test]
    fn test_inline_rejects_bad_expressions() {
        assert!(InlineShardingAlgorithm::parse("i", "t_order").is_err());
        assert!(InlineShardingAlgorithm::parse("i", "t_${id % 0}").is_err());
        assert!(InlineShardingAlgorithm::parse("i", "t_${a}_${b}").is_err());
    }

    #[test]
    fn test_registry_rejects_zero_sharding_count() {
        for config in [
            AlgorithmConfig::Mod { sharding_count: 0 },
            AlgorithmConfig::HashMod { sharding_count: 0 },
        ] {
            let err = AlgorithmRegistry::build("zero", &config).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidAlgorithm { ref algorithm, .. } if algorithm == "zero"));
        }
        let err = AlgorithmRegistry::build("r", &AlgorithmConfig::BoundaryRange { sharding_ranges: vec![] }).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAlgorithm { .. }));
    }

    #[test]
    fn test_registry_builds_configured_algorithms() {
        let mut configs = BTreeMap::new();
        configs.insert("m".to_string(), AlgorithmConfig::Mod { sharding_count: 2 });
        configs.insert(
            "i".to_string(),
            AlgorithmConfig::Inline {
                algorithm_expression: "ds_${user_id % 2}".into(),
            },
        );
        let registry = AlgorithmRegistry::from_config(&configs).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("m").map(|a| a.algorithm_type().to_string()), Some("MOD".into()));
        assert!(registry.get("missing").is_none());
    }
}
