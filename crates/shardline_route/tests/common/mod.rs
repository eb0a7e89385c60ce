//! Shared fixture: three data sources (ds_0 and ds_2 on one instance), a
//! bound pair `t_order`/`t_order_item`, an unbound `t_user`, a range-sharded
//! `t_range` and the broadcast table `t_config`.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shardline_common::{AlgorithmError, RouteProps, ShardlineConfig};
use shardline_route::{
    AlgorithmRegistry, ResourceMetadata, RouteContext, RouteMapper, RouteUnit, ShardingAlgorithm, ShardingRule,
    ShardingValue,
};

pub const CONFIG: &str = r#"
[[data_sources]]
name = "ds_0"
url = "mysql://10.0.0.1:3306/demo_ds_0"
tables = ["t_order_0", "t_order_1", "t_order_item_0", "t_order_item_1", "t_user", "t_config", "t_range_0", "t_range_1", "t_range_2"]

[[data_sources]]
name = "ds_1"
url = "mysql://10.0.0.2:3306/demo_ds_1"
tables = ["t_order_0", "t_order_1", "t_order_item_0", "t_order_item_1", "t_user", "t_config"]

[[data_sources]]
name = "ds_2"
url = "mysql://10.0.0.1:3306/demo_ds_2"

[rule]
binding_tables = ["t_order, t_order_item"]
broadcast_tables = ["t_config"]

[rule.default_database_strategy]
kind = "standard"
sharding_column = "order_id"
algorithm = "ds_mod"

[[rule.tables]]
logic_table = "t_order"
actual_data_nodes = "ds_${0..1}.t_order_${0..1}"

[rule.tables.table_strategy]
kind = "standard"
sharding_column = "order_id"
algorithm = "t_order_inline"

[[rule.tables]]
logic_table = "t_order_item"
actual_data_nodes = "ds_${0..1}.t_order_item_${0..1}"

[rule.tables.table_strategy]
kind = "standard"
sharding_column = "order_id"
algorithm = "t_order_item_inline"

[[rule.tables]]
logic_table = "t_user"
actual_data_nodes = "ds_${0..1}.t_user"

[rule.tables.database_strategy]
kind = "standard"
sharding_column = "user_id"
algorithm = "ds_mod"

[[rule.tables]]
logic_table = "t_range"
actual_data_nodes = "ds_0.t_range_${0..2}"

[rule.tables.database_strategy]
kind = "none"

[rule.tables.table_strategy]
kind = "standard"
sharding_column = "id"
algorithm = "id_range"

[rule.algorithms.ds_mod]
type = "MOD"
sharding_count = 2

[rule.algorithms.t_order_inline]
type = "INLINE"
algorithm_expression = "t_order_${order_id % 2}"

[rule.algorithms.t_order_item_inline]
type = "INLINE"
algorithm_expression = "t_order_item_${order_id % 2}"

[rule.algorithms.id_range]
type = "BOUNDARY_RANGE"
sharding_ranges = [100, 200]
"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config() -> ShardlineConfig {
    ShardlineConfig::from_toml_str(CONFIG).unwrap()
}

pub fn rule() -> ShardingRule {
    ShardingRule::from_config(&config()).unwrap()
}

pub fn metadata() -> ResourceMetadata {
    ResourceMetadata::from_config(&config())
}

pub fn props() -> RouteProps {
    RouteProps::default()
}

pub fn unit(ds: &str, tables: &[(&str, &str)]) -> RouteUnit {
    RouteUnit::new(
        RouteMapper::new(ds, ds),
        tables.iter().map(|(l, a)| RouteMapper::new(*l, *a)).collect(),
    )
}

/// Wraps an algorithm and counts its invocations.
#[derive(Debug)]
pub struct CountingAlgorithm {
    inner: Arc<dyn ShardingAlgorithm>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingAlgorithm {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ShardingAlgorithm for CountingAlgorithm {
    fn algorithm_type(&self) -> &str {
        self.inner.algorithm_type()
    }

    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.do_sharding(available_targets, value)
    }
}

/// Rule whose configured algorithms are all wrapped in counters, keyed by
/// algorithm name.
pub fn counting_rule() -> (ShardingRule, Vec<(String, Arc<AtomicUsize>)>) {
    let config = config();
    let mut custom = AlgorithmRegistry::new();
    let mut counters = Vec::new();
    for (name, algorithm) in &config.rule.algorithms {
        let calls = Arc::new(AtomicUsize::new(0));
        let wrapped = CountingAlgorithm {
            inner: AlgorithmRegistry::build(name, algorithm).unwrap(),
            calls: Arc::clone(&calls),
        };
        custom.register(name.clone(), Arc::new(wrapped));
        counters.push((name.clone(), calls));
    }
    (ShardingRule::build(&config, &custom).unwrap(), counters)
}

pub fn calls(counters: &[(String, Arc<AtomicUsize>)], name: &str) -> usize {
    counters
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, c)| c.load(Ordering::SeqCst))
        .unwrap_or(0)
}

/// Always answers with one fixed target, valid or not.
#[derive(Debug)]
pub struct FixedTargetAlgorithm(pub &'static str);

impl ShardingAlgorithm for FixedTargetAlgorithm {
    fn algorithm_type(&self) -> &str {
        "FIXED"
    }

    fn do_sharding(
        &self,
        _available_targets: &[String],
        _value: &ShardingValue<'_>,
    ) -> Result<Vec<String>, AlgorithmError> {
        Ok(vec![self.0.to_string()])
    }
}

pub fn route_ctx(units: Vec<RouteUnit>) -> RouteContext {
    units.into_iter().collect()
}
