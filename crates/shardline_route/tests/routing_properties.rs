//! Routing invariants.
//!
//! - determinism: repeated routing yields the same route context
//! - binding: bound tables never trigger extra algorithm invocations
//! - ranges: every spanned shard is included, boundaries inclusive
//! - absence: validation names every absent node
//! - broadcast completeness: one unit per configured node
//! - concurrency: routing against registry snapshots while the rule is replaced

mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use shardline_common::{AlgorithmConfig, RouteError, RouteProps, ShardError};
use shardline_route::{
    AlgorithmRegistry, DdlKind, ResourceMetadata, RouteValidator, RoutingPipeline, RuleRegistry, ShardingCondition,
    ShardingConditions, ShardingRule, StatementContext, StorageUnit, ValueRange,
};

// ═══════════════════════════════════════════════════════════════════════════
// Determinism
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_routing_is_deterministic() {
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let pipeline = RoutingPipeline::new(&rule, &metadata, &props);
    let statements = [
        (StatementContext::select(&["t_order"]), ShardingConditions::empty()),
        (
            StatementContext::select(&["t_order", "t_user"]).with_join(),
            ShardingConditions::empty(),
        ),
        (
            StatementContext::select(&["t_order", "t_order_item"]),
            ShardingConditions::new(vec![ShardingCondition::in_list("t_order", "order_id", [1, 2, 3])]),
        ),
    ];
    for (statement, conditions) in &statements {
        let first = pipeline.route(statement, conditions).unwrap();
        for _ in 0..10 {
            assert_eq!(pipeline.route(statement, conditions).unwrap(), first);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Binding invariant
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_bound_tables_evaluate_driving_strategy_once_per_axis() {
    let (rule, counters) = counting_rule();
    let metadata = metadata();
    let props = props();
    let statement = StatementContext::select(&["t_order", "t_order_item"]).with_join();
    let conditions = ShardingConditions::new(vec![ShardingCondition::equal("t_order", "order_id", 7)]);

    let route = RoutingPipeline::new(&rule, &metadata, &props)
        .route(&statement, &conditions)
        .unwrap();

    assert_eq!(calls(&counters, "ds_mod"), 1);
    assert_eq!(calls(&counters, "t_order_inline"), 1);
    assert_eq!(calls(&counters, "t_order_item_inline"), 0);

    let ctx = route.route_context();
    assert_eq!(ctx.len(), 1);
    for unit in ctx.units() {
        let order = unit.actual_table("t_order").unwrap();
        let item = unit.actual_table("t_order_item").unwrap();
        assert_eq!(order.rsplit('_').next(), item.rsplit('_').next());
    }
}

#[test]
fn test_bound_full_scan_pairs_tables_by_index() {
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let statement = StatementContext::select(&["t_order", "t_order_item"]).with_join();
    let route = RoutingPipeline::new(&rule, &metadata, &props)
        .route(&statement, &ShardingConditions::empty())
        .unwrap();
    let ctx = route.route_context();
    assert_eq!(ctx.len(), 4);
    assert!(ctx.contains(&unit(
        "ds_0",
        &[("t_order", "t_order_1"), ("t_order_item", "t_order_item_1")]
    )));
    assert!(!ctx.contains(&unit(
        "ds_0",
        &[("t_order", "t_order_0"), ("t_order_item", "t_order_item_1")]
    )));
}

// ═══════════════════════════════════════════════════════════════════════════
// Range conditions
// ═══════════════════════════════════════════════════════════════════════════

fn route_range(range: ValueRange) -> Vec<String> {
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let conditions = ShardingConditions::new(vec![ShardingCondition::range("t_range", "id", range)]);
    let route = RoutingPipeline::new(&rule, &metadata, &props)
        .route(&StatementContext::select(&["t_range"]), &conditions)
        .unwrap();
    let mut tables: Vec<String> = route
        .route_context()
        .units()
        .filter_map(|u| u.actual_table("t_range").map(str::to_string))
        .collect();
    tables.sort();
    tables
}

#[test]
fn test_range_includes_every_spanned_shard() {
    assert_eq!(route_range(ValueRange::closed(50, 250)), vec!["t_range_0", "t_range_1", "t_range_2"]);
    assert_eq!(route_range(ValueRange::closed(100, 199)), vec!["t_range_1"]);
    // both boundary values are inclusive
    assert_eq!(route_range(ValueRange::closed(99, 200)), vec!["t_range_0", "t_range_1", "t_range_2"]);
    assert_eq!(route_range(ValueRange::at_least(150)), vec!["t_range_1", "t_range_2"]);
}

#[test]
fn test_mod_range_wider_than_shard_count_hits_everything() {
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let conditions = ShardingConditions::new(vec![ShardingCondition::range(
        "t_order",
        "order_id",
        ValueRange::closed(10, 20),
    )]);
    let route = RoutingPipeline::new(&rule, &metadata, &props)
        .route(&StatementContext::select(&["t_order"]), &conditions)
        .unwrap();
    assert_eq!(route.route_context().len(), 4);
}

// ═══════════════════════════════════════════════════════════════════════════
// Absence detection
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_absent_node_is_reported() {
    init_tracing();
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let ctx = route_ctx(vec![
        unit("bar_ds", &[("t_order", "t_absent")]),
        unit("ds_0", &[("t_order", "t_order_0")]),
        unit("ds_1", &[("t_order", "t_order_7")]),
    ]);
    let conditions = ShardingConditions::new(vec![ShardingCondition::equal("t_order", "order_id", 5)]);

    let err = RouteValidator::new(&rule, &metadata, &props)
        .validate(ctx, &StatementContext::select(&["t_order"]), &conditions)
        .unwrap_err();

    let shard_err = ShardError::from(err);
    let absent = shard_err.absent_node().unwrap();
    assert_eq!(absent.absent_nodes, vec!["bar_ds.t_absent", "ds_1.t_order_7"]);
    assert_eq!(absent.data_sources, vec!["bar_ds", "ds_1"]);
    assert_eq!(absent.logic_table.as_deref(), Some("t_order"));
    assert_eq!(
        absent.database_strategy.as_deref(),
        Some("standard(column=order_id, algorithm=ds_mod)")
    );
    assert_eq!(absent.sharding_values, vec!["t_order.order_id = 5"]);
    assert!(shard_err.to_string().contains("bar_ds.t_absent"));
    assert!(!shard_err.is_retryable());
}

#[test]
fn test_metadata_check_rejects_ddl_on_missing_table() {
    let rule = rule();
    let metadata = metadata();
    let props = RouteProps {
        check_table_metadata_enabled: true,
        ..RouteProps::default()
    };
    let validator = RouteValidator::new(&rule, &metadata, &props);
    let statement = StatementContext::ddl(DdlKind::Table, &["t_order"]);

    let ok = route_ctx(vec![unit("ds_0", &[("t_order", "t_order_0")])]);
    assert!(validator.validate(ok, &statement, &ShardingConditions::empty()).is_ok());

    let missing = route_ctx(vec![unit("ds_2", &[("t_order", "t_order_0")])]);
    let err = validator
        .validate(missing, &statement, &ShardingConditions::empty())
        .unwrap_err();
    assert!(matches!(err, RouteError::AbsentNode(ref e) if e.absent_nodes == vec!["ds_2.t_order_0"]));
}

#[test]
fn test_metadata_presence_accepts_node_missing_from_rule() {
    let rule = rule();
    let metadata = ResourceMetadata::new().with_unit(StorageUnit::new("ds_1", "10.0.0.2:3306", ["t_order_legacy"]));
    let props = RouteProps {
        check_table_metadata_enabled: true,
        ..RouteProps::default()
    };
    let ctx = route_ctx(vec![unit("ds_1", &[("t_order", "t_order_legacy")])]);
    let validated = RouteValidator::new(&rule, &metadata, &props)
        .validate(ctx, &StatementContext::delete("t_order"), &ShardingConditions::empty())
        .unwrap();
    assert_eq!(validated.route_context().len(), 1);
}

#[test]
fn test_non_dml_skips_rule_check_without_metadata_check() {
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let ctx = route_ctx(vec![unit("bar_ds", &[("t_order", "t_absent")])]);
    assert!(RouteValidator::new(&rule, &metadata, &props)
        .validate(ctx, &StatementContext::ddl(DdlKind::Table, &["t_order"]), &ShardingConditions::empty())
        .is_ok());
}

#[test]
fn test_algorithm_target_outside_topology_is_rejected() {
    let config = config();
    let mut custom = AlgorithmRegistry::new();
    custom.register("ds_mod", Arc::new(FixedTargetAlgorithm("ds_9")));
    let rule = ShardingRule::build(&config, &custom).unwrap();
    let metadata = metadata();
    let props = props();
    let err = RoutingPipeline::new(&rule, &metadata, &props)
        .route(
            &StatementContext::select(&["t_order"]),
            &ShardingConditions::new(vec![ShardingCondition::equal("t_order", "order_id", 1)]),
        )
        .unwrap_err();
    match err {
        RouteError::InvalidRouteTarget { algorithm, targets, .. } => {
            assert_eq!(algorithm, "ds_mod");
            assert_eq!(targets, vec!["ds_9"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Broadcast completeness
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_table_broadcast_covers_every_configured_node() {
    let rule = rule();
    let metadata = metadata();
    let props = props();
    let statement = StatementContext::ddl(DdlKind::Table, &["t_order", "t_order_item", "t_range"]);
    let route = RoutingPipeline::new(&rule, &metadata, &props)
        .route(&statement, &ShardingConditions::empty())
        .unwrap();
    let expected: usize = ["t_order", "t_order_item", "t_range"]
        .iter()
        .map(|t| rule.table_rule(t).unwrap().actual_data_nodes().len())
        .sum();
    assert_eq!(expected, 11);
    assert_eq!(route.route_context().len(), expected);
}

// ═══════════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_concurrent_routing_against_replaced_rules() {
    init_tracing();
    let registry = Arc::new(RuleRegistry::from_config(&config()).unwrap());
    let metadata = metadata();
    let props = props();

    thread::scope(|scope| {
        for worker in 0..4i64 {
            let registry = Arc::clone(&registry);
            let metadata = &metadata;
            let props = &props;
            scope.spawn(move || {
                for i in 0..200i64 {
                    let rule = registry.load();
                    let order_id = worker * 1000 + i;
                    let conditions =
                        ShardingConditions::new(vec![ShardingCondition::equal("t_order", "order_id", order_id)]);
                    let route = RoutingPipeline::new(&rule, metadata, props)
                        .route(&StatementContext::select(&["t_order"]), &conditions)
                        .unwrap();
                    let expected = format!("t_order_{}", order_id % 2);
                    let ctx = route.route_context();
                    assert_eq!(ctx.len(), 1);
                    assert!(ctx.units().all(|u| u.actual_table("t_order") == Some(expected.as_str())));
                }
            });
        }

        let mut reconfigured = config();
        reconfigured.rule.algorithms.insert(
            "t_order_inline".into(),
            AlgorithmConfig::Mod { sharding_count: 2 },
        );
        for _ in 0..20 {
            registry.replace(ShardingRule::from_config(&reconfigured).unwrap());
        }
    });

    assert_eq!(registry.revision(), 20);
}
