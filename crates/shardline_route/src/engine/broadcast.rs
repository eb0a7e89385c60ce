use crate::context::{RouteContext, RouteUnit};
use crate::metadata::StorageMetadata;
use crate::rule::{DataNode, ShardingRule};

use super::node_unit;

pub(super) fn route_databases(rule: &ShardingRule) -> RouteContext {
    rule.data_source_names()
        .iter()
        .map(|ds| RouteUnit::data_source_only(ds))
        .collect()
}

/// One unit per configured (data source, actual table) pair of every table.
/// Broadcast tables count as present under their own name on every data source.
pub(super) fn route_tables(rule: &ShardingRule, logic_tables: &[String]) -> RouteContext {
    let mut ctx = RouteContext::new();
    for table in logic_tables {
        if let Some(table_rule) = rule.table_rule(table) {
            for node in table_rule.actual_data_nodes() {
                ctx.add(node_unit(table_rule.logic_table(), node));
            }
        } else if rule.is_broadcast_table(table) {
            for ds in rule.data_source_names() {
                ctx.add(node_unit(table, &DataNode::new(ds.as_str(), table.as_str())));
            }
        }
    }
    ctx
}

pub(super) fn route_instances(metadata: &dyn StorageMetadata) -> RouteContext {
    metadata
        .instance_data_source_names()
        .iter()
        .map(|ds| RouteUnit::data_source_only(ds))
        .collect()
}

/// First data source of each minimal data-source group.
pub(super) fn route_data_source_groups(rule: &ShardingRule) -> RouteContext {
    rule.data_source_groups()
        .iter()
        .filter_map(|group| group.first())
        .map(|ds| RouteUnit::data_source_only(ds))
        .collect()
}
