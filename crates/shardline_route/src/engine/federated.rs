use crate::context::RouteContext;
use crate::rule::ShardingRule;

/// Every actual node of every sharding table; the federation engine
/// downstream decides what to read from where.
pub(super) fn route(rule: &ShardingRule, logic_tables: &[String]) -> RouteContext {
    logic_tables
        .iter()
        .filter_map(|t| rule.table_rule(t))
        .flat_map(|table_rule| {
            table_rule
                .actual_data_nodes()
                .iter()
                .map(move |node| super::node_unit(table_rule.logic_table(), node))
        })
        .collect()
}
