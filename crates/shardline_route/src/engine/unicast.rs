use shardline_common::RouteError;

use crate::context::{RouteContext, RouteMapper, RouteUnit};
use crate::rule::ShardingRule;

/// Tables without a table rule (broadcast or unknown) exist everywhere.
fn hosts(rule: &ShardingRule, data_source: &str, table: &str) -> bool {
    match rule.table_rule(table) {
        Some(table_rule) => !table_rule.tables_in(data_source).is_empty(),
        None => true,
    }
}

/// Exactly one unit: the first data source (configuration order) hosting
/// every table, else the first hosting any; first actual table of each.
pub(super) fn route(rule: &ShardingRule, logic_tables: &[String]) -> Result<RouteContext, RouteError> {
    let data_sources = rule.data_source_names();
    let chosen = data_sources
        .iter()
        .find(|ds| logic_tables.iter().all(|t| hosts(rule, ds, t)))
        .or_else(|| {
            data_sources
                .iter()
                .find(|ds| logic_tables.iter().any(|t| hosts(rule, ds, t)))
        })
        .ok_or_else(|| RouteError::NoDatabaseRoute(logic_tables.join(", ")))?;

    let mappers = logic_tables
        .iter()
        .filter_map(|table| match rule.table_rule(table) {
            Some(table_rule) => table_rule
                .tables_in(chosen)
                .first()
                .map(|actual| RouteMapper::new(table_rule.logic_table(), actual.as_str())),
            None => Some(RouteMapper::new(table.as_str(), table.as_str())),
        })
        .collect();

    let mut ctx = RouteContext::new();
    ctx.add(RouteUnit::new(
        RouteMapper::new(chosen.as_str(), chosen.as_str()),
        mappers,
    ));
    Ok(ctx)
}
