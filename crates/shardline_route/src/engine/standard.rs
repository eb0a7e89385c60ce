use shardline_common::RouteError;

use crate::condition::{ShardingCondition, ShardingConditions};
use crate::context::{RouteContext, RouteMapper, RouteUnit};
use crate::rule::{DataNode, ShardingRule, TableRule};

/// Route one sharding table, or a set of mutually bound tables.
///
/// Only the driving table's strategies are evaluated; every other table is
/// bound and takes the actual table at the same index on the same data source.
pub(super) fn route(
    rule: &ShardingRule,
    logic_tables: &[String],
    conditions: &ShardingConditions,
) -> Result<RouteContext, RouteError> {
    let Some(driving_name) = driving_table(logic_tables, conditions) else {
        return Ok(RouteContext::new());
    };
    let driving = rule.find_table_rule(driving_name)?;
    let nodes = route_data_nodes(driving, &conditions.for_table(driving.logic_table()))?;

    let bound: Vec<&String> = logic_tables
        .iter()
        .filter(|t| !t.eq_ignore_ascii_case(driving.logic_table()))
        .collect();

    let mut ctx = RouteContext::new();
    for node in nodes {
        let mut mappers = Vec::with_capacity(bound.len() + 1);
        mappers.push(RouteMapper::new(driving.logic_table(), node.table.as_str()));
        for table in &bound {
            let actual = rule.find_binding_actual_table(&node.data_source, driving, &node.table, table)?;
            mappers.push(RouteMapper::new(table.as_str(), actual));
        }
        ctx.add(RouteUnit::new(
            RouteMapper::new(node.data_source.as_str(), node.data_source.as_str()),
            mappers,
        ));
    }
    Ok(ctx)
}

/// The table named by the first condition touching `logic_tables`, else the
/// first table.
fn driving_table<'a>(logic_tables: &'a [String], conditions: &ShardingConditions) -> Option<&'a String> {
    conditions
        .iter()
        .find_map(|c| logic_tables.iter().find(|t| t.eq_ignore_ascii_case(&c.table)))
        .or_else(|| logic_tables.first())
}

/// Cartesian product of the data-source axis and the table axis, restricted
/// to the rule's configured nodes. An unresolved axis contributes every target.
fn route_data_nodes(
    table_rule: &TableRule,
    conditions: &[&ShardingCondition],
) -> Result<Vec<DataNode>, RouteError> {
    let logic_table = table_rule.logic_table();
    let all_sources = table_rule.data_source_names();
    let sources = table_rule
        .database_strategy()
        .route(logic_table, &all_sources, conditions)?
        .unwrap_or_else(|| all_sources.clone());
    if sources.is_empty() {
        return Err(RouteError::NoDatabaseRoute(logic_table.to_string()));
    }

    let tables = table_rule
        .table_strategy()
        .route(logic_table, table_rule.actual_table_names(), conditions)?;

    let mut nodes = Vec::new();
    for ds in &sources {
        for table in table_rule.tables_in(ds) {
            if tables.as_ref().map_or(true, |t| t.contains(table)) {
                nodes.push(DataNode::new(ds.as_str(), table.as_str()));
            }
        }
    }
    if nodes.is_empty() {
        return Err(RouteError::NoTableRoute {
            logic_table: logic_table.to_string(),
            data_source: sources.join(", "),
        });
    }
    Ok(nodes)
}
