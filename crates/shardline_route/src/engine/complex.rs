use shardline_common::RouteError;

use super::standard;
use crate::condition::ShardingConditions;
use crate::context::{RouteContext, RouteUnit};
use crate::rule::ShardingRule;

/// Route unbound sharding tables: each binding group routes on its own,
/// then units of all groups are combined on every data source they share.
pub(super) fn route(
    rule: &ShardingRule,
    logic_tables: &[String],
    conditions: &ShardingConditions,
) -> Result<RouteContext, RouteError> {
    let mut routed = Vec::new();
    for group in group_by_binding(rule, logic_tables) {
        routed.push(standard::route(rule, &group, conditions)?);
    }
    let Some((first, rest)) = routed.split_first() else {
        return Ok(RouteContext::new());
    };

    let common: Vec<&str> = first
        .actual_data_source_names()
        .into_iter()
        .filter(|ds| rest.iter().all(|ctx| ctx.actual_data_source_names().contains(ds)))
        .collect();
    if common.is_empty() {
        return Err(RouteError::NoDataSourceIntersection(logic_tables.to_vec()));
    }

    let mut result = RouteContext::new();
    for ds in common {
        let mut combined = vec![RouteUnit::data_source_only(ds)];
        for ctx in &routed {
            let units: Vec<&RouteUnit> = ctx
                .units()
                .filter(|u| u.data_source_mapper().actual_name == ds)
                .collect();
            combined = combined
                .iter()
                .flat_map(|acc| units.iter().map(move |u| acc.merged_with(u)))
                .collect();
        }
        result.extend(combined);
    }
    Ok(result)
}

fn group_by_binding(rule: &ShardingRule, logic_tables: &[String]) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    for table in logic_tables {
        let existing = rule.binding_group(table).and_then(|binding| {
            groups
                .iter()
                .position(|members| members.iter().any(|m| binding.contains(m)))
        });
        match existing {
            Some(idx) => groups[idx].push(table.clone()),
            None => groups.push(vec![table.clone()]),
        }
    }
    groups
}
