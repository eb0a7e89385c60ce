//! Routing result validation.
//!
//! Every table mapper of every route unit must name a node that exists:
//! (a) in storage metadata, checked only when `check_table_metadata_enabled`,
//! or (b) among the rule's actual data nodes of that logical table, checked
//! only for DML whose logical table the rule knows. A node with no
//! applicable check passes. All absent nodes are collected into one error.

use indexmap::IndexSet;
use shardline_common::{AbsentNodeError, RouteError, RouteProps};

use crate::condition::ShardingConditions;
use crate::context::{RouteContext, RouteMapper};
use crate::metadata::StorageMetadata;
use crate::rule::ShardingRule;
use crate::statement::StatementContext;

/// A route context that passed validation. Only `RouteValidator` creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRoute {
    route_context: RouteContext,
}

impl ValidatedRoute {
    pub fn route_context(&self) -> &RouteContext {
        &self.route_context
    }

    pub fn into_route_context(self) -> RouteContext {
        self.route_context
    }
}

pub struct RouteValidator<'a> {
    rule: &'a ShardingRule,
    metadata: &'a dyn StorageMetadata,
    props: &'a RouteProps,
}

impl<'a> RouteValidator<'a> {
    pub fn new(rule: &'a ShardingRule, metadata: &'a dyn StorageMetadata, props: &'a RouteProps) -> Self {
        Self { rule, metadata, props }
    }

    pub fn validate(
        &self,
        route_context: RouteContext,
        statement: &StatementContext,
        conditions: &ShardingConditions,
    ) -> Result<ValidatedRoute, RouteError> {
        let mut absent_nodes: IndexSet<String> = IndexSet::new();
        let mut data_sources: IndexSet<String> = IndexSet::new();
        let mut first_absent_table: Option<String> = None;

        for unit in route_context.units() {
            let data_source = unit.data_source_mapper().actual_name.as_str();
            for mapper in unit.table_mappers() {
                if self.is_present(statement, data_source, mapper) {
                    continue;
                }
                absent_nodes.insert(format!("{}.{}", data_source, mapper.actual_name));
                data_sources.insert(data_source.to_string());
                first_absent_table.get_or_insert_with(|| mapper.logic_name.clone());
            }
        }

        if absent_nodes.is_empty() {
            return Ok(ValidatedRoute { route_context });
        }

        let error = self.absent_node_error(absent_nodes, data_sources, first_absent_table, conditions);
        tracing::warn!("route rejected: {}", error);
        Err(error.into())
    }

    fn is_present(&self, statement: &StatementContext, data_source: &str, mapper: &RouteMapper) -> bool {
        let check_metadata = self.props.check_table_metadata_enabled;
        let check_rule = statement.is_dml()
            && (self.rule.is_sharding_table(&mapper.logic_name)
                || self.rule.is_broadcast_table(&mapper.logic_name));
        if !check_metadata && !check_rule {
            return true;
        }
        (check_metadata && self.metadata.contains_table(data_source, &mapper.actual_name))
            || (check_rule && self.in_rule(data_source, mapper))
    }

    fn in_rule(&self, data_source: &str, mapper: &RouteMapper) -> bool {
        match self.rule.table_rule(&mapper.logic_name) {
            Some(table_rule) => table_rule.contains_node(data_source, &mapper.actual_name),
            None => {
                mapper.actual_name.eq_ignore_ascii_case(&mapper.logic_name)
                    && self.rule.data_source_names().iter().any(|ds| ds == data_source)
            }
        }
    }

    fn absent_node_error(
        &self,
        absent_nodes: IndexSet<String>,
        data_sources: IndexSet<String>,
        logic_table: Option<String>,
        conditions: &ShardingConditions,
    ) -> AbsentNodeError {
        let table_rule = logic_table.as_deref().and_then(|t| self.rule.table_rule(t));
        let sharding_values = match &logic_table {
            Some(table) if !conditions.for_table(table).is_empty() => conditions
                .for_table(table)
                .iter()
                .map(|c| c.to_string())
                .collect(),
            _ => conditions.render(),
        };
        AbsentNodeError {
            absent_nodes: absent_nodes.into_iter().collect(),
            data_sources: data_sources.into_iter().collect(),
            database_strategy: table_rule.map(|r| r.database_strategy().to_string()),
            table_strategy: table_rule.map(|r| r.table_strategy().to_string()),
            logic_table,
            sharding_values,
        }
    }
}
