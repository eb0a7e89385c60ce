//! Execution context builder.

use indexmap::IndexSet;
use shardline_common::{RouteProps, ShardError, ShardResult};
use shardline_route::{RouteMapper, RouteUnit, StatementContext, StorageMetadata, ValidatedRoute};

use crate::rewrite::{RewriteResult, SqlRewriteUnit};
use crate::unit::{ExecutionUnit, ExecutionUnits, SqlUnit};

/// Turns a validated route and its rewrite into execution units.
pub struct ExecutionContextBuilder<'a> {
    metadata: &'a dyn StorageMetadata,
    props: &'a RouteProps,
}

impl<'a> ExecutionContextBuilder<'a> {
    pub fn new(metadata: &'a dyn StorageMetadata, props: &'a RouteProps) -> Self {
        Self { metadata, props }
    }

    /// Build execution units for `route`.
    ///
    /// A generic rewrite targets the route's data sources in route order,
    /// keeping only the first one on each physical instance. A
    /// route-scoped rewrite yields one unit per rewritten route unit, each of
    /// which must belong to `route`; units equal on
    /// `(data_source, sql, parameters)` collapse into one.
    pub fn build(
        &self,
        route: &ValidatedRoute,
        rewrite: RewriteResult,
        statement: &StatementContext,
    ) -> ShardResult<ExecutionUnits> {
        let ordered = statement.is_ddl() || (statement.is_select() && statement.needs_ordered_merge);
        let mut units = ExecutionUnits::with_order(ordered);

        match rewrite {
            RewriteResult::Generic(rewritten) => {
                let mut instances = IndexSet::new();
                for data_source in route.route_context().actual_data_source_names() {
                    let instance = self
                        .metadata
                        .instance_of(data_source)
                        .unwrap_or_else(|| data_source.to_string());
                    if !instances.insert(instance) {
                        continue;
                    }
                    units.insert(ExecutionUnit::new(
                        data_source,
                        SqlUnit::new(
                            rewritten.sql.clone(),
                            rewritten.parameters.clone(),
                            table_mappers_on(route, data_source),
                        ),
                    ));
                }
            }
            RewriteResult::RouteScoped(rewritten) => {
                for (route_unit, rewritten) in rewritten {
                    if !route.route_context().contains(&route_unit) {
                        return Err(ShardError::internal(format!(
                            "rewritten route unit `{}` is not part of the validated route",
                            route_unit
                        )));
                    }
                    units.insert(self.route_scoped_unit(&route_unit, rewritten));
                }
            }
        }

        tracing::debug!(
            "built {} execution unit(s) from {} route unit(s)",
            units.len(),
            route.route_context().len()
        );
        if self.props.sql_show {
            for unit in units.iter() {
                tracing::info!("Actual SQL: {}", unit);
            }
        }
        Ok(units)
    }

    fn route_scoped_unit(&self, route_unit: &RouteUnit, rewritten: SqlRewriteUnit) -> ExecutionUnit {
        let mapper = route_unit.data_source_mapper();
        let data_source = if self.metadata.contains_data_source(&mapper.actual_name) {
            mapper.actual_name.clone()
        } else {
            mapper.logic_name.clone()
        };
        ExecutionUnit::new(
            data_source,
            SqlUnit::new(rewritten.sql, rewritten.parameters, route_unit.table_mappers().to_vec()),
        )
    }
}

/// Table mappers of every route unit landing on `data_source`.
fn table_mappers_on(route: &ValidatedRoute, data_source: &str) -> Vec<RouteMapper> {
    let mut mappers = IndexSet::new();
    for unit in route.route_context().units() {
        if unit.data_source_mapper().actual_name == data_source {
            mappers.extend(unit.table_mappers().iter().cloned());
        }
    }
    mappers.into_iter().collect()
}
