//! Strategy engines. `RouteStrategy` is the closed set of routing shapes;
//! each variant routes through its own module.

mod broadcast;
mod complex;
mod federated;
mod standard;
mod unicast;

use std::fmt;

use shardline_common::RouteError;

use crate::condition::ShardingConditions;
use crate::context::{RouteContext, RouteMapper, RouteUnit};
use crate::metadata::StorageMetadata;
use crate::rule::{DataNode, ShardingRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteStrategy {
    /// One sharding table, or mutually bound tables, routed by their strategies.
    Standard { logic_tables: Vec<String> },
    /// Unbound sharding tables, combined per shared data source.
    Complex { logic_tables: Vec<String> },
    /// Every actual node of every table, for the federation engine downstream.
    Federated { logic_tables: Vec<String> },
    /// Exactly one unit on one data source.
    Unicast { logic_tables: Vec<String> },
    /// Every actual node of every table.
    TableBroadcast { logic_tables: Vec<String> },
    /// Every data source once, no tables.
    DatabaseBroadcast,
    /// Every physical instance once, no tables.
    InstanceBroadcast,
    /// One data source per minimal data-source group.
    DataSourceGroupBroadcast,
    /// Empty route; the executor sends the statement to a default connection.
    Ignore,
}

impl RouteStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            RouteStrategy::Standard { .. } => "standard",
            RouteStrategy::Complex { .. } => "complex",
            RouteStrategy::Federated { .. } => "federated",
            RouteStrategy::Unicast { .. } => "unicast",
            RouteStrategy::TableBroadcast { .. } => "table-broadcast",
            RouteStrategy::DatabaseBroadcast => "database-broadcast",
            RouteStrategy::InstanceBroadcast => "instance-broadcast",
            RouteStrategy::DataSourceGroupBroadcast => "data-source-group-broadcast",
            RouteStrategy::Ignore => "ignore",
        }
    }

    pub fn logic_tables(&self) -> &[String] {
        match self {
            RouteStrategy::Standard { logic_tables }
            | RouteStrategy::Complex { logic_tables }
            | RouteStrategy::Federated { logic_tables }
            | RouteStrategy::Unicast { logic_tables }
            | RouteStrategy::TableBroadcast { logic_tables } => logic_tables,
            _ => &[],
        }
    }

    /// Compute the route context for this strategy.
    pub fn route(
        &self,
        rule: &ShardingRule,
        metadata: &dyn StorageMetadata,
        conditions: &ShardingConditions,
    ) -> Result<RouteContext, RouteError> {
        let ctx = match self {
            RouteStrategy::Standard { logic_tables } => {
                standard::route(rule, logic_tables, conditions)?
            }
            RouteStrategy::Complex { logic_tables } => complex::route(rule, logic_tables, conditions)?,
            RouteStrategy::Federated { logic_tables } => federated::route(rule, logic_tables),
            RouteStrategy::Unicast { logic_tables } => unicast::route(rule, logic_tables)?,
            RouteStrategy::TableBroadcast { logic_tables } => {
                broadcast::route_tables(rule, logic_tables)
            }
            RouteStrategy::DatabaseBroadcast => broadcast::route_databases(rule),
            RouteStrategy::InstanceBroadcast => broadcast::route_instances(metadata),
            RouteStrategy::DataSourceGroupBroadcast => broadcast::route_data_source_groups(rule),
            RouteStrategy::Ignore => RouteContext::new(),
        };
        tracing::debug!("{} routing produced {} unit(s)", self.name(), ctx.len());
        Ok(ctx)
    }
}

fn node_unit(logic_table: &str, node: &DataNode) -> RouteUnit {
    RouteUnit::new(
        RouteMapper::new(node.data_source.as_str(), node.data_source.as_str()),
        vec![RouteMapper::new(logic_table, node.table.as_str())],
    )
}

impl fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.logic_tables();
        if tables.is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}({})", self.name(), tables.join(", "))
        }
    }
}
