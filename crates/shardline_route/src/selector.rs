//! Routing engine selection: classify a statement and pick one strategy.
//!
//! First match wins:
//! 1. TCL → database broadcast
//! 2. DDL → routine: database broadcast; tablespace: instance broadcast;
//!    otherwise table broadcast over the rule tables (ignore when none)
//! 3. DAL → see `select_dal`
//! 4. DCL → one concrete rule table: table broadcast; otherwise instance broadcast
//! 5. DML/DQL → broadcast tables, always-false, ignore, then
//!    federated / standard / complex
//!
//! Selection never fails; unsupported shapes surface later in validation.

use shardline_common::RouteProps;

use crate::condition::ShardingConditions;
use crate::engine::RouteStrategy;
use crate::rule::ShardingRule;
use crate::statement::{DalKind, DdlKind, StatementContext, StatementKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteEngineSelector;

impl RouteEngineSelector {
    pub fn select(
        statement: &StatementContext,
        rule: &ShardingRule,
        conditions: &ShardingConditions,
        props: &RouteProps,
    ) -> RouteStrategy {
        let strategy = match statement.kind {
            StatementKind::Tcl => RouteStrategy::DatabaseBroadcast,
            StatementKind::Ddl(kind) => select_ddl(kind, statement, rule),
            StatementKind::Dal(kind) => select_dal(kind, statement, rule),
            StatementKind::Dcl(_) => select_dcl(statement, rule),
            StatementKind::Dml(_) => select_dml(statement, rule, conditions, props),
        };
        tracing::debug!("selected {} for {:?}", strategy, statement.kind);
        strategy
    }
}

/// Tables of `statement` that have a table rule or are broadcast tables.
fn rule_tables(statement: &StatementContext, rule: &ShardingRule) -> Vec<String> {
    let mut out = Vec::new();
    for table in statement.table_names() {
        let name = match rule.table_rule(table) {
            Some(table_rule) => table_rule.logic_table().to_string(),
            None if rule.is_broadcast_table(table) => table.to_ascii_lowercase(),
            None => continue,
        };
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn select_ddl(kind: DdlKind, statement: &StatementContext, rule: &ShardingRule) -> RouteStrategy {
    match kind {
        DdlKind::Routine => RouteStrategy::DatabaseBroadcast,
        DdlKind::Tablespace => RouteStrategy::InstanceBroadcast,
        DdlKind::Table | DdlKind::Index | DdlKind::View => {
            let logic_tables = rule_tables(statement, rule);
            if !statement.tables.is_empty() && logic_tables.is_empty() {
                RouteStrategy::Ignore
            } else {
                RouteStrategy::TableBroadcast { logic_tables }
            }
        }
    }
}

/// DAL: `USE` → ignore; session/variable statements → database broadcast;
/// resource groups → instance broadcast; tables but no rule tables (sharding
/// or broadcast) → ignore;
/// `OPTIMIZE` → table broadcast; `ANALYZE` → table broadcast, or database
/// broadcast with no rule tables; any rule table → unicast; else one data
/// source per data-source group.
fn select_dal(kind: DalKind, statement: &StatementContext, rule: &ShardingRule) -> RouteStrategy {
    match kind {
        DalKind::Use => return RouteStrategy::Ignore,
        DalKind::Set | DalKind::Reset | DalKind::ShowDatabases | DalKind::Load => {
            return RouteStrategy::DatabaseBroadcast
        }
        DalKind::ResourceGroup => return RouteStrategy::InstanceBroadcast,
        _ => {}
    }
    let logic_tables = rule_tables(statement, rule);
    if !statement.tables.is_empty() && logic_tables.is_empty() {
        return RouteStrategy::Ignore;
    }
    match kind {
        DalKind::Optimize => RouteStrategy::TableBroadcast { logic_tables },
        DalKind::Analyze if logic_tables.is_empty() => RouteStrategy::DatabaseBroadcast,
        DalKind::Analyze => RouteStrategy::TableBroadcast { logic_tables },
        _ if !logic_tables.is_empty() => RouteStrategy::Unicast { logic_tables },
        _ => RouteStrategy::DataSourceGroupBroadcast,
    }
}

fn select_dcl(statement: &StatementContext, rule: &ShardingRule) -> RouteStrategy {
    match statement.tables.as_slice() {
        [table] if !table.is_wildcard() => {
            let logic_tables = rule_tables(statement, rule);
            if logic_tables.is_empty() {
                RouteStrategy::Ignore
            } else {
                RouteStrategy::TableBroadcast { logic_tables }
            }
        }
        _ => RouteStrategy::InstanceBroadcast,
    }
}

fn select_dml(
    statement: &StatementContext,
    rule: &ShardingRule,
    conditions: &ShardingConditions,
    props: &RouteProps,
) -> RouteStrategy {
    let table_names = statement.table_names();
    if rule.is_all_broadcast_tables(&table_names) {
        let logic_tables = table_names.iter().map(|t| t.to_string()).collect();
        return if statement.is_select() {
            RouteStrategy::Unicast { logic_tables }
        } else {
            RouteStrategy::DatabaseBroadcast
        };
    }
    if conditions.is_always_false() || table_names.is_empty() {
        return RouteStrategy::Unicast {
            logic_tables: table_names.iter().map(|t| t.to_string()).collect(),
        };
    }
    let logic_tables = rule.sharding_table_names(&table_names);
    if logic_tables.is_empty() {
        return RouteStrategy::Ignore;
    }
    if is_federated(statement, rule, &logic_tables, conditions, props) {
        return RouteStrategy::Federated { logic_tables };
    }
    if logic_tables.len() == 1 || rule.is_all_binding_tables(&logic_tables) {
        RouteStrategy::Standard { logic_tables }
    } else {
        RouteStrategy::Complex { logic_tables }
    }
}

/// Statement-shape checks come first (subquery, HAVING, partial DISTINCT
/// aggregation); a join only federates when it spans several sharding tables
/// that are neither on one shared data source nor bound.
fn is_federated(
    statement: &StatementContext,
    rule: &ShardingRule,
    logic_tables: &[String],
    conditions: &ShardingConditions,
    props: &RouteProps,
) -> bool {
    if !props.sql_federation_enabled || !statement.is_select() || statement.has_pagination {
        return false;
    }
    if conditions.is_need_merge() && conditions.is_same_sharding_condition() {
        return false;
    }
    if statement.has_subquery || statement.has_having || statement.has_partial_distinct_aggregation {
        return true;
    }
    statement.has_join
        && logic_tables.len() > 1
        && !rule.is_all_in_same_data_source(logic_tables)
        && !rule.is_all_binding_tables(logic_tables)
}
