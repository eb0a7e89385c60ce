//! Sharding rule model: table rules, binding table groups and broadcast
//! tables, built once from configuration and only read while routing.
//!
//! Logical table names are matched case-insensitively.

pub mod algorithm;
pub mod inline;
pub mod strategy;
pub mod table_rule;

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use shardline_common::{ConfigError, RouteError, ShardlineConfig};

use self::algorithm::AlgorithmRegistry;
pub use self::strategy::ShardingStrategy;
pub use self::table_rule::{DataNode, TableRule};

/// Logical tables guaranteed to shard identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTableGroup {
    tables: Vec<String>,
}

impl BindingTableGroup {
    pub fn contains(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }
}

#[derive(Debug, Clone)]
pub struct ShardingRule {
    data_source_names: Vec<String>,
    table_rules: IndexMap<String, TableRule>,
    binding_groups: Vec<BindingTableGroup>,
    binding_index: HashMap<String, usize>,
    broadcast_tables: IndexSet<String>,
}

fn key(table: &str) -> String {
    table.to_ascii_lowercase()
}

impl ShardingRule {
    /// Build with the configured algorithms only.
    pub fn from_config(config: &ShardlineConfig) -> Result<Self, ConfigError> {
        Self::build(config, &AlgorithmRegistry::new())
    }

    /// Build with configured algorithms plus `custom` ones (custom wins on
    /// name clashes).
    pub fn build(config: &ShardlineConfig, custom: &AlgorithmRegistry) -> Result<Self, ConfigError> {
        let rule_config = &config.rule;
        let mut registry = AlgorithmRegistry::from_config(&rule_config.algorithms)?;
        registry.merge(custom);

        let data_source_names = config.data_source_names();

        let mut table_rules = IndexMap::new();
        for table in &rule_config.tables {
            let logic_table = table.logic_table.trim();
            let nodes = match &table.actual_data_nodes {
                Some(expression) => inline::expand(expression)?
                    .iter()
                    .map(|n| DataNode::parse(n))
                    .collect::<Result<Vec<_>, _>>()?,
                None => data_source_names
                    .iter()
                    .map(|ds| DataNode::new(ds.clone(), logic_table))
                    .collect(),
            };
            if nodes.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "table `{}` has no actual data nodes",
                    logic_table
                )));
            }
            for node in &nodes {
                if !data_source_names.contains(&node.data_source) {
                    return Err(ConfigError::UnknownDataSource {
                        data_source: node.data_source.clone(),
                        referenced_by: logic_table.to_string(),
                    });
                }
            }
            let database_strategy = ShardingStrategy::from_config(
                table
                    .database_strategy
                    .as_ref()
                    .or(rule_config.default_database_strategy.as_ref()),
                &registry,
                logic_table,
            )?;
            let table_strategy = ShardingStrategy::from_config(
                table
                    .table_strategy
                    .as_ref()
                    .or(rule_config.default_table_strategy.as_ref()),
                &registry,
                logic_table,
            )?;
            let rule = TableRule::new(logic_table, nodes, database_strategy, table_strategy);
            if table_rules.insert(key(logic_table), rule).is_some() {
                return Err(ConfigError::DuplicateTableRule(logic_table.to_string()));
            }
        }

        let mut broadcast_tables = IndexSet::new();
        for table in &rule_config.broadcast_tables {
            let k = key(table.trim());
            if table_rules.contains_key(&k) {
                return Err(ConfigError::BroadcastShardingOverlap(table.trim().to_string()));
            }
            broadcast_tables.insert(k);
        }

        let mut binding_groups = Vec::new();
        let mut binding_index = HashMap::new();
        for group in &rule_config.binding_tables {
            let tables: Vec<String> = group
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            for table in &tables {
                let rule: &TableRule = table_rules
                    .get(&key(table))
                    .ok_or_else(|| ConfigError::BindingNotSharded(table.clone()))?;
                if binding_index.insert(key(table), binding_groups.len()).is_some() {
                    return Err(ConfigError::DuplicateBinding(table.clone()));
                }
                if let Some(first) = tables.first().and_then(|t| table_rules.get(&key(t))) {
                    if !first.has_same_layout(rule) {
                        return Err(ConfigError::Invalid(format!(
                            "binding tables `{}` and `{}` have different data node layouts",
                            first.logic_table(),
                            rule.logic_table()
                        )));
                    }
                }
            }
            binding_groups.push(BindingTableGroup { tables });
        }

        tracing::debug!(
            "sharding rule built: {} table rules, {} binding groups, {} broadcast tables",
            table_rules.len(),
            binding_groups.len(),
            broadcast_tables.len()
        );

        Ok(Self {
            data_source_names,
            table_rules,
            binding_groups,
            binding_index,
            broadcast_tables,
        })
    }

    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn table_rules(&self) -> impl Iterator<Item = &TableRule> {
        self.table_rules.values()
    }

    pub fn table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules.get(&key(logic_table))
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Result<&TableRule, RouteError> {
        self.table_rule(logic_table)
            .ok_or_else(|| RouteError::TableRuleNotFound(logic_table.to_string()))
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.table_rules.contains_key(&key(logic_table))
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables.contains(&key(logic_table))
    }

    /// True when `tables` is non-empty and every table is a broadcast table.
    pub fn is_all_broadcast_tables(&self, tables: &[&str]) -> bool {
        !tables.is_empty() && tables.iter().all(|t| self.is_broadcast_table(t))
    }

    /// Sharding tables among `tables`, in statement order, without duplicates.
    pub fn sharding_table_names(&self, tables: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for table in tables {
            if let Some(rule) = self.table_rule(table) {
                if !out.iter().any(|t| t.eq_ignore_ascii_case(rule.logic_table())) {
                    out.push(rule.logic_table().to_string());
                }
            }
        }
        out
    }

    pub fn binding_group(&self, logic_table: &str) -> Option<&BindingTableGroup> {
        self.binding_index
            .get(&key(logic_table))
            .and_then(|idx| self.binding_groups.get(*idx))
    }

    /// True when `tables` is non-empty and all of them belong to one binding group.
    pub fn is_all_binding_tables(&self, tables: &[String]) -> bool {
        let mut groups = tables.iter().map(|t| self.binding_index.get(&key(t)));
        match groups.next() {
            Some(Some(first)) => groups.all(|g| g == Some(first)),
            _ => false,
        }
    }

    /// True when every table rule of `tables` lives on one single, shared data source.
    pub fn is_all_in_same_data_source(&self, tables: &[String]) -> bool {
        let mut shared: Option<String> = None;
        for table in tables {
            let Some(rule) = self.table_rule(table) else {
                return false;
            };
            let sources = rule.data_source_names();
            if sources.len() != 1 {
                return false;
            }
            let ds = &sources[0];
            if shared.get_or_insert_with(|| ds.clone()) != ds {
                return false;
            }
        }
        shared.is_some()
    }

    /// Actual table of `bound_table` paired with `driving_actual_table` of
    /// `driving` on `data_source`: the table at the same position.
    pub fn find_binding_actual_table(
        &self,
        data_source: &str,
        driving: &TableRule,
        driving_actual_table: &str,
        bound_table: &str,
    ) -> Result<String, RouteError> {
        let not_found = || RouteError::BindingActualTableNotFound {
            data_source: data_source.to_string(),
            actual_table: driving_actual_table.to_string(),
            bound_table: bound_table.to_string(),
        };
        let bound = self.find_table_rule(bound_table)?;
        let index = driving
            .table_index(data_source, driving_actual_table)
            .ok_or_else(not_found)?;
        bound
            .tables_in(data_source)
            .get(index)
            .cloned()
            .ok_or_else(not_found)
    }

    /// Minimal data-source groups reaching every table rule: the data-source
    /// sets of all table rules folded by pairwise intersection.
    pub fn data_source_groups(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = Vec::new();
        for rule in self.table_rules.values() {
            let sources = rule.data_source_names();
            if groups.is_empty() {
                groups.push(sources);
                continue;
            }
            let narrowed: Vec<Vec<String>> = groups
                .iter()
                .map(|g| g.iter().filter(|ds| sources.contains(ds)).cloned().collect::<Vec<_>>())
                .filter(|g| !g.is_empty())
                .collect();
            if narrowed.is_empty() {
                groups.push(sources);
            } else {
                groups = narrowed;
            }
        }
        if groups.is_empty() && !self.data_source_names.is_empty() {
            groups.push(self.data_source_names.clone());
        }
        groups
    }
}
