use std::fmt;

use indexmap::IndexMap;
use shardline_common::ConfigError;

use super::strategy::ShardingStrategy;

/// A physical `data_source.table` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataNode {
    pub data_source: String,
    pub table: String,
}

impl DataNode {
    pub fn new(data_source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            table: table.into(),
        }
    }

    /// Parse `ds.table`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.trim().split_once('.') {
            Some((ds, table)) if !ds.trim().is_empty() && !table.trim().is_empty() => {
                Ok(Self::new(ds.trim(), table.trim()))
            }
            _ => Err(ConfigError::Invalid(format!(
                "data node `{}` must be `data_source.table`",
                text
            ))),
        }
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.data_source, self.table)
    }
}

/// Routing rule of one logical table: its actual data nodes and the
/// strategies of both routing axes.
#[derive(Debug, Clone)]
pub struct TableRule {
    logic_table: String,
    actual_data_nodes: Vec<DataNode>,
    // data source → actual tables on it, both in configuration order
    tables_by_data_source: IndexMap<String, Vec<String>>,
    // every actual table name, first-seen order
    actual_tables: Vec<String>,
    database_strategy: ShardingStrategy,
    table_strategy: ShardingStrategy,
}

impl TableRule {
    pub fn new(
        logic_table: impl Into<String>,
        actual_data_nodes: Vec<DataNode>,
        database_strategy: ShardingStrategy,
        table_strategy: ShardingStrategy,
    ) -> Self {
        let mut tables_by_data_source: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut actual_tables: Vec<String> = Vec::new();
        for node in &actual_data_nodes {
            let tables = tables_by_data_source.entry(node.data_source.clone()).or_default();
            if !tables.contains(&node.table) {
                tables.push(node.table.clone());
            }
            if !actual_tables.contains(&node.table) {
                actual_tables.push(node.table.clone());
            }
        }
        Self {
            logic_table: logic_table.into(),
            actual_data_nodes,
            tables_by_data_source,
            actual_tables,
            database_strategy,
            table_strategy,
        }
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn actual_data_nodes(&self) -> &[DataNode] {
        &self.actual_data_nodes
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.tables_by_data_source.keys().cloned().collect()
    }

    pub fn actual_table_names(&self) -> &[String] {
        &self.actual_tables
    }

    /// Actual tables hosted by `data_source`, empty when none.
    pub fn tables_in(&self, data_source: &str) -> &[String] {
        self.tables_by_data_source
            .get(data_source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_node(&self, data_source: &str, table: &str) -> bool {
        self.tables_in(data_source)
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Position of `table` among the actual tables of `data_source`.
    pub fn table_index(&self, data_source: &str, table: &str) -> Option<usize> {
        self.tables_in(data_source)
            .iter()
            .position(|t| t.eq_ignore_ascii_case(table))
    }

    pub fn database_strategy(&self) -> &ShardingStrategy {
        &self.database_strategy
    }

    pub fn table_strategy(&self) -> &ShardingStrategy {
        &self.table_strategy
    }

    /// Same data sources with the same number of actual tables on each.
    pub fn has_same_layout(&self, other: &TableRule) -> bool {
        self.tables_by_data_source.len() == other.tables_by_data_source.len()
            && self
                .tables_by_data_source
                .iter()
                .all(|(ds, tables)| other.tables_in(ds).len() == tables.len())
    }
}
