//! Execution units: the contract between routing and the statement executor.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use shardline_common::Datum;
use shardline_route::RouteMapper;

/// SQL text, parameters, and the logical → actual table mappings the text
/// was rewritten against.
#[derive(Debug, Clone)]
pub struct SqlUnit {
    pub sql: String,
    pub parameters: Vec<Datum>,
    pub table_route_mappers: Vec<RouteMapper>,
}

impl SqlUnit {
    pub fn new(sql: impl Into<String>, parameters: Vec<Datum>, table_route_mappers: Vec<RouteMapper>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
            table_route_mappers,
        }
    }
}

/// One statement for one actual data source.
///
/// Equality and hashing cover `(data_source_name, sql, parameters)` only;
/// table mappers are informational.
#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    pub data_source_name: String,
    pub sql_unit: SqlUnit,
}

impl ExecutionUnit {
    pub fn new(data_source_name: impl Into<String>, sql_unit: SqlUnit) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            sql_unit,
        }
    }
}

impl PartialEq for ExecutionUnit {
    fn eq(&self, other: &Self) -> bool {
        self.data_source_name == other.data_source_name
            && self.sql_unit.sql == other.sql_unit.sql
            && self.sql_unit.parameters == other.sql_unit.parameters
    }
}

impl Eq for ExecutionUnit {}

impl Hash for ExecutionUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data_source_name.hash(state);
        self.sql_unit.sql.hash(state);
        self.sql_unit.parameters.hash(state);
    }
}

impl fmt::Display for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ::: {}", self.data_source_name, self.sql_unit.sql)?;
        if !self.sql_unit.parameters.is_empty() {
            let params: Vec<String> = self.sql_unit.parameters.iter().map(|p| p.to_string()).collect();
            write!(f, " ::: [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Deduplicated execution units. `Ordered` keeps production order (DDL,
/// ordered-merge queries); `Unordered` makes no ordering promise.
#[derive(Debug, Clone)]
pub enum ExecutionUnits {
    Ordered(IndexSet<ExecutionUnit>),
    Unordered(HashSet<ExecutionUnit>),
}

impl ExecutionUnits {
    pub(crate) fn with_order(ordered: bool) -> Self {
        if ordered {
            ExecutionUnits::Ordered(IndexSet::new())
        } else {
            ExecutionUnits::Unordered(HashSet::new())
        }
    }

    /// Insert unless an equal unit is already present.
    pub(crate) fn insert(&mut self, unit: ExecutionUnit) -> bool {
        match self {
            ExecutionUnits::Ordered(set) => set.insert(unit),
            ExecutionUnits::Unordered(set) => set.insert(unit),
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, ExecutionUnits::Ordered(_))
    }

    pub fn len(&self) -> usize {
        match self {
            ExecutionUnits::Ordered(set) => set.len(),
            ExecutionUnits::Unordered(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, unit: &ExecutionUnit) -> bool {
        match self {
            ExecutionUnits::Ordered(set) => set.contains(unit),
            ExecutionUnits::Unordered(set) => set.contains(unit),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &ExecutionUnit> + '_> {
        match self {
            ExecutionUnits::Ordered(set) => Box::new(set.iter()),
            ExecutionUnits::Unordered(set) => Box::new(set.iter()),
        }
    }

    /// Distinct target data sources, in iteration order.
    pub fn data_source_names(&self) -> Vec<&str> {
        let mut names: IndexSet<&str> = IndexSet::new();
        for unit in self.iter() {
            names.insert(unit.data_source_name.as_str());
        }
        names.into_iter().collect()
    }
}
