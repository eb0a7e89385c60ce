//! Routing output: route units and the route context holding them.

use std::fmt;

use indexmap::IndexSet;

/// Logical name → actual name, for a data source or a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: impl Into<String>, actual_name: impl Into<String>) -> Self {
        Self {
            logic_name: logic_name.into(),
            actual_name: actual_name.into(),
        }
    }
}

/// One execution target: a data source plus the actual table of every
/// logical table the statement touches there.
///
/// Table mappers are kept sorted and deduplicated, so two units with the
/// same data source and the same table set are equal regardless of the
/// order the mappers were produced in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteUnit {
    data_source_mapper: RouteMapper,
    table_mappers: Vec<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source_mapper: RouteMapper, mut table_mappers: Vec<RouteMapper>) -> Self {
        table_mappers.sort();
        table_mappers.dedup();
        Self {
            data_source_mapper,
            table_mappers,
        }
    }

    /// Unit on `data_source` (logical == actual) without table mappers.
    pub fn data_source_only(data_source: &str) -> Self {
        Self::new(RouteMapper::new(data_source, data_source), Vec::new())
    }

    pub fn data_source_mapper(&self) -> &RouteMapper {
        &self.data_source_mapper
    }

    pub fn table_mappers(&self) -> &[RouteMapper] {
        &self.table_mappers
    }

    pub fn actual_table(&self, logic_table: &str) -> Option<&str> {
        self.table_mappers
            .iter()
            .find(|m| m.logic_name.eq_ignore_ascii_case(logic_table))
            .map(|m| m.actual_name.as_str())
    }

    /// Same data source, tables of both units combined.
    pub fn merged_with(&self, other: &RouteUnit) -> RouteUnit {
        let mut mappers = self.table_mappers.clone();
        mappers.extend(other.table_mappers.iter().cloned());
        RouteUnit::new(self.data_source_mapper.clone(), mappers)
    }
}

impl fmt::Display for RouteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data_source_mapper.actual_name)?;
        if !self.table_mappers.is_empty() {
            let tables: Vec<String> = self
                .table_mappers
                .iter()
                .map(|m| format!("{}:{}", m.logic_name, m.actual_name))
                .collect();
            write!(f, " -> [{}]", tables.join(", "))?;
        }
        Ok(())
    }
}

/// Set of route units in first-produced order. Equality is set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
    units: IndexSet<RouteUnit>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit; false when an equal unit is already present.
    pub fn add(&mut self, unit: RouteUnit) -> bool {
        self.units.insert(unit)
    }

    pub fn units(&self) -> impl Iterator<Item = &RouteUnit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, unit: &RouteUnit) -> bool {
        self.units.contains(unit)
    }

    /// Distinct actual data source names, in unit order.
    pub fn actual_data_source_names(&self) -> Vec<&str> {
        let names: IndexSet<&str> = self
            .units
            .iter()
            .map(|u| u.data_source_mapper.actual_name.as_str())
            .collect();
        names.into_iter().collect()
    }
}

impl FromIterator<RouteUnit> for RouteContext {
    fn from_iter<I: IntoIterator<Item = RouteUnit>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

impl Extend<RouteUnit> for RouteContext {
    fn extend<I: IntoIterator<Item = RouteUnit>>(&mut self, iter: I) {
        self.units.extend(iter);
    }
}

impl IntoIterator for RouteContext {
    type Item = RouteUnit;
    type IntoIter = indexmap::set::IntoIter<RouteUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.into_iter()
    }
}

impl fmt::Display for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units: Vec<String> = self.units.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", units.join("; "))
    }
}
