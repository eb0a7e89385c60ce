//! Bound statement context consumed by routing. Parsing and binding happen
//! upstream; this is only the shape the router needs.

/// A table as written in SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `*` in `GRANT ... ON *.*` style statements.
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlKind {
    Table,
    Index,
    View,
    /// Functions and procedures.
    Routine,
    Tablespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DalKind {
    Use,
    Set,
    Reset,
    ShowDatabases,
    Load,
    ResourceGroup,
    Optimize,
    Analyze,
    /// `SHOW TABLES`, `SHOW CREATE TABLE`, `DESCRIBE` and the like.
    Show,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DclKind {
    Grant,
    Revoke,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmlKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Transaction control.
    Tcl,
    Ddl(DdlKind),
    Dal(DalKind),
    Dcl(DclKind),
    Dml(DmlKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementContext {
    pub kind: StatementKind,
    pub tables: Vec<TableRef>,
    pub has_subquery: bool,
    pub has_having: bool,
    pub has_partial_distinct_aggregation: bool,
    pub has_join: bool,
    pub has_pagination: bool,
    /// ORDER BY / GROUP BY: rows from different units are merged in order.
    pub needs_ordered_merge: bool,
}

impl StatementContext {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            tables: Vec::new(),
            has_subquery: false,
            has_having: false,
            has_partial_distinct_aggregation: false,
            has_join: false,
            has_pagination: false,
            needs_ordered_merge: false,
        }
    }

    pub fn select(tables: &[&str]) -> Self {
        Self::new(StatementKind::Dml(DmlKind::Select)).with_tables(tables)
    }

    pub fn insert(table: &str) -> Self {
        Self::new(StatementKind::Dml(DmlKind::Insert)).with_tables(&[table])
    }

    pub fn update(table: &str) -> Self {
        Self::new(StatementKind::Dml(DmlKind::Update)).with_tables(&[table])
    }

    pub fn delete(table: &str) -> Self {
        Self::new(StatementKind::Dml(DmlKind::Delete)).with_tables(&[table])
    }

    pub fn ddl(kind: DdlKind, tables: &[&str]) -> Self {
        Self::new(StatementKind::Ddl(kind)).with_tables(tables)
    }

    pub fn dal(kind: DalKind, tables: &[&str]) -> Self {
        Self::new(StatementKind::Dal(kind)).with_tables(tables)
    }

    pub fn dcl(kind: DclKind, tables: &[&str]) -> Self {
        Self::new(StatementKind::Dcl(kind)).with_tables(tables)
    }

    pub fn tcl() -> Self {
        Self::new(StatementKind::Tcl)
    }

    pub fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables.extend(tables.iter().map(|t| TableRef::new(*t)));
        self
    }

    pub fn with_subquery(mut self) -> Self {
        self.has_subquery = true;
        self
    }

    pub fn with_having(mut self) -> Self {
        self.has_having = true;
        self
    }

    pub fn with_partial_distinct_aggregation(mut self) -> Self {
        self.has_partial_distinct_aggregation = true;
        self
    }

    pub fn with_join(mut self) -> Self {
        self.has_join = true;
        self
    }

    pub fn with_pagination(mut self) -> Self {
        self.has_pagination = true;
        self
    }

    pub fn with_ordered_merge(mut self) -> Self {
        self.needs_ordered_merge = true;
        self
    }

    pub fn is_select(&self) -> bool {
        self.kind == StatementKind::Dml(DmlKind::Select)
    }

    pub fn is_dml(&self) -> bool {
        matches!(self.kind, StatementKind::Dml(_))
    }

    pub fn is_ddl(&self) -> bool {
        matches!(self.kind, StatementKind::Ddl(_))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}
