//! Storage metadata: which data sources exist, which actual tables they
//! hold, and which physical instance each one lives on.

use indexmap::{IndexMap, IndexSet};
use shardline_common::ShardlineConfig;

/// Read-only view of the storage catalog.
pub trait StorageMetadata: Send + Sync {
    fn contains_data_source(&self, data_source: &str) -> bool;

    fn contains_table(&self, data_source: &str, table: &str) -> bool;

    /// One data source name per physical instance (the first configured
    /// name on that instance), in configuration order.
    fn instance_data_source_names(&self) -> Vec<String>;

    /// Endpoint of the instance hosting `data_source`, if known.
    fn instance_of(&self, data_source: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUnit {
    pub name: String,
    /// `host:port` of the physical instance.
    pub endpoint: String,
    tables: IndexSet<String>,
}

impl StorageUnit {
    pub fn new<I, S>(name: impl Into<String>, endpoint: impl Into<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            tables: tables.into_iter().map(|t| t.as_ref().to_ascii_lowercase()).collect(),
        }
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains(&table.to_ascii_lowercase())
    }
}

/// In-memory catalog of storage units, keyed by data source name.
#[derive(Debug, Clone, Default)]
pub struct ResourceMetadata {
    units: IndexMap<String, StorageUnit>,
}

impl ResourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ShardlineConfig) -> Self {
        let mut metadata = Self::new();
        for ds in &config.data_sources {
            metadata.add_unit(StorageUnit::new(ds.name.clone(), ds.endpoint(), &ds.tables));
        }
        metadata
    }

    pub fn add_unit(&mut self, unit: StorageUnit) {
        self.units.insert(unit.name.clone(), unit);
    }

    pub fn with_unit(mut self, unit: StorageUnit) -> Self {
        self.add_unit(unit);
        self
    }

    pub fn unit(&self, data_source: &str) -> Option<&StorageUnit> {
        self.units.get(data_source)
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }
}

impl StorageMetadata for ResourceMetadata {
    fn contains_data_source(&self, data_source: &str) -> bool {
        self.units.contains_key(data_source)
    }

    fn contains_table(&self, data_source: &str, table: &str) -> bool {
        self.units
            .get(data_source)
            .map_or(false, |unit| unit.contains_table(table))
    }

    fn instance_data_source_names(&self) -> Vec<String> {
        let mut seen = IndexSet::new();
        self.units
            .values()
            .filter(|unit| seen.insert(unit.endpoint.as_str()))
            .map(|unit| unit.name.clone())
            .collect()
    }

    fn instance_of(&self, data_source: &str) -> Option<String> {
        self.units.get(data_source).map(|unit| unit.endpoint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ResourceMetadata {
        ResourceMetadata::new()
            .with_unit(StorageUnit::new("ds_0", "10.0.0.1:3306", ["t_order_0", "T_ORDER_1"]))
            .with_unit(StorageUnit::new("ds_1", "10.0.0.1:3306", ["t_order_2"]))
            .with_unit(StorageUnit::new("ds_2", "10.0.0.2:3306", Vec::<String>::new()))
    }

    #[test]
    fn test_instance_names_take_first_per_endpoint() {
        assert_eq!(metadata().instance_data_source_names(), vec!["ds_0", "ds_2"]);
    }

    #[test]
    fn test_instance_of_resolves_endpoint() {
        let md = metadata();
        assert_eq!(md.instance_of("ds_1").as_deref(), Some("10.0.0.1:3306"));
        assert_eq!(md.instance_of("ds_0"), md.instance_of("ds_1"));
        assert_eq!(md.instance_of("ds_9"), None);
    }

    #[test]
    fn test_table_lookup() {
        let md = metadata();
        assert!(md.contains_table("ds_0", "t_order_1"));
        assert!(!md.contains_table("ds_1", "t_order_0"));
        assert!(!md.contains_table("ds_9", "t_order_0"));
        assert!(md.contains_data_source("ds_2"));
        assert!(!md.contains_data_source("bar_ds"));
    }

    #[test]
    fn test_from_config_parses_endpoints() {
        let config = ShardlineConfig::from_toml_str(
            r#"
[[data_sources]]
name = "a"
url = "mysql://db1:3306/a"
tables = ["t_user"]

[[data_sources]]
name = "b"
url = "mysql://db1:3306/b"
"#,
        )
        .unwrap();
        let md = ResourceMetadata::from_config(&config);
        assert_eq!(md.unit("b").map(|u| u.endpoint.as_str()), Some("db1:3306"));
        assert_eq!(md.instance_data_source_names(), vec!["a"]);
        assert!(md.contains_table("a", "t_user"));
    }
}
