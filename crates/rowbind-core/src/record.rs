//! Dynamic property bag for one row.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::naming::{to_domain_name, to_storage_name};
use crate::value::Value;

/// Ordered storage-name -> value mapping produced from a [`Record`].
pub type StorageMap = IndexMap<String, Value>;

/// One row: domain-named properties in insertion order, plus the table it
/// belongs to and the storage names of its primary-key columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    table_name: Option<String>,
    primary_key: Vec<String>,
    properties: IndexMap<String, Value>,
}

impl Record {
    /// Empty record targeting `table_name`, without a primary key.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            ..Self::default()
        }
    }

    /// Empty record targeting `table_name` whose primary key is the comma
    /// separated list of storage column names in `primary_key`.
    pub fn with_primary_key(table_name: impl Into<String>, primary_key: &str) -> Self {
        let mut record = Self::new(table_name);
        record.set_primary_key(primary_key);
        record
    }

    /// Build from already-named properties (no table, no key).
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Build from one result row. Column names are converted to domain names.
    ///
    /// Fails on the first column whose domain name an earlier column already
    /// took (`name` and `NAME`, or a join returning two `name` columns).
    pub fn from_result_row<I, K>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut record = Self::default();
        for (column, value) in columns {
            let column = column.as_ref();
            let property = to_domain_name(column);
            if record.contains(&property) {
                return Err(Error::column(column, Error::DuplicateProperty { property }));
            }
            record.set(property, value);
        }
        Ok(record)
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn set_table_name(&mut self, table_name: impl Into<String>) {
        self.table_name = Some(table_name.into());
    }

    /// Storage names of the primary-key columns, in configured order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn set_primary_key(&mut self, primary_key: &str) {
        self.primary_key = primary_key
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a property. An existing property keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.properties.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn is_primary_key(&self, storage_name: &str) -> bool {
        self.primary_key.iter().any(|c| c == storage_name)
    }

    /// Storage-named copy of every property, leaving out primary-key columns
    /// unless `include_primary_key` is set.
    pub fn to_storage_mapping(&self, include_primary_key: bool) -> StorageMap {
        self.properties
            .iter()
            .map(|(name, value)| (to_storage_name(name), value))
            .filter(|(column, _)| include_primary_key || !self.is_primary_key(column))
            .map(|(column, value)| (column, value.clone()))
            .collect()
    }

    /// Primary-key column -> value, in key order.
    pub fn primary_key_storage_mapping(&self) -> Result<StorageMap> {
        if self.primary_key.is_empty() {
            return Err(Error::no_primary_key(
                self.table_name.as_deref().unwrap_or_default(),
            ));
        }

        let mut map = StorageMap::with_capacity(self.primary_key.len());
        for column in &self.primary_key {
            let property = to_domain_name(column);
            let value = self
                .properties
                .get(&property)
                .ok_or_else(|| Error::missing_property(&property))?;
            map.insert(column.clone(), value.clone());
        }
        Ok(map)
    }

    /// Render every property as a JSON object, keys in insertion order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.properties {
            writeln!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}
