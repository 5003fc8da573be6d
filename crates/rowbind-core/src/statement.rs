//! SQL fragment building with positional `:N` placeholders.
//!
//! Every fragment that assigns placeholder indices has a matching way to get
//! the values in that same order ([`StatementBuilder::values`]), so the text
//! and the bound parameters cannot drift apart.

use crate::record::StorageMap;
use crate::value::Value;

/// Fragments over an ordered storage-name -> value mapping.
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    entries: StorageMap,
}

impl StatementBuilder {
    pub fn new(entries: StorageMap) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose value is not NULL.
    pub fn non_null_entries(&self) -> Vec<(&str, &Value)> {
        self.filtered(false).collect()
    }

    fn filtered(&self, include_null: bool) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .filter(move |(_, v)| include_null || !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
    }

    /// `a, b, c`
    pub fn column_name_list(&self, include_null: bool) -> String {
        self.filtered(include_null)
            .map(|(column, _)| column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `:0, :1, :2`, one per column of [`StatementBuilder::column_name_list`].
    pub fn placeholder_list(&self, include_null: bool) -> String {
        (0..self.filtered(include_null).count())
            .map(|i| format!(":{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `where a=:N and b=:N+1`
    pub fn where_clause(&self, start: usize) -> String {
        format!("where {}", self.assignments(start).join(" and "))
    }

    /// `set a=:N, b=:N+1`
    pub fn set_clause(&self, start: usize) -> String {
        format!("set {}", self.assignments(start).join(", "))
    }

    fn assignments(&self, start: usize) -> Vec<String> {
        self.entries
            .keys()
            .enumerate()
            .map(|(i, column)| format!("{column}=:{}", start + i))
            .collect()
    }

    /// Values in placeholder order for the same `include_null` choice.
    pub fn values(&self, include_null: bool) -> Vec<Value> {
        self.filtered(include_null).map(|(_, v)| v.clone()).collect()
    }
}

impl From<StorageMap> for StatementBuilder {
    fn from(entries: StorageMap) -> Self {
        Self::new(entries)
    }
}
