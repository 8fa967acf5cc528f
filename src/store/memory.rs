use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use super::{Record, RecordStore};
use crate::error::{RecordTreeError, Result};

/// In-memory store. Rows keep insertion order; later inserts count as newer.
///
/// Behaves like a schema-bearing store: querying an undeclared type, or a
/// field the type never declared, is an error rather than an empty result.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, MemoryTable>,
}

#[derive(Debug, Default)]
struct MemoryTable {
    columns: BTreeSet<String>,
    rows: Vec<Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type and its fields without inserting any rows.
    pub fn define_type(&mut self, entity_type: &str, fields: &[&str]) -> &mut Self {
        let table = self.tables.entry(entity_type.to_string()).or_default();
        table.columns.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// Insert a record, declaring its type and fields on first use.
    pub fn insert(&mut self, entity_type: &str, record: Record) -> &mut Self {
        let table = self.tables.entry(entity_type.to_string()).or_default();
        table.columns.extend(record.fields.keys().cloned());
        table.rows.push(record);
        self
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self, entity_type: &str) -> Result<&MemoryTable> {
        self.tables
            .get(entity_type)
            .ok_or_else(|| RecordTreeError::Query(format!("No such entity type: {}", entity_type)))
    }
}

impl RecordStore for MemoryStore {
    fn fetch_by_id(&self, entity_type: &str, id: &str) -> Result<Option<Record>> {
        let table = self.table(entity_type)?;
        Ok(table.rows.iter().find(|r| r.id == id).cloned())
    }

    fn fetch_children(
        &self,
        child_type: &str,
        linking_field: &str,
        parent_id: &str,
    ) -> Result<Vec<Record>> {
        let table = self.table(child_type)?;
        if !table.columns.contains(linking_field) {
            return Err(RecordTreeError::Query(format!(
                "No such field {} on {}",
                linking_field, child_type
            )));
        }

        Ok(table
            .rows
            .iter()
            .rev()
            .filter(|r| matches!(r.field(linking_field), Some(Value::String(v)) if v == parent_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert("Contact", Record::new("C1").with_field("AccountId", "A1"))
            .insert("Contact", Record::new("C2").with_field("AccountId", "A1"))
            .insert("Contact", Record::new("C3").with_field("AccountId", "A2"));
        store
    }

    #[test]
    fn test_fetch_by_id() {
        let store = contacts();
        let found = store.fetch_by_id("Contact", "C2").unwrap();
        assert_eq!(found.map(|r| r.id), Some("C2".to_string()));
        assert!(store.fetch_by_id("Contact", "C9").unwrap().is_none());
    }

    #[test]
    fn test_fetch_children_newest_first() {
        let store = contacts();
        let ids: Vec<_> = store
            .fetch_children("Contact", "AccountId", "A1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["C2", "C1"]);
    }

    #[test]
    fn test_declared_type_without_rows_is_empty() {
        let mut store = MemoryStore::new();
        store.define_type("Case", &["ContactId"]);
        assert!(store.fetch_children("Case", "ContactId", "C1").unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_type_and_field_are_errors() {
        let store = contacts();
        assert!(matches!(
            store.fetch_children("Lead", "AccountId", "A1"),
            Err(RecordTreeError::Query(_))
        ));
        assert!(matches!(
            store.fetch_children("Contact", "OwnerId", "A1"),
            Err(RecordTreeError::Query(_))
        ));
    }
}
