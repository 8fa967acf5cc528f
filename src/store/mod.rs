//! Record store adapters.
//!
//! The hierarchy builder only sees [`RecordStore`]: fetch one record by type
//! and id, or fetch every record of a type whose linking field equals a
//! parent id. Type and field names arrive at runtime from the registry.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A typed entity instance: identifier plus whatever fields the store returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Display text of `field`, or `None` when the field is missing or null.
    pub fn label_from(&self, field: &str) -> Option<String> {
        match self.field(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Read access to typed records.
pub trait RecordStore {
    /// Fetch a record by type and id; `Ok(None)` when no such record exists.
    fn fetch_by_id(&self, entity_type: &str, id: &str) -> Result<Option<Record>>;

    /// Fetch records of `child_type` whose `linking_field` equals `parent_id`,
    /// newest first. No matches is an empty vec, not an error.
    fn fetch_children(
        &self,
        child_type: &str,
        linking_field: &str,
        parent_id: &str,
    ) -> Result<Vec<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_from_string_field() {
        let record = Record::new("A1").with_field("Name", "Acme");
        assert_eq!(record.label_from("Name"), Some("Acme".to_string()));
    }

    #[test]
    fn test_label_from_missing_or_null() {
        let record = Record::new("A1").with_field("Name", Value::Null);
        assert_eq!(record.label_from("Name"), None);
        assert_eq!(record.label_from("Subject"), None);
    }

    #[test]
    fn test_label_from_number() {
        let record = Record::new("L1").with_field("Quantity", json!(12));
        assert_eq!(record.label_from("Quantity"), Some("12".to_string()));
    }
}
