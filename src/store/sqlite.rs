use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde_json::{Map, Number, Value};

use super::{Record, RecordStore};
use crate::error::{RecordTreeError, Result};

/// Record store over SQLite: one table per entity type with an `id TEXT`
/// primary key and a `created_at` column; every other column is a field.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a record into the table for `entity_type`.
    pub fn insert(&self, entity_type: &str, record: &Record) -> Result<()> {
        let table = quote_identifier(entity_type)?;
        let mut columns = vec!["\"id\"".to_string()];
        let mut values = vec![SqlValue::Text(record.id.clone())];
        for (name, value) in &record.fields {
            if name == "id" {
                continue;
            }
            columns.push(quote_identifier(name)?);
            values.push(json_to_sql(value));
        }

        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }
}

impl RecordStore for SqliteStore<'_> {
    fn fetch_by_id(&self, entity_type: &str, id: &str) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = ?1 LIMIT 1",
            quote_identifier(entity_type)?
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = column_names(&stmt);
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row, &columns)?)),
            None => Ok(None),
        }
    }

    fn fetch_children(
        &self,
        child_type: &str,
        linking_field: &str,
        parent_id: &str,
    ) -> Result<Vec<Record>> {
        // Qualified so an unknown column errors instead of reading as a string literal.
        let table = quote_identifier(child_type)?;
        let sql = format!(
            "SELECT * FROM {table} WHERE {table}.{} = ?1 ORDER BY created_at DESC, rowid DESC",
            quote_identifier(linking_field)?
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = column_names(&stmt);
        let mut rows = stmt.query(params![parent_id])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_record(row, &columns)?);
        }
        Ok(out)
    }
}

/// Quote a type or field name for interpolation into SQL. Only ASCII
/// letters, digits and `_` are accepted, and the first char is not a digit.
fn quote_identifier(name: &str) -> Result<String> {
    let valid = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(RecordTreeError::Query(format!("Invalid identifier: {:?}", name)));
    }
    Ok(format!("\"{}\"", name))
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

fn row_to_record(row: &Row<'_>, columns: &[String]) -> Result<Record> {
    let mut id = None;
    let mut fields = Map::new();
    for (i, name) in columns.iter().enumerate() {
        let value = sql_to_json(row.get_ref(i)?);
        if name == "id" {
            id = match &value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            };
        }
        fields.insert(name.clone(), value);
    }

    let id = id.ok_or_else(|| RecordTreeError::Query("Row without an id column".to_string()))?;
    Ok(Record { id, fields })
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        // blobs never label a node
        ValueRef::Blob(_) => Value::Null,
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
