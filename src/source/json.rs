//! JSON test history exports: an array of flat row objects.

use super::SourceError;
use crate::models::Table;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Convert a JSON value into a table cell.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// Build a table from parsed JSON.
///
/// Columns are the union of row keys in first-seen order; keys missing
/// from a row are null.
pub fn table_from_value(value: &Value) -> Result<Table, SourceError> {
    let Value::Array(items) = value else {
        return Err(SourceError::NotAnArray);
    };

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(SourceError::NotAnObject { index });
        };

        let mut row = vec![None; columns.len()];
        for (key, field) in fields {
            let position = *positions.entry(key.clone()).or_insert_with(|| {
                columns.push(key.clone());
                columns.len() - 1
            });
            if position >= row.len() {
                row.resize(position + 1, None);
            }
            row[position] = cell_text(field);
        }
        rows.push(row);
    }

    Ok(Table::new(columns, rows))
}

/// Read a JSON array of rows from `path`.
pub fn read_rows(path: &Path) -> Result<Table, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;
    let table = table_from_value(&value)?;

    info!("Loaded {} row(s) from {}", table.len(), path.display());
    Ok(table)
}
