//! SQLite test history databases.

use super::SourceError;
use crate::models::Table;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info};

/// Whether `name` is a plain SQL identifier that is safe to interpolate.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Convert a SQLite value into a table cell.
///
/// Numbers become their decimal text; NULL and blobs become null.
fn cell_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Read every row of `table` from the database at `path` (read-only).
pub fn read_table(path: &Path, table: &str) -> Result<Table, SourceError> {
    if !is_valid_table_name(table) {
        return Err(SourceError::InvalidTableName(table.to_string()));
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    read_from_connection(&conn, table)
}

/// Read every row of `table` from an open connection.
pub fn read_from_connection(conn: &Connection, table: &str) -> Result<Table, SourceError> {
    if !is_valid_table_name(table) {
        return Err(SourceError::InvalidTableName(table.to_string()));
    }

    let query = format!("SELECT * FROM \"{}\"", table);
    debug!("Running query: {}", query);

    let mut statement = conn.prepare(&query)?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = statement.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(cell_text(row.get_ref(i)?));
        }
        rows.push(cells);
    }

    info!("Loaded {} row(s) from table `{}`", rows.len(), table);
    Ok(Table::new(columns, rows))
}
