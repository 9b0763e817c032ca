//! Loading test history into a [`Table`].
//!
//! Reading is the only I/O in the pipeline; it happens once per run,
//! before any station is analyzed.

pub mod json;
pub mod sqlite;

use crate::cli::SourceFormat;
use crate::models::Table;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading the input table.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid table name '{0}': expected letters, digits and underscores")]
    InvalidTableName(String),

    #[error("JSON input must be an array of row objects")]
    NotAnArray,

    #[error("JSON row {index} is not an object")]
    NotAnObject { index: usize },
}

/// Load the input table in the given format.
pub fn load_table(path: &Path, format: SourceFormat, table: &str) -> Result<Table, SourceError> {
    match format {
        SourceFormat::Sqlite => sqlite::read_table(path, table),
        SourceFormat::Json => json::read_rows(path),
    }
}
