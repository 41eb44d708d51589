use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the store, seed and load paths.
///
/// None of these are retried: every operation is local and deterministic, so
/// a failure means bad configuration or bad data.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Store path could not be opened (missing, unreadable or unwritable)
    #[error("store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// DDL or constraint failure while creating/seeding. Nothing was committed.
    #[error("schema violation: {0}")]
    SchemaViolation(#[source] rusqlite::Error),

    /// A stored value could not be interpreted while loading
    #[error("data format error in {table} row {row_id}, column {column}: {detail}")]
    DataFormat {
        table: &'static str,
        row_id: i64,
        column: &'static str,
        detail: String,
    },

    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

impl DashboardError {
    pub(crate) fn data_format(
        table: &'static str,
        row_id: i64,
        column: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        DashboardError::DataFormat {
            table,
            row_id,
            column,
            detail: detail.into(),
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
