//! Runtime configuration.
//!
//! The store path is threaded explicitly through every call; there is no
//! process-wide default connection.

use std::path::{Path, PathBuf};

/// File name used when no `--db` / `SALES_DASHBOARD_DB` is given
pub const DEFAULT_DB_FILE: &str = "sales.db";

/// Number of products shown in the "top products" chart
pub const DEFAULT_TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub db_path: PathBuf,
    pub top_products: usize,
}

impl DashboardConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            top_products: DEFAULT_TOP_PRODUCTS,
        }
    }

    pub fn with_top_products(mut self, n: usize) -> Self {
        self.top_products = n;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::new(default_db_path())
    }
}

/// `sales.db` beside the running executable.
///
/// Falls back to the working directory when the executable path is unknown.
pub fn default_db_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_DB_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}
