// Sales Dashboard - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod config;
pub mod error;
pub mod entities;
pub mod db;
pub mod seed;
pub mod loader;
pub mod analytics;
pub mod dashboard;
pub mod export;

// Re-export commonly used types
pub use config::{default_db_path, DashboardConfig, DEFAULT_DB_FILE, DEFAULT_TOP_PRODUCTS};
pub use error::{DashboardError, DashboardResult};
pub use entities::{Client, JoinedRecord, Product, Sale};
pub use db::{
    ensure_store, open_store, open_store_read_only, table_counts,
    EnsureOutcome, TableCounts,
};
pub use loader::{load, Dataset, LoadCache, MissingReference, ReferentialGap};
pub use analytics::{
    active_client_count, average_order_value, revenue_by_month, revenue_by_product,
    revenue_by_region, top_products, total_quantity, total_revenue,
    Kpis, MonthlyRevenue, ProductRevenue, RegionRevenue,
};
pub use dashboard::{load_dashboard, Dashboard, SourceTables};
pub use export::{export_joined_csv, write_joined_csv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
