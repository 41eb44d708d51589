use rusqlite::{params, Connection, OpenFlags};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::entities::{Client, Product, Sale};
use crate::error::{DashboardError, DashboardResult};
use crate::seed;

/// Tables the store must contain to count as initialized
pub const TABLES: [&str; 3] = ["clients", "products", "sales"];

/// What `ensure_store` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Tables were missing; created and seeded
    Created,
    /// Tables were dropped, recreated and reseeded
    Reset,
    /// Tables already present; nothing written
    AlreadyInitialized,
}

impl fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnsureOutcome::Created => "created",
            EnsureOutcome::Reset => "reset",
            EnsureOutcome::AlreadyInitialized => "already initialized",
        };
        f.write_str(s)
    }
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub clients: i64,
    pub products: i64,
    pub sales: i64,
}

// ============================================================================
// CONNECTIONS
// ============================================================================

/// Open (creating if needed) the store for writing, with foreign keys on.
pub fn open_store(path: &Path) -> DashboardResult<Connection> {
    let unavailable = |source| DashboardError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open(path).map_err(unavailable)?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(unavailable)?;

    Ok(conn)
}

/// Open an existing store read-only. Never creates the file.
pub fn open_store_read_only(path: &Path) -> DashboardResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    Connection::open_with_flags(path, flags).map_err(|source| DashboardError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            region TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            list_price REAL NOT NULL CHECK (list_price >= 0)
        )",
        [],
    )?;

    // unit_price is captured at sale time, independent of products.list_price
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sales (
            id INTEGER PRIMARY KEY,
            client_id INTEGER NOT NULL REFERENCES clients(id),
            product_id INTEGER NOT NULL REFERENCES products(id),
            date TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            unit_price REAL NOT NULL CHECK (unit_price >= 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sales_client ON sales(client_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sales_product ON sales(product_id)",
        [],
    )?;

    Ok(())
}

/// Drop all three tables, children first.
pub fn drop_all(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS sales;
         DROP TABLE IF EXISTS products;
         DROP TABLE IF EXISTS clients;",
    )
}

/// True when every table in [`TABLES`] exists.
pub fn is_initialized(conn: &Connection) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (?1, ?2, ?3)",
    )?;
    let present: i64 = stmt.query_row(params![TABLES[0], TABLES[1], TABLES[2]], |row| row.get(0))?;

    Ok(present == TABLES.len() as i64)
}

// ============================================================================
// ENSURE
// ============================================================================

/// Make sure the store holds the three tables, seeding them on first run.
///
/// With `reset = true` existing tables are dropped and reseeded. Drop, create
/// and seed share one transaction: on any failure nothing is committed.
pub fn ensure_store(path: &Path, reset: bool) -> DashboardResult<EnsureOutcome> {
    let mut conn = open_store(path)?;

    let initialized = is_initialized(&conn).map_err(|source| DashboardError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    if initialized && !reset {
        debug!(path = %path.display(), "store already initialized");
        return Ok(EnsureOutcome::AlreadyInitialized);
    }

    let tx = conn.transaction().map_err(DashboardError::SchemaViolation)?;
    drop_all(&tx).map_err(DashboardError::SchemaViolation)?;
    create_schema(&tx).map_err(DashboardError::SchemaViolation)?;
    seed::insert_seed(&tx, &seed::fixtures()).map_err(DashboardError::SchemaViolation)?;
    tx.commit().map_err(DashboardError::SchemaViolation)?;

    let outcome = if initialized {
        EnsureOutcome::Reset
    } else {
        EnsureOutcome::Created
    };

    let counts = table_counts(&conn)?;
    info!(
        path = %path.display(),
        %outcome,
        clients = counts.clients,
        products = counts.products,
        sales = counts.sales,
        "store seeded"
    );

    Ok(outcome)
}

// ============================================================================
// WRITES (seed + external writers)
// ============================================================================

pub fn insert_clients(conn: &Connection, clients: &[Client]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare("INSERT INTO clients (id, name, region) VALUES (?1, ?2, ?3)")?;

    for client in clients {
        stmt.execute(params![client.id, client.name, client.region])?;
    }

    Ok(clients.len())
}

pub fn insert_products(conn: &Connection, products: &[Product]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO products (id, name, category, list_price) VALUES (?1, ?2, ?3, ?4)",
    )?;

    for product in products {
        // Decimal goes in as text; REAL affinity converts it
        stmt.execute(params![
            product.id,
            product.name,
            product.category,
            product.list_price.to_string(),
        ])?;
    }

    Ok(products.len())
}

pub fn insert_sales(conn: &Connection, sales: &[Sale]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO sales (id, client_id, product_id, date, quantity, unit_price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for sale in sales {
        stmt.execute(params![
            sale.id,
            sale.client_id,
            sale.product_id,
            sale.date_string(),
            sale.quantity,
            sale.unit_price.to_string(),
        ])?;
    }

    Ok(sales.len())
}

pub fn table_counts(conn: &Connection) -> DashboardResult<TableCounts> {
    let count = |table: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
    };

    Ok(TableCounts {
        clients: count("clients")?,
        products: count("products")?,
        sales: count("sales")?,
    })
}
