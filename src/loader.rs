//! Data loader: reads the three tables and builds the joined dataset.
//!
//! Loading is a pure read. The connection lives for one call and is dropped
//! on every exit path. [`LoadCache`] memoizes the result per store path so
//! repeated renders do not re-query.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::open_store_read_only;
use crate::entities::sale::SALE_DATE_FORMAT;
use crate::entities::{Client, JoinedRecord, Product, Sale};
use crate::error::{DashboardError, DashboardResult};

/// Everything one load produces. Shared read-only once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    pub clients: Vec<Client>,
    pub products: Vec<Product>,
    pub sales: Vec<Sale>,
    pub joined: Vec<JoinedRecord>,
    /// Sales the inner join dropped. Only possible if foreign keys were
    /// bypassed by an external writer.
    pub referential_gaps: Vec<ReferentialGap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReference {
    Client,
    Product,
    Both,
}

/// A sale with no matching client and/or product.
///
/// Not an error: the inner join skips the row and the dashboard carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferentialGap {
    pub sale_id: i64,
    pub client_id: i64,
    pub product_id: i64,
    pub missing: MissingReference,
}

// ============================================================================
// LOAD
// ============================================================================

/// Open the store read-only and load everything.
pub fn load(path: &Path) -> DashboardResult<Dataset> {
    let conn = open_store_read_only(path)?;
    let dataset = load_from_connection(&conn)?;

    info!(
        path = %path.display(),
        clients = dataset.clients.len(),
        products = dataset.products.len(),
        sales = dataset.sales.len(),
        joined = dataset.joined.len(),
        "dataset loaded"
    );

    Ok(dataset)
}

pub fn load_from_connection(conn: &Connection) -> DashboardResult<Dataset> {
    let clients = read_clients(conn)?;
    let products = read_products(conn)?;
    let sales = read_sales(conn)?;

    let (joined, referential_gaps) = join(&clients, &products, &sales)?;
    check_totals(&joined)?;

    Ok(Dataset {
        clients,
        products,
        sales,
        joined,
        referential_gaps,
    })
}

pub fn read_clients(conn: &Connection) -> DashboardResult<Vec<Client>> {
    let mut stmt = conn.prepare("SELECT id, name, region FROM clients ORDER BY id")?;
    let mut rows = stmt.query([])?;

    let mut clients = Vec::new();
    while let Some(row) = rows.next()? {
        clients.push(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            region: row.get(2)?,
        });
    }

    Ok(clients)
}

pub fn read_products(conn: &Connection) -> DashboardResult<Vec<Product>> {
    let mut stmt =
        conn.prepare("SELECT id, name, category, list_price FROM products ORDER BY id")?;
    let mut rows = stmt.query([])?;

    let mut products = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let list_price = decode_price("products", id, "list_price", row.get(3)?)?;

        products.push(Product {
            id,
            name: row.get(1)?,
            category: row.get(2)?,
            list_price,
        });
    }

    Ok(products)
}

pub fn read_sales(conn: &Connection) -> DashboardResult<Vec<Sale>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, product_id, date, quantity, unit_price
         FROM sales
         ORDER BY id",
    )?;
    let mut rows = stmt.query([])?;

    let mut sales = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;

        let quantity = decode_integer("sales", id, "quantity", row.get(4)?)?;
        if quantity < 1 {
            return Err(DashboardError::data_format(
                "sales",
                id,
                "quantity",
                format!("quantity must be at least 1, got {quantity}"),
            ));
        }

        sales.push(Sale {
            id,
            client_id: decode_integer("sales", id, "client_id", row.get(1)?)?,
            product_id: decode_integer("sales", id, "product_id", row.get(2)?)?,
            date: decode_date("sales", id, "date", row.get(3)?)?,
            quantity,
            unit_price: decode_price("sales", id, "unit_price", row.get(5)?)?,
        });
    }

    Ok(sales)
}

// ============================================================================
// JOIN
// ============================================================================

/// Inner join sales → clients → products.
///
/// Output keeps the order of `sales`. Rows with a dangling key are skipped
/// and returned as gaps. A joined sale whose revenue overflows is a
/// `DataFormat` error.
pub fn join(
    clients: &[Client],
    products: &[Product],
    sales: &[Sale],
) -> DashboardResult<(Vec<JoinedRecord>, Vec<ReferentialGap>)> {
    let clients_by_id: HashMap<i64, &Client> = clients.iter().map(|c| (c.id, c)).collect();
    let products_by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut joined = Vec::with_capacity(sales.len());
    let mut gaps = Vec::new();

    for sale in sales {
        let client = clients_by_id.get(&sale.client_id);
        let product = products_by_id.get(&sale.product_id);

        let missing = match (client, product) {
            (Some(client), Some(product)) => {
                let row = JoinedRecord::new(sale, client, product).ok_or_else(|| {
                    DashboardError::data_format(
                        "sales",
                        sale.id,
                        "unit_price",
                        format!(
                            "revenue overflows: {} × {}",
                            sale.quantity, sale.unit_price
                        ),
                    )
                })?;
                joined.push(row);
                continue;
            }
            (None, Some(_)) => MissingReference::Client,
            (Some(_), None) => MissingReference::Product,
            (None, None) => MissingReference::Both,
        };

        warn!(
            sale_id = sale.id,
            client_id = sale.client_id,
            product_id = sale.product_id,
            ?missing,
            "sale dropped by join: dangling reference"
        );

        gaps.push(ReferentialGap {
            sale_id: sale.id,
            client_id: sale.client_id,
            product_id: sale.product_id,
            missing,
        });
    }

    Ok((joined, gaps))
}

/// Reject datasets whose grand totals overflow.
///
/// Quantities are >= 1 and revenues >= 0, so every group sum is bounded by
/// the grand total: once this passes, no aggregation can overflow.
fn check_totals(joined: &[JoinedRecord]) -> DashboardResult<()> {
    let mut quantity: i64 = 0;
    let mut revenue = Decimal::ZERO;

    for row in joined {
        quantity = quantity.checked_add(row.quantity).ok_or_else(|| {
            DashboardError::data_format(
                "sales",
                row.sale_id,
                "quantity",
                "total quantity overflows".to_string(),
            )
        })?;
        revenue = revenue.checked_add(row.revenue).ok_or_else(|| {
            DashboardError::data_format(
                "sales",
                row.sale_id,
                "unit_price",
                "total revenue overflows".to_string(),
            )
        })?;
    }

    Ok(())
}

// ============================================================================
// VALUE DECODING
// ============================================================================
// SQLite columns are dynamically typed, so a REAL column can still hold text.
// Decode by hand to report the offending row instead of a generic type error.

fn decode_integer(
    table: &'static str,
    row_id: i64,
    column: &'static str,
    value: Value,
) -> DashboardResult<i64> {
    match value {
        Value::Integer(i) => Ok(i),
        // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
        Value::Real(f)
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            Ok(f as i64)
        }
        Value::Text(ref s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DashboardError::data_format(table, row_id, column, format!("not an integer: {s:?}"))),
        other => Err(DashboardError::data_format(
            table,
            row_id,
            column,
            format!("not an integer: {other:?}"),
        )),
    }
}

fn decode_price(
    table: &'static str,
    row_id: i64,
    column: &'static str,
    value: Value,
) -> DashboardResult<Decimal> {
    let parsed = match value {
        Value::Integer(i) => Ok(Decimal::from(i)),
        // f64 Display is the shortest round-trip form, so 19.99 stays 19.99
        Value::Real(f) => Decimal::from_str(&f.to_string()).map_err(|e| e.to_string()),
        Value::Text(ref s) => Decimal::from_str(s.trim()).map_err(|e| format!("{s:?}: {e}")),
        other => Err(format!("not a number: {other:?}")),
    };

    let price = parsed.map_err(|detail| DashboardError::data_format(table, row_id, column, detail))?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(DashboardError::data_format(
            table,
            row_id,
            column,
            format!("price must not be negative, got {price}"),
        ));
    }

    Ok(price)
}

fn decode_date(
    table: &'static str,
    row_id: i64,
    column: &'static str,
    value: Value,
) -> DashboardResult<NaiveDate> {
    match value {
        Value::Text(s) => parse_sale_date(&s).ok_or_else(|| {
            DashboardError::data_format(table, row_id, column, format!("unparsable date: {s:?}"))
        }),
        other => Err(DashboardError::data_format(
            table,
            row_id,
            column,
            format!("expected date text, got {other:?}"),
        )),
    }
}

/// Accepts `YYYY-MM-DD`, or a datetime whose date part is kept.
pub fn parse_sale_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, SALE_DATE_FORMAT) {
        return Some(date);
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

// ============================================================================
// MEMOIZATION
// ============================================================================

/// Memoized [`load`] keyed by store path.
///
/// Holds at most one entry. Asking for a different path drops the old entry
/// before reloading.
#[derive(Debug, Default)]
pub struct LoadCache {
    entry: Option<(PathBuf, Arc<Dataset>)>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> DashboardResult<Arc<Dataset>> {
        if let Some((cached_path, dataset)) = &self.entry {
            if cached_path == path {
                debug!(path = %path.display(), "dataset cache hit");
                return Ok(Arc::clone(dataset));
            }
        }

        self.entry = None;
        let dataset = Arc::new(load(path)?);
        self.entry = Some((path.to_path_buf(), Arc::clone(&dataset)));

        Ok(dataset)
    }

    /// Forget the cached dataset; the next `load` re-queries.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn cached_path(&self) -> Option<&Path> {
        self.entry.as_ref().map(|(path, _)| path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_schema, ensure_store, insert_clients, insert_products};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn empty_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_load_seeded_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sales.db");
        ensure_store(&path, false).unwrap();

        let dataset = load(&path).unwrap();

        assert_eq!(dataset.clients.len(), 5);
        assert_eq!(dataset.products.len(), 5);
        assert_eq!(dataset.sales.len(), 12);
        assert_eq!(dataset.joined.len(), 12);
        assert!(dataset.referential_gaps.is_empty());

        let first = &dataset.joined[0];
        assert_eq!(first.sale_id, 1);
        assert_eq!(first.client_name, "Alice SARL");
        assert_eq!(first.product_name, "Kindle Paperwhite");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(first.revenue, dec!(258));
    }

    #[test]
    fn test_missing_store_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.db");

        let err = load(&path).unwrap_err();
        assert!(matches!(err, DashboardError::StoreUnavailable { .. }));
        // Loader must not create the file
        assert!(!path.exists());
    }

    #[test]
    fn test_dangling_client_is_dropped_not_fatal() {
        let conn = empty_store();
        insert_clients(&conn, &[Client::new(1, "A", "Europe")]).unwrap();
        insert_products(&conn, &[Product::new(1, "P", "books", dec!(10))]).unwrap();

        // foreign_keys is off on this connection, so the orphan goes in
        conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
        conn.execute_batch(
            "INSERT INTO sales VALUES (1, 1, 1, '2025-01-10', 2, 10.0);
             INSERT INTO sales VALUES (2, 99, 1, '2025-01-11', 1, 10.0);",
        )
        .unwrap();

        let dataset = load_from_connection(&conn).unwrap();

        assert_eq!(dataset.sales.len(), 2);
        assert_eq!(dataset.joined.len(), 1);
        assert_eq!(dataset.joined[0].sale_id, 1);
        assert_eq!(
            dataset.referential_gaps,
            vec![ReferentialGap {
                sale_id: 2,
                client_id: 99,
                product_id: 1,
                missing: MissingReference::Client,
            }]
        );
    }

    #[test]
    fn test_bad_date_reports_row() {
        let conn = empty_store();
        insert_clients(&conn, &[Client::new(1, "A", "Europe")]).unwrap();
        insert_products(&conn, &[Product::new(1, "P", "books", dec!(10))]).unwrap();
        conn.execute_batch("INSERT INTO sales VALUES (7, 1, 1, 'last tuesday', 1, 10.0);")
            .unwrap();

        match load_from_connection(&conn).unwrap_err() {
            DashboardError::DataFormat {
                table,
                row_id,
                column,
                ..
            } => {
                assert_eq!(table, "sales");
                assert_eq!(row_id, 7);
                assert_eq!(column, "date");
            }
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_price_reports_row() {
        let conn = empty_store();
        conn.execute_batch("INSERT INTO products VALUES (3, 'P', 'books', 'cheap');")
            .unwrap();

        match load_from_connection(&conn).unwrap_err() {
            DashboardError::DataFormat { row_id, column, .. } => {
                assert_eq!(row_id, 3);
                assert_eq!(column, "list_price");
            }
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    fn seeded_store() -> Connection {
        let conn = empty_store();
        insert_clients(&conn, &[Client::new(1, "A", "Europe")]).unwrap();
        insert_products(&conn, &[Product::new(1, "P", "books", dec!(10))]).unwrap();
        conn
    }

    fn expect_data_format(conn: &Connection) -> (i64, &'static str) {
        match load_from_connection(conn).unwrap_err() {
            DashboardError::DataFormat { row_id, column, .. } => (row_id, column),
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_revenue_overflow_reports_row() {
        let conn = seeded_store();
        conn.execute_batch(
            "INSERT INTO sales VALUES (13, 1, 1, '2025-07-01', 9223372036854775807, 10000000000.0);",
        )
        .unwrap();

        assert_eq!(expect_data_format(&conn), (13, "unit_price"));
    }

    #[test]
    fn test_total_quantity_overflow_reports_row() {
        let conn = seeded_store();
        // Zero price keeps each revenue at 0; only the quantity sum overflows
        conn.execute_batch(
            "INSERT INTO sales VALUES (1, 1, 1, '2025-07-01', 9223372036854775807, 0);
             INSERT INTO sales VALUES (2, 1, 1, '2025-07-02', 1, 0);",
        )
        .unwrap();

        assert_eq!(expect_data_format(&conn), (2, "quantity"));
    }

    #[test]
    fn test_large_but_bounded_quantity_loads() {
        let conn = seeded_store();
        conn.execute_batch(
            "INSERT INTO sales VALUES (1, 1, 1, '2025-07-01', 9223372036854775807, 0);",
        )
        .unwrap();

        let dataset = load_from_connection(&conn).unwrap();
        assert_eq!(dataset.joined[0].quantity, i64::MAX);
        assert_eq!(dataset.joined[0].revenue, Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_real_quantity_is_rejected() {
        let conn = seeded_store();
        // CHECK passes (1e30 >= 1) and INTEGER affinity keeps it REAL
        conn.execute_batch("INSERT INTO sales VALUES (4, 1, 1, '2025-07-01', 1e30, 1.0);")
            .unwrap();

        assert_eq!(expect_data_format(&conn), (4, "quantity"));
    }

    #[test]
    fn test_decimal_prices_survive_real_column() {
        let conn = empty_store();
        insert_products(&conn, &[Product::new(1, "P", "books", dec!(19.99))]).unwrap();

        let products = read_products(&conn).unwrap();
        assert_eq!(products[0].list_price, dec!(19.99));
    }

    #[test]
    fn test_parse_sale_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        assert_eq!(parse_sale_date("2025-03-10"), Some(expected));
        assert_eq!(parse_sale_date("2025-03-10 14:30:00"), Some(expected));
        assert_eq!(parse_sale_date("2025-03-10T14:30:00"), Some(expected));
        assert_eq!(parse_sale_date("10/03/2025"), None);
        assert_eq!(parse_sale_date("2025-02-30"), None);
    }

    #[test]
    fn test_cache_reuses_and_invalidates() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.db");
        let second = dir.path().join("b.db");
        ensure_store(&first, false).unwrap();
        ensure_store(&second, false).unwrap();

        let mut cache = LoadCache::new();

        let a1 = cache.load(&first).unwrap();
        let a2 = cache.load(&first).unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));

        let b = cache.load(&second).unwrap();
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(cache.cached_path(), Some(second.as_path()));

        cache.invalidate();
        assert_eq!(cache.cached_path(), None);
        let b2 = cache.load(&second).unwrap();
        assert!(!Arc::ptr_eq(&b, &b2));
    }

    #[test]
    fn test_failed_load_leaves_cache_empty() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("a.db");
        ensure_store(&good, false).unwrap();

        let mut cache = LoadCache::new();
        cache.load(&good).unwrap();

        assert!(cache.load(&dir.path().join("missing.db")).is_err());
        assert_eq!(cache.cached_path(), None);
    }
}
