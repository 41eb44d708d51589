// End-to-end: seed a store on disk, load it, aggregate it.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::tempdir;

use sales_dashboard::{
    active_client_count, average_order_value, ensure_store, load, open_store, revenue_by_month,
    revenue_by_product, revenue_by_region, table_counts, total_quantity, total_revenue,
    Dashboard, DashboardError, EnsureOutcome, LoadCache, MissingReference,
};

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, 1).unwrap()
}

#[test]
fn test_seed_round_trip_counts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");

    assert_eq!(ensure_store(&path, false).unwrap(), EnsureOutcome::Created);
    let dataset = load(&path).unwrap();

    assert_eq!(dataset.clients.len(), 5);
    assert_eq!(dataset.products.len(), 5);
    assert_eq!(dataset.sales.len(), 12);
    assert_eq!(dataset.joined.len(), dataset.sales.len());

    let distinct_in_sales: std::collections::HashSet<_> =
        dataset.sales.iter().map(|s| s.client_id).collect();
    assert_eq!(active_client_count(&dataset.joined), distinct_in_sales.len());
    assert_eq!(active_client_count(&dataset.joined), 5);

    println!("✅ Seed round trip: 5 clients, 5 products, 12 sales");
}

#[test]
fn test_seed_scenario_totals() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    ensure_store(&path, false).unwrap();
    let joined = load(&path).unwrap().joined;

    // 2×129 + 1×39 + 3×19 + 5×24 + 1×79 + 2×39 + 1×79 + 1×129 + 4×19 + 2×24 + 2×79 + 1×129
    let reference = dec!(258) + dec!(39) + dec!(57) + dec!(120) + dec!(79) + dec!(78)
        + dec!(79) + dec!(129) + dec!(76) + dec!(48) + dec!(158) + dec!(129);

    assert_eq!(total_quantity(&joined), 25);
    assert_eq!(total_revenue(&joined), reference);
    assert_eq!(total_revenue(&joined), dec!(1250));
    assert_eq!(average_order_value(&joined).round_dp(2), dec!(104.17));
}

#[test]
fn test_seed_scenario_series() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    ensure_store(&path, false).unwrap();
    let joined = load(&path).unwrap().joined;
    let total = total_revenue(&joined);

    let regions = revenue_by_region(&joined);
    let region_view: Vec<(&str, Decimal)> =
        regions.iter().map(|r| (r.region.as_str(), r.revenue)).collect();
    assert_eq!(
        region_view,
        vec![
            ("Europe", dec!(494)),
            ("Africa", dec!(247)),
            ("North America", dec!(196)),
            ("Asia", dec!(186)),
            ("Middle East", dec!(127)),
        ]
    );
    assert_eq!(regions.iter().map(|r| r.revenue).sum::<Decimal>(), total);

    let products = revenue_by_product(&joined);
    let product_ids: Vec<i64> = products.iter().map(|p| p.product_id).collect();
    assert_eq!(product_ids, vec![1, 5, 4, 3, 2]);
    assert_eq!(products[0].revenue, dec!(516));
    assert!(products.windows(2).all(|w| w[0].revenue >= w[1].revenue));
    assert_eq!(products.iter().map(|p| p.revenue).sum::<Decimal>(), total);

    let months = revenue_by_month(&joined);
    let month_view: Vec<(NaiveDate, Decimal)> =
        months.iter().map(|m| (m.month, m.revenue)).collect();
    assert_eq!(
        month_view,
        vec![
            (month(1), dec!(297)),
            (month(2), dec!(177)),
            (month(3), dec!(157)),
            (month(4), dec!(208)),
            (month(5), dec!(124)),
            (month(6), dec!(287)),
        ]
    );
    assert!(months.windows(2).all(|w| w[0].month < w[1].month));
}

#[test]
fn test_months_without_sales_are_not_synthesized() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    ensure_store(&path, false).unwrap();

    {
        let conn = open_store(&path).unwrap();
        conn.execute("DELETE FROM sales WHERE date LIKE '2025-03-%'", []).unwrap();
    }

    let months: Vec<NaiveDate> = revenue_by_month(&load(&path).unwrap().joined)
        .into_iter()
        .map(|m| m.month)
        .collect();

    assert_eq!(months, vec![month(1), month(2), month(4), month(5), month(6)]);
}

#[test]
fn test_ensure_twice_keeps_row_counts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");

    ensure_store(&path, false).unwrap();
    let before = table_counts(&open_store(&path).unwrap()).unwrap();
    assert_eq!(
        ensure_store(&path, false).unwrap(),
        EnsureOutcome::AlreadyInitialized
    );
    let after = table_counts(&open_store(&path).unwrap()).unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_orphan_sale_is_skipped_by_join() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    ensure_store(&path, false).unwrap();

    {
        // Plain connection: foreign keys off, so the constraint is bypassed
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
        conn.execute(
            "INSERT INTO sales (id, client_id, product_id, date, quantity, unit_price)
             VALUES (13, 42, 1, '2025-07-01', 3, 129.0)",
            [],
        )
        .unwrap();
    }

    let dataset = load(&path).unwrap();

    assert_eq!(dataset.sales.len(), 13);
    assert_eq!(dataset.joined.len(), 12);
    assert!(dataset.joined.iter().all(|r| r.sale_id != 13));
    assert_eq!(dataset.referential_gaps.len(), 1);
    assert_eq!(dataset.referential_gaps[0].sale_id, 13);
    assert_eq!(dataset.referential_gaps[0].missing, MissingReference::Client);

    // Aggregation carries on over the surviving rows
    let dashboard = Dashboard::build(&dataset, 5);
    assert_eq!(dashboard.kpis.total_revenue, dec!(1250));
    assert_eq!(dashboard.revenue_by_month.len(), 6);
}

#[test]
fn test_overflowing_sale_is_a_data_error_and_cache_recovers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    ensure_store(&path, false).unwrap();

    {
        let conn = open_store(&path).unwrap();
        conn.execute(
            "INSERT INTO sales (id, client_id, product_id, date, quantity, unit_price)
             VALUES (13, 1, 1, '2025-07-01', 9223372036854775807, 10000000000.0)",
            [],
        )
        .unwrap();
    }

    let mut cache = LoadCache::new();
    match cache.load(&path).unwrap_err() {
        DashboardError::DataFormat { table, row_id, .. } => {
            assert_eq!(table, "sales");
            assert_eq!(row_id, 13);
        }
        other => panic!("expected DataFormat, got {other:?}"),
    }

    {
        let conn = open_store(&path).unwrap();
        conn.execute("DELETE FROM sales WHERE id = 13", []).unwrap();
    }

    let dataset = cache.load(&path).unwrap();
    assert_eq!(Dashboard::build(&dataset, 5).kpis.total_revenue, dec!(1250));
}
