//! Aggregation views over the joined dataset.
//!
//! Every function here is pure: same rows in, same numbers out. Sums use
//! `Decimal`, so totals are exact. The loader rejects datasets whose grand
//! totals overflow, so none of the sums below can.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::entities::JoinedRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRevenue {
    pub region: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRevenue {
    pub product_id: i64,
    pub product_name: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// First day of the month
    pub month: NaiveDate,
    pub revenue: Decimal,
}

/// The four headline numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub total_revenue: Decimal,
    pub total_quantity: i64,
    pub average_order_value: Decimal,
    pub active_clients: usize,
}

impl Kpis {
    pub fn compute(joined: &[JoinedRecord]) -> Self {
        Kpis {
            total_revenue: total_revenue(joined),
            total_quantity: total_quantity(joined),
            average_order_value: average_order_value(joined),
            active_clients: active_client_count(joined),
        }
    }
}

// ============================================================================
// SCALARS
// ============================================================================

pub fn total_revenue(joined: &[JoinedRecord]) -> Decimal {
    joined.iter().map(|r| r.revenue).sum()
}

pub fn total_quantity(joined: &[JoinedRecord]) -> i64 {
    joined.iter().map(|r| r.quantity).sum()
}

/// Revenue per sale. An empty dataset divides by 1 and yields 0.
pub fn average_order_value(joined: &[JoinedRecord]) -> Decimal {
    let orders = Decimal::from(joined.len().max(1));
    total_revenue(joined) / orders
}

pub fn active_client_count(joined: &[JoinedRecord]) -> usize {
    joined
        .iter()
        .map(|r| r.client_id)
        .collect::<HashSet<_>>()
        .len()
}

// ============================================================================
// SERIES
// ============================================================================

/// Revenue per region, highest first. Ties sort by region name.
pub fn revenue_by_region(joined: &[JoinedRecord]) -> Vec<RegionRevenue> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for row in joined {
        *totals.entry(row.region.as_str()).or_default() += row.revenue;
    }

    let mut result: Vec<RegionRevenue> = totals
        .into_iter()
        .map(|(region, revenue)| RegionRevenue {
            region: region.to_string(),
            revenue,
        })
        .collect();

    result.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.region.cmp(&b.region))
    });
    result
}

/// Revenue per product, highest first. Ties sort by name, then id.
pub fn revenue_by_product(joined: &[JoinedRecord]) -> Vec<ProductRevenue> {
    let mut totals: HashMap<i64, ProductRevenue> = HashMap::new();
    for row in joined {
        totals
            .entry(row.product_id)
            .or_insert_with(|| ProductRevenue {
                product_id: row.product_id,
                product_name: row.product_name.clone(),
                revenue: Decimal::ZERO,
            })
            .revenue += row.revenue;
    }

    let mut result: Vec<ProductRevenue> = totals.into_values().collect();
    result.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.product_name.cmp(&b.product_name))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    result
}

/// The `n` best-selling products by revenue.
pub fn top_products(joined: &[JoinedRecord], n: usize) -> Vec<ProductRevenue> {
    let mut ranked = revenue_by_product(joined);
    ranked.truncate(n);
    ranked
}

/// Revenue per calendar month, oldest first. Months without sales are absent.
pub fn revenue_by_month(joined: &[JoinedRecord]) -> Vec<MonthlyRevenue> {
    let mut totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for row in joined {
        *totals.entry(month_start(row.date)).or_default() += row.revenue;
    }

    totals
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue { month, revenue })
        .collect()
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}
