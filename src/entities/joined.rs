// 🔗 Joined Record
//
// One row per sale, enriched with its client and product.
//
// Column collisions between the three tables (`id`, `name`) are resolved by
// prefixing with the owning entity: sale_id, client_name, product_name.
// `revenue` is derived here and never persisted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Client, Product, Sale};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedRecord {
    // ========================================================================
    // SALE
    // ========================================================================
    pub sale_id: i64,
    pub client_id: i64,
    pub product_id: i64,
    pub date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Decimal,

    // ========================================================================
    // CLIENT
    // ========================================================================
    pub client_name: String,
    pub region: String,

    // ========================================================================
    // PRODUCT
    // ========================================================================
    pub product_name: String,
    pub category: String,
    pub list_price: Decimal,

    // ========================================================================
    // DERIVED
    // ========================================================================
    pub revenue: Decimal,
}

impl JoinedRecord {
    /// Build the joined row. Caller guarantees the keys match.
    ///
    /// `None` when the sale's revenue does not fit in a `Decimal`.
    pub fn new(sale: &Sale, client: &Client, product: &Product) -> Option<Self> {
        debug_assert_eq!(sale.client_id, client.id);
        debug_assert_eq!(sale.product_id, product.id);

        Some(JoinedRecord {
            sale_id: sale.id,
            client_id: sale.client_id,
            product_id: sale.product_id,
            date: sale.date,
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            client_name: client.name.clone(),
            region: client.region.clone(),
            product_name: product.name.clone(),
            category: product.category.clone(),
            list_price: product.list_price,
            revenue: sale.revenue()?,
        })
    }
}
