// 📦 Product Entity
//
// `list_price` is the CURRENT catalogue price. Sales capture their own
// unit price, so changing it never rewrites history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub list_price: Decimal,
}

impl Product {
    pub fn new(id: i64, name: &str, category: &str, list_price: Decimal) -> Self {
        Product {
            id,
            name: name.to_string(),
            category: category.to_string(),
            list_price,
        }
    }
}
