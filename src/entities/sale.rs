// 🧾 Sale Entity
//
// One order line. Foreign keys point at clients(id) and products(id);
// SQLite enforces them at write time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Date format used for the `sales.date` column
pub const SALE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub client_id: i64,
    pub product_id: i64,
    pub date: NaiveDate,
    /// Always >= 1
    pub quantity: i64,
    /// Price captured at sale time, may differ from the product's list price
    pub unit_price: Decimal,
}

impl Sale {
    /// quantity × unit_price, or `None` when the product overflows `Decimal`
    pub fn revenue(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }

    /// Date as stored in SQLite (ISO `YYYY-MM-DD`)
    pub fn date_string(&self) -> String {
        self.date.format(SALE_DATE_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_revenue_uses_captured_price() {
        let sale = Sale {
            id: 1,
            client_id: 1,
            product_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            quantity: 3,
            unit_price: dec!(19.99),
        };

        assert_eq!(sale.revenue(), Some(dec!(59.97)));
        assert_eq!(sale.date_string(), "2025-01-15");
    }

    #[test]
    fn test_revenue_overflow_is_none() {
        let sale = Sale {
            id: 13,
            client_id: 1,
            product_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            quantity: i64::MAX,
            unit_price: dec!(10000000000),
        };

        assert_eq!(sale.revenue(), None);
    }
}
