// 🌱 Demo Seed Data
//
// Deterministic rows written on first run (or --reset):
// - 5 clients, one per region
// - 5 products over 4 categories
// - 12 sales, two per month from January to June 2025
//
// A sale is priced at its product's list price unless the fixture
// carries an explicit override.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::db::{insert_clients, insert_products, insert_sales};
use crate::entities::{Client, Product, Sale};

pub const SEED_YEAR: i32 = 2025;

/// Everything `insert_seed` writes
#[derive(Debug, Clone)]
pub struct SeedData {
    pub clients: Vec<Client>,
    pub products: Vec<Product>,
    pub sales: Vec<Sale>,
}

// ============================================================================
// FIXTURES
// ============================================================================

const CLIENTS: [(i64, &str, &str); 5] = [
    (1, "Alice SARL", "Europe"),
    (2, "Brahim Inc.", "Africa"),
    (3, "Chen & Co", "Asia"),
    (4, "Davis LLC", "North America"),
    (5, "Emir Trading", "Middle East"),
];

const PRODUCTS: [(i64, &str, &str, Decimal); 5] = [
    (1, "Kindle Paperwhite", "electronics", dec!(129)),
    (2, "Book - Data BI", "books", dec!(39)),
    (3, "T-shirt", "clothing", dec!(19)),
    (4, "Coffee beans 1kg", "groceries", dec!(24)),
    (5, "Bluetooth headset", "electronics", dec!(79)),
];

struct SaleFixture {
    id: i64,
    client_id: i64,
    product_id: i64,
    date: NaiveDate,
    quantity: i64,
    /// None = product list price
    unit_price: Option<Decimal>,
}

const fn seed_date(month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(SEED_YEAR, month, day) {
        Some(date) => date,
        None => panic!("invalid seed date"),
    }
}

/// Sale at the product's list price
const fn sale(
    id: i64,
    client_id: i64,
    product_id: i64,
    date: NaiveDate,
    quantity: i64,
) -> SaleFixture {
    sale_at(id, client_id, product_id, date, quantity, None)
}

const fn sale_at(
    id: i64,
    client_id: i64,
    product_id: i64,
    date: NaiveDate,
    quantity: i64,
    unit_price: Option<Decimal>,
) -> SaleFixture {
    SaleFixture {
        id,
        client_id,
        product_id,
        date,
        quantity,
        unit_price,
    }
}

impl SaleFixture {
    fn to_sale(&self, products: &[Product]) -> Sale {
        let list_price = products
            .iter()
            .find(|p| p.id == self.product_id)
            .map(|p| p.list_price)
            .unwrap_or_default();

        Sale {
            id: self.id,
            client_id: self.client_id,
            product_id: self.product_id,
            date: self.date,
            quantity: self.quantity,
            unit_price: self.unit_price.unwrap_or(list_price),
        }
    }
}

// Evaluated at compile time, so a bad date is a build error
const SALES: [SaleFixture; 12] = [
    sale(1, 1, 1, seed_date(1, 15), 2),
    sale(2, 2, 2, seed_date(1, 20), 1),
    sale(3, 3, 3, seed_date(2, 5), 3),
    sale(4, 4, 4, seed_date(2, 22), 5),
    sale(5, 5, 5, seed_date(3, 10), 1),
    sale(6, 1, 2, seed_date(3, 25), 2),
    sale(7, 2, 5, seed_date(4, 12), 1),
    sale(8, 3, 1, seed_date(4, 28), 1),
    sale(9, 4, 3, seed_date(5, 9), 4),
    sale(10, 5, 4, seed_date(5, 18), 2),
    sale(11, 1, 5, seed_date(6, 6), 2),
    sale(12, 2, 1, seed_date(6, 20), 1),
];

/// Build the seed rows.
pub fn fixtures() -> SeedData {
    let clients: Vec<Client> = CLIENTS
        .iter()
        .map(|(id, name, region)| Client::new(*id, name, region))
        .collect();

    let products: Vec<Product> = PRODUCTS
        .iter()
        .map(|(id, name, category, price)| Product::new(*id, name, category, *price))
        .collect();

    let sales = SALES.iter().map(|fixture| fixture.to_sale(&products)).collect();

    SeedData {
        clients,
        products,
        sales,
    }
}

/// Insert seed rows, parents first. Run inside a transaction.
pub fn insert_seed(conn: &Connection, data: &SeedData) -> rusqlite::Result<()> {
    insert_clients(conn, &data.clients)?;
    insert_products(conn, &data.products)?;
    insert_sales(conn, &data.sales)?;
    Ok(())
}
