// Entity Models
//
// The three stored tables (clients, products, sales) and the derived
// JoinedRecord the dashboard aggregates over.
//
// Stored entities are read-only once seeded. JoinedRecord is rebuilt on every
// load and never written back.

pub mod client;
pub mod product;
pub mod sale;
pub mod joined;

pub use client::Client;
pub use product::Product;
pub use sale::Sale;
pub use joined::JoinedRecord;
