// 👤 Client Entity
//
// A customer of the shop. `region` is categorical and drives the
// "revenue by region" view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub region: String,
}

impl Client {
    pub fn new(id: i64, name: &str, region: &str) -> Self {
        Client {
            id,
            name: name.to_string(),
            region: region.to_string(),
        }
    }
}
