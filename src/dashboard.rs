//! Snapshot handed to renderers.
//!
//! A renderer (terminal UI, HTTP API, text report) never touches the store:
//! it receives one `Dashboard` holding the KPIs, the three chart series and
//! the raw tables for the "source data" view.

use serde::Serialize;

use crate::analytics::{self, Kpis, MonthlyRevenue, ProductRevenue, RegionRevenue};
use crate::config::DashboardConfig;
use crate::entities::{Client, Product, Sale};
use crate::error::DashboardResult;
use crate::loader::{Dataset, LoadCache, ReferentialGap};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceTables {
    pub clients: Vec<Client>,
    pub products: Vec<Product>,
    pub sales: Vec<Sale>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub revenue_by_region: Vec<RegionRevenue>,
    pub top_products: Vec<ProductRevenue>,
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub source: SourceTables,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub referential_gaps: Vec<ReferentialGap>,
}

impl Dashboard {
    pub fn build(dataset: &Dataset, top_n: usize) -> Self {
        let joined = &dataset.joined;

        Dashboard {
            kpis: Kpis::compute(joined),
            revenue_by_region: analytics::revenue_by_region(joined),
            top_products: analytics::top_products(joined, top_n),
            revenue_by_month: analytics::revenue_by_month(joined),
            source: SourceTables {
                clients: dataset.clients.clone(),
                products: dataset.products.clone(),
                sales: dataset.sales.clone(),
            },
            referential_gaps: dataset.referential_gaps.clone(),
        }
    }
}

/// Load (memoized) and aggregate in one step.
pub fn load_dashboard(cache: &mut LoadCache, config: &DashboardConfig) -> DashboardResult<Dashboard> {
    let dataset = cache.load(config.db_path())?;
    Ok(Dashboard::build(&dataset, config.top_products))
}
