// Sales Dashboard - Web Server
// JSON API over the memoized load + aggregate path

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sales_dashboard::{
    analytics, default_db_path, ensure_store, Dashboard, DashboardConfig, DashboardError, Dataset,
    LoadCache, DEFAULT_TOP_PRODUCTS,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sales dashboard JSON API")]
struct Args {
    /// Path to the SQLite store
    #[arg(long, env = "SALES_DASHBOARD_DB", value_name = "PATH")]
    db: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000", env = "SALES_DASHBOARD_ADDR")]
    addr: String,

    /// Default number of products in the top products chart
    #[arg(long, env = "SALES_DASHBOARD_TOP", default_value_t = DEFAULT_TOP_PRODUCTS)]
    top: usize,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    config: Arc<DashboardConfig>,
    cache: Arc<Mutex<LoadCache>>,
}

impl AppState {
    /// A poisoned lock is recovered: `LoadCache` empties its entry before
    /// every reload, so a panicked load leaves it empty, not half-built.
    fn cache(&self) -> MutexGuard<'_, LoadCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Memoized dataset; only re-queries after `/api/reload`
    fn dataset(&self) -> Result<Arc<Dataset>, ApiError> {
        Ok(self.cache().load(self.config.db_path())?)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug)]
enum ApiError {
    Store(DashboardError),
    NotFound(String),
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(err) => {
                error!("dashboard load failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[derive(Deserialize)]
struct TopParams {
    top: Option<usize>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard - Full snapshot (KPIs, series, raw tables)
async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.dataset()?;
    let top = params.top.unwrap_or(state.config.top_products);
    Ok(Json(ApiResponse::ok(Dashboard::build(&dataset, top))))
}

/// GET /api/kpis
async fn get_kpis(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.dataset()?;
    Ok(Json(ApiResponse::ok(analytics::Kpis::compute(&dataset.joined))))
}

/// GET /api/revenue/region
async fn get_revenue_by_region(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.dataset()?;
    Ok(Json(ApiResponse::ok(analytics::revenue_by_region(&dataset.joined))))
}

/// GET /api/revenue/product?top=N - All products unless `top` is given
async fn get_revenue_by_product(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.dataset()?;
    let products = match params.top {
        Some(n) => analytics::top_products(&dataset.joined, n),
        None => analytics::revenue_by_product(&dataset.joined),
    };
    Ok(Json(ApiResponse::ok(products)))
}

/// GET /api/revenue/month
async fn get_revenue_by_month(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.dataset()?;
    Ok(Json(ApiResponse::ok(analytics::revenue_by_month(&dataset.joined))))
}

/// GET /api/raw/:table - clients, products or sales as stored
async fn get_raw_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Response, ApiError> {
    let dataset = state.dataset()?;

    let response = match table.as_str() {
        "clients" => Json(ApiResponse::ok(&dataset.clients)).into_response(),
        "products" => Json(ApiResponse::ok(&dataset.products)).into_response(),
        "sales" => Json(ApiResponse::ok(&dataset.sales)).into_response(),
        other => return Err(ApiError::NotFound(format!("unknown table: {other}"))),
    };

    Ok(response)
}

/// POST /api/reload - Drop the memoized dataset
async fn reload(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.cache().invalidate();

    let dataset = state.dataset()?;
    info!(sales = dataset.sales.len(), "dataset reloaded");
    Ok((StatusCode::OK, Json(ApiResponse::ok("reloaded"))))
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/kpis", get(get_kpis))
        .route("/revenue/region", get(get_revenue_by_region))
        .route("/revenue/product", get(get_revenue_by_product))
        .route("/revenue/month", get(get_revenue_by_month))
        .route("/raw/:table", get(get_raw_table))
        .route("/reload", post(reload))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = DashboardConfig::new(args.db.unwrap_or_else(default_db_path))
        .with_top_products(args.top);

    println!("🌐 Sales Dashboard - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let outcome = ensure_store(config.db_path(), false)?;
    println!("✓ Store {}: {}", outcome, config.db_path().display());

    let state = AppState {
        config: Arc::new(config),
        cache: Arc::new(Mutex::new(LoadCache::new())),
    };

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/dashboard", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
