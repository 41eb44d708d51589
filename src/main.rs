// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sales_dashboard::{
    default_db_path, ensure_store, export_joined_csv, load_dashboard, DashboardConfig, LoadCache,
    DEFAULT_TOP_PRODUCTS,
};

/// Sales dashboard over a local SQLite store
///
/// Examples:
///   sales-dashboard init --reset
///   sales-dashboard report --json
///   sales-dashboard --db ./demo.db export --output joined.csv
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite store (default: sales.db beside the executable)
    #[arg(long, global = true, env = "SALES_DASHBOARD_DB", value_name = "PATH")]
    db: Option<PathBuf>,

    /// Number of products in the top products chart
    #[arg(long, global = true, env = "SALES_DASHBOARD_TOP", default_value_t = DEFAULT_TOP_PRODUCTS)]
    top: usize,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the tables and seed demo data (no-op if already present)
    Init {
        /// Drop and recreate the tables, then reseed
        #[arg(long)]
        reset: bool,
    },
    /// Print KPIs and revenue breakdowns
    Report {
        /// Print the full dashboard snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the joined dataset as CSV
    Export {
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Interactive terminal dashboard (default)
    Tui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = DashboardConfig::new(cli.db.clone().unwrap_or_else(default_db_path))
        .with_top_products(cli.top);
    debug!(?config, "resolved configuration");

    match cli.command {
        Some(Command::Init { reset }) => run_init(&config, reset),
        Some(Command::Report { json }) => run_report(&config, json),
        Some(Command::Export { output }) => run_export(&config, &output),
        Some(Command::Tui) | None => run_ui_mode(&config),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "sales_dashboard=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn run_init(config: &DashboardConfig, reset: bool) -> Result<()> {
    let outcome = ensure_store(config.db_path(), reset)
        .with_context(|| format!("Failed to initialize {}", config.db_path().display()))?;

    debug!(%outcome, "ensure finished");
    println!("✓ Store ready: {}", resolved(config.db_path()).display());

    Ok(())
}

fn run_report(config: &DashboardConfig, json: bool) -> Result<()> {
    ensure_store(config.db_path(), false).context("Failed to prepare store")?;

    let mut cache = LoadCache::new();
    let dashboard = load_dashboard(&mut cache, config).context("Failed to load dashboard")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    let kpis = &dashboard.kpis;
    println!("📊 Sales Dashboard - {}", resolved(config.db_path()).display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Total revenue:        {:>12.2} €", kpis.total_revenue);
    println!("  Units sold:           {:>12}", kpis.total_quantity);
    println!("  Average order value:  {:>12.2} €", kpis.average_order_value);
    println!("  Active clients:       {:>12}", kpis.active_clients);

    println!("\n🌍 Revenue by region");
    for row in &dashboard.revenue_by_region {
        println!("  {:<20} {:>12.2} €", row.region, row.revenue);
    }

    println!("\n🏆 Top {} products", dashboard.top_products.len());
    for row in &dashboard.top_products {
        println!("  {:<20} {:>12.2} €", row.product_name, row.revenue);
    }

    println!("\n📅 Revenue by month");
    for row in &dashboard.revenue_by_month {
        println!("  {:<20} {:>12.2} €", row.month.format("%Y-%m"), row.revenue);
    }

    if !dashboard.referential_gaps.is_empty() {
        println!(
            "\n⚠️  {} sale(s) skipped: client or product missing",
            dashboard.referential_gaps.len()
        );
    }

    Ok(())
}

fn run_export(config: &DashboardConfig, output: &Path) -> Result<()> {
    ensure_store(config.db_path(), false).context("Failed to prepare store")?;

    let mut cache = LoadCache::new();
    let dataset = cache.load(config.db_path()).context("Failed to load dataset")?;
    let written = export_joined_csv(output, &dataset.joined)?;

    println!("✓ Exported {} rows to {}", written, output.display());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &DashboardConfig) -> Result<()> {
    ensure_store(config.db_path(), false).context("Failed to prepare store")?;

    let mut app = ui::App::new(config.clone()).context("Failed to load dashboard")?;
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &DashboardConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: sales-dashboard report");
    std::process::exit(1);
}
