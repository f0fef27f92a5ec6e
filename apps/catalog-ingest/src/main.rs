//! Illustrative CLI runner for the catalog ingest pipeline (§6). Not
//! exercised by the workspace's test suite — it exists to show one way to
//! wire the library crates together, the way `apps/cli` wires CyberFabric's
//! subcommands.

mod fetch;
mod wiring;

use catalog_core::{CoreError, Region};
use catalog_pipeline::IngestPipeline;
use clap::Parser;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

/// Runs one ingest pass against the Socrata discovery API for one or more
/// regions.
#[derive(Parser)]
#[command(name = "catalog-ingest", version, about)]
struct Cli {
    /// Regions to discover, comma-separated (e.g. "US,EU").
    #[arg(long, env = "CATALOG_REGIONS", value_delimiter = ',', default_value = "US")]
    regions: Vec<String>,

    /// Page size requested from the discovery endpoint.
    #[arg(long, env = "CATALOG_PAGE_SIZE", default_value_t = 100)]
    page_size: u32,

    /// Maximum total items to process across all regions this run.
    #[arg(long, env = "CATALOG_LIMIT", default_value_t = 10_000)]
    limit: u64,

    /// Validate configuration and report the plan without discovering or
    /// writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Items staged per transactional commit.
    #[arg(long, env = "CATALOG_BATCH_SIZE", default_value_t = 500)]
    batch_size: u64,

    /// Explicit resume token overriding the stored resume state.
    #[arg(long, env = "CATALOG_RESUME_FROM")]
    resume_from: Option<String>,

    /// Disable reading/writing persisted resume state.
    #[arg(long)]
    no_resume: bool,

    /// `sea-orm` connection string for the catalog database.
    #[arg(long, env = "CATALOG_DATABASE_URL")]
    database_url: String,

    /// Optional Socrata app token sent on every request.
    #[arg(long, env = "SOCRATA_APP_TOKEN")]
    app_token: Option<String>,

    /// Pipeline name the resume state is keyed under.
    #[arg(long, env = "CATALOG_PIPELINE_NAME", default_value = "socrata_catalog")]
    pipeline_name: String,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    match runtime.block_on(run(cli)) {
        Ok(()) => Ok(()),
        Err(err) => {
            let code = match err.downcast_ref::<CoreError>() {
                Some(CoreError::PipelineConfig(_) | CoreError::Config(_)) => 2,
                Some(_) => 1,
                None => 1,
            };
            tracing::error!(%err, "catalog-ingest failed");
            std::process::exit(code);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let regions = parse_regions(&cli.regions)?;

    let conn = sea_orm::Database::connect(&cli.database_url).await.map_err(|e| CoreError::config(e.to_string()))?;
    let repository = std::sync::Arc::new(catalog_db::SeaOrmCatalogRepository::new(conn));

    let mut discovery = HashMap::new();
    for region in &regions {
        discovery.insert(*region, wiring::build_discovery_driver(*region, cli.app_token.as_deref(), cli.page_size));
    }

    let config = catalog_pipeline::IngestPipelineConfig {
        pipeline_name: cli.pipeline_name,
        regions,
        page_size: cli.page_size,
        limit: cli.limit,
        dry_run: cli.dry_run,
        resume_from: cli.resume_from,
        resume_enabled: !cli.no_resume,
        batch_size: cli.batch_size,
        retry_config: catalog_http::RetryConfig::default(),
        metrics_enabled: true,
        now: std::sync::Arc::new(chrono::Utc::now),
        logger: std::sync::Arc::new(catalog_observability::TracingEventLogger::new(catalog_observability::LogLevel::Info)),
        metrics: std::sync::Arc::new(catalog_observability::TracingMetricsSink),
        repository,
        discovery,
    };

    let mut pipeline = IngestPipeline::new(config);
    let report = pipeline.run().await?;

    tracing::info!(
        total_processed = report.total_processed,
        completed_regions = ?report.completed_regions,
        dry_run = report.dry_run,
        "ingest run finished",
    );
    Ok(())
}

fn parse_regions(raw: &[String]) -> anyhow::Result<Vec<Region>> {
    let parsed: Vec<Region> = raw
        .iter()
        .map(|r| Region::parse(r).ok_or_else(|| CoreError::config(format!("unknown region: {r}"))))
        .collect::<Result<_, _>>()?;
    if parsed.is_empty() {
        anyhow::bail!(CoreError::config("at least one region must be configured"));
    }
    Ok(parsed)
}
