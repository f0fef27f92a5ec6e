//! Pipeline configuration and run report (§4.F): a closed, enumerated
//! option set rather than a dynamic bag (§9 "dynamic option bags →
//! enumerated configuration struct").

use catalog_adapter::DiscoveryDriver;
use catalog_core::Region;
use catalog_db::CatalogRepository;
use catalog_http::RetryConfig;
use catalog_observability::{EventLogger, MetricsSink};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Time source injection for determinism (§4.F `now()`).
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// `{regions, pageSize, limit, dryRun, resumeEnabled, batchSize,
/// retryConfig, metricsEnabled, logLevel, logger, now(), httpFetch}`
/// (§4.F). `logLevel` is carried by the injected `logger` itself rather
/// than duplicated as a separate field; `httpFetch` lives one layer down,
/// threaded into the concrete `DiscoveryDriver` the caller constructs.
pub struct IngestPipelineConfig {
    pub pipeline_name: String,
    pub regions: Vec<Region>,
    pub page_size: u32,
    pub limit: u64,
    pub dry_run: bool,
    /// Overrides the stored resume token with this explicit JSON token
    /// (§4.F `resumeFrom`), bypassing the repository read entirely.
    pub resume_from: Option<String>,
    pub resume_enabled: bool,
    pub batch_size: u64,
    pub retry_config: RetryConfig,
    pub metrics_enabled: bool,
    pub now: NowFn,
    pub logger: Arc<dyn EventLogger>,
    pub metrics: Arc<dyn MetricsSink>,
    pub repository: Arc<dyn CatalogRepository>,
    /// One discovery driver per region this run is configured to process.
    pub discovery: HashMap<Region, Arc<dyn DiscoveryDriver>>,
}

impl IngestPipelineConfig {
    /// §4.F step 1: `regions` non-empty and each has a configured driver,
    /// `pageSize`/`limit` positive, `batchSize >= 1`. Failures are always
    /// `CONFIG`, never reached via the iteration-level retry policy.
    pub(crate) fn validate(&self) -> Result<(), catalog_core::CoreError> {
        if self.regions.is_empty() {
            return Err(catalog_core::CoreError::config("regions must be non-empty"));
        }
        if self.page_size == 0 {
            return Err(catalog_core::CoreError::config("pageSize must be a positive integer"));
        }
        if self.limit == 0 {
            return Err(catalog_core::CoreError::config("limit must be a positive integer"));
        }
        if self.batch_size == 0 {
            return Err(catalog_core::CoreError::config("batchSize must be >= 1"));
        }
        for region in &self.regions {
            if !self.discovery.contains_key(region) {
                return Err(catalog_core::CoreError::config(format!(
                    "no discovery driver configured for region {}",
                    region.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// `{startedAt, finishedAt, plannedRegions, plannedPageSize, plannedLimit,
/// dryRun, resumeFrom, totalProcessed, lastCursor, completedRegions}`
/// (§4.F step 6).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub planned_regions: Vec<Region>,
    pub planned_page_size: u32,
    pub planned_limit: u64,
    pub dry_run: bool,
    pub resume_from: Option<String>,
    pub total_processed: u64,
    pub last_cursor: Option<String>,
    pub completed_regions: Vec<Region>,
}
