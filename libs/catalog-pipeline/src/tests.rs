//! Scenario tests against the §8 end-to-end cases, using fake drivers and
//! a fake repository rather than a mocking library — swap-the-capability
//! over branch-on-a-flag, per the workspace's testing convention.

use crate::engine::IngestPipeline;
use crate::types::IngestPipelineConfig;
use async_trait::async_trait;
use catalog_adapter::{DiscoveryDriver, ItemStream};
use catalog_core::{CatalogItem, CoreError, Region, ResumeState};
use catalog_db::{AgencyUpsert, CatalogRepository, DatasetUpsertOutcome, DomainUpsert, HostUpsert, ItemBatch};
use catalog_http::RetryConfig;
use catalog_observability::{NullEventLogger, NullMetricsSink, RecordingEventLogger, RecordingMetricsSink};
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn item(region: Region, host: &str, domain: &str, agency: Option<&str>) -> CatalogItem {
    CatalogItem { region, host: host.to_string(), domain: domain.to_string(), agency: agency.map(str::to_string) }
}

fn fixed_now(t: DateTime<Utc>) -> crate::types::NowFn {
    Arc::new(move || t)
}

enum Attempt {
    Items(Vec<CatalogItem>),
    Err(CoreError),
}

struct FakeDiscoveryDriver {
    calls: Mutex<u32>,
    script: Vec<Attempt>,
}

impl FakeDiscoveryDriver {
    fn once(items: Vec<CatalogItem>) -> Self {
        Self { calls: Mutex::new(0), script: vec![Attempt::Items(items)] }
    }

    fn scripted(script: Vec<Attempt>) -> Self {
        Self { calls: Mutex::new(0), script }
    }
}

#[async_trait]
impl DiscoveryDriver for FakeDiscoveryDriver {
    async fn discover<'a>(&'a self, _limit: u64) -> Result<ItemStream<'a, CatalogItem>, CoreError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let index = (*calls as usize).min(self.script.len() - 1);
            *calls += 1;
            index
        };
        match &self.script[index] {
            Attempt::Items(items) => Ok(stream::iter(items.clone().into_iter().map(Ok)).boxed()),
            Attempt::Err(err) => Err(clone_error(err)),
        }
    }
}

fn clone_error(err: &CoreError) -> CoreError {
    match err {
        CoreError::Schema(msg) => CoreError::Schema(msg.clone()),
        CoreError::TransientHttp { url, status, message } => {
            CoreError::TransientHttp { url: url.clone(), status: *status, message: message.clone() }
        }
        other => CoreError::Config(other.to_string()),
    }
}

#[derive(Default)]
struct FakeCatalogRepository {
    fail_on_call: Option<u32>,
    calls: Mutex<u32>,
    batches: Mutex<Vec<ItemBatch>>,
    resume: Mutex<Option<ResumeState>>,
}

impl FakeCatalogRepository {
    fn new() -> Self {
        Self::default()
    }

    fn failing_on(call: u32) -> Self {
        Self { fail_on_call: Some(call), ..Self::default() }
    }

    fn with_resume(resume: ResumeState) -> Self {
        Self { resume: Mutex::new(Some(resume)), ..Self::default() }
    }

    fn committed_batches(&self) -> Vec<ItemBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogRepository for FakeCatalogRepository {
    async fn upsert_host(&self, _upsert: &HostUpsert) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_domain(&self, _upsert: &DomainUpsert) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_agency(&self, _upsert: &AgencyUpsert) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_datasets(&self, _host: &str, _datasets: &[catalog_core::Dataset]) -> Result<DatasetUpsertOutcome, CoreError> {
        Ok(DatasetUpsertOutcome::default())
    }

    async fn retire_stale_datasets(&self, _host: &str, _cutoff: DateTime<Utc>) -> Result<u64, CoreError> {
        Ok(0)
    }

    async fn load_resume_state(&self, _pipeline: &str) -> Result<Option<ResumeState>, CoreError> {
        Ok(self.resume.lock().unwrap().clone())
    }

    async fn update_resume_state(&self, _pipeline: &str, _token: &str, _processed_at: DateTime<Utc>) -> Result<(), CoreError> {
        Ok(())
    }

    async fn process_item_batch(
        &self,
        batch: &ItemBatch,
        pipeline: &str,
        resume_token: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<DatasetUpsertOutcome, CoreError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if self.fail_on_call == Some(call) {
            return Err(CoreError::Persistence(anyhow::anyhow!("Database connection lost")));
        }
        self.batches.lock().unwrap().push(batch.clone());
        *self.resume.lock().unwrap() = Some(ResumeState {
            pipeline: pipeline.to_string(),
            resume_token: resume_token.to_string(),
            last_processed_at: processed_at,
            updated_at: processed_at,
        });
        Ok(DatasetUpsertOutcome { inserted: u64::try_from(batch.hosts.len()).unwrap_or(0), updated: 0 })
    }
}

fn base_config(
    driver: Arc<dyn DiscoveryDriver>,
    repository: Arc<dyn CatalogRepository>,
    batch_size: u64,
    limit: u64,
) -> IngestPipelineConfig {
    let mut discovery: HashMap<Region, Arc<dyn DiscoveryDriver>> = HashMap::new();
    discovery.insert(Region::Us, driver);
    IngestPipelineConfig {
        pipeline_name: "socrata_catalog".to_string(),
        regions: vec![Region::Us],
        page_size: 100,
        limit,
        dry_run: false,
        resume_from: None,
        resume_enabled: true,
        batch_size,
        retry_config: RetryConfig::deterministic(3),
        metrics_enabled: true,
        now: fixed_now(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        logger: Arc::new(NullEventLogger),
        metrics: Arc::new(NullMetricsSink),
        repository,
        discovery,
    }
}

#[tokio::test]
async fn s1_paginated_ingest_commits_one_batch() {
    let items = vec![
        item(Region::Us, "data.city1.gov", "city1.gov", Some("Dept A")),
        item(Region::Us, "data.city2.gov", "city2.gov", Some("Dept B")),
        item(Region::Us, "data.city3.gov", "city3.gov", None),
    ];
    let driver = Arc::new(FakeDiscoveryDriver::once(items));
    let repo = Arc::new(FakeCatalogRepository::new());
    let config = base_config(driver, repo.clone(), 3, 5);

    let report = IngestPipeline::new(config).run().await.unwrap();

    assert_eq!(report.total_processed, 3);
    assert_eq!(report.completed_regions, vec![Region::Us]);
    assert_eq!(repo.committed_batches().len(), 1);
    assert!(report.last_cursor.unwrap().contains("\"processed\":3"));
}

#[tokio::test]
async fn s2_resume_carries_forward_processed_count() {
    let stored = ResumeState {
        pipeline: "socrata_catalog".to_string(),
        resume_token: "{\"region\":\"US\",\"cursor\":\"existing\",\"processed\":3}".to_string(),
        last_processed_at: Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap(),
    };
    let items = vec![
        item(Region::Us, "data.city4.gov", "city4.gov", None),
        item(Region::Us, "data.city5.gov", "city5.gov", None),
    ];
    let driver = Arc::new(FakeDiscoveryDriver::once(items));
    let repo = Arc::new(FakeCatalogRepository::with_resume(stored));
    let logger = Arc::new(RecordingEventLogger::default());
    let metrics = Arc::new(RecordingMetricsSink::new());
    let mut config = base_config(driver, repo, 2, 5);
    config.logger = logger.clone();
    config.metrics = metrics.clone();

    let report = IngestPipeline::new(config).run().await.unwrap();

    assert_eq!(report.total_processed, 5);
    let resumed = logger.find("Resume from token").unwrap();
    assert_eq!(resumed.context.get("token_length").unwrap().as_u64().unwrap() as usize, 49);
    assert_eq!(metrics.total_increments("resume_restarts_total"), 1);
}

#[tokio::test]
async fn s3_duplicate_items_are_deduped_within_the_session() {
    let items = vec![
        item(Region::Us, "data.city1.gov", "city1.gov", Some("A")),
        item(Region::Us, "data.city1.gov", "city1.gov", Some("A")),
        item(Region::Us, "data.city2.gov", "city2.gov", Some("B")),
    ];
    let driver = Arc::new(FakeDiscoveryDriver::once(items));
    let repo = Arc::new(FakeCatalogRepository::new());
    let metrics = Arc::new(RecordingMetricsSink::new());
    let mut config = base_config(driver, repo.clone(), 10, 10);
    config.metrics = metrics.clone();

    let report = IngestPipeline::new(config).run().await.unwrap();

    assert_eq!(report.total_processed, 2);
    assert_eq!(metrics.total_increments("duplicates_skipped_total"), 1);
    let batches = repo.committed_batches();
    assert_eq!(batches[0].hosts.len(), 2);
    assert_eq!(batches[0].hosts[0].host, "data.city1.gov");
    assert_eq!(batches[0].hosts[1].host, "data.city2.gov");
}

#[tokio::test]
async fn s4_mid_batch_failure_preserves_prior_resume_token() {
    let items = vec![
        item(Region::Us, "data.city1.gov", "city1.gov", None),
        item(Region::Us, "data.city2.gov", "city2.gov", None),
        item(Region::Us, "data.city3.gov", "city3.gov", None),
        item(Region::Us, "data.city4.gov", "city4.gov", None),
    ];
    let driver = Arc::new(FakeDiscoveryDriver::once(items));
    let repo = Arc::new(FakeCatalogRepository::failing_on(2));
    let logger = Arc::new(RecordingEventLogger::default());
    let mut config = base_config(driver, repo.clone(), 3, 10);
    config.logger = logger.clone();

    let err = IngestPipeline::new(config).run().await.unwrap_err();
    assert!(matches!(err, CoreError::PipelineRuntime(_)));

    let rollback = logger.find("Batch rollback").unwrap();
    assert_eq!(rollback.context.get("batch_size").unwrap().as_u64(), Some(1));
    assert_eq!(rollback.context.get("error_message").unwrap().as_str(), Some("Database connection lost"));

    let resume = repo.load_resume_state("socrata_catalog").await.unwrap().unwrap();
    assert!(resume.resume_token.contains("\"processed\":3"));
}

#[tokio::test]
async fn s5a_fatal_iterator_error_aborts_without_retry() {
    let driver = Arc::new(FakeDiscoveryDriver::scripted(vec![Attempt::Err(CoreError::Schema(
        "Invalid JSON response format".to_string(),
    ))]));
    let repo = Arc::new(FakeCatalogRepository::new());
    let logger = Arc::new(RecordingEventLogger::default());
    let mut config = base_config(driver, repo, 3, 10);
    config.logger = logger.clone();

    let err = IngestPipeline::new(config).run().await.unwrap_err();
    assert!(matches!(err, CoreError::PipelineRuntime(_)));

    let fatal = logger.find("Fatal error encountered").unwrap();
    assert_eq!(fatal.context.get("error_type").unwrap().as_str(), Some("FATAL"));
    assert_eq!(fatal.context.get("attempt").unwrap().as_u64(), Some(1));
}

#[tokio::test]
async fn s5b_transient_iterator_error_retries_then_exhausts() {
    let transient = || {
        Attempt::Err(CoreError::TransientHttp {
            url: "https://api.us.socrata.com/api/catalog/v1/domains".to_string(),
            status: None,
            message: "Network timeout".to_string(),
        })
    };
    let driver = Arc::new(FakeDiscoveryDriver::scripted(vec![transient(), transient()]));
    let repo = Arc::new(FakeCatalogRepository::new());
    let logger = Arc::new(RecordingEventLogger::default());
    let mut config = base_config(driver, repo, 3, 10);
    config.retry_config = RetryConfig::deterministic(1);
    config.logger = logger.clone();

    let err = IngestPipeline::new(config).run().await.unwrap_err();
    assert!(matches!(err, CoreError::PipelineRuntime(_)));

    let exhausted = logger.find("Retry exhausted").unwrap();
    assert_eq!(exhausted.context.get("error_type").unwrap().as_str(), Some("TRANSIENT"));
    assert_eq!(exhausted.context.get("total_attempts").unwrap().as_u64(), Some(2));
}

#[tokio::test]
async fn dry_run_never_invokes_the_repository_or_discovery() {
    let driver = Arc::new(FakeDiscoveryDriver::once(vec![item(Region::Us, "data.city1.gov", "city1.gov", None)]));
    let repo = Arc::new(FakeCatalogRepository::new());
    let mut config = base_config(driver, repo.clone(), 3, 10);
    config.dry_run = true;

    let report = IngestPipeline::new(config).run().await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.total_processed, 0);
    assert!(report.last_cursor.is_none());
    assert!(repo.committed_batches().is_empty());
}

#[tokio::test]
async fn validate_rejects_empty_regions() {
    let driver = Arc::new(FakeDiscoveryDriver::once(vec![]));
    let repo = Arc::new(FakeCatalogRepository::new());
    let mut config = base_config(driver, repo, 3, 10);
    config.regions = Vec::new();

    let err = IngestPipeline::new(config).run().await.unwrap_err();
    assert!(matches!(err, CoreError::PipelineConfig(_)));
}
