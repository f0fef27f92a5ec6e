//! The ingest pipeline state machine (§4.F): validate, load resume,
//! iterate discovery per region, batch and commit, apply the
//! iteration-level retry policy, and report.

use crate::token;
use crate::types::{IngestPipelineConfig, PipelineReport};
use catalog_adapter::DiscoveryDriver;
use catalog_core::{CatalogItem, CoreError, Region, RetryClass};
use catalog_db::{AgencyUpsert, DomainUpsert, HostUpsert, ItemBatch};
use catalog_http::calculate_backoff;
use catalog_observability::{ctx, Context};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;

struct RunState {
    /// Keys of items that belong to a successfully committed batch this
    /// run. Populated only at commit time, not on first sight — so an
    /// iteration-level retry that restarts the discovery stream from
    /// scratch re-derives already-committed items and correctly skips
    /// them as duplicates, while items that were staged but never
    /// committed (the failed attempt that triggered the retry) are
    /// reprocessed rather than silently lost.
    committed: HashSet<String>,
    total_processed: u64,
    last_cursor: Option<String>,
    completed_regions: Vec<Region>,
}

/// Runs one ingest pass over the configured regions and drivers.
pub struct IngestPipeline {
    config: IngestPipelineConfig,
}

impl IngestPipeline {
    #[must_use]
    pub fn new(config: IngestPipelineConfig) -> Self {
        Self { config }
    }

    /// Takes `&mut self`: the borrow checker statically prevents two
    /// concurrent runs of the same pipeline instance (§5).
    pub async fn run(&mut self) -> Result<PipelineReport, CoreError> {
        self.config.validate().map_err(CoreError::as_pipeline_config)?;
        let started_at = (self.config.now)();

        if self.config.dry_run {
            let finished_at = (self.config.now)();
            self.emit_duration_metric(started_at, finished_at);
            return Ok(PipelineReport {
                started_at,
                finished_at,
                planned_regions: self.config.regions.clone(),
                planned_page_size: self.config.page_size,
                planned_limit: self.config.limit,
                dry_run: true,
                resume_from: self.config.resume_from.clone(),
                total_processed: 0,
                last_cursor: None,
                completed_regions: Vec::new(),
            });
        }

        let mut state = RunState {
            committed: HashSet::new(),
            total_processed: 0,
            last_cursor: None,
            completed_regions: Vec::new(),
        };
        self.load_resume(&mut state).await?;

        let mut run_err = None;
        for region in self.config.regions.clone() {
            if state.total_processed >= self.config.limit {
                break;
            }
            let remaining = self.config.limit - state.total_processed;
            let driver = Arc::clone(self.config.discovery.get(&region).expect("validated in IngestPipelineConfig::validate"));
            match self.iterate_region_with_retry(region, driver, remaining, &mut state).await {
                Ok(()) => state.completed_regions.push(region),
                Err(err) => {
                    run_err = Some(err);
                    break;
                }
            }
        }

        let finished_at = (self.config.now)();
        self.emit_duration_metric(started_at, finished_at);

        if let Some(err) = run_err {
            return Err(err);
        }

        Ok(PipelineReport {
            started_at,
            finished_at,
            planned_regions: self.config.regions.clone(),
            planned_page_size: self.config.page_size,
            planned_limit: self.config.limit,
            dry_run: false,
            resume_from: self.config.resume_from.clone(),
            total_processed: state.total_processed,
            last_cursor: state.last_cursor,
            completed_regions: state.completed_regions,
        })
    }

    /// §4.F step 2. `resumeFrom` (an explicit override token) takes
    /// precedence over a stored `ResumeState` read.
    async fn load_resume(&self, state: &mut RunState) -> Result<(), CoreError> {
        if let Some(explicit) = &self.config.resume_from {
            let parsed = token::parse(explicit)?;
            state.total_processed = parsed.processed;
            state.last_cursor = Some(explicit.clone());
            return Ok(());
        }

        if !self.config.resume_enabled {
            return Ok(());
        }

        let Some(resume_state) = self
            .config
            .repository
            .load_resume_state(&self.config.pipeline_name)
            .await
            .map_err(CoreError::as_pipeline_runtime)?
        else {
            return Ok(());
        };

        let parsed = token::parse(&resume_state.resume_token)?;
        if self.config.metrics_enabled {
            self.config.metrics.increment_by_one("resume_restarts_total", &Context::new());
        }
        self.config.logger.info(
            "Resume from token",
            &ctx!(
                "pipeline" => self.config.pipeline_name.clone(),
                "last_processed_at" => resume_state.last_processed_at.to_rfc3339(),
                "token_length" => resume_state.resume_token.len() as u64,
            ),
        );
        self.config.logger.info(
            "Resume operation",
            &ctx!("region" => parsed.region.as_str(), "processed" => parsed.processed),
        );

        state.total_processed = parsed.processed;
        state.last_cursor = Some(resume_state.resume_token);
        Ok(())
    }

    /// §4.F step 5: classifies a discovery failure as FATAL (abort
    /// immediately) or TRANSIENT (retry with backoff up to
    /// `retryConfig.max_attempts` further attempts beyond the first).
    async fn iterate_region_with_retry(
        &self,
        region: Region,
        driver: Arc<dyn DiscoveryDriver>,
        remaining_limit: u64,
        state: &mut RunState,
    ) -> Result<(), CoreError> {
        let mut attempt = 1u32;
        loop {
            match self.try_iterate_region(region, driver.as_ref(), remaining_limit, state).await {
                Ok(()) => return Ok(()),
                Err(err) => match err.retry_class() {
                    RetryClass::Fatal => {
                        self.config.logger.error(
                            "Fatal error encountered",
                            &ctx!("error_type" => "FATAL", "error" => err.to_string(), "attempt" => attempt),
                        );
                        return Err(err.as_pipeline_runtime());
                    }
                    RetryClass::Transient => {
                        if attempt > self.config.retry_config.max_attempts {
                            self.config.logger.error(
                                "Retry exhausted",
                                &ctx!(
                                    "error_type" => "TRANSIENT",
                                    "total_attempts" => attempt,
                                    "final_error" => err.to_string(),
                                ),
                            );
                            return Err(CoreError::RetryExhausted { url: "discovery".to_string(), attempts: attempt }
                                .as_pipeline_runtime());
                        }
                        tokio::time::sleep(calculate_backoff(self.config.retry_config, attempt - 1)).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    /// One full pull-and-batch pass over a freshly constructed discovery
    /// stream. Returns the underlying driver error unclassified, letting
    /// the retry wrapper decide whether to restart.
    async fn try_iterate_region(
        &self,
        region: Region,
        driver: &dyn DiscoveryDriver,
        remaining_limit: u64,
        state: &mut RunState,
    ) -> Result<(), CoreError> {
        if remaining_limit == 0 {
            return Ok(());
        }

        let mut stream = driver.discover(remaining_limit).await?;
        let mut pending: Vec<CatalogItem> = Vec::new();
        let mut staged_this_attempt: HashSet<String> = HashSet::new();

        while let Some(item) = stream.next().await {
            let item = item?;
            let key = item.dedup_key();
            if state.committed.contains(&key) || staged_this_attempt.contains(&key) {
                if self.config.metrics_enabled {
                    self.config.metrics.increment_by_one("duplicates_skipped_total", &ctx!("region" => region.as_str()));
                }
                self.config
                    .logger
                    .debug("Duplicate item skipped", &ctx!("region" => region.as_str(), "key" => key));
                continue;
            }

            staged_this_attempt.insert(key);
            pending.push(item);
            if pending.len() as u64 >= self.config.batch_size {
                self.commit_batch(region, &mut pending, state).await?;
            }
        }

        if !pending.is_empty() {
            self.commit_batch(region, &mut pending, state).await?;
        }
        Ok(())
    }

    /// §4.F step 4: builds the next resume token, runs
    /// `processItemBatch` in one transaction, and emits the matching
    /// success/failure telemetry.
    async fn commit_batch(&self, region: Region, pending: &mut Vec<CatalogItem>, state: &mut RunState) -> Result<(), CoreError> {
        let now = (self.config.now)();
        let batch_size = pending.len() as u64;

        let mut batch = ItemBatch::default();
        for item in pending.iter() {
            batch.hosts.push(HostUpsert { host: item.host.clone(), region: item.region, last_seen: now });
            batch.domains.push(DomainUpsert {
                domain: item.domain.clone(),
                region: item.region,
                country: None,
                last_seen: now,
            });
            if let Some(agency) = &item.agency {
                batch.agencies.push(AgencyUpsert {
                    host: item.host.clone(),
                    name: agency.clone(),
                    agency_type: None,
                    created_at: now,
                });
            }
        }

        let new_total = state.total_processed + batch_size;
        let token = token::encode(region, new_total);
        let start = std::time::Instant::now();
        let result = self.config.repository.process_item_batch(&batch, &self.config.pipeline_name, &token, now).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(_outcome) => {
                for item in pending.drain(..) {
                    state.committed.insert(item.dedup_key());
                }
                state.total_processed = new_total;
                state.last_cursor = Some(token);
                if self.config.metrics_enabled {
                    self.config.metrics.increment_by_one("batches_total", &ctx!("region" => region.as_str()));
                    self.config.metrics.increment(
                        "items_total",
                        i64::try_from(batch_size).unwrap_or(i64::MAX),
                        &ctx!("region" => region.as_str()),
                    );
                    self.config.metrics.timing("batch_duration_ms", duration_ms, &ctx!("region" => region.as_str()));
                }
                self.config.logger.info(
                    "Batch processed",
                    &ctx!(
                        "batch_size" => batch_size,
                        "items_total" => new_total,
                        "duration_ms" => duration_ms,
                        "resume_token_advanced" => true,
                    ),
                );
                Ok(())
            }
            Err(err) => {
                self.config.logger.error(
                    "Batch rollback",
                    &ctx!(
                        "batch_size" => batch_size,
                        "duration_ms" => duration_ms,
                        "error_message" => err.to_string(),
                        "resume_preserved" => true,
                    ),
                );
                pending.clear();
                Err(err)
            }
        }
    }

    fn emit_duration_metric(&self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) {
        if !self.config.metrics_enabled {
            return;
        }
        let millis = u64::try_from((finished_at - started_at).num_milliseconds().max(0)).unwrap_or(u64::MAX);
        let regions = self.config.regions.iter().map(Region::as_str).collect::<Vec<_>>().join(",");
        self.config.metrics.timing(
            "pipeline_duration_ms",
            millis,
            &ctx!("regions" => regions, "dry_run" => self.config.dry_run),
        );
    }
}
