//! The catalog repository contract (§4.E): idempotent upserts keyed on
//! natural identifiers, transactional batch commits that advance the
//! resume token atomically, and stale-record retirement.
//!
//! Grounded on `modules/oagw/oagw-gw/src/infra/storage/link_repo.rs` and
//! `route_repo.rs` (repository trait + `SeaOrm*Repository` struct holding
//! a connection) and
//! `modules/simple-user-settings/.../sea_orm_repo.rs` (`Insert::on_conflict`
//! upsert style). Unlike the teacher's multi-tenant repositories, this
//! store carries no `AccessScope`/`SecureConn` — the system is
//! single-tenant.

use crate::entities::{agency, dataset, domain, host, resume_state};
use async_trait::async_trait;
use catalog_core::{CoreError, Dataset, Region, ResumeState};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};

/// One host upsert within an `ItemBatch` (§4.E `upsertHost`).
#[derive(Debug, Clone)]
pub struct HostUpsert {
    pub host: String,
    pub region: Region,
    pub last_seen: DateTime<Utc>,
}

/// One domain upsert within an `ItemBatch` (§4.E `upsertDomain`).
#[derive(Debug, Clone)]
pub struct DomainUpsert {
    pub domain: String,
    pub region: Region,
    pub country: Option<String>,
    pub last_seen: DateTime<Utc>,
}

/// One agency upsert within an `ItemBatch` (§4.E `upsertAgency`).
#[derive(Debug, Clone)]
pub struct AgencyUpsert {
    pub host: String,
    pub name: String,
    pub agency_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything `processItemBatch` commits in one transaction (§4.F step 4):
/// the host/domain/agency rows observed this batch plus the datasets they
/// carry.
#[derive(Debug, Clone, Default)]
pub struct ItemBatch {
    pub hosts: Vec<HostUpsert>,
    pub domains: Vec<DomainUpsert>,
    pub agencies: Vec<AgencyUpsert>,
    /// `(host, dataset)` pairs; grouped by host internally before the
    /// batched `upsertDatasets` call.
    pub datasets: Vec<(String, Dataset)>,
}

/// `{inserted, updated}` from `upsertDatasets`/`processItemBatch` (§9 Open
/// Question 1). Counts are computed by diffing the set of keys that
/// existed before the upsert from the set submitted; backends that cannot
/// distinguish return `{n, 0}` and must document the limitation (this
/// implementation always distinguishes, since both backends support a
/// pre-upsert existence check).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetUpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

impl DatasetUpsertOutcome {
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            inserted: self.inserted + other.inserted,
            updated: self.updated + other.updated,
        }
    }
}

/// §4.E's full operation set.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn upsert_host(&self, upsert: &HostUpsert) -> Result<(), CoreError>;
    async fn upsert_domain(&self, upsert: &DomainUpsert) -> Result<(), CoreError>;
    async fn upsert_agency(&self, upsert: &AgencyUpsert) -> Result<(), CoreError>;
    async fn upsert_datasets(
        &self,
        host: &str,
        datasets: &[Dataset],
    ) -> Result<DatasetUpsertOutcome, CoreError>;
    async fn retire_stale_datasets(&self, host: &str, cutoff: DateTime<Utc>) -> Result<u64, CoreError>;
    async fn load_resume_state(&self, pipeline: &str) -> Result<Option<ResumeState>, CoreError>;
    async fn update_resume_state(
        &self,
        pipeline: &str,
        token: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), CoreError>;
    async fn process_item_batch(
        &self,
        batch: &ItemBatch,
        pipeline: &str,
        resume_token: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<DatasetUpsertOutcome, CoreError>;
}

/// `sea-orm`-backed implementation over any `ConnectionTrait` (a plain
/// `DatabaseConnection` or a `DatabaseTransaction`), so the free functions
/// below can run identically whether called directly or from within
/// `process_item_batch`'s transaction.
pub struct SeaOrmCatalogRepository {
    conn: DatabaseConnection,
}

impl SeaOrmCatalogRepository {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

async fn upsert_host_on<C: ConnectionTrait>(conn: &C, upsert: &HostUpsert) -> Result<(), CoreError> {
    let model = host::ActiveModel {
        host: ActiveValue::Set(upsert.host.clone()),
        region: ActiveValue::Set(crate::mapper::region_to_str(upsert.region)),
        last_seen: ActiveValue::Set(upsert.last_seen),
    };
    host::Entity::insert(model)
        .on_conflict(
            OnConflict::column(host::Column::Host)
                .update_columns([host::Column::Region, host::Column::LastSeen])
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;
    Ok(())
}

async fn upsert_domain_on<C: ConnectionTrait>(conn: &C, upsert: &DomainUpsert) -> Result<(), CoreError> {
    let model = domain::ActiveModel {
        domain: ActiveValue::Set(upsert.domain.clone()),
        country: ActiveValue::Set(upsert.country.clone()),
        region: ActiveValue::Set(crate::mapper::region_to_str(upsert.region)),
        last_seen: ActiveValue::Set(upsert.last_seen),
    };
    domain::Entity::insert(model)
        .on_conflict(
            OnConflict::column(domain::Column::Domain)
                .update_columns([domain::Column::Country, domain::Column::Region, domain::Column::LastSeen])
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;
    Ok(())
}

async fn upsert_agency_on<C: ConnectionTrait>(conn: &C, upsert: &AgencyUpsert) -> Result<(), CoreError> {
    let model = agency::ActiveModel {
        host: ActiveValue::Set(upsert.host.clone()),
        name: ActiveValue::Set(upsert.name.clone()),
        agency_type: ActiveValue::Set(upsert.agency_type.clone()),
        created_at: ActiveValue::Set(upsert.created_at),
    };
    agency::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([agency::Column::Host, agency::Column::Name])
                .update_column(agency::Column::AgencyType)
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;
    Ok(())
}

fn tags_to_json(tags: &[String]) -> serde_json::Value {
    serde_json::Value::Array(tags.iter().cloned().map(serde_json::Value::String).collect())
}

/// `ON CONFLICT (host, dataset_id) DO UPDATE` refreshing every non-key
/// column, forcing `active = true` and bumping `last_seen` (§4.E). Counts
/// are computed by checking which `(host, dataset_id)` keys already
/// existed before the insert.
async fn upsert_datasets_on<C: ConnectionTrait>(
    conn: &C,
    host: &str,
    datasets: &[Dataset],
) -> Result<DatasetUpsertOutcome, CoreError> {
    if datasets.is_empty() {
        return Ok(DatasetUpsertOutcome::default());
    }

    let ids: Vec<String> = datasets.iter().map(|d| d.dataset_id.clone()).collect();
    let existing: Vec<String> = dataset::Entity::find()
        .filter(dataset::Column::Host.eq(host))
        .filter(dataset::Column::DatasetId.is_in(ids))
        .all(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?
        .into_iter()
        .map(|m| m.dataset_id)
        .collect();
    let existing_count = u64::try_from(existing.len()).unwrap_or(u64::MAX);

    let models: Vec<dataset::ActiveModel> = datasets
        .iter()
        .map(|d| dataset::ActiveModel {
            host: ActiveValue::Set(host.to_string()),
            dataset_id: ActiveValue::Set(d.dataset_id.clone()),
            title: ActiveValue::Set(d.title.clone()),
            description: ActiveValue::Set(d.description.clone()),
            category: ActiveValue::Set(d.category.clone()),
            tags: ActiveValue::Set(tags_to_json(&d.tags)),
            publisher: ActiveValue::Set(d.publisher.clone()),
            updated_at: ActiveValue::Set(d.updated_at),
            row_count: ActiveValue::Set(d.row_count),
            view_count: ActiveValue::Set(d.view_count),
            link: ActiveValue::Set(d.link.clone()),
            active: ActiveValue::Set(true),
            first_seen: ActiveValue::Set(d.first_seen),
            last_seen: ActiveValue::Set(d.last_seen),
        })
        .collect();

    dataset::Entity::insert_many(models)
        .on_conflict(
            OnConflict::columns([dataset::Column::Host, dataset::Column::DatasetId])
                .update_columns([
                    dataset::Column::Title,
                    dataset::Column::Description,
                    dataset::Column::Category,
                    dataset::Column::Tags,
                    dataset::Column::Publisher,
                    dataset::Column::UpdatedAt,
                    dataset::Column::RowCount,
                    dataset::Column::ViewCount,
                    dataset::Column::Link,
                    dataset::Column::Active,
                    dataset::Column::LastSeen,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;

    let total = u64::try_from(datasets.len()).unwrap_or(u64::MAX);
    Ok(DatasetUpsertOutcome {
        inserted: total - existing_count,
        updated: existing_count,
    })
}

async fn retire_stale_datasets_on<C: ConnectionTrait>(
    conn: &C,
    host: &str,
    cutoff: DateTime<Utc>,
) -> Result<u64, CoreError> {
    use sea_orm::sea_query::Expr;

    let result = dataset::Entity::update_many()
        .col_expr(dataset::Column::Active, Expr::value(false))
        .filter(dataset::Column::Host.eq(host))
        .filter(dataset::Column::LastSeen.lt(cutoff))
        .filter(dataset::Column::Active.eq(true))
        .exec(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;

    Ok(result.rows_affected)
}

async fn load_resume_state_on<C: ConnectionTrait>(
    conn: &C,
    pipeline: &str,
) -> Result<Option<ResumeState>, CoreError> {
    let model = resume_state::Entity::find_by_id(pipeline.to_string())
        .one(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;
    Ok(model.map(ResumeState::from))
}

async fn update_resume_state_on<C: ConnectionTrait>(
    conn: &C,
    pipeline: &str,
    token: &str,
    processed_at: DateTime<Utc>,
) -> Result<(), CoreError> {
    let now = Utc::now();
    let model = resume_state::ActiveModel {
        pipeline: ActiveValue::Set(pipeline.to_string()),
        resume_token: ActiveValue::Set(token.to_string()),
        last_processed_at: ActiveValue::Set(processed_at),
        updated_at: ActiveValue::Set(now),
    };
    resume_state::Entity::insert(model)
        .on_conflict(
            OnConflict::column(resume_state::Column::Pipeline)
                .update_columns([
                    resume_state::Column::ResumeToken,
                    resume_state::Column::LastProcessedAt,
                    resume_state::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(|e| CoreError::Persistence(e.into()))?;
    Ok(())
}

#[async_trait]
impl CatalogRepository for SeaOrmCatalogRepository {
    async fn upsert_host(&self, upsert: &HostUpsert) -> Result<(), CoreError> {
        upsert_host_on(&self.conn, upsert).await
    }

    async fn upsert_domain(&self, upsert: &DomainUpsert) -> Result<(), CoreError> {
        upsert_domain_on(&self.conn, upsert).await
    }

    async fn upsert_agency(&self, upsert: &AgencyUpsert) -> Result<(), CoreError> {
        upsert_agency_on(&self.conn, upsert).await
    }

    async fn upsert_datasets(
        &self,
        host: &str,
        datasets: &[Dataset],
    ) -> Result<DatasetUpsertOutcome, CoreError> {
        upsert_datasets_on(&self.conn, host, datasets).await
    }

    async fn retire_stale_datasets(&self, host: &str, cutoff: DateTime<Utc>) -> Result<u64, CoreError> {
        retire_stale_datasets_on(&self.conn, host, cutoff).await
    }

    async fn load_resume_state(&self, pipeline: &str) -> Result<Option<ResumeState>, CoreError> {
        load_resume_state_on(&self.conn, pipeline).await
    }

    async fn update_resume_state(
        &self,
        pipeline: &str,
        token: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        update_resume_state_on(&self.conn, pipeline, token, processed_at).await
    }

    /// Runs every host/domain/agency/dataset upsert plus the resume-state
    /// update inside a single `DatabaseTransaction` (§4.E). On any failure
    /// the transaction rolls back and the resume token stays at its prior
    /// committed value (§4.F invariant 1, scenario S4).
    async fn process_item_batch(
        &self,
        batch: &ItemBatch,
        pipeline: &str,
        resume_token: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<DatasetUpsertOutcome, CoreError> {
        let txn = self.conn.begin().await.map_err(|e| CoreError::Persistence(e.into()))?;

        for upsert in &batch.hosts {
            upsert_host_on(&txn, upsert).await?;
        }
        for upsert in &batch.domains {
            upsert_domain_on(&txn, upsert).await?;
        }
        for upsert in &batch.agencies {
            upsert_agency_on(&txn, upsert).await?;
        }

        let mut by_host: std::collections::BTreeMap<&str, Vec<&Dataset>> = std::collections::BTreeMap::new();
        for (host, dataset) in &batch.datasets {
            by_host.entry(host.as_str()).or_default().push(dataset);
        }

        let mut outcome = DatasetUpsertOutcome::default();
        for (host, datasets) in by_host {
            let owned: Vec<Dataset> = datasets.into_iter().cloned().collect();
            outcome = outcome.merge(upsert_datasets_on(&txn, host, &owned).await?);
        }

        update_resume_state_on(&txn, pipeline, resume_token, processed_at).await?;

        txn.commit().await.map_err(|e| CoreError::Persistence(e.into()))?;
        Ok(outcome)
    }
}

/// Decorates any `CatalogRepository` to make every write a no-op, per §4.F
/// `dryRun` / §8 invariant 4. Reads still pass through so the pipeline's
/// resume-load step behaves identically in dry-run mode. Grounded on the
/// teacher's capability-substitution philosophy: swap implementations
/// rather than branch on a flag inside one struct.
pub struct DryRunRepository<R> {
    inner: R,
}

impl<R: CatalogRepository> DryRunRepository<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: CatalogRepository> CatalogRepository for DryRunRepository<R> {
    async fn upsert_host(&self, _upsert: &HostUpsert) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_domain(&self, _upsert: &DomainUpsert) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_agency(&self, _upsert: &AgencyUpsert) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_datasets(
        &self,
        _host: &str,
        datasets: &[Dataset],
    ) -> Result<DatasetUpsertOutcome, CoreError> {
        Ok(DatasetUpsertOutcome {
            inserted: u64::try_from(datasets.len()).unwrap_or(u64::MAX),
            updated: 0,
        })
    }

    async fn retire_stale_datasets(&self, _host: &str, _cutoff: DateTime<Utc>) -> Result<u64, CoreError> {
        Ok(0)
    }

    async fn load_resume_state(&self, pipeline: &str) -> Result<Option<ResumeState>, CoreError> {
        self.inner.load_resume_state(pipeline).await
    }

    async fn update_resume_state(
        &self,
        _pipeline: &str,
        _token: &str,
        _processed_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    async fn process_item_batch(
        &self,
        batch: &ItemBatch,
        _pipeline: &str,
        _resume_token: &str,
        _processed_at: DateTime<Utc>,
    ) -> Result<DatasetUpsertOutcome, CoreError> {
        let total = u64::try_from(batch.datasets.len()).unwrap_or(u64::MAX);
        Ok(DatasetUpsertOutcome { inserted: total, updated: 0 })
    }
}
