//! Integration tests against an in-memory sqlite connection, covering §8
//! invariants 2 (idempotent upsert), 3 (retirement), and 4 (dry-run no-op).

mod support;

use catalog_core::{Dataset, Region};
use catalog_db::{
    CatalogRepository, DatasetUpsertOutcome, DomainUpsert, DryRunRepository, HostUpsert, ItemBatch,
    SeaOrmCatalogRepository,
};
use chrono::{Duration, TimeZone, Utc};

fn sample_dataset(id: &str, title: &str, last_seen: chrono::DateTime<Utc>) -> Dataset {
    Dataset {
        host: "data.city1.gov".to_string(),
        dataset_id: id.to_string(),
        title: title.to_string(),
        description: None,
        category: Some("Housing".to_string()),
        tags: vec!["parcels".to_string(), "gis".to_string()],
        publisher: None,
        updated_at: None,
        row_count: Some(100),
        view_count: Some(5),
        link: None,
        active: true,
        first_seen: last_seen,
        last_seen,
    }
}

#[tokio::test]
async fn upsert_datasets_is_idempotent_and_refreshes_columns() {
    let conn = support::bootstrap().await;
    let repo = SeaOrmCatalogRepository::new(conn);

    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let first = sample_dataset("abcd-1234", "Parcels v1", t0);
    let outcome = repo.upsert_datasets("data.city1.gov", &[first]).await.unwrap();
    assert_eq!(outcome, DatasetUpsertOutcome { inserted: 1, updated: 0 });

    let t1 = t0 + Duration::days(1);
    let second = sample_dataset("abcd-1234", "Parcels v2", t1);
    let outcome = repo.upsert_datasets("data.city1.gov", &[second]).await.unwrap();
    assert_eq!(outcome, DatasetUpsertOutcome { inserted: 0, updated: 1 });
}

#[tokio::test]
async fn retire_stale_datasets_only_affects_rows_before_cutoff() {
    let conn = support::bootstrap().await;
    let repo = SeaOrmCatalogRepository::new(conn);

    let old = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let recent = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let cutoff = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();

    repo.upsert_datasets(
        "data.city1.gov",
        &[sample_dataset("stale-1", "Old dataset", old), sample_dataset("fresh-1", "New dataset", recent)],
    )
    .await
    .unwrap();

    let retired = repo.retire_stale_datasets("data.city1.gov", cutoff).await.unwrap();
    assert_eq!(retired, 1);

    // Re-running against the same cutoff must not retire anything further
    // (no resurrection, no double-count).
    let retired_again = repo.retire_stale_datasets("data.city1.gov", cutoff).await.unwrap();
    assert_eq!(retired_again, 0);
}

#[tokio::test]
async fn dry_run_repository_never_mutates_state() {
    let conn = support::bootstrap().await;
    let verifier = SeaOrmCatalogRepository::new(conn.clone());
    let repo = DryRunRepository::new(SeaOrmCatalogRepository::new(conn));

    repo.upsert_host(&HostUpsert {
        host: "data.city1.gov".to_string(),
        region: Region::Us,
        last_seen: Utc::now(),
    })
    .await
    .unwrap();

    let dry_run_outcome = repo
        .upsert_datasets("data.city1.gov", &[sample_dataset("abcd-1234", "Parcels", Utc::now())])
        .await
        .unwrap();
    assert_eq!(dry_run_outcome, DatasetUpsertOutcome { inserted: 1, updated: 0 });

    // Nothing was actually persisted: a real upsert against the same
    // underlying connection still sees an empty table (reports `inserted`,
    // not `updated`).
    let real_outcome = verifier
        .upsert_datasets("data.city1.gov", &[sample_dataset("abcd-1234", "Parcels", Utc::now())])
        .await
        .unwrap();
    assert_eq!(real_outcome, DatasetUpsertOutcome { inserted: 1, updated: 0 });
    assert!(verifier.load_resume_state("socrata_catalog").await.unwrap().is_none());
}

#[tokio::test]
async fn process_item_batch_commits_upserts_and_resume_token_together() {
    let conn = support::bootstrap().await;
    let repo = SeaOrmCatalogRepository::new(conn);

    let now = Utc::now();
    let batch = ItemBatch {
        hosts: vec![HostUpsert { host: "data.city1.gov".to_string(), region: Region::Us, last_seen: now }],
        domains: vec![DomainUpsert {
            domain: "city1.gov".to_string(),
            region: Region::Us,
            country: Some("US".to_string()),
            last_seen: now,
        }],
        agencies: vec![],
        datasets: vec![("data.city1.gov".to_string(), sample_dataset("abcd-1234", "Parcels", now))],
    };

    let outcome = repo
        .process_item_batch(&batch, "socrata_catalog", "{\"region\":\"US\",\"cursor\":\"c1\",\"processed\":1}", now)
        .await
        .unwrap();
    assert_eq!(outcome, DatasetUpsertOutcome { inserted: 1, updated: 0 });

    let resume = repo.load_resume_state("socrata_catalog").await.unwrap().unwrap();
    assert_eq!(resume.resume_token, "{\"region\":\"US\",\"cursor\":\"c1\",\"processed\":1}");
}
