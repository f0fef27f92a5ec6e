//! Catalog repository (§4.E): `sea-orm` entities, idempotent upserts,
//! stale-dataset retirement, resume-state persistence, and a
//! single-transaction batch commit. See `SCHEMA.sql` for the reference DDL
//! this crate assumes but never executes (migrations are out of scope).

pub mod entities;
pub mod mapper;
pub mod repository;

pub use repository::{
    AgencyUpsert, CatalogRepository, DatasetUpsertOutcome, DomainUpsert, DryRunRepository,
    HostUpsert, ItemBatch, SeaOrmCatalogRepository,
};
