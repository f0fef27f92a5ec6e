//! Portal adapter contract (§4.B): the capability set the pipeline depends
//! on, decoupled from any concrete driver (Socrata/CKAN/ArcGIS).
//!
//! Grounded on the teacher's "capability composition instead of
//! inheritance" design note (§9): drivers implement independent
//! single-method traits composed into one supertrait, mirroring
//! `modules/oagw/oagw-gw/src/domain/repo.rs`'s per-capability repository
//! traits (`LinkRepository`, `RouteRepository`) rather than a single large
//! interface with optional methods.

use async_trait::async_trait;
use catalog_core::{CatalogItem, CoreError, NormalizedDatasetMetadata, PortalCatalogEntry};
use futures::stream::BoxStream;
use serde_json::Value;

/// Parameters for `listCatalog` (§4.B).
#[derive(Debug, Clone, Default)]
pub struct ListCatalogParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub cursor: Option<String>,
}

/// A single predicate in a `fetchRows` query's `where` clause. The adapter
/// passes this through in its own native dialect (§4.B); `RowQuery::where_native`
/// is therefore a pre-rendered string, not a structured AST shared across
/// drivers.
#[derive(Debug, Clone, Default)]
pub struct RowQuery {
    pub select: Option<Vec<String>>,
    pub where_native: Option<String>,
    pub order_by: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A lazy, finite sequence of fallible items — the Rust realization of
/// "async iteration" (§9 design note): callers pull one item at a time and
/// never drive the same stream from two tasks concurrently (§5).
pub type ItemStream<'a, T> = BoxStream<'a, Result<T, CoreError>>;

/// `listCatalog({limit?, offset?, cursor?}) -> lazy sequence of
/// PortalCatalogEntry` (§4.B). Finite; restartable only via an explicit
/// cursor.
#[async_trait]
pub trait CatalogLister: Send + Sync {
    async fn list_catalog<'a>(
        &'a self,
        params: ListCatalogParams,
    ) -> Result<ItemStream<'a, PortalCatalogEntry>, CoreError>;
}

/// `fetchRows(idOrURL, query, extra?) -> lazy sequence of row records`
/// (§4.B). Rows are opaque JSON objects; normalization happens via the
/// codec layer (§4.I) once a caller knows the column's logical type.
#[async_trait]
pub trait RowFetcher: Send + Sync {
    async fn fetch_rows<'a>(
        &'a self,
        id_or_url: &str,
        query: RowQuery,
        extra: Option<Value>,
    ) -> Result<ItemStream<'a, Value>, CoreError>;
}

/// `fetchMetadata(id) -> NormalizedDatasetMetadata` (§4.B).
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_metadata(&self, id: &str) -> Result<NormalizedDatasetMetadata, CoreError>;
}

/// The full portal adapter capability set. Blanket-implemented for any type
/// that provides all three capabilities, so drivers need only implement the
/// pieces they actually have — the pipeline depends on this supertrait, not
/// on a concrete `SocrataDriver`/`CkanDriver` type.
pub trait PortalAdapter: CatalogLister + RowFetcher + MetadataFetcher {}

impl<T> PortalAdapter for T where T: CatalogLister + RowFetcher + MetadataFetcher {}

/// Discovery iteration (§4.C.1): enumerate the hosts/domains/agencies a
/// driver knows about as a lazy stream of `CatalogItem` records. This is a
/// separate capability from `CatalogLister` — discovery walks catalog
/// *structure* (domains, agencies), while `listCatalog` walks catalog
/// *contents* (dataset entries) — and the pipeline (§4.F) depends on it
/// directly rather than through `PortalAdapter`, since discovery is a
/// Socrata-specific surface with no CKAN/ArcGIS equivalent defined here.
#[async_trait]
pub trait DiscoveryDriver: Send + Sync {
    async fn discover<'a>(&'a self, limit: u64) -> Result<ItemStream<'a, CatalogItem>, CoreError>;
}
