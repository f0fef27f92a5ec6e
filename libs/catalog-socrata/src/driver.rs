//! Composes the Socrata driver's sub-components (discovery, catalog
//! listing, row fetching, metadata) behind the adapter contract for one
//! host (§4.C).

use crate::auth::V3AuthResolver;
use crate::catalog::SocrataCatalogLister;
use crate::discovery::SocrataDiscoveryDriver;
use crate::metadata::SocrataMetadataFetcher;
use crate::rows::SocrataRowFetcher;
use crate::soql::AllowedFields;
use crate::transport::SocrataTransport;
use catalog_adapter::{CatalogLister, DiscoveryDriver, ItemStream, ListCatalogParams, MetadataFetcher, RowFetcher, RowQuery};
use catalog_core::{CatalogItem, CoreError, NormalizedDatasetMetadata, PortalCatalogEntry, Region};
use catalog_http::Fetch;
use serde_json::Value;

/// One Socrata host's full driver surface: `PortalAdapter` (via the
/// blanket impl over `CatalogLister + RowFetcher + MetadataFetcher`) plus
/// the Socrata-specific `DiscoveryDriver`. The sub-components are built
/// once, at construction time, and held as fields, rather than
/// constructed per call — avoids borrowing a stream from a temporary
/// that method dispatch would otherwise drop before the caller finishes
/// pulling from it.
pub struct SocrataDriver<F: Fetch> {
    discovery: SocrataDiscoveryDriver<F>,
    catalog: SocrataCatalogLister<F>,
    rows: SocrataRowFetcher<F>,
    metadata: SocrataMetadataFetcher<F>,
}

impl<F: Fetch> SocrataDriver<F> {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        region: Region,
        transport: SocrataTransport<F>,
        auth: V3AuthResolver,
        allowed_fields: AllowedFields,
    ) -> Self {
        Self::with_page_sizes(host, region, transport, auth, allowed_fields, 1000, 1000)
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_page_sizes(
        host: impl Into<String>,
        region: Region,
        transport: SocrataTransport<F>,
        auth: V3AuthResolver,
        allowed_fields: AllowedFields,
        discovery_page_size: u32,
        v2_page_size: u32,
    ) -> Self {
        let host = host.into();
        Self {
            discovery: SocrataDiscoveryDriver::new(host.clone(), region, discovery_page_size, transport.clone()),
            catalog: SocrataCatalogLister::new(host.clone(), transport.clone()),
            rows: SocrataRowFetcher::new(host.clone(), transport.clone(), auth, allowed_fields)
                .with_v2_page_size(v2_page_size),
            metadata: SocrataMetadataFetcher::new(host, transport),
        }
    }
}

#[async_trait::async_trait]
impl<F: Fetch> DiscoveryDriver for SocrataDriver<F> {
    async fn discover<'a>(&'a self, limit: u64) -> Result<ItemStream<'a, CatalogItem>, CoreError> {
        self.discovery.discover(limit).await
    }
}

#[async_trait::async_trait]
impl<F: Fetch> CatalogLister for SocrataDriver<F> {
    async fn list_catalog<'a>(
        &'a self,
        params: ListCatalogParams,
    ) -> Result<ItemStream<'a, PortalCatalogEntry>, CoreError> {
        self.catalog.list_catalog(params).await
    }
}

#[async_trait::async_trait]
impl<F: Fetch> RowFetcher for SocrataDriver<F> {
    async fn fetch_rows<'a>(
        &'a self,
        id_or_url: &str,
        query: RowQuery,
        extra: Option<Value>,
    ) -> Result<ItemStream<'a, Value>, CoreError> {
        self.rows.fetch_rows(id_or_url, query, extra).await
    }
}

#[async_trait::async_trait]
impl<F: Fetch> MetadataFetcher for SocrataDriver<F> {
    async fn fetch_metadata(&self, id: &str) -> Result<NormalizedDatasetMetadata, CoreError> {
        self.metadata.fetch_metadata(id).await
    }
}
