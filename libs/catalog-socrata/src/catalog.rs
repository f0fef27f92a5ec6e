//! `listCatalog` (§4.B) for the Socrata driver: `GET /api/catalog/v1`,
//! paged by `limit`/`offset` or an opaque cursor, mapped into
//! `PortalCatalogEntry` records.
//!
//! Distinct from discovery iteration (§4.C.1): this walks dataset-level
//! search results, not host/domain/agency structure.

use crate::transport::SocrataTransport;
use catalog_adapter::{CatalogLister, ItemStream, ListCatalogParams};
use catalog_core::{CoreError, PortalCatalogEntry, PortalSource};
use catalog_http::Fetch;
use serde::Deserialize;
use std::collections::VecDeque;

#[derive(Debug, Deserialize)]
struct CatalogSearchResponse {
    results: Vec<CatalogSearchResult>,
    #[serde(rename = "resultSetSize", default)]
    result_set_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CatalogSearchResult {
    resource: CatalogSearchResource,
    #[serde(default)]
    classification: Option<CatalogClassification>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    metadata: Option<CatalogSearchMetadata>,
}

#[derive(Debug, Deserialize)]
struct CatalogSearchResource {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    resource_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogClassification {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(rename = "domain_tags", default)]
    domain_tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogSearchMetadata {
    domain: String,
}

pub struct SocrataCatalogLister<F: Fetch> {
    host: String,
    transport: SocrataTransport<F>,
    page_size: u64,
}

impl<F: Fetch> SocrataCatalogLister<F> {
    #[must_use]
    pub fn new(host: impl Into<String>, transport: SocrataTransport<F>) -> Self {
        Self {
            host: host.into(),
            transport,
            page_size: 100,
        }
    }

    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<(Vec<PortalCatalogEntry>, u64), CoreError> {
        let url = format!(
            "https://{}/api/catalog/v1?domains={}&limit={}&offset={}",
            self.host, self.host, limit, offset
        );
        let body = self.transport.get_json(&url).await?;
        let parsed: CatalogSearchResponse = serde_json::from_value(body)
            .map_err(|e| CoreError::Schema(format!("malformed catalog search response: {e}")))?;

        let total = parsed.result_set_size.unwrap_or(0);
        let entries = parsed.results.into_iter().map(entry_from).collect();
        Ok((entries, total))
    }
}

fn entry_from(result: CatalogSearchResult) -> PortalCatalogEntry {
    let domain = result
        .metadata
        .map(|m| m.domain)
        .unwrap_or_default();
    let (category, tags) = result
        .classification
        .map(|c| (c.categories.into_iter().next(), c.domain_tags))
        .unwrap_or((None, Vec::new()));

    PortalCatalogEntry {
        id: result.resource.id,
        name: result.resource.name,
        description: result.resource.description,
        domain,
        permalink: result.permalink,
        resource_url: result.link,
        category,
        tags,
        source: PortalSource::Socrata,
        layer: result.resource.resource_type,
    }
}

struct ListState {
    pending: VecDeque<PortalCatalogEntry>,
    offset: u64,
    limit: Option<u64>,
    emitted: u64,
    exhausted: bool,
}

/// `listCatalog` is restartable only via an explicit cursor, not via
/// `offset` alone (§4.B) — encoded here as an opaque JSON token the same
/// way `catalog-pipeline::token` encodes resume state.
fn encode_cursor(offset: u64) -> String {
    serde_json::json!({ "offset": offset }).to_string()
}

fn decode_cursor(raw: &str) -> Result<u64, CoreError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| CoreError::Schema("Invalid listCatalog cursor format".to_string()))?;
    value
        .get("offset")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| CoreError::Schema("Invalid listCatalog cursor format".to_string()))
}

#[async_trait::async_trait]
impl<F: Fetch> CatalogLister for SocrataCatalogLister<F> {
    async fn list_catalog<'a>(
        &'a self,
        params: ListCatalogParams,
    ) -> Result<ItemStream<'a, PortalCatalogEntry>, CoreError> {
        // A cursor, when present, is the sole restart mechanism and takes
        // precedence over a bare `offset` (§4.B).
        let offset = match &params.cursor {
            Some(cursor) => decode_cursor(cursor)?,
            None => params.offset.unwrap_or(0),
        };
        let state = ListState {
            pending: VecDeque::new(),
            offset,
            limit: params.limit,
            emitted: 0,
            exhausted: false,
        };
        let page_size = self.page_size;

        let stream = futures::stream::unfold(state, move |mut state| async move {
            loop {
                if let Some(limit) = state.limit {
                    if state.emitted >= limit {
                        return None;
                    }
                }
                if let Some(entry) = state.pending.pop_front() {
                    state.emitted += 1;
                    return Some((Ok(entry), state));
                }
                if state.exhausted {
                    return None;
                }
                match self.fetch_page(page_size, state.offset).await {
                    Ok((entries, _total)) => {
                        let fetched = u64::try_from(entries.len()).unwrap_or(u64::MAX);
                        state.exhausted = fetched < page_size;
                        state.offset += fetched;
                        state.pending.extend(entries);
                        if state.pending.is_empty() && state.exhausted {
                            return None;
                        }
                    }
                    Err(err) => return Some((Err(err), state)),
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
