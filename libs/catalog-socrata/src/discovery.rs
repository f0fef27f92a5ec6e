//! Discovery iteration (§4.C.1): walks `/api/catalog/v1/domains`, paged by
//! the server-returned `links.next` cursor, and fans each domain record out
//! into one `CatalogItem` per listed agency.
//!
//! Grounded on the adapter contract's "lazy sequence" design note (§9):
//! implemented with `futures::stream::unfold` rather than collecting pages
//! eagerly, so a caller that stops pulling after a low `limit` never issues
//! requests for pages it doesn't need.

use crate::transport::SocrataTransport;
use catalog_adapter::{DiscoveryDriver, ItemStream};
use catalog_core::{CatalogItem, CoreError, Region};
use catalog_http::Fetch;
use serde::Deserialize;
use std::collections::VecDeque;

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    results: Vec<DiscoveryDomainRecord>,
    #[serde(default)]
    links: Option<DiscoveryLinks>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDomainRecord {
    domain: String,
    #[serde(default)]
    agencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryLinks {
    next: Option<String>,
}

struct DiscoveryState {
    pending: VecDeque<CatalogItem>,
    cursor: Option<String>,
    emitted: u64,
    limit: u64,
    exhausted: bool,
}

/// Drives discovery iteration for one Socrata host.
pub struct SocrataDiscoveryDriver<F: Fetch> {
    host: String,
    region: Region,
    page_size: u32,
    transport: SocrataTransport<F>,
}

impl<F: Fetch> SocrataDiscoveryDriver<F> {
    #[must_use]
    pub fn new(host: impl Into<String>, region: Region, page_size: u32, transport: SocrataTransport<F>) -> Self {
        Self {
            host: host.into(),
            region,
            page_size: page_size.clamp(1, 1000),
            transport,
        }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<(Vec<CatalogItem>, Option<String>), CoreError> {
        let mut url = self
            .transport
            .discovery_base_url()
            .join("/api/catalog/v1/domains")
            .map_err(|e| CoreError::config(format!("invalid discovery URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &self.page_size.to_string());
            if let Some(c) = cursor {
                pairs.append_pair("cursor", c);
            }
        }

        let body = self.transport.get_json(url.as_str()).await?;
        let parsed: DiscoveryResponse = serde_json::from_value(body)
            .map_err(|e| CoreError::Schema(format!("malformed discovery response: {e}")))?;

        let mut items = Vec::new();
        for record in parsed.results {
            if record.agencies.is_empty() {
                items.push(CatalogItem {
                    region: self.region,
                    host: self.host.clone(),
                    domain: record.domain.clone(),
                    agency: None,
                });
            } else {
                for agency in &record.agencies {
                    items.push(CatalogItem {
                        region: self.region,
                        host: self.host.clone(),
                        domain: record.domain.clone(),
                        agency: Some(agency.clone()),
                    });
                }
            }
        }

        let next_cursor = parsed.links.and_then(|l| l.next);
        Ok((items, next_cursor))
    }
}

#[async_trait::async_trait]
impl<F: Fetch> DiscoveryDriver for SocrataDiscoveryDriver<F> {
    async fn discover<'a>(&'a self, limit: u64) -> Result<ItemStream<'a, CatalogItem>, CoreError> {
        let state = DiscoveryState {
            pending: VecDeque::new(),
            cursor: None,
            emitted: 0,
            limit,
            exhausted: false,
        };

        let stream = futures::stream::unfold(state, move |mut state| async move {
            loop {
                if state.emitted >= state.limit {
                    return None;
                }
                if let Some(item) = state.pending.pop_front() {
                    state.emitted += 1;
                    return Some((Ok(item), state));
                }
                if state.exhausted {
                    return None;
                }
                match self.fetch_page(state.cursor.as_deref()).await {
                    Ok((items, next_cursor)) => {
                        state.exhausted = next_cursor.is_none();
                        state.cursor = next_cursor;
                        state.pending.extend(items);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SocrataTransport;
    use catalog_http::{HttpRequest, HttpResponse, RetryConfig, RetryingFetcher, TransportError};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    fn json_response(body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status: http::StatusCode::OK,
            headers: http::HeaderMap::new(),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    struct PagedFetch {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Fetch for PagedFetch {
        async fn fetch(&self, _req: HttpRequest) -> Result<HttpResponse, TransportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                Ok(json_response(json!({
                    "results": [
                        {"domain": "city1.gov", "agencies": ["Dept A", "Dept B"]},
                        {"domain": "city2.gov", "agencies": []}
                    ],
                    "links": {"next": "cursor-2"}
                })))
            } else {
                Ok(json_response(json!({
                    "results": [
                        {"domain": "city3.gov", "agencies": ["Dept C"]}
                    ],
                    "links": {"next": null}
                })))
            }
        }
    }

    fn transport() -> SocrataTransport<PagedFetch> {
        let fetcher = RetryingFetcher::new(
            PagedFetch { calls: AtomicUsize::new(0) },
            RetryConfig::deterministic(3),
        );
        SocrataTransport::new(Region::Us, fetcher, CancellationToken::new())
    }

    #[tokio::test]
    async fn fans_out_one_item_per_agency_and_null_for_empty() {
        let driver = SocrataDiscoveryDriver::new("data.city1.gov", Region::Us, 100, transport());

        let stream = driver.discover(10).await.unwrap();
        let items: Vec<CatalogItem> = stream.map(Result::unwrap).collect().await;

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].agency.as_deref(), Some("Dept A"));
        assert_eq!(items[1].agency.as_deref(), Some("Dept B"));
        assert_eq!(items[2].agency, None);
        assert_eq!(items[3].domain, "city3.gov");
    }

    #[tokio::test]
    async fn limit_truncates_emitted_records() {
        let driver = SocrataDiscoveryDriver::new("data.city1.gov", Region::Us, 100, transport());

        let stream = driver.discover(2).await.unwrap();
        let items: Vec<CatalogItem> = stream.map(Result::unwrap).collect().await;

        assert_eq!(items.len(), 2);
    }
}
