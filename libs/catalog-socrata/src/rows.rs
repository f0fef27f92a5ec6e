//! Row fetching: v2 `GET /resource/{id}.json` pagination (§4.C.3) and v3
//! `POST /api/v3/views/{id}/query.json` (§4.C.4), composed behind the
//! `RowFetcher` contract.

use crate::auth::{V3AuthResolver, V3KeyPair};
use crate::soql::{append_query_string, AllowedFields, SoqlInput};
use crate::transport::SocrataTransport;
use catalog_adapter::{ItemStream, RowFetcher, RowQuery};
use catalog_core::CoreError;
use catalog_http::Fetch;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// Default v2 page size; clamped to `[1,1000]` like every explicit page
/// size in this driver (§4.C.3).
const DEFAULT_V2_PAGE_SIZE: u32 = 1000;

struct V2State {
    pending: VecDeque<Value>,
    offset: u32,
    page_size: u32,
    emitted: u64,
    max_rows: Option<u64>,
    exhausted: bool,
}

/// Row-fetching driver for one Socrata host. Tries v3 first when
/// credentials or an app token are configured and the dataset hasn't been
/// marked v3-unavailable; falls back to v2 on `{401,403,404,501}` (§4.C.4).
pub struct SocrataRowFetcher<F: Fetch> {
    host: String,
    transport: SocrataTransport<F>,
    auth: V3AuthResolver,
    allowed_fields: AllowedFields,
    v2_page_size: u32,
}

impl<F: Fetch> SocrataRowFetcher<F> {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        transport: SocrataTransport<F>,
        auth: V3AuthResolver,
        allowed_fields: AllowedFields,
    ) -> Self {
        Self {
            host: host.into(),
            transport,
            auth,
            allowed_fields,
            v2_page_size: DEFAULT_V2_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_v2_page_size(mut self, page_size: u32) -> Self {
        self.v2_page_size = page_size.clamp(1, 1000);
        self
    }

    fn resource_url(&self, id_or_url: &str) -> String {
        if id_or_url.starts_with("http://") || id_or_url.starts_with("https://") {
            id_or_url.to_string()
        } else {
            format!("https://{}/resource/{}.json", self.host, id_or_url)
        }
    }

    fn v3_url(&self, id_or_url: &str) -> String {
        format!("https://{}/api/v3/views/{}/query.json", self.host, id_or_url)
    }

    async fn fetch_v2_page(
        &self,
        id_or_url: &str,
        query: &RowQuery,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<Value>, CoreError> {
        let input = row_query_to_soql(query, offset, page_size);
        let params = crate::soql::build_soql(&input, &self.allowed_fields)?;
        let url = append_query_string(&self.resource_url(id_or_url), &params);
        let body = self.transport.get_json(&url).await?;
        body.as_array()
            .cloned()
            .ok_or_else(|| CoreError::Schema("v2 row response was not a JSON array".to_string()))
    }

    /// Attempt a v3 query; `Ok(None)` signals "v3 unavailable, fall back to
    /// v2" per the `{401,403,404,501}` predicate (§4.C.4).
    async fn try_v3_query(
        &self,
        id_or_url: &str,
        query: &RowQuery,
        extra: Option<&Value>,
        page_number: u32,
        page_size: u32,
    ) -> Result<Option<Vec<Value>>, CoreError> {
        let credentials = self.auth.resolve(&self.host, id_or_url);
        let auth_header = credentials.map(V3KeyPair::basic_auth_header);

        let mut body = json!({
            "query": row_query_to_v3_query(query),
            "page": {"pageNumber": page_number, "pageSize": page_size},
            "includeSynthetic": false,
        });
        if let Some(extra_value) = extra {
            if let (Some(target), Some(source)) = (body.as_object_mut(), extra_value.as_object()) {
                for (k, v) in source {
                    target.insert(k.clone(), v.clone());
                }
            }
        }

        match self
            .transport
            .post_json(&self.v3_url(id_or_url), &body, auth_header.as_deref(), self.auth.app_token())
            .await
        {
            Ok(value) => {
                let rows = value
                    .as_array()
                    .cloned()
                    .ok_or_else(|| CoreError::Schema("v3 query response was not a JSON array".to_string()))?;
                Ok(Some(rows))
            }
            Err(err) if err.is_v3_unavailable() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn row_query_to_soql(query: &RowQuery, offset: u32, limit: u32) -> SoqlInput {
    SoqlInput {
        select: query.select.clone(),
        where_predicates: Vec::new(),
        order: query.order_by.clone(),
        group: None,
        limit: Some(i64::from(limit)),
        offset: Some(i64::from(offset)),
        extra: query
            .where_native
            .as_ref()
            .map(|w| {
                let mut map = std::collections::BTreeMap::new();
                map.insert("$where".to_string(), w.clone());
                map
            })
            .unwrap_or_default(),
    }
}

fn row_query_to_v3_query(query: &RowQuery) -> Value {
    let mut parts = Vec::new();
    if let Some(select) = &query.select {
        parts.push(format!("SELECT {}", select.join(", ")));
    }
    if let Some(where_native) = &query.where_native {
        parts.push(format!("WHERE {where_native}"));
    }
    if let Some(order) = &query.order_by {
        parts.push(format!("ORDER BY {}", order.join(", ")));
    }
    Value::String(parts.join(" "))
}

#[async_trait::async_trait]
impl<F: Fetch> RowFetcher for SocrataRowFetcher<F> {
    async fn fetch_rows<'a>(
        &'a self,
        id_or_url: &str,
        query: RowQuery,
        extra: Option<Value>,
    ) -> Result<ItemStream<'a, Value>, CoreError> {
        let id = id_or_url.to_string();
        let page_size = self.v2_page_size;
        let max_rows = query.limit.map(u64::from);

        // Always attempt v3 first, credentials or not (§4.C.4): an
        // unconfigured host still gets an anonymous v3 POST, possibly
        // carrying an app token. Only a documented v3-unavailable response
        // (or no app token and a resolver miss that still 401s/404s) falls
        // back to v2.
        if let Some(first_page) = self.try_v3_query(&id, &query, extra.as_ref(), 1, page_size).await? {
            struct V3State {
                pending: VecDeque<Value>,
                page_number: u32,
                exhausted: bool,
            }

            let fetched = u32::try_from(first_page.len()).unwrap_or(u32::MAX);
            let state = V3State {
                pending: first_page.into(),
                page_number: 1,
                exhausted: fetched < page_size,
            };

            let stream = futures::stream::unfold(
                (state, id, query, extra),
                move |(mut state, id, query, extra)| async move {
                    loop {
                        if let Some(row) = state.pending.pop_front() {
                            return Some((Ok(row), (state, id, query, extra)));
                        }
                        if state.exhausted {
                            return None;
                        }
                        let next_page = state.page_number + 1;
                        match self
                            .try_v3_query(&id, &query, extra.as_ref(), next_page, page_size)
                            .await
                        {
                            Ok(Some(rows)) => {
                                let fetched = u32::try_from(rows.len()).unwrap_or(u32::MAX);
                                state.exhausted = fetched < page_size;
                                state.page_number = next_page;
                                state.pending.extend(rows);
                                if state.pending.is_empty() && state.exhausted {
                                    return None;
                                }
                            }
                            Ok(None) => return None,
                            Err(err) => return Some((Err(err), (state, id, query, extra))),
                        }
                    }
                },
            );

            return Ok(Box::pin(stream));
        }

        let state = V2State {
            pending: VecDeque::new(),
            offset: query.offset.unwrap_or(0),
            page_size,
            emitted: 0,
            max_rows,
            exhausted: false,
        };

        let stream = futures::stream::unfold((state, query), move |(mut state, query)| async move {
            loop {
                if let Some(max) = state.max_rows {
                    if state.emitted >= max {
                        return None;
                    }
                }
                if let Some(row) = state.pending.pop_front() {
                    state.emitted += 1;
                    return Some((Ok(row), (state, query)));
                }
                if state.exhausted {
                    return None;
                }
                match self.fetch_v2_page(&id, &query, state.offset, state.page_size).await {
                    Ok(rows) => {
                        let fetched = u32::try_from(rows.len()).unwrap_or(u32::MAX);
                        state.exhausted = fetched < state.page_size;
                        state.offset += fetched;
                        state.pending.extend(rows);
                        if state.pending.is_empty() && state.exhausted {
                            return None;
                        }
                    }
                    Err(err) => return Some((Err(err), (state, query))),
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_http::{HttpRequest, HttpResponse, RetryConfig, RetryingFetcher, TransportError};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    /// v3 (`POST`) always answers "unavailable" here, so a fetcher built
    /// over this fake necessarily falls through to v2 pagination.
    struct V2PagedFetch {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl catalog_http::Fetch for V2PagedFetch {
        async fn fetch(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
            if req.method == http::Method::POST {
                return Ok(HttpResponse {
                    status: http::StatusCode::NOT_FOUND,
                    headers: http::HeaderMap::new(),
                    body: Vec::new(),
                });
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let rows: Vec<Value> = if call == 0 {
                (0..2).map(|i| json!({"id": i})).collect()
            } else {
                vec![]
            };
            Ok(HttpResponse {
                status: http::StatusCode::OK,
                headers: http::HeaderMap::new(),
                body: serde_json::to_vec(&rows).unwrap(),
            })
        }
    }

    fn transport() -> SocrataTransport<V2PagedFetch> {
        let fetcher = RetryingFetcher::new(
            V2PagedFetch { calls: AtomicUsize::new(0) },
            RetryConfig::deterministic(3),
        );
        SocrataTransport::new(catalog_core::Region::Us, fetcher, CancellationToken::new())
    }

    #[tokio::test]
    async fn v2_pagination_stops_on_short_page() {
        let transport = transport();
        let fetcher = SocrataRowFetcher::new(
            "data.city1.gov",
            transport,
            V3AuthResolver::new(),
            AllowedFields::new(["id"]),
        )
        .with_v2_page_size(2);

        let stream = fetcher
            .fetch_rows("abcd-1234", RowQuery::default(), None)
            .await
            .unwrap();
        let rows: Vec<Value> = stream.map(Result::unwrap).collect().await;

        assert_eq!(rows.len(), 2);
    }

    struct V3OnlyFetch;

    #[async_trait::async_trait]
    impl catalog_http::Fetch for V3OnlyFetch {
        async fn fetch(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
            assert!(!req.headers.contains_key("Authorization"), "no credentials were configured");
            let rows: Vec<Value> = vec![json!({"id": 1})];
            Ok(HttpResponse {
                status: http::StatusCode::OK,
                headers: http::HeaderMap::new(),
                body: serde_json::to_vec(&rows).unwrap(),
            })
        }
    }

    #[tokio::test]
    async fn v3_is_attempted_even_with_no_credentials_or_app_token() {
        let fetcher_inner = RetryingFetcher::new(V3OnlyFetch, RetryConfig::deterministic(3));
        let transport = SocrataTransport::new(catalog_core::Region::Us, fetcher_inner, CancellationToken::new());
        let fetcher = SocrataRowFetcher::new(
            "data.city1.gov",
            transport,
            V3AuthResolver::new(),
            AllowedFields::new(["id"]),
        );

        let stream = fetcher
            .fetch_rows("abcd-1234", RowQuery::default(), None)
            .await
            .unwrap();
        let rows: Vec<Value> = stream.map(Result::unwrap).collect().await;

        assert_eq!(rows.len(), 1);
    }
}
