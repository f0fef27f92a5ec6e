//! Shared request plumbing for the Socrata driver: discovery base-URL
//! resolution and JSON GET/POST helpers layered over the retrying fetcher
//! (§4.C, §6). Request headers always carry `Accept: application/json`;
//! `Authorization`/`X-App-Token` are attached per-call and never logged
//! (§7 invariant 7) — this module builds the header value and hands it
//! straight to the transport, it never formats it into a log record.

use catalog_adapter::region::discovery_base_url;
use catalog_core::{CoreError, Region};
use catalog_http::{Fetch, HttpRequest, HttpResponse, RetryingFetcher};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Cheaply cloneable: every driver sub-component (discovery, rows,
/// metadata, catalog listing) owns one of these rather than borrowing a
/// shared reference, mirroring `SeaOrmLinkRepository`'s owned-connection
/// style in `modules/oagw/oagw-gw/src/infra/storage/link_repo.rs`.
pub struct SocrataTransport<F: Fetch> {
    region: Region,
    fetcher: Arc<RetryingFetcher<F>>,
    cancel: CancellationToken,
}

impl<F: Fetch> Clone for SocrataTransport<F> {
    fn clone(&self) -> Self {
        Self {
            region: self.region,
            fetcher: Arc::clone(&self.fetcher),
            cancel: self.cancel.clone(),
        }
    }
}

impl<F: Fetch> SocrataTransport<F> {
    #[must_use]
    pub fn new(region: Region, fetcher: RetryingFetcher<F>, cancel: CancellationToken) -> Self {
        Self {
            region,
            fetcher: Arc::new(fetcher),
            cancel,
        }
    }

    #[must_use]
    pub fn discovery_base_url(&self) -> Url {
        discovery_base_url(self.region)
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, CoreError> {
        let request = HttpRequest::get(url).with_header("Accept", "application/json");
        let response = self.fetcher.fetch_with_retry(request, &self.cancel).await?;
        parse_json_body(&response)
    }

    /// POST a JSON body, optionally carrying Basic auth and an app token
    /// (§4.C.4 auth precedence; §6 request headers).
    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
        auth_header: Option<&str>,
        app_token: Option<&str>,
    ) -> Result<Value, CoreError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| CoreError::Schema(format!("failed to encode request body: {e}")))?;
        let mut request = HttpRequest::post(url, payload)
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/json");
        if let Some(auth) = auth_header {
            request = request.with_header("Authorization", auth);
        }
        if let Some(token) = app_token {
            request = request.with_header("X-App-Token", token);
        }
        let response = self.fetcher.fetch_with_retry(request, &self.cancel).await?;
        parse_json_body(&response)
    }
}

fn parse_json_body(response: &HttpResponse) -> Result<Value, CoreError> {
    serde_json::from_slice(&response.body)
        .map_err(|e| CoreError::Schema(format!("malformed JSON body: {e}")))
}
