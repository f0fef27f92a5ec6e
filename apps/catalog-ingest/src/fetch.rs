//! A real `Fetch` implementation over `reqwest`, the only concrete HTTP
//! client this workspace constructs — `catalog-http` itself stays
//! transport-agnostic (§1, §6).

use async_trait::async_trait;
use catalog_http::{Fetch, HttpRequest, HttpResponse, TransportError};
use std::time::Duration;

#[derive(Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TransportError::network(e.to_string()))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| TransportError::network(e.to_string()))?.to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}
