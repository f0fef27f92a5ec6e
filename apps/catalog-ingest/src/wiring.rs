//! Builds one `SocrataDriver` per region, each holding its own retrying
//! fetcher over a shared `reqwest` client (§4.C).

use crate::fetch::ReqwestFetch;
use catalog_adapter::DiscoveryDriver;
use catalog_core::Region;
use catalog_http::{RetryConfig, RetryingFetcher};
use catalog_socrata::{SocrataDriver, SocrataTransport, V3AuthResolver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[must_use]
pub fn build_discovery_driver(region: Region, app_token: Option<&str>, page_size: u32) -> Arc<dyn DiscoveryDriver> {
    let client = ReqwestFetch::new().expect("failed to build the HTTP client");
    let fetcher = RetryingFetcher::new(client, RetryConfig::default());
    let transport = SocrataTransport::new(region, fetcher, CancellationToken::new());

    let mut auth = V3AuthResolver::new();
    if let Some(token) = app_token {
        auth = auth.with_app_token(token);
    }

    let host = catalog_adapter::region::discovery_base_url(region).host_str().unwrap_or("api.us.socrata.com").to_string();
    Arc::new(SocrataDriver::with_page_sizes(
        host,
        region,
        transport,
        auth,
        catalog_socrata::AllowedFields::new(Vec::<String>::new()),
        page_size,
        1000,
    ))
}
