//! HTTP retry/backoff decorator (§4.D) over an injected, `fetch`-shaped
//! transport (§1, §6). This crate owns no connection pool — it wraps
//! whatever `Fetch` implementation the caller provides (a real client, a
//! cassette replay, or a test fake) with classified retries, exponential
//! backoff with jitter, `Retry-After` honoring, and cancellation.

pub mod config;
pub mod retry;
pub mod transport;

pub use config::RetryConfig;
pub use retry::{calculate_backoff, classify, parse_retry_after, Classification, RetryingFetcher};
pub use transport::{Fetch, HttpRequest, HttpResponse, TransportError};
