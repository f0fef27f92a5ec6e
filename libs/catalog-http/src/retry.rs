//! Exponential backoff with jitter, `Retry-After` honoring, classified
//! retries, and abort propagation (§4.D).
//!
//! Grounded on `libs/modkit-http/src/layers/retry.rs`'s `calculate_backoff`
//! and `src/response.rs`'s `parse_retry_after`, reshaped from a `tower`
//! `Service` layer into a plain async decorator over the injected `Fetch`
//! trait, since this crate owns no connection pool of its own.

use crate::config::RetryConfig;
use crate::transport::{Fetch, HttpRequest, HttpResponse, TransportError};
use catalog_core::CoreError;
use http::StatusCode;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cap applied to a parsed `Retry-After` value (§4.D).
const RETRY_AFTER_CAP: Duration = Duration::from_secs(30);

/// `delay = base * 2^attempt + jitter`, `jitter = uniform(0, base)`,
/// capped to `max_delay`. `attempt` is 0-indexed (the first retry uses
/// `attempt = 0`). Jitter is disabled for deterministic tests via
/// `config.enable_jitter = false`.
#[must_use]
pub fn calculate_backoff(config: RetryConfig, attempt: u32) -> Duration {
    let base_ms = config.base_delay_ms;
    let exp = 2u64.saturating_pow(attempt);
    let backoff_ms = base_ms.saturating_mul(exp);

    let jittered_ms = if config.enable_jitter && base_ms > 0 {
        let jitter = rand::thread_rng().gen_range(0..=base_ms);
        backoff_ms.saturating_add(jitter)
    } else {
        backoff_ms
    };

    Duration::from_millis(jittered_ms.min(config.max_delay_ms))
}

/// Parse the `Retry-After` header as seconds or an HTTP-date, capped to
/// `RETRY_AFTER_CAP` (§4.D). Returns `None` if absent or unparseable.
#[must_use]
pub fn parse_retry_after(headers: &http::HeaderMap) -> Option<Duration> {
    let raw = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    let trimmed = raw.trim();

    let parsed = if let Ok(seconds) = trimmed.parse::<i64>() {
        (seconds >= 0).then(|| Duration::from_secs(u64::try_from(seconds).unwrap_or(0)))
    } else {
        httpdate::parse_http_date(trimmed)
            .ok()
            .and_then(|when| when.duration_since(std::time::SystemTime::now()).ok())
    };

    parsed.map(|d| d.min(RETRY_AFTER_CAP))
}

/// Classification of an HTTP response or transport failure (§4.D, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// `429` or `5xx` — retry with backoff (honoring `Retry-After` for 429).
    Transient,
    /// `4xx` other than `429` — fatal, never retried.
    Fatal,
}

#[must_use]
pub fn classify(status: StatusCode) -> Classification {
    if status.is_success() || status.is_redirection() {
        Classification::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Classification::Transient
    } else {
        Classification::Fatal
    }
}

/// Decorates any `Fetch` with the retry/backoff algorithm of §4.D.
pub struct RetryingFetcher<F> {
    inner: F,
    config: RetryConfig,
}

impl<F: Fetch> RetryingFetcher<F> {
    #[must_use]
    pub fn new(inner: F, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Execute `request`, retrying per §4.D, until success, a fatal error,
    /// cancellation, or attempt exhaustion.
    ///
    /// # Errors
    /// Returns `CoreError::FatalHttp` on a non-429 `4xx`, `CoreError::Cancelled`
    /// if `cancel` fires, and `CoreError::RetryExhausted` once `max_attempts`
    /// is spent on transient failures.
    pub async fn fetch_with_retry(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, CoreError> {
        let url = request.url.clone();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let outcome = tokio::select! {
                () = cancel.cancelled() => return Err(CoreError::Cancelled),
                result = self.inner.fetch(request.clone()) => result,
            };

            match outcome {
                Ok(response) => match classify(response.status) {
                    Classification::Success => return Ok(response),
                    Classification::Fatal => {
                        let status = response.status.as_u16();
                        return Err(CoreError::FatalHttp {
                            url,
                            status,
                            message: format!("HTTP {status}"),
                            v3_unavailable: matches!(status, 401 | 403 | 404 | 501),
                        });
                    }
                    Classification::Transient => {
                        if attempt + 1 >= self.config.max_attempts {
                            return Err(CoreError::RetryExhausted {
                                url,
                                attempts: attempt + 1,
                            });
                        }
                        let delay = if response.status == StatusCode::TOO_MANY_REQUESTS {
                            parse_retry_after(&response.headers)
                                .unwrap_or_else(|| calculate_backoff(self.config, attempt))
                        } else {
                            calculate_backoff(self.config, attempt)
                        };
                        tracing::debug!(
                            attempt = attempt + 1,
                            max_attempts = self.config.max_attempts,
                            status = response.status.as_u16(),
                            delay_ms = delay.as_millis(),
                            url = %url,
                            "retrying HTTP request"
                        );
                        Self::wait(delay, cancel).await?;
                        attempt += 1;
                    }
                },
                Err(TransportError { is_retryable_network_error: false, .. }) => {
                    return Err(CoreError::Cancelled);
                }
                Err(err) => {
                    if attempt + 1 >= self.config.max_attempts {
                        return Err(CoreError::RetryExhausted {
                            url,
                            attempts: attempt + 1,
                        });
                    }
                    let delay = calculate_backoff(self.config, attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        error = %err,
                        delay_ms = delay.as_millis(),
                        url = %url,
                        "retrying after network error"
                    );
                    Self::wait(delay, cancel).await?;
                    attempt += 1;
                }
            }
        }
    }

    async fn wait(delay: Duration, cancel: &CancellationToken) -> Result<(), CoreError> {
        tokio::select! {
            () = cancel.cancelled() => Err(CoreError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
