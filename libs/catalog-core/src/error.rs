//! Error taxonomy (§7). Kinds, not type names: every failure in the pipeline
//! is classified into one of these variants so callers can decide whether to
//! retry, fail fast, or preserve the resume token.

use thiserror::Error;

/// Unified error type shared by every crate in the workspace.
///
/// Grounded on `modules/nodes_registry/src/domain/error.rs`'s pattern of one
/// `thiserror` enum per concern plus an `anyhow` escape hatch for
/// infrastructure failures that don't deserve their own variant.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid inputs, malformed resume tokens, disallowed SoQL identifiers,
    /// non-finite numeric values. Fails fast; never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// `5xx`, `429`, and network failures. Retried with backoff (§4.D);
    /// becomes `RetryExhausted` when attempts are exhausted.
    #[error("transient HTTP error ({status:?}) for {url}: {message}")]
    TransientHttp {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// `4xx` other than `429`. Never retried. `v3_unavailable` additionally
    /// flags `{401,403,404,501}` responses to the v3 API so the caller can
    /// fall back to v2 (§4.C.4).
    #[error("fatal HTTP error ({status}) for {url}: {message}")]
    FatalHttp {
        url: String,
        status: u16,
        message: String,
        v3_unavailable: bool,
    },

    /// Authorization failures. Always surfaced as `FatalHttp`-shaped data,
    /// but tagged distinctly so logging code can double-check redaction.
    #[error("authorization error for {url}")]
    Auth { url: String },

    /// Retries against one endpoint were exhausted.
    #[error("retry exhausted after {attempts} attempt(s) for {url}")]
    RetryExhausted { url: String, attempts: u32 },

    /// Database transaction failures. The batch rolls back; the resume
    /// token is preserved at its prior value. Not retried automatically.
    #[error("persistence error: {0}")]
    Persistence(#[source] anyhow::Error),

    /// Caller-initiated cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// Input did not conform to the declared portal JSON shape. Classified
    /// FATAL at the pipeline's iteration-retry boundary (§4.F step 5).
    #[error("schema error: {0}")]
    Schema(String),

    /// Pipeline-boundary wrapper for caller-facing misuse (§4.F step 1,
    /// §7 propagation policy). Not a parallel taxonomy — just a tag plus
    /// the original cause.
    #[error("CONFIG: {0}")]
    PipelineConfig(#[source] Box<CoreError>),

    /// Pipeline-boundary wrapper for operational failures (§4.F steps 4-5).
    #[error("RUNTIME: {0}")]
    PipelineRuntime(#[source] Box<CoreError>),
}

impl CoreError {
    /// Classification used by the pipeline's iteration-level retry policy
    /// (§4.F step 5): `TypeError`/schema-shape errors are FATAL, HTTP/network
    /// failures are TRANSIENT.
    #[must_use]
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Schema(_) | Self::Config(_) | Self::FatalHttp { .. } | Self::Auth { .. } => {
                RetryClass::Fatal
            }
            Self::TransientHttp { .. } | Self::RetryExhausted { .. } | Self::Cancelled => {
                RetryClass::Transient
            }
            Self::Persistence(_) => RetryClass::Fatal,
            Self::PipelineConfig(inner) | Self::PipelineRuntime(inner) => inner.retry_class(),
        }
    }

    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    #[must_use]
    pub fn as_pipeline_config(self) -> Self {
        Self::PipelineConfig(Box::new(self))
    }

    #[must_use]
    pub fn as_pipeline_runtime(self) -> Self {
        Self::PipelineRuntime(Box::new(self))
    }

    /// `true` when this error was classified from a v3 status code the
    /// caller may fall back to v2 for (§4.C.4).
    #[must_use]
    pub fn is_v3_unavailable(&self) -> bool {
        matches!(self, Self::FatalHttp { v3_unavailable: true, .. })
    }
}

/// Classification used by §4.F step 5 / §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Fatal,
    Transient,
}

pub type CoreResult<T> = Result<T, CoreError>;
