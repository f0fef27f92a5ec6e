//! v3 authorization precedence and credential handling (§4.C.4, §6, §7
//! invariant 7).
//!
//! Credentials are wrapped in `secrecy::SecretString` so their `Debug`
//! impl is redacted and accidental `{:?}`/logging of a resolved key pair
//! cannot leak the secret, mirroring `modkit-auth`'s `SecretString` usage
//! for OAuth2 client secrets in `libs/modkit-auth/src/oauth2/source.rs`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// A key id/secret pair used for HTTP Basic auth against the v3 query API.
#[derive(Clone)]
pub struct V3KeyPair {
    pub key_id: String,
    pub key_secret: SecretString,
}

impl V3KeyPair {
    #[must_use]
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: SecretString::from(key_secret.into()),
        }
    }

    /// Render the `Authorization: Basic ...` header value. Never logged by
    /// callers of this function — the header value itself is returned, not
    /// printed.
    #[must_use]
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.key_id, self.key_secret.expose_secret());
        format!("Basic {}", BASE64.encode(raw))
    }
}

impl std::fmt::Debug for V3KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V3KeyPair")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[redacted]")
            .finish()
    }
}

/// Normalizes a dataset identifier the way the dataset-scoped credential
/// key is named: lowercase, dashes removed (§6).
#[must_use]
pub fn normalize_dataset_id(id: &str) -> String {
    id.to_ascii_lowercase().replace('-', "")
}

/// Resolves v3 Basic-auth credentials with precedence dataset → host →
/// global (§4.C.4, §6), plus an optional app token sent regardless of Basic
/// auth presence.
#[derive(Clone, Default)]
pub struct V3AuthResolver {
    dataset_keys: HashMap<(String, String), V3KeyPair>,
    host_keys: HashMap<String, V3KeyPair>,
    global_key: Option<V3KeyPair>,
    app_token: Option<SecretString>,
}

impl V3AuthResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_global(mut self, pair: V3KeyPair) -> Self {
        self.global_key = Some(pair);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>, pair: V3KeyPair) -> Self {
        self.host_keys.insert(host.into(), pair);
        self
    }

    #[must_use]
    pub fn with_dataset(mut self, host: impl Into<String>, dataset_id: &str, pair: V3KeyPair) -> Self {
        self.dataset_keys
            .insert((host.into(), normalize_dataset_id(dataset_id)), pair);
        self
    }

    #[must_use]
    pub fn with_app_token(mut self, token: impl Into<String>) -> Self {
        self.app_token = Some(SecretString::from(token.into()));
        self
    }

    /// Resolve the credential pair for `(host, dataset_id)` following
    /// dataset → host → global precedence (§4.C.4). `None` means the
    /// request is sent anonymously (possibly still app-token'd).
    #[must_use]
    pub fn resolve(&self, host: &str, dataset_id: &str) -> Option<&V3KeyPair> {
        let key = (host.to_string(), normalize_dataset_id(dataset_id));
        self.dataset_keys
            .get(&key)
            .or_else(|| self.host_keys.get(host))
            .or(self.global_key.as_ref())
    }

    #[must_use]
    pub fn app_token(&self) -> Option<&str> {
        self.app_token.as_ref().map(ExposeSecret::expose_secret)
    }
}
