//! Region resolver (§4.A): maps a host to a region via per-host override,
//! global default, or `US` fallback, and decides failover eligibility.
//!
//! Grounded on the `RwLock<HashMap<..>>`-backed cache style of
//! `modules/nodes_registry/src/domain/node_storage.rs::NodeStorage` — the
//! memoization table is process-wide and entries never invalidate, since
//! host-to-region is stable (§5 "Shared resources").

use catalog_core::Region;
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

/// Discovery base URL for a region (§4.A).
#[must_use]
pub fn discovery_base_url(region: Region) -> Url {
    let raw = match region {
        Region::Us => "https://api.us.socrata.com",
        Region::Eu => "https://api.eu.socrata.com",
    };
    // Constructed from a fixed, known-valid literal: infallible in practice.
    Url::parse(raw).unwrap_or_else(|_| Url::parse("https://api.us.socrata.com").unwrap())
}

/// `true` if `status` (or a network error) warrants crossing over to the
/// other region (§4.A). Never true for `401/403/404` — those are
/// authorization/not-found outcomes, not availability outcomes.
#[must_use]
pub fn should_failover(status: Option<u16>, is_network_error: bool) -> bool {
    if is_network_error {
        return true;
    }
    match status {
        Some(code) if (500..600).contains(&code) => true,
        _ => false,
    }
}

/// Resolves a host to a region using a per-host override table, then a
/// global default, then `US`. Resolution is memoized per host; invalid
/// override values are silently ignored.
pub struct RegionResolver {
    global_default: Region,
    overrides: HashMap<String, Region>,
    cache: RwLock<HashMap<String, Region>>,
}

impl RegionResolver {
    /// `overrides` models the per-host `SOCRATA__<host>__REGION` config keys
    /// (§4.A); env/config loading itself is out of scope here — the caller
    /// resolves those keys into this map before constructing the resolver.
    #[must_use]
    pub fn new(global_default: Option<Region>, overrides: HashMap<String, Region>) -> Self {
        Self {
            global_default: global_default.unwrap_or(Region::Us),
            overrides,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `host` to a region, consulting the override table, then the
    /// global default, then falling back to `US`. Memoizes the result.
    pub fn resolve_region(&self, host: &str) -> Region {
        if let Some(cached) = self.cache.read().ok().and_then(|c| c.get(host).copied()) {
            return cached;
        }

        let resolved = self
            .overrides
            .get(host)
            .copied()
            .unwrap_or(self.global_default);

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(host.to_string(), resolved);
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_global_default_then_us() {
        let resolver = RegionResolver::new(None, HashMap::new());
        assert_eq!(resolver.resolve_region("data.example.gov"), Region::Us);

        let resolver = RegionResolver::new(Some(Region::Eu), HashMap::new());
        assert_eq!(resolver.resolve_region("data.example.gov"), Region::Eu);
    }

    #[test]
    fn per_host_override_takes_precedence() {
        let mut overrides = HashMap::new();
        overrides.insert("data.eu-city.gov".to_string(), Region::Eu);
        let resolver = RegionResolver::new(Some(Region::Us), overrides);

        assert_eq!(resolver.resolve_region("data.eu-city.gov"), Region::Eu);
        assert_eq!(resolver.resolve_region("data.other.gov"), Region::Us);
    }

    #[test]
    fn resolution_is_memoized() {
        let resolver = RegionResolver::new(Some(Region::Us), HashMap::new());
        assert_eq!(resolver.resolve_region("data.example.gov"), Region::Us);
        // Second call hits the cache path; behavior must remain identical.
        assert_eq!(resolver.resolve_region("data.example.gov"), Region::Us);
    }

    #[test]
    fn should_failover_on_network_error_and_5xx_only() {
        assert!(should_failover(None, true));
        assert!(should_failover(Some(500), false));
        assert!(should_failover(Some(503), false));
        assert!(!should_failover(Some(401), false));
        assert!(!should_failover(Some(403), false));
        assert!(!should_failover(Some(404), false));
        assert!(!should_failover(Some(200), false));
    }
}
