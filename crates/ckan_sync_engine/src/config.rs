//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Environment variable holding the API endpoint.
pub const ENDPOINT_VAR: &str = "CKAN_API_ENDPOINT";
/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "CKAN_API_KEY";

/// Configuration for catalog access.
#[derive(Clone)]
pub struct SyncConfig {
    /// API endpoint, always ending with `/` (e.g. `https://ckan.example.org/api/3/`).
    pub endpoint: String,
    /// Static API key sent as the `Authorization` header.
    pub api_key: String,
    /// Request timeout. `None` waits for the catalog indefinitely.
    pub request_timeout: Option<Duration>,
    /// How long the harvest source list is cached.
    pub harvest_source_ttl: Duration,
}

impl SyncConfig {
    /// Creates a new configuration.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint.into()),
            api_key: api_key.into(),
            request_timeout: None,
            harvest_source_ttl: Duration::from_secs(60 * 60),
        }
    }

    /// Reads the configuration from `CKAN_API_ENDPOINT` and `CKAN_API_KEY`.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SyncResult<Self> {
        let endpoint = lookup(ENDPOINT_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SyncError::Configuration(format!("{ENDPOINT_VAR} is not set")))?;
        let api_key = lookup(API_KEY_VAR)
            .ok_or_else(|| SyncError::Configuration(format!("{API_KEY_VAR} is not set")))?;
        Ok(Self::new(endpoint.trim(), api_key))
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets how long the harvest source list is cached.
    pub fn with_harvest_source_ttl(mut self, ttl: Duration) -> Self {
        self.harvest_source_ttl = ttl;
        self
    }
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("harvest_source_ttl", &self.harvest_source_ttl)
            .finish()
    }
}

fn normalize_endpoint(mut endpoint: String) -> String {
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SyncConfig::new("https://ckan.example.org/api/3", "secret")
            .with_timeout(Duration::from_secs(10))
            .with_harvest_source_ttl(Duration::from_secs(5));

        assert_eq!(config.endpoint, "https://ckan.example.org/api/3/");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.harvest_source_ttl, Duration::from_secs(5));
    }

    #[test]
    fn no_timeout_by_default() {
        let config = SyncConfig::new("http://localhost/api/3/", "k");
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.endpoint, "http://localhost/api/3/");
    }

    #[test]
    fn from_lookup_requires_endpoint() {
        let err = SyncConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains(ENDPOINT_VAR));

        let err = SyncConfig::from_lookup(|name| {
            (name == ENDPOINT_VAR).then(|| "http://ckan/api/3".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn from_lookup_reads_both() {
        let config = SyncConfig::from_lookup(|name| match name {
            ENDPOINT_VAR => Some(" http://ckan/api/3 ".into()),
            API_KEY_VAR => Some("key".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.endpoint, "http://ckan/api/3/");
        assert_eq!(config.api_key, "key");
    }

    #[test]
    fn debug_hides_key() {
        let config = SyncConfig::new("http://ckan/", "top-secret");
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
