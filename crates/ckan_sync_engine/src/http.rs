//! HTTP transport implementation.
//!
//! This module provides the JSON-over-HTTP client for the catalog API.
//! The actual HTTP library is abstracted via a trait to allow different
//! implementations (reqwest, ureq, an in-memory fake, etc.).

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::CatalogTransport;
use ckan_sync_protocol::{Action, RawResponse};
use parking_lot::RwLock;
use serde_json::Value;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and the `Authorization` header
    /// set to `api_key`, and returns the response body.
    fn post(&self, url: &str, api_key: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// Client for the catalog's action API.
///
/// Every call is a POST of a JSON object to `{endpoint}action/{action}`
/// carrying the static API key.
pub struct ApiClient<C: HttpClient> {
    endpoint: String,
    api_key: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> ApiClient<C> {
    /// Creates a new API client.
    pub fn new(config: &SyncConfig, client: C) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the API endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}

impl<C: HttpClient> CatalogTransport for ApiClient<C> {
    fn do_request(&self, action: &Action, payload: &Value) -> SyncResult<RawResponse> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| SyncError::Codec(format!("Failed to encode request: {}", e)))?;

        let url = action.url(&self.endpoint);
        let response = self.client.post(&url, &self.api_key, body).map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            SyncError::transport(e)
        })?;

        *self.last_error.write() = None;
        Ok(RawResponse::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckan_sync_protocol::{ResourceAction, ResourceType, SEND_FAILURE_MESSAGE};
    use serde_json::json;

    #[derive(Default)]
    struct TestClient {
        response: RwLock<Option<Vec<u8>>>,
        seen: RwLock<Vec<(String, String, Vec<u8>)>>,
    }

    impl TestClient {
        fn set_response(&self, resp: &[u8]) {
            *self.response.write() = Some(resp.to_vec());
        }
    }

    impl HttpClient for TestClient {
        fn post(&self, url: &str, api_key: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
            self.seen
                .write()
                .push((url.to_string(), api_key.to_string(), body));
            self.response
                .read()
                .clone()
                .ok_or_else(|| "connection refused".into())
        }
    }

    fn create() -> Action {
        Action::Resource(ResourceType::Package, ResourceAction::Create)
    }

    #[test]
    fn posts_json_to_action_url_with_key() {
        let client = TestClient::default();
        client.set_response(br#"{"success": true, "result": {"id": "p1"}}"#);
        let api = ApiClient::new(&SyncConfig::new("https://ckan.example.org/api/3", "k3y"), client);

        let outcome = api.call(&create(), &json!({"title": "T"}));
        assert!(outcome.is_success());
        assert_eq!(outcome.result["id"], "p1");

        let seen = api.client().seen.read();
        assert_eq!(seen[0].0, "https://ckan.example.org/api/3/action/package_create");
        assert_eq!(seen[0].1, "k3y");
        let body: Value = serde_json::from_slice(&seen[0].2).unwrap();
        assert_eq!(body, json!({"title": "T"}));
    }

    #[test]
    fn transport_error_is_recorded() {
        let api = ApiClient::new(&SyncConfig::new("http://ckan/", "k"), TestClient::default());

        let result = api.do_request(&create(), &json!({}));
        assert!(matches!(result, Err(SyncError::Transport { .. })));
        assert_eq!(api.last_error().as_deref(), Some("connection refused"));

        let outcome = api.call(&create(), &json!({}));
        assert_eq!(outcome.errors, vec![SEND_FAILURE_MESSAGE]);
    }

    #[test]
    fn error_cleared_after_success() {
        let api = ApiClient::new(&SyncConfig::new("http://ckan/", "k"), TestClient::default());
        let _ = api.do_request(&create(), &json!({}));
        api.client().set_response(br#"{"success": true, "result": null}"#);
        api.do_request(&create(), &json!({})).unwrap();
        assert_eq!(api.last_error(), None);
    }
}
