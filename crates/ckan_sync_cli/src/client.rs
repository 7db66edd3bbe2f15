//! Blocking HTTP client for the action API.

use ckan_sync_engine::HttpClient;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client. Without a timeout, calls wait indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post(&self, url: &str, api_key: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| e.to_string())?;

        // Failed actions answer 4xx/5xx with a JSON envelope.
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| e.to_string())
    }
}
