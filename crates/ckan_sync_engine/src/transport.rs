//! Transport layer abstraction for catalog calls.

use crate::error::{SyncError, SyncResult};
use ckan_sync_protocol::{validate, Action, ApiError, ApiResponse, RawResponse, SEND_FAILURE_MESSAGE};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Validated outcome of one catalog call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiOutcome {
    /// The `result` member (`null` on failure).
    pub result: Value,
    /// Error messages; empty on success.
    pub errors: Vec<String>,
}

impl ApiOutcome {
    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts into a result carrying the messages as an application error.
    pub fn into_result(self) -> SyncResult<Value> {
        if self.errors.is_empty() {
            Ok(self.result)
        } else {
            Err(SyncError::Application(self.errors))
        }
    }

    fn from_raw(raw: &RawResponse) -> Self {
        let errors = validate(raw);
        let result = if errors.is_empty() {
            ApiResponse::decode(raw)
                .map(|response| response.result)
                .unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        Self { result, errors }
    }
}

/// A catalog transport executes one JSON call against the catalog API.
///
/// This trait abstracts the network layer, allowing for the HTTP client
/// ([`crate::ApiClient`]) or a mock for testing.
pub trait CatalogTransport: Send + Sync {
    /// Issues one action and returns the raw response.
    ///
    /// Transport failures are returned as [`SyncError::Transport`].
    fn do_request(&self, action: &Action, payload: &Value) -> SyncResult<RawResponse>;

    /// Issues one action and validates the response.
    ///
    /// Never fails: transport failures become
    /// [`SEND_FAILURE_MESSAGE`] in the outcome.
    fn call(&self, action: &Action, payload: &Value) -> ApiOutcome {
        debug!(%action, "catalog request");
        let outcome = match self.do_request(action, payload) {
            Ok(raw) => ApiOutcome::from_raw(&raw),
            Err(err) => {
                warn!(%action, error = %err, "catalog request failed");
                ApiOutcome {
                    result: Value::Null,
                    errors: vec![SEND_FAILURE_MESSAGE.to_string()],
                }
            }
        };
        if !outcome.is_success() {
            warn!(%action, errors = ?outcome.errors, "catalog rejected request");
        }
        outcome
    }
}

impl<T: CatalogTransport + ?Sized> CatalogTransport for std::sync::Arc<T> {
    fn do_request(&self, action: &Action, payload: &Value) -> SyncResult<RawResponse> {
        (**self).do_request(action, payload)
    }
}

/// A scripted reply of the [`MockTransport`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A decoded envelope.
    Response(ApiResponse),
    /// Raw body bytes, e.g. an HTML error page.
    Raw(Vec<u8>),
    /// A network failure.
    TransportFailure(String),
}

impl MockReply {
    /// A successful reply with the given result.
    pub fn ok(result: Value) -> Self {
        MockReply::Response(ApiResponse::ok(result))
    }

    /// A failed reply with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        MockReply::Response(ApiResponse::failure(ApiError::message(message)))
    }
}

/// A mock transport for testing.
///
/// Replies are looked up by action name: queued replies first, then the
/// sticky reply set with [`MockTransport::set_reply`]. Every call is logged.
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<MockReply>>>,
    sticky: Mutex<HashMap<String, MockReply>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reply for every call to an action.
    pub fn set_reply(&self, action: &str, reply: MockReply) {
        self.sticky.lock().insert(action.to_string(), reply);
    }

    /// Queues a reply for the next call to an action.
    pub fn push_reply(&self, action: &str, reply: MockReply) {
        self.queued
            .lock()
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Returns all calls as `(action name, payload)` pairs.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Returns the action names called, in order.
    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Returns the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_reply(&self, name: &str) -> Option<MockReply> {
        if let Some(reply) = self
            .queued
            .lock()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
        {
            return Some(reply);
        }
        self.sticky.lock().get(name).cloned()
    }
}

impl CatalogTransport for MockTransport {
    fn do_request(&self, action: &Action, payload: &Value) -> SyncResult<RawResponse> {
        let name = action.name();
        self.calls.lock().push((name.clone(), payload.clone()));
        match self.next_reply(&name) {
            Some(MockReply::Response(response)) => Ok(RawResponse::new(response.to_bytes())),
            Some(MockReply::Raw(body)) => Ok(RawResponse::new(body)),
            Some(MockReply::TransportFailure(message)) => Err(SyncError::transport(message)),
            None => Err(SyncError::transport(format!("no mock reply set for {name}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckan_sync_protocol::{ResourceAction, ResourceType, UNKNOWN_ERROR_MESSAGE};
    use serde_json::json;

    fn show() -> Action {
        Action::Resource(ResourceType::Group, ResourceAction::Show)
    }

    #[test]
    fn mock_records_calls() {
        let transport = MockTransport::new();
        transport.set_reply("group_show", MockReply::ok(json!({"id": "g1"})));

        let outcome = transport.call(&show(), &json!({"id": "g1"}));
        assert!(outcome.is_success());
        assert_eq!(outcome.result, json!({"id": "g1"}));
        assert_eq!(transport.calls(), vec![("group_show".to_string(), json!({"id": "g1"}))]);
    }

    #[test]
    fn queued_reply_before_sticky() {
        let transport = MockTransport::new();
        transport.set_reply("group_show", MockReply::ok(json!(1)));
        transport.push_reply("group_show", MockReply::error("Not found"));

        assert_eq!(transport.call(&show(), &json!({})).errors, vec!["Not found"]);
        assert!(transport.call(&show(), &json!({})).is_success());
    }

    #[test]
    fn transport_failure_becomes_send_message() {
        let transport = MockTransport::new();
        transport.set_reply("group_show", MockReply::TransportFailure("refused".into()));

        let outcome = transport.call(&show(), &json!({}));
        assert_eq!(outcome.errors, vec![SEND_FAILURE_MESSAGE]);
        assert_eq!(outcome.result, Value::Null);
    }

    #[test]
    fn missing_reply_is_transport_failure() {
        let transport = MockTransport::new();
        assert!(matches!(
            transport.do_request(&show(), &json!({})),
            Err(SyncError::Transport { .. })
        ));
    }

    #[test]
    fn raw_html_is_undecodable() {
        let transport = MockTransport::new();
        transport.set_reply("group_show", MockReply::Raw(b"<h1>Bad Gateway</h1>".to_vec()));
        assert_eq!(transport.call(&show(), &json!({})).errors, vec![SEND_FAILURE_MESSAGE]);
    }

    #[test]
    fn outcome_into_result() {
        let transport = MockTransport::new();
        transport.set_reply(
            "group_show",
            MockReply::Response(ApiResponse::failure(ApiError::default())),
        );
        let err = transport.call(&show(), &json!({})).into_result().unwrap_err();
        assert_eq!(err.messages(), vec![UNKNOWN_ERROR_MESSAGE]);
    }
}
