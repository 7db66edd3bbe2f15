//! In-memory fake of the catalog's action API.
//!
//! [`FakeCatalog`] implements [`HttpClient`], so it plugs into a real
//! [`ApiClient`](ckan_sync_engine::ApiClient) and exercises the whole
//! request path: JSON encoding, URL building, the API key and response
//! validation. Clones share state, so a test can keep a handle for
//! assertions while the client owns another.

use ckan_sync_engine::HttpClient;
use ckan_sync_protocol::{ApiError, ApiResponse};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// API key accepted by a default fake.
pub const TEST_API_KEY: &str = "test-api-key";

/// Endpoint used with the fake.
pub const TEST_ENDPOINT: &str = "http://catalog.test/api/3/";

/// Message returned for unknown records.
pub const NOT_FOUND: &str = "Not found";

/// Message returned for a taken slug.
pub const NAME_IN_USE: &str = "That URL is already in use.";

/// Message returned for a wrong API key.
pub const ACCESS_DENIED: &str = "Access denied";

const RESOURCES: [&str; 3] = ["package", "organization", "group"];

/// A scripted failure for the next call of an action.
#[derive(Debug, Clone)]
pub enum Injected {
    /// Answer with `success: false` and this message.
    Error(String),
    /// Answer with this raw body.
    Raw(Vec<u8>),
    /// Fail at the transport level.
    Transport(String),
}

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<String, Vec<Map<String, Value>>>,
    sources: Vec<Value>,
    jobs: HashMap<String, Vec<Value>>,
    injected: HashMap<String, VecDeque<Injected>>,
    calls: Vec<(String, Value)>,
}

/// An in-memory catalog.
#[derive(Debug, Clone)]
pub struct FakeCatalog {
    api_key: String,
    state: Arc<Mutex<State>>,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCatalog {
    /// Creates an empty catalog accepting [`TEST_API_KEY`].
    pub fn new() -> Self {
        Self::with_api_key(TEST_API_KEY)
    }

    /// Creates an empty catalog accepting the given key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Seeds a record and returns its id. Missing `id`, `name` and
    /// `state` are filled in.
    pub fn insert(&self, resource: &str, record: Value) -> String {
        let mut record = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let id = complete_record(&mut record);
        self.state
            .lock()
            .records
            .entry(resource.to_string())
            .or_default()
            .push(record);
        id
    }

    /// Returns a record by id or name.
    pub fn record(&self, resource: &str, id_or_name: &str) -> Option<Value> {
        let state = self.state.lock();
        find(&state, resource, id_or_name).map(|idx| Value::Object(state.records[resource][idx].clone()))
    }

    /// Returns all records of a resource type in insertion order.
    pub fn records(&self, resource: &str) -> Vec<Value> {
        self.state
            .lock()
            .records
            .get(resource)
            .map(|records| records.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Registers an active harvest source.
    pub fn add_harvest_source(&self, id: &str, title: &str) {
        let mut state = self.state.lock();
        state.sources.push(json!({ "id": id, "title": title, "active": true }));
        state.jobs.entry(id.to_string()).or_default();
    }

    /// Returns the jobs of a source, newest first.
    pub fn harvest_jobs(&self, source_id: &str) -> Vec<Value> {
        self.state
            .lock()
            .jobs
            .get(source_id)
            .map(|jobs| jobs.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Sets the status of the newest job of a source.
    pub fn set_latest_job_status(&self, source_id: &str, status: &str) {
        if let Some(job) = self
            .state
            .lock()
            .jobs
            .get_mut(source_id)
            .and_then(|jobs| jobs.last_mut())
        {
            job["status"] = Value::String(status.to_string());
        }
    }

    /// Makes the next call of `action` fail with `success: false`.
    pub fn fail_next(&self, action: &str, message: &str) {
        self.inject(action, Injected::Error(message.to_string()));
    }

    /// Queues a scripted failure for the next call of `action`.
    pub fn inject(&self, action: &str, failure: Injected) {
        self.state
            .lock()
            .injected
            .entry(action.to_string())
            .or_default()
            .push_back(failure);
    }

    /// Returns all calls as `(action, payload)`.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().calls.clone()
    }

    /// Returns the action names of all calls.
    pub fn call_names(&self) -> Vec<String> {
        self.state.lock().calls.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Returns how often an action was called.
    pub fn count(&self, action: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(name, _)| name == action)
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn dispatch(&self, action: &str, payload: &Map<String, Value>) -> ApiResponse {
        let mut state = self.state.lock();

        if let Some((resource, verb)) = action.rsplit_once('_') {
            if RESOURCES.contains(&resource) {
                return match verb {
                    "create" => create(&mut state, resource, payload),
                    "update" => update(&mut state, resource, payload),
                    "show" => show(&state, resource, payload),
                    "purge" => purge(&mut state, resource, payload),
                    "list" => list(&state, resource, payload),
                    _ => unknown_action(),
                };
            }
        }

        match action {
            "harvest_source_list" => ApiResponse::ok(Value::Array(state.sources.clone())),
            "harvest_job_create" => harvest_job_create(&mut state, payload),
            "harvest_job_abort" => harvest_job_abort(&mut state, payload),
            "harvest_source_clear" => match source_of(&state, payload, "id") {
                Some(id) => ApiResponse::ok(json!({ "id": id })),
                None => not_found(),
            },
            "harvest_source_show_status" => match source_of(&state, payload, "id") {
                Some(id) => {
                    let jobs = &state.jobs[&id];
                    ApiResponse::ok(json!({
                        "last_job": jobs.last().cloned(),
                        "job_count": jobs.len(),
                    }))
                }
                None => not_found(),
            },
            "harvest_job_list" => match source_of(&state, payload, "source_id") {
                Some(id) => ApiResponse::ok(Value::Array(
                    state.jobs[&id].iter().rev().cloned().collect(),
                )),
                None => not_found(),
            },
            _ => unknown_action(),
        }
    }
}

impl HttpClient for FakeCatalog {
    fn post(&self, url: &str, api_key: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let action = url.rsplit('/').next().unwrap_or_default().to_string();
        let payload: Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;

        let injected = {
            let mut state = self.state.lock();
            state.calls.push((action.clone(), payload.clone()));
            state.injected.get_mut(&action).and_then(VecDeque::pop_front)
        };
        match injected {
            Some(Injected::Error(message)) => {
                return Ok(ApiResponse::failure(ApiError::message(message)).to_bytes())
            }
            Some(Injected::Raw(body)) => return Ok(body),
            Some(Injected::Transport(message)) => return Err(message),
            None => {}
        }

        if api_key != self.api_key {
            return Ok(ApiResponse::failure(ApiError::message(ACCESS_DENIED)).to_bytes());
        }
        let Value::Object(payload) = payload else {
            return Ok(ApiResponse::failure(ApiError::message("Bad request data")).to_bytes());
        };
        Ok(self.dispatch(&action, &payload).to_bytes())
    }
}

fn complete_record(record: &mut Map<String, Value>) -> String {
    let id = match record.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };
    record.insert("id".into(), Value::String(id.clone()));

    let has_name = record
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty());
    if !has_name {
        let title = record.get("title").and_then(Value::as_str).unwrap_or_default();
        let slug = slugify(title);
        let name = if slug.is_empty() { id.clone() } else { slug };
        record.insert("name".into(), Value::String(name));
    }
    record
        .entry("state")
        .or_insert_with(|| Value::String("active".into()));
    id
}

/// Turns a title into a slug (`"Air Quality"` → `"air-quality"`).
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn find(state: &State, resource: &str, id_or_name: &str) -> Option<usize> {
    state.records.get(resource)?.iter().position(|record| {
        record.get("id").and_then(Value::as_str) == Some(id_or_name)
            || record.get("name").and_then(Value::as_str) == Some(id_or_name)
    })
}

fn payload_id<'a>(payload: &'a Map<String, Value>) -> Option<&'a str> {
    payload.get("id").and_then(Value::as_str)
}

fn not_found() -> ApiResponse {
    ApiResponse::failure(ApiError::message(NOT_FOUND))
}

fn unknown_action() -> ApiResponse {
    ApiResponse::failure(ApiError::message("Action name not known"))
}

fn name_in_use(state: &State, resource: &str, name: &str, except: Option<&str>) -> bool {
    state.records.get(resource).is_some_and(|records| {
        records.iter().any(|record| {
            record.get("name").and_then(Value::as_str) == Some(name)
                && record.get("id").and_then(Value::as_str) != except
        })
    })
}

fn create(state: &mut State, resource: &str, payload: &Map<String, Value>) -> ApiResponse {
    let mut record = payload.clone();
    record.remove("id");
    complete_record(&mut record);

    let name = record.get("name").and_then(Value::as_str).unwrap_or_default();
    if name_in_use(state, resource, name, None) {
        return ApiResponse::failure(ApiError {
            name: vec![NAME_IN_USE.to_string()],
            ..ApiError::default()
        });
    }

    state
        .records
        .entry(resource.to_string())
        .or_default()
        .push(record.clone());
    ApiResponse::ok(Value::Object(record))
}

fn update(state: &mut State, resource: &str, payload: &Map<String, Value>) -> ApiResponse {
    let Some(id) = payload_id(payload) else {
        return ApiResponse::failure(ApiError {
            id: vec!["Missing value".to_string()],
            ..ApiError::default()
        });
    };
    let Some(idx) = find(state, resource, id) else {
        return not_found();
    };

    let current_id = state.records[resource][idx]
        .get("id")
        .cloned()
        .unwrap_or(Value::Null);
    if let Some(name) = payload.get("name").and_then(Value::as_str) {
        if name_in_use(state, resource, name, current_id.as_str()) {
            return ApiResponse::failure(ApiError {
                name: vec![NAME_IN_USE.to_string()],
                ..ApiError::default()
            });
        }
    }

    let Some(record) = state.records.get_mut(resource).and_then(|r| r.get_mut(idx)) else {
        return not_found();
    };
    for (key, value) in payload {
        record.insert(key.clone(), value.clone());
    }
    record.insert("id".into(), current_id);
    ApiResponse::ok(Value::Object(record.clone()))
}

fn show(state: &State, resource: &str, payload: &Map<String, Value>) -> ApiResponse {
    match payload_id(payload).and_then(|id| find(state, resource, id)) {
        Some(idx) => ApiResponse::ok(Value::Object(state.records[resource][idx].clone())),
        None => not_found(),
    }
}

fn purge(state: &mut State, resource: &str, payload: &Map<String, Value>) -> ApiResponse {
    if resource == "package" {
        return unknown_action();
    }
    match payload_id(payload).and_then(|id| find(state, resource, id)) {
        Some(idx) => {
            if let Some(records) = state.records.get_mut(resource) {
                records.remove(idx);
            }
            ApiResponse::ok(Value::Null)
        }
        None => not_found(),
    }
}

fn list(state: &State, resource: &str, payload: &Map<String, Value>) -> ApiResponse {
    let all_fields = payload.get("all_fields").and_then(Value::as_bool) == Some(true);
    let active = state
        .records
        .get(resource)
        .into_iter()
        .flatten()
        .filter(|record| record.get("state").and_then(Value::as_str) != Some("deleted"));
    let items: Vec<Value> = if all_fields {
        active.cloned().map(Value::Object).collect()
    } else {
        active
            .filter_map(|record| record.get("name").cloned())
            .collect()
    };
    ApiResponse::ok(Value::Array(items))
}

fn source_of(state: &State, payload: &Map<String, Value>, key: &str) -> Option<String> {
    let id = payload.get(key).and_then(Value::as_str)?;
    state.jobs.contains_key(id).then(|| id.to_string())
}

fn harvest_job_create(state: &mut State, payload: &Map<String, Value>) -> ApiResponse {
    let Some(source) = source_of(state, payload, "source_id") else {
        return not_found();
    };
    let jobs = state.jobs.entry(source.clone()).or_default();
    let unfinished = jobs.iter().any(|job| {
        matches!(job.get("status").and_then(Value::as_str), Some("New" | "Running"))
    });
    if unfinished {
        return ApiResponse::failure(ApiError::message(
            "There already is an unrun job for this source",
        ));
    }
    let job = json!({
        "id": Uuid::new_v4().to_string(),
        "source_id": source,
        "status": "New",
        "created": "2016-01-18T09:30:05.123456",
        "gather_started": null,
        "gather_finished": null,
    });
    jobs.push(job.clone());
    ApiResponse::ok(job)
}

fn harvest_job_abort(state: &mut State, payload: &Map<String, Value>) -> ApiResponse {
    let Some(source) = source_of(state, payload, "source_id") else {
        return not_found();
    };
    let running = state.jobs.get_mut(&source).and_then(|jobs| {
        jobs.iter_mut().rev().find(|job| {
            matches!(job.get("status").and_then(Value::as_str), Some("New" | "Running"))
        })
    });
    match running {
        Some(job) => {
            job["status"] = Value::String("Aborted".into());
            ApiResponse::ok(job.clone())
        }
        None => ApiResponse::failure(ApiError::message("No job running for this source")),
    }
}
