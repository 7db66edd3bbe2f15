//! Create/update payloads per entity kind.

use ckan_sync_protocol::{EntityKind, LocalEntity};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Builds the catalog payload of an entity.
///
/// The returned object carries `id` exactly when the entity already has a
/// remote reference, which makes the engine issue an update.
pub trait PayloadBuilder: Send + Sync {
    /// Builds the payload.
    fn build(&self, entity: &LocalEntity) -> Map<String, Value>;
}

/// Payload builder used for the standard entity kinds.
///
/// - every kind: all fields, `name` (slug) when known, `state` from the
///   visibility, `id` when synced
/// - organisation: `parent` becomes `groups: [{"name": parent}]`
/// - dataset: `organisation` becomes `owner_org`, group names become
///   `groups: [{"name": ...}]`
#[derive(Debug, Clone, Copy)]
pub struct StandardPayload {
    kind: EntityKind,
}

impl StandardPayload {
    /// Creates the builder for a kind.
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }

    /// Creates a shareable builder for a kind.
    pub fn shared(kind: EntityKind) -> Arc<dyn PayloadBuilder> {
        Arc::new(Self::new(kind))
    }
}

impl PayloadBuilder for StandardPayload {
    fn build(&self, entity: &LocalEntity) -> Map<String, Value> {
        let mut payload = entity.fields.clone();

        match self.kind {
            EntityKind::Organisation => {
                let parent = payload.remove("parent");
                let groups = match parent.as_ref().and_then(Value::as_str) {
                    Some(parent) if !parent.is_empty() => json!([{ "name": parent }]),
                    _ => json!([]),
                };
                payload.insert("groups".into(), groups);
            }
            EntityKind::Dataset => {
                if let Some(org) = payload.remove("organisation") {
                    payload.insert("owner_org".into(), org);
                }
                if let Some(Value::Array(groups)) = payload.get("groups") {
                    let groups: Vec<Value> = groups
                        .iter()
                        .map(|group| match group {
                            Value::String(name) => json!({ "name": name }),
                            other => other.clone(),
                        })
                        .collect();
                    payload.insert("groups".into(), Value::Array(groups));
                }
            }
            EntityKind::Group => {}
        }

        if let Some(name) = entity.name.as_deref().filter(|n| !n.is_empty()) {
            payload
                .entry("name")
                .or_insert_with(|| Value::String(name.to_string()));
        }
        payload.insert(
            "state".into(),
            Value::String(entity.visibility.as_str().to_string()),
        );
        match entity.reference_id() {
            Some(reference) => {
                payload.insert("id".into(), Value::String(reference.to_string()));
            }
            None => {
                payload.remove("id");
            }
        }
        payload
    }
}
