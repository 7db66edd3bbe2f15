//! Local entity snapshots.

use crate::error::ProtocolError;
use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Local identifier of an entity.
pub type EntityId = u64;

/// Visibility of an entity, mirrored into the remote `state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    /// Visible (`active`).
    #[default]
    Active,
    /// Trashed (`deleted`).
    Deleted,
}

impl VisibilityState {
    /// Returns the remote `state` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityState::Active => "active",
            VisibilityState::Deleted => "deleted",
        }
    }
}

/// Local publish status. Only published entities are synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Not yet published.
    #[default]
    Draft,
    /// Waiting for review.
    Pending,
    /// Published.
    Publish,
    /// Privately published.
    Private,
}

impl FromStr for PostStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "pending" => Ok(PostStatus::Pending),
            "publish" => Ok(PostStatus::Publish),
            "private" => Ok(PostStatus::Private),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

/// Snapshot of a locally managed entity.
///
/// `reference_id` and `name` are assigned by the remote catalog on the first
/// successful create. An empty string is treated the same as no reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEntity {
    /// Entity kind.
    pub kind: EntityKind,
    /// Local identifier.
    pub id: EntityId,
    /// Remote identifier, once created remotely.
    #[serde(default)]
    pub reference_id: Option<String>,
    /// Remote slug, once created remotely.
    #[serde(default)]
    pub name: Option<String>,
    /// Local publish status.
    #[serde(default)]
    pub status: PostStatus,
    /// Local visibility.
    #[serde(default)]
    pub visibility: VisibilityState,
    /// Field values sent to the catalog.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl LocalEntity {
    /// Creates an unsynced draft entity.
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self {
            kind,
            id,
            reference_id: None,
            name: None,
            status: PostStatus::Draft,
            visibility: VisibilityState::Active,
            fields: Map::new(),
        }
    }

    /// Creates a published entity.
    pub fn published(kind: EntityKind, id: EntityId) -> Self {
        Self::new(kind, id).with_status(PostStatus::Publish)
    }

    /// Sets the publish status.
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets the remote reference id.
    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Returns the remote reference id, if set and non-empty.
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref().filter(|r| !r.is_empty())
    }

    /// Returns true if the entity exists remotely.
    pub fn is_synced(&self) -> bool {
        self.reference_id().is_some()
    }

    /// Returns true if the entity is published locally.
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Publish
    }

    /// Returns a field as a string slice.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Records the identifiers assigned by the catalog.
    ///
    /// An empty `reference_id` is ignored so a known reference is never lost.
    pub fn assign_reference(&mut self, reference_id: &str, name: Option<&str>) {
        if reference_id.is_empty() {
            return;
        }
        self.reference_id = Some(reference_id.to_string());
        if let Some(name) = name {
            self.name = Some(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reference_is_unsynced() {
        let entity = LocalEntity::published(EntityKind::Group, 1).with_reference("");
        assert!(!entity.is_synced());
        assert_eq!(entity.reference_id(), None);
    }

    #[test]
    fn assign_reference_never_clears() {
        let mut entity = LocalEntity::published(EntityKind::Organisation, 7);
        entity.assign_reference("abc", Some("my-org"));
        assert_eq!(entity.reference_id(), Some("abc"));
        assert_eq!(entity.name.as_deref(), Some("my-org"));

        entity.assign_reference("", None);
        assert_eq!(entity.reference_id(), Some("abc"));
        assert_eq!(entity.name.as_deref(), Some("my-org"));
    }

    #[test]
    fn serde_defaults() {
        let entity: LocalEntity =
            serde_json::from_str(r#"{"kind":"dataset","id":3,"fields":{"title":"T"}}"#).unwrap();
        assert_eq!(entity.status, PostStatus::Draft);
        assert_eq!(entity.visibility, VisibilityState::Active);
        assert_eq!(entity.field_str("title"), Some("T"));
    }

    #[test]
    fn status_parsing() {
        assert_eq!("publish".parse::<PostStatus>().unwrap(), PostStatus::Publish);
        assert!("trash".parse::<PostStatus>().is_err());
    }
}
