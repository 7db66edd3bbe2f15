//! Entity kinds and their remote resource types.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Kind of a locally managed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A dataset.
    Dataset,
    /// An organisation.
    Organisation,
    /// A group.
    Group,
}

impl EntityKind {
    /// All entity kinds.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Dataset,
        EntityKind::Organisation,
        EntityKind::Group,
    ];

    /// Returns the local type name (max. 20 characters).
    pub fn local_type(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "ckan-local-dataset",
            EntityKind::Organisation => "ckan-local-org",
            EntityKind::Group => "ckan-local-group",
        }
    }

    /// Returns the prefix used for this kind's stored field names.
    pub fn field_prefix(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "_ckan_local_dataset_",
            EntityKind::Organisation => "_ckan_local_org_",
            EntityKind::Group => "_ckan_local_group_",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_type())
    }
}

impl FromStr for EntityKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" | "ckan-local-dataset" => Ok(EntityKind::Dataset),
            "organisation" | "org" | "ckan-local-org" => Ok(EntityKind::Organisation),
            "group" | "ckan-local-group" => Ok(EntityKind::Group),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// Resource type on the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// `package` (datasets).
    Package,
    /// `organization`.
    Organization,
    /// `group`.
    Group,
}

impl ResourceType {
    /// Returns the action prefix used by the catalog API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Package => "package",
            ResourceType::Organization => "organization",
            ResourceType::Group => "group",
        }
    }

    /// Returns true if the catalog can permanently purge this resource type.
    pub fn supports_purge(&self) -> bool {
        !matches!(self, ResourceType::Package)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable mapping from entity kind to remote resource type.
///
/// The standard registry maps dataset → package, organisation → organization
/// and group → group. Resolving an unregistered kind is a configuration error
/// and is expected to surface when an engine is constructed.
#[derive(Debug, Clone)]
pub struct EntityKindRegistry {
    mapping: HashMap<EntityKind, ResourceType>,
}

impl EntityKindRegistry {
    /// Creates the standard registry.
    pub fn standard() -> Self {
        Self::from_pairs([
            (EntityKind::Dataset, ResourceType::Package),
            (EntityKind::Organisation, ResourceType::Organization),
            (EntityKind::Group, ResourceType::Group),
        ])
    }

    /// Creates a registry from explicit pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (EntityKind, ResourceType)>) -> Self {
        Self {
            mapping: pairs.into_iter().collect(),
        }
    }

    /// Resolves the remote resource type for a kind.
    pub fn resolve(&self, kind: EntityKind) -> ProtocolResult<ResourceType> {
        self.mapping
            .get(&kind)
            .copied()
            .ok_or_else(|| ProtocolError::UnregisteredKind(kind.to_string()))
    }

    /// Resolves a kind given by name.
    pub fn resolve_name(&self, name: &str) -> ProtocolResult<(EntityKind, ResourceType)> {
        let kind: EntityKind = name.parse()?;
        Ok((kind, self.resolve(kind)?))
    }

    /// Returns the number of registered kinds.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns true if no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

impl Default for EntityKindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
