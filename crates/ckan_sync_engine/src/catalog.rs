//! Read-only lookups against the catalog (form options, existence checks).

use crate::error::{SyncError, SyncResult};
use crate::transport::CatalogTransport;
use ckan_sync_protocol::{Action, ResourceAction, ResourceType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Message for lookups of resource types other than group/organization.
pub const TYPE_NOT_AVAILABLE: &str = "Type not available!";

/// A selectable catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOption {
    /// Slug.
    pub name: String,
    /// Display title.
    pub title: String,
}

/// Lookups of groups and organizations.
pub struct CatalogLookup<T: CatalogTransport> {
    transport: Arc<T>,
}

impl<T: CatalogTransport> CatalogLookup<T> {
    /// Creates a lookup over a transport.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    fn check_type(resource: ResourceType) -> SyncResult<()> {
        match resource {
            ResourceType::Group | ResourceType::Organization => Ok(()),
            ResourceType::Package => Err(SyncError::Application(vec![TYPE_NOT_AVAILABLE.into()])),
        }
    }

    /// Lists all records of a type as `name → title`, in catalog order.
    pub fn list_options(&self, resource: ResourceType) -> SyncResult<Vec<CatalogOption>> {
        Self::check_type(resource)?;
        let result = self
            .transport
            .call(
                &Action::Resource(resource, ResourceAction::List),
                &json!({ "all_fields": true }),
            )
            .into_result()?;

        let records = result.as_array().cloned().unwrap_or_default();
        Ok(records
            .iter()
            .filter_map(|record| {
                let name = record.get("name").and_then(Value::as_str)?;
                let title = record.get("title").and_then(Value::as_str).unwrap_or(name);
                Some(CatalogOption {
                    name: name.to_string(),
                    title: title.to_string(),
                })
            })
            .collect())
    }

    /// Lists the organizations that can be the parent of `current`.
    ///
    /// An organization cannot be its own parent, so `current` is left out.
    pub fn parent_options(&self, current: Option<&str>) -> SyncResult<Vec<CatalogOption>> {
        let mut options = self.list_options(ResourceType::Organization)?;
        if let Some(current) = current {
            options.retain(|option| option.name != current);
        }
        Ok(options)
    }

    /// Returns true if a record with this name or id exists.
    pub fn exists(&self, resource: ResourceType, name: &str) -> SyncResult<bool> {
        Self::check_type(resource)?;
        Ok(self
            .transport
            .call(
                &Action::Resource(resource, ResourceAction::Show),
                &json!({ "id": name }),
            )
            .is_success())
    }

    /// Returns true if the group exists.
    pub fn group_exists(&self, name: &str) -> SyncResult<bool> {
        self.exists(ResourceType::Group, name)
    }

    /// Returns true if the organization exists.
    pub fn organisation_exists(&self, name: &str) -> SyncResult<bool> {
        self.exists(ResourceType::Organization, name)
    }
}
