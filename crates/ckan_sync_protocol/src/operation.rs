//! Remote operations and the catalog actions that carry them.

use crate::entity::VisibilityState;
use crate::kind::ResourceType;
use serde_json::{json, Map, Value};
use std::fmt;

/// Per-resource action suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    /// `_create`
    Create,
    /// `_update`
    Update,
    /// `_show`
    Show,
    /// `_purge`
    Purge,
    /// `_list`
    List,
}

impl ResourceAction {
    fn suffix(&self) -> &'static str {
        match self {
            ResourceAction::Create => "create",
            ResourceAction::Update => "update",
            ResourceAction::Show => "show",
            ResourceAction::Purge => "purge",
            ResourceAction::List => "list",
        }
    }
}

/// A named action of the catalog API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// `{resource}_{action}`
    Resource(ResourceType, ResourceAction),
    /// `harvest_job_create`
    HarvestJobCreate,
    /// `harvest_job_abort`
    HarvestJobAbort,
    /// `harvest_source_clear`
    HarvestSourceClear,
    /// `harvest_source_list`
    HarvestSourceList,
    /// `harvest_source_show_status`
    HarvestSourceShowStatus,
    /// `harvest_job_list`
    HarvestJobList,
}

impl Action {
    /// Returns the action name used in the URL path.
    pub fn name(&self) -> String {
        match self {
            Action::Resource(resource, action) => {
                format!("{}_{}", resource.as_str(), action.suffix())
            }
            Action::HarvestJobCreate => "harvest_job_create".into(),
            Action::HarvestJobAbort => "harvest_job_abort".into(),
            Action::HarvestSourceClear => "harvest_source_clear".into(),
            Action::HarvestSourceList => "harvest_source_list".into(),
            Action::HarvestSourceShowStatus => "harvest_source_show_status".into(),
            Action::HarvestJobList => "harvest_job_list".into(),
        }
    }

    /// Builds the full URL for this action below an API endpoint.
    ///
    /// The endpoint is expected to end with `/` (e.g. `https://ckan/api/3/`).
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}action/{}", endpoint, self.name())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// What a remote operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Create the record.
    Create,
    /// Replace the record.
    Update,
    /// Change only the record's `state` (read-modify-write).
    SetState(VisibilityState),
    /// Remove the record permanently.
    Purge,
}

/// A remote operation against one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOperation {
    /// Target resource type.
    pub resource: ResourceType,
    /// What to do.
    pub kind: OperationKind,
    /// JSON object payload.
    pub payload: Map<String, Value>,
}

impl RemoteOperation {
    /// Creates a save: Update if the record already has a reference,
    /// Create otherwise.
    ///
    /// The reference always ends up as the payload `id`, and a stray `id`
    /// is stripped from a Create.
    pub fn save(
        resource: ResourceType,
        reference_id: Option<&str>,
        mut payload: Map<String, Value>,
    ) -> Self {
        let kind = match reference_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                payload.insert("id".into(), Value::String(id.to_string()));
                OperationKind::Update
            }
            None => {
                payload.remove("id");
                OperationKind::Create
            }
        };
        Self {
            resource,
            kind,
            payload,
        }
    }

    /// Creates a state change for an existing record.
    pub fn set_state(resource: ResourceType, reference_id: &str, state: VisibilityState) -> Self {
        Self {
            resource,
            kind: OperationKind::SetState(state),
            payload: id_payload(reference_id),
        }
    }

    /// Creates a purge for an existing record.
    pub fn purge(resource: ResourceType, reference_id: &str) -> Self {
        Self {
            resource,
            kind: OperationKind::Purge,
            payload: id_payload(reference_id),
        }
    }

    /// Returns the actions issued for this operation, in order.
    ///
    /// Purge of a `package` yields no action: datasets are never purged.
    pub fn actions(&self) -> Vec<Action> {
        let resource = self.resource;
        match self.kind {
            OperationKind::Create => vec![Action::Resource(resource, ResourceAction::Create)],
            OperationKind::Update => vec![Action::Resource(resource, ResourceAction::Update)],
            OperationKind::SetState(_) => vec![
                Action::Resource(resource, ResourceAction::Show),
                Action::Resource(resource, ResourceAction::Update),
            ],
            OperationKind::Purge if !resource.supports_purge() => Vec::new(),
            OperationKind::Purge => vec![Action::Resource(resource, ResourceAction::Purge)],
        }
    }

    /// Returns the payload as a JSON value.
    pub fn payload_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}

fn id_payload(reference_id: &str) -> Map<String, Value> {
    match json!({ "id": reference_id }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names() {
        assert_eq!(
            Action::Resource(ResourceType::Package, ResourceAction::Create).name(),
            "package_create"
        );
        assert_eq!(
            Action::Resource(ResourceType::Organization, ResourceAction::Purge).name(),
            "organization_purge"
        );
        assert_eq!(Action::HarvestSourceShowStatus.name(), "harvest_source_show_status");
        assert_eq!(
            Action::HarvestJobList.url("https://ckan.example.org/api/3/"),
            "https://ckan.example.org/api/3/action/harvest_job_list"
        );
    }

    #[test]
    fn save_without_reference_creates() {
        let op = RemoteOperation::save(ResourceType::Group, None, Map::new());
        assert_eq!(op.kind, OperationKind::Create);
        assert_eq!(
            op.actions(),
            vec![Action::Resource(ResourceType::Group, ResourceAction::Create)]
        );

        let mut payload = Map::new();
        payload.insert("id".into(), Value::String("stale".into()));
        let op = RemoteOperation::save(ResourceType::Group, Some(""), payload);
        assert_eq!(op.kind, OperationKind::Create);
        assert!(op.payload.get("id").is_none());
    }

    #[test]
    fn save_with_reference_updates_whatever_the_payload() {
        let op = RemoteOperation::save(ResourceType::Package, Some("ref-1"), Map::new());
        assert_eq!(op.kind, OperationKind::Update);
        assert_eq!(op.payload_value(), json!({"id": "ref-1"}));

        let mut payload = Map::new();
        payload.insert("id".into(), Value::String("other".into()));
        let op = RemoteOperation::save(ResourceType::Package, Some("ref-1"), payload);
        assert_eq!(op.payload["id"], "ref-1");
    }

    #[test]
    fn set_state_is_show_then_update() {
        let op = RemoteOperation::set_state(
            ResourceType::Organization,
            "ref",
            VisibilityState::Deleted,
        );
        assert_eq!(op.payload_value(), json!({"id": "ref"}));
        assert_eq!(
            op.actions(),
            vec![
                Action::Resource(ResourceType::Organization, ResourceAction::Show),
                Action::Resource(ResourceType::Organization, ResourceAction::Update),
            ]
        );
    }

    #[test]
    fn package_purge_has_no_action() {
        assert!(RemoteOperation::purge(ResourceType::Package, "ref")
            .actions()
            .is_empty());
        assert_eq!(
            RemoteOperation::purge(ResourceType::Group, "ref").actions(),
            vec![Action::Resource(ResourceType::Group, ResourceAction::Purge)]
        );
    }
}
