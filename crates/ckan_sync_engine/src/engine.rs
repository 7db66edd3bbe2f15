//! Lifecycle sync engine.
//!
//! The engine turns lifecycle events of one entity kind into catalog calls:
//!
//! | event | remote |
//! |---|---|
//! | saved (published) | `_create`, or `_update` once a reference exists |
//! | trashed / untrashed | `_show`, then `_update` with the new `state` |
//! | permanently deleted | `_purge` (never for `package`) |
//!
//! Local state always wins: visibility is written before any remote call
//! and is never rolled back, and a failed purge does not stop the local
//! delete. Remote failures are stored as notices for the next page.

use crate::error::{SyncError, SyncResult};
use crate::notice::NoticeStore;
use crate::payload::{PayloadBuilder, StandardPayload};
use crate::store::EntityStore;
use crate::transport::CatalogTransport;
use ckan_sync_protocol::{
    Action, EntityId, EntityKind, EntityKindRegistry, LifecycleEvent, LifecycleKind, LocalEntity,
    OperationKind, RemoteOperation, ResourceAction, ResourceType, VisibilityState,
    UNKNOWN_ERROR_MESSAGE,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Statistics about remote operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records created remotely.
    pub creates: u64,
    /// Records updated remotely.
    pub updates: u64,
    /// Successful state changes (trash/untrash).
    pub state_changes: u64,
    /// Records purged remotely.
    pub purges: u64,
    /// Operations that failed remotely.
    pub failures: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Per-id results of a lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// `(id, success)` in processing order. Skipped ids are absent.
    pub results: Vec<(EntityId, bool)>,
    /// Ids that were not found or belong to another kind.
    pub skipped: Vec<EntityId>,
    /// Ids whose local read or write failed. The local store may be out of
    /// date for them even if the remote operation succeeded.
    pub store_failures: Vec<EntityId>,
}

impl BatchOutcome {
    /// Returns true if every processed id succeeded, remotely and locally.
    pub fn all_succeeded(&self) -> bool {
        self.store_failures.is_empty() && self.results.iter().all(|(_, ok)| *ok)
    }

    /// Returns the ids whose remote operation failed.
    pub fn failed_ids(&self) -> Vec<EntityId> {
        self.results
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Mirrors lifecycle events of one entity kind into the catalog.
pub struct SyncEngine<T: CatalogTransport> {
    kind: EntityKind,
    resource: ResourceType,
    transport: Arc<T>,
    notices: NoticeStore,
    payload: Arc<dyn PayloadBuilder>,
    stats: RwLock<SyncStats>,
}

impl<T: CatalogTransport> SyncEngine<T> {
    /// Creates an engine for a kind.
    ///
    /// Fails with a configuration error when the kind is not registered.
    pub fn new(
        kind: EntityKind,
        registry: &EntityKindRegistry,
        transport: impl Into<Arc<T>>,
        notices: NoticeStore,
    ) -> SyncResult<Self> {
        let resource = registry.resolve(kind)?;
        Ok(Self {
            kind,
            resource,
            transport: transport.into(),
            notices,
            payload: StandardPayload::shared(kind),
            stats: RwLock::new(SyncStats::default()),
        })
    }

    /// Creates an engine for a kind given by name (e.g. `ckan-local-org`).
    pub fn for_kind_name(
        name: &str,
        registry: &EntityKindRegistry,
        transport: impl Into<Arc<T>>,
        notices: NoticeStore,
    ) -> SyncResult<Self> {
        let (kind, _) = registry.resolve_name(name)?;
        Self::new(kind, registry, transport, notices)
    }

    /// Replaces the payload builder.
    pub fn with_payload_builder(mut self, builder: Arc<dyn PayloadBuilder>) -> Self {
        self.payload = builder;
        self
    }

    /// Returns the entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the remote resource type.
    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns the notice store.
    pub fn notices(&self) -> &NoticeStore {
        &self.notices
    }

    /// Returns the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Handles a save of one entity.
    ///
    /// Autosaves and unpublished entities are ignored. Returns false if the
    /// catalog call failed; `reference_id` is then left as it was.
    pub fn on_saved(&self, entity: &mut LocalEntity, autosave: bool) -> bool {
        if autosave || !entity.is_published() {
            debug!(id = entity.id, autosave, status = ?entity.status, "save not synced");
            return true;
        }

        let operation = RemoteOperation::save(
            self.resource,
            entity.reference_id(),
            self.payload.build(entity),
        );
        let Some(result) = self.execute(entity.id, &operation) else {
            return false;
        };

        if let Some(reference) = result
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        {
            let name = result.get("name").and_then(Value::as_str);
            entity.assign_reference(reference, name);
        }

        let mut stats = self.stats.write();
        if operation.kind == OperationKind::Update {
            stats.updates += 1;
        } else {
            stats.creates += 1;
        }
        info!(
            id = entity.id,
            resource = %self.resource,
            kind = ?operation.kind,
            reference = entity.reference_id().unwrap_or(""),
            "entity synced"
        );
        true
    }

    /// Handles a trash of one entity.
    pub fn on_trash(&self, entity: &mut LocalEntity) -> bool {
        self.set_visibility(entity, VisibilityState::Deleted)
    }

    /// Handles an untrash of one entity.
    pub fn on_untrash(&self, entity: &mut LocalEntity) -> bool {
        self.set_visibility(entity, VisibilityState::Active)
    }

    /// Sets the local visibility, then mirrors it as the remote `state`.
    fn set_visibility(&self, entity: &mut LocalEntity, state: VisibilityState) -> bool {
        entity.visibility = state;

        let Some(reference) = entity.reference_id() else {
            debug!(id = entity.id, "entity never synced, no state change sent");
            return true;
        };
        let operation = RemoteOperation::set_state(self.resource, reference, state);
        if self.execute(entity.id, &operation).is_none() {
            return false;
        }

        self.stats.write().state_changes += 1;
        info!(id = entity.id, state = state.as_str(), "remote state changed");
        true
    }

    /// Handles the permanent delete of one entity.
    ///
    /// Returns false if the purge failed. The caller deletes the local
    /// entity either way.
    pub fn on_permanent_delete(&self, entity: &LocalEntity) -> bool {
        let Some(reference) = entity.reference_id() else {
            return true;
        };

        let operation = RemoteOperation::purge(self.resource, reference);
        if operation.actions().is_empty() {
            debug!(id = entity.id, resource = %self.resource, "purge not supported, skipped");
            return true;
        }
        if self.execute(entity.id, &operation).is_none() {
            return false;
        }

        self.stats.write().purges += 1;
        info!(id = entity.id, reference, "entity purged");
        true
    }

    /// Issues the actions of an operation in order and returns the result
    /// of the last one, or `None` after recording the first failure.
    ///
    /// For a state change, the record returned by `_show` is sent back to
    /// `_update` with its `state` replaced, since the catalog has no
    /// partial update. An operation without actions succeeds with `null`.
    fn execute(&self, id: EntityId, operation: &RemoteOperation) -> Option<Value> {
        let mut payload = operation.payload_value();
        let mut result = Value::Null;

        for action in operation.actions() {
            let outcome = self.transport.call(&action, &payload);
            if !outcome.is_success() {
                self.record_failure(id, outcome.errors);
                return None;
            }
            result = outcome.result;

            if let (OperationKind::SetState(state), Action::Resource(_, ResourceAction::Show)) =
                (operation.kind, action)
            {
                let Value::Object(mut record) = std::mem::take(&mut result) else {
                    self.record_failure(id, vec![UNKNOWN_ERROR_MESSAGE.to_string()]);
                    return None;
                };
                record.insert("state".into(), Value::String(state.as_str().to_string()));
                payload = Value::Object(record);
            }
        }
        Some(result)
    }

    /// Handles a lifecycle event over one or more ids.
    ///
    /// Ids are processed one at a time in order; each outcome is
    /// independent. Mutated entities are written back to the store, and
    /// permanently deleted ones are removed whatever the remote outcome.
    /// A failing store read or write is logged and recorded for that id;
    /// the remaining ids are still processed.
    pub fn handle(&self, event: &LifecycleEvent, store: &dyn EntityStore) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for &id in &event.targets {
            let mut entity = match store.get(id) {
                Ok(Some(entity)) => entity,
                Ok(None) => {
                    warn!(id, "entity not found, skipped");
                    outcome.skipped.push(id);
                    continue;
                }
                Err(err) => {
                    self.record_store_failure(id, &err, &mut outcome);
                    continue;
                }
            };
            if entity.kind != self.kind {
                warn!(id, kind = %entity.kind, "entity of another kind, skipped");
                outcome.skipped.push(id);
                continue;
            }

            let ok = match event.kind {
                LifecycleKind::Saved { autosave } => self.on_saved(&mut entity, autosave),
                LifecycleKind::Trashed => self.on_trash(&mut entity),
                LifecycleKind::Untrashed => self.on_untrash(&mut entity),
                LifecycleKind::PermanentlyDeleted => self.on_permanent_delete(&entity),
            };
            outcome.results.push((id, ok));

            let written = if event.kind == LifecycleKind::PermanentlyDeleted {
                store.remove(id).map(|_| ())
            } else {
                let reference = entity.reference_id().map(str::to_string);
                let written = store.put(entity);
                if let (Err(_), Some(reference)) = (&written, reference) {
                    warn!(id, %reference, "remote reference not stored locally");
                }
                written
            };
            if let Err(err) = written {
                self.record_store_failure(id, &err, &mut outcome);
            }
        }

        outcome
    }

    /// Returns and clears the pending notices of this kind.
    pub fn drain_notices(&self) -> SyncResult<Vec<String>> {
        self.notices.drain_and_clear()
    }

    fn record_store_failure(&self, id: EntityId, err: &SyncError, outcome: &mut BatchOutcome) {
        warn!(id, error = %err, "local store failed");
        outcome.store_failures.push(id);
    }

    fn record_failure(&self, id: EntityId, errors: Vec<String>) {
        {
            let mut stats = self.stats.write();
            stats.failures += 1;
            stats.last_error = errors.last().cloned();
        }
        if let Err(err) = self.notices.append(&errors) {
            warn!(id, error = %err, "failed to store notices");
        }
    }
}
