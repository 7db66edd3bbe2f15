//! Lifecycle events emitted by the surrounding admin layer.

use crate::entity::EntityId;

/// The lifecycle transition that needs remote mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    /// Entity was saved (or published).
    Saved {
        /// Whether the save was an automatic draft save.
        autosave: bool,
    },
    /// Entity was moved to the trash.
    Trashed,
    /// Entity was restored from the trash.
    Untrashed,
    /// Entity is about to be deleted permanently.
    PermanentlyDeleted,
}

/// How the user triggered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrigin {
    /// A single row action (e.g. the trash link of one entity).
    #[default]
    Single,
    /// A bulk action over a checkbox selection.
    Bulk,
    /// The undo link shown after trashing.
    Undo,
}

/// A lifecycle event over one or more local entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// The transition.
    pub kind: LifecycleKind,
    /// Affected local ids, processed in order.
    pub targets: Vec<EntityId>,
    /// How the event was triggered.
    pub origin: EventOrigin,
}

impl LifecycleEvent {
    /// Creates a single-entity event.
    pub fn single(kind: LifecycleKind, id: EntityId) -> Self {
        Self {
            kind,
            targets: vec![id],
            origin: EventOrigin::Single,
        }
    }

    /// Creates a bulk event.
    pub fn bulk(kind: LifecycleKind, ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            kind,
            targets: ids.into_iter().collect(),
            origin: EventOrigin::Bulk,
        }
    }

    /// Creates the event for an undo link, which carries ids as `1,2,3`.
    pub fn undo(ids: &str) -> Self {
        Self {
            kind: LifecycleKind::Untrashed,
            targets: ids
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect(),
            origin: EventOrigin::Undo,
        }
    }

    /// Creates a non-autosave `Saved` event for one entity.
    pub fn saved(id: EntityId) -> Self {
        Self::single(LifecycleKind::Saved { autosave: false }, id)
    }

    /// Returns true if this event names more than one entity.
    pub fn is_batch(&self) -> bool {
        self.targets.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_parses_id_list() {
        let event = LifecycleEvent::undo("4, 5,x,6");
        assert_eq!(event.kind, LifecycleKind::Untrashed);
        assert_eq!(event.targets, vec![4, 5, 6]);
        assert_eq!(event.origin, EventOrigin::Undo);
        assert!(event.is_batch());
    }

    #[test]
    fn single_event() {
        let event = LifecycleEvent::saved(9);
        assert_eq!(event.targets, vec![9]);
        assert!(!event.is_batch());
        assert_eq!(event.kind, LifecycleKind::Saved { autosave: false });
    }
}
