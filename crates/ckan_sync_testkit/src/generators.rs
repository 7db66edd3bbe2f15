//! Property-based test generators using proptest.

use ckan_sync_protocol::{EntityId, EntityKind, LocalEntity, PostStatus};
use proptest::prelude::*;

/// Strategy for entity kinds.
pub fn entity_kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop::sample::select(EntityKind::ALL.to_vec())
}

/// Strategy for catalog slugs.
pub fn slug_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,20}[a-z0-9]").expect("Invalid regex")
}

/// Strategy for publish statuses.
pub fn status_strategy() -> impl Strategy<Value = PostStatus> {
    prop_oneof![
        Just(PostStatus::Draft),
        Just(PostStatus::Pending),
        Just(PostStatus::Publish),
        Just(PostStatus::Private),
    ]
}

/// Strategy for unsynced published entities of a kind with a unique title.
pub fn published_entity_strategy(kind: EntityKind) -> impl Strategy<Value = LocalEntity> {
    (1..10_000u64, slug_strategy()).prop_map(move |(id, title)| {
        LocalEntity::published(kind, id).with_field("title", format!("{title}-{id}"))
    })
}

/// Strategy for a set of distinct local ids.
pub fn id_set_strategy(max: usize) -> impl Strategy<Value = Vec<EntityId>> {
    prop::collection::btree_set(1..1_000u64, 1..=max).prop_map(|ids| ids.into_iter().collect())
}
