//! Lifecycle commands: save, trash, untrash and delete.

use super::{CommandResult, Context};
use ckan_sync_engine::{BatchOutcome, EntityStore};
use ckan_sync_protocol::{
    EntityId, EntityKind, LifecycleEvent, LifecycleKind, LocalEntity, PostStatus,
};
use serde_json::Value;
use tracing::info;

/// Local edit applied before a save.
#[derive(Debug, Default)]
pub struct Edit {
    /// Entity to edit; a new one is created when `None`.
    pub id: Option<EntityId>,
    /// New publish status.
    pub status: Option<PostStatus>,
    /// Fields to set.
    pub fields: Vec<(String, Value)>,
    /// Whether the save is an autosave.
    pub autosave: bool,
}

/// Applies an edit to the local store and sends the save.
pub fn save(ctx: &Context, kind: EntityKind, edit: Edit) -> CommandResult {
    let engine = ctx.engine(kind)?;

    let mut entity = match edit.id {
        Some(id) => ctx
            .store
            .get(id)?
            .filter(|entity| entity.kind == kind)
            .ok_or_else(|| format!("no {kind} with id {id}"))?,
        None => LocalEntity::new(kind, ctx.store.next_id()?),
    };
    if let Some(status) = edit.status {
        entity.status = status;
    }
    entity.fields.extend(edit.fields);
    let id = entity.id;
    ctx.store.put(entity)?;
    info!(id, %kind, "local entity saved");

    let event = LifecycleEvent::single(
        LifecycleKind::Saved {
            autosave: edit.autosave,
        },
        id,
    );
    let outcome = engine.handle(&event, &ctx.store);
    report(kind, &outcome);

    if let Some(entity) = ctx.store.get(id)? {
        println!(
            "{} {}: reference={} name={}",
            kind,
            id,
            entity.reference_id().unwrap_or("-"),
            entity.name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Runs a trash, untrash or delete event.
pub fn run(ctx: &Context, kind: EntityKind, event: LifecycleEvent) -> CommandResult {
    if event.targets.is_empty() {
        return Err("no ids given".into());
    }
    let engine = ctx.engine(kind)?;
    let outcome = engine.handle(&event, &ctx.store);
    report(kind, &outcome);
    Ok(())
}

fn report(kind: EntityKind, outcome: &BatchOutcome) {
    for (id, ok) in &outcome.results {
        println!("  {} {}: {}", kind, id, if *ok { "ok" } else { "failed" });
    }
    for id in &outcome.skipped {
        println!("  {} {}: skipped", kind, id);
    }
    for id in &outcome.store_failures {
        println!("  {} {}: not stored locally", kind, id);
    }
    if !outcome.all_succeeded() {
        println!(
            "{} failed; run `ckan-sync notices {}` for details",
            outcome.failed_ids().len(),
            kind
        );
    }
}
