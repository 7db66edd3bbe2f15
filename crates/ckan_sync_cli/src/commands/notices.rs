//! Notices command implementation.

use super::{CommandResult, Context};
use ckan_sync_protocol::EntityKind;

/// Prints and clears the pending notices of the given kinds.
pub fn run(ctx: &Context, kinds: &[EntityKind]) -> CommandResult {
    let mut total = 0;
    for &kind in kinds {
        let messages = ctx.notice_store(kind).drain_and_clear()?;
        total += messages.len();
        for message in messages {
            println!("[{}] {}", kind, message);
        }
    }
    if total == 0 {
        println!("No notices.");
    }
    Ok(())
}
