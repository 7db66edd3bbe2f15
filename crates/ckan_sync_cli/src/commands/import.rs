//! Import command implementation.

use super::{CommandResult, Context};
use ckan_sync_engine::{DatasetImporter, ImportRecord};
use ckan_sync_protocol::EntityKind;
use std::fs;
use std::path::Path;

/// Imports one dataset from a JSON file.
pub fn run(ctx: &Context, path: &Path) -> CommandResult {
    let bytes = fs::read(path)?;
    let record: ImportRecord = serde_json::from_slice(&bytes)
        .map_err(|e| format!("{} is not a valid import file: {}", path.display(), e))?;

    let engine = ctx.engine(EntityKind::Dataset)?;
    let outcome = DatasetImporter::new(&engine, &ctx.store)?.import(&record)?;

    if outcome.synced {
        println!("Import successful");
    } else {
        println!("Imported locally; the catalog rejected the dataset");
        for message in engine.drain_notices()? {
            println!("  {}", message);
        }
    }
    println!(
        "dataset {} ({})",
        outcome.id,
        if outcome.created { "created" } else { "updated" }
    );
    Ok(())
}
