//! Options command: lists groups or organizations as form choices.

use super::{CommandResult, Context};
use ckan_sync_engine::CatalogLookup;
use ckan_sync_protocol::ResourceType;

/// Lists the selectable records of a resource type.
///
/// With `exclude`, lists organizations usable as the parent of that one.
pub fn run(ctx: &Context, resource: ResourceType, exclude: Option<&str>) -> CommandResult {
    let lookup = CatalogLookup::new(ctx.client.clone());
    let options = match (resource, exclude) {
        (ResourceType::Organization, Some(current)) => lookup.parent_options(Some(current))?,
        _ => lookup.list_options(resource)?,
    };
    for option in options {
        println!("{}\t{}", option.name, option.title);
    }
    Ok(())
}
