//! CKAN Sync CLI
//!
//! Drives the sync engine from the command line against a JSON entity file.
//!
//! # Commands
//!
//! - `save` - Edit a local entity and sync the save
//! - `trash` / `untrash` / `delete` - Send lifecycle events for ids
//! - `notices` - Print and clear pending failure messages
//! - `options` - List groups or organizations
//! - `harvest` - Manage harvest sources and jobs
//! - `import` - Import a dataset from a JSON file

mod client;
mod commands;

use ckan_sync_engine::{SyncConfig, API_KEY_VAR, ENDPOINT_VAR};
use ckan_sync_protocol::{EntityId, EntityKind, LifecycleEvent, LifecycleKind, PostStatus, ResourceType};
use clap::{Parser, Subcommand, ValueEnum};
use commands::harvest::HarvestAction;
use commands::lifecycle::Edit;
use commands::Context;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Mirror local catalog entities into a CKAN instance.
#[derive(Parser)]
#[command(name = "ckan-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local entity file
    #[arg(global = true, long, default_value = "entities.json")]
    store: PathBuf,

    /// Path to the notice file
    #[arg(global = true, long, default_value = "notices.json")]
    notices: PathBuf,

    /// CKAN API endpoint, e.g. https://ckan.example.org/api/3/
    #[arg(global = true, long, env = ENDPOINT_VAR)]
    endpoint: Option<String>,

    /// CKAN API key
    #[arg(global = true, long, env = API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(global = true, long)]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Dataset,
    Organisation,
    Group,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Dataset => EntityKind::Dataset,
            Kind::Organisation => EntityKind::Organisation,
            Kind::Group => EntityKind::Group,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Status {
    Draft,
    Pending,
    Publish,
    Private,
}

impl From<Status> for PostStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Draft => PostStatus::Draft,
            Status::Pending => PostStatus::Pending,
            Status::Publish => PostStatus::Publish,
            Status::Private => PostStatus::Private,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Listable {
    Organization,
    Group,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a local entity (or create one) and sync the save
    Save {
        /// Entity kind
        kind: Kind,

        /// Local id; a new entity is created when omitted
        #[arg(long)]
        id: Option<EntityId>,

        /// Publish status to set
        #[arg(long, value_enum)]
        status: Option<Status>,

        /// Field to set, as key=value (repeatable)
        #[arg(short, long = "field", value_parser = commands::parse_field)]
        fields: Vec<(String, serde_json::Value)>,

        /// Treat the save as an autosave (not synced)
        #[arg(long)]
        autosave: bool,
    },

    /// Move entities to the trash
    Trash {
        /// Entity kind
        kind: Kind,
        /// Local ids
        ids: Vec<EntityId>,
    },

    /// Restore entities from the trash
    Untrash {
        /// Entity kind
        kind: Kind,
        /// Local ids
        ids: Vec<EntityId>,
        /// Ids from an undo link, as 1,2,3
        #[arg(long, conflicts_with = "ids")]
        undo: Option<String>,
    },

    /// Delete entities permanently
    Delete {
        /// Entity kind
        kind: Kind,
        /// Local ids
        ids: Vec<EntityId>,
    },

    /// Print and clear pending notices
    Notices {
        /// Entity kind (all kinds when omitted)
        kind: Option<Kind>,
    },

    /// List groups or organizations
    Options {
        /// Resource type
        resource: Listable,
        /// Organization that must not be offered as its own parent
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Manage harvest sources and jobs
    #[command(subcommand)]
    Harvest(HarvestCommand),

    /// Import a dataset from a JSON file
    Import {
        /// Import file
        file: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum HarvestCommand {
    /// List active harvest sources
    Sources,
    /// Show jobs of a source
    Jobs {
        /// Source id
        source_id: String,
        /// Show all jobs instead of the latest
        #[arg(short, long)]
        all: bool,
    },
    /// Start a new harvest job
    Reharvest {
        /// Source id
        source_id: String,
    },
    /// Abort the running job
    Abort {
        /// Source id
        source_id: String,
    },
    /// Remove all datasets harvested from a source
    Clear {
        /// Source id
        source_id: String,
    },
}

impl From<HarvestCommand> for HarvestAction {
    fn from(command: HarvestCommand) -> Self {
        match command {
            HarvestCommand::Sources => HarvestAction::Sources,
            HarvestCommand::Jobs { source_id, all } => HarvestAction::Jobs { source_id, all },
            HarvestCommand::Reharvest { source_id } => HarvestAction::Reharvest(source_id),
            HarvestCommand::Abort { source_id } => HarvestAction::Abort(source_id),
            HarvestCommand::Clear { source_id } => HarvestAction::Clear(source_id),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("CKAN Sync CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let endpoint = cli
        .endpoint
        .ok_or_else(|| format!("API endpoint required (--endpoint or {ENDPOINT_VAR})"))?;
    let api_key = cli
        .api_key
        .ok_or_else(|| format!("API key required (--api-key or {API_KEY_VAR})"))?;
    let mut config = SyncConfig::new(endpoint, api_key);
    if let Some(seconds) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(seconds));
    }
    let ctx = Context::open(config, cli.store, cli.notices)?;

    match cli.command {
        Commands::Save {
            kind,
            id,
            status,
            fields,
            autosave,
        } => {
            let edit = Edit {
                id,
                status: status.map(PostStatus::from),
                fields,
                autosave,
            };
            commands::lifecycle::save(&ctx, kind.into(), edit)?;
        }
        Commands::Trash { kind, ids } => {
            let event = LifecycleEvent::bulk(LifecycleKind::Trashed, ids);
            commands::lifecycle::run(&ctx, kind.into(), event)?;
        }
        Commands::Untrash { kind, ids, undo } => {
            let event = match undo {
                Some(undo) => LifecycleEvent::undo(&undo),
                None => LifecycleEvent::bulk(LifecycleKind::Untrashed, ids),
            };
            commands::lifecycle::run(&ctx, kind.into(), event)?;
        }
        Commands::Delete { kind, ids } => {
            let event = LifecycleEvent::bulk(LifecycleKind::PermanentlyDeleted, ids);
            commands::lifecycle::run(&ctx, kind.into(), event)?;
        }
        Commands::Notices { kind } => {
            let kinds = match kind {
                Some(kind) => vec![kind.into()],
                None => EntityKind::ALL.to_vec(),
            };
            commands::notices::run(&ctx, &kinds)?;
        }
        Commands::Options { resource, exclude } => {
            let resource = match resource {
                Listable::Organization => ResourceType::Organization,
                Listable::Group => ResourceType::Group,
            };
            commands::options::run(&ctx, resource, exclude.as_deref())?;
        }
        Commands::Harvest(command) => {
            commands::harvest::run(&ctx, command.into())?;
        }
        Commands::Import { file } => {
            commands::import::run(&ctx, &file)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
