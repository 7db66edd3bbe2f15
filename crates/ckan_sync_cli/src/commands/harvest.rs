//! Harvest commands.

use super::{CommandResult, Context};
use ckan_sync_engine::{has_unfinished_job, readable_datetime, HarvestClient, HarvestJob};

/// Harvest action to run.
#[derive(Debug)]
pub enum HarvestAction {
    /// List active sources.
    Sources,
    /// Show the jobs of a source (latest only unless `all`).
    Jobs {
        /// Source id.
        source_id: String,
        /// Show the whole history.
        all: bool,
    },
    /// Start a new job.
    Reharvest(String),
    /// Abort the running job.
    Abort(String),
    /// Remove all harvested datasets.
    Clear(String),
}

/// Runs a harvest action.
pub fn run(ctx: &Context, action: HarvestAction) -> CommandResult {
    let harvest = HarvestClient::new(ctx.client.clone(), ctx.config.harvest_source_ttl);

    match action {
        HarvestAction::Sources => {
            let sources = harvest.sources()?;
            if sources.is_empty() {
                println!("No harvest sources.");
            }
            for source in sources {
                println!("{}\t{}", source.id, source.title);
            }
        }
        HarvestAction::Jobs { source_id, all } => {
            let jobs = if all {
                harvest.jobs(&source_id)?
            } else {
                harvest.latest_jobs(&source_id)?
            };
            print_jobs(&jobs);
            if has_unfinished_job(&jobs) {
                println!("A job is still running.");
            }
        }
        HarvestAction::Reharvest(source_id) => {
            harvest.reharvest(&source_id)?;
            println!("Harvest job created for {}", source_id);
        }
        HarvestAction::Abort(source_id) => {
            harvest.abort(&source_id)?;
            println!("Harvest job aborted for {}", source_id);
        }
        HarvestAction::Clear(source_id) => {
            harvest.clear(&source_id)?;
            println!("Harvest source {} cleared", source_id);
        }
    }
    Ok(())
}

fn print_jobs(jobs: &[HarvestJob]) {
    if jobs.is_empty() {
        println!("No jobs.");
        return;
    }
    println!("{:<38} {:<10} {:<20} {:<20} {:<20}", "id", "status", "created", "started", "finished");
    for job in jobs {
        println!(
            "{:<38} {:<10} {:<20} {:<20} {:<20}",
            job.id,
            job.status.as_str(),
            readable_datetime(job.created.as_deref()),
            readable_datetime(job.gather_started.as_deref()),
            readable_datetime(job.gather_finished.as_deref()),
        );
    }
}
