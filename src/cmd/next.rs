//! `shipyard next`: select the next issue and write the hand-off file.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use shipyard::handoff;
use shipyard::scheduler::Selection;
use shipyard::tracker;

use super::{Prefetch, Verdict, load_config, load_pool};
use crate::Cli;

pub async fn cmd_next(
    cli: &Cli,
    project_dir: &Path,
    force: Option<u64>,
    snapshot_file: Option<&Path>,
    claim: bool,
) -> Result<Verdict> {
    let config = load_config(cli, project_dir)?;
    let scheduler = config.scheduler()?;
    let policy = config.selection_policy(force)?;

    let pool = load_pool(&config, &scheduler, snapshot_file, Prefetch::Selection(&policy)).await?;

    let selection = scheduler.select_next(&pool.items, &policy, &pool.snapshot);
    let handoff_path = config.handoff_path();
    let written = handoff::record(&selection, scheduler.priority(), &handoff_path)?;
    tracing::debug!(outcome = selection.reason_code(), "selection finished");

    match &selection {
        Selection::Selected(pick) => {
            let tag = if pick.forced { " (forced)" } else { "" };
            println!(
                "{} Next issue: #{} [{}] {}{}",
                style("✓").green(),
                pick.item.id,
                scheduler.priority().label_for(pick.rank),
                pick.item.title,
                tag
            );
            if written.is_some() {
                println!("  Hand-off written to {}", handoff_path.display());
            }
        }
        Selection::NoRunnable { evaluated, blocked } => {
            println!(
                "{} No runnable issue ({} candidates, {} waiting on dependencies)",
                style("⏸").yellow(),
                evaluated,
                blocked.len()
            );
            for id in blocked {
                println!("  #{} is blocked by open or unknown dependencies", id);
            }
        }
        Selection::ForcedClosed { id } => {
            println!(
                "{} Forced issue #{} is already closed; nothing selected",
                style("⚠").yellow(),
                id
            );
        }
        Selection::ForcedUnavailable { id, error } => {
            println!(
                "{} Forced issue #{} could not be loaded: {}",
                style("⚠").yellow(),
                id,
                error
            );
        }
    }

    if claim && let Some(picked) = selection.item() {
        let client = pool
            .tracker
            .as_ref()
            .context("--claim needs the live tracker")?;
        let label = scheduler
            .labels()
            .claim_label()
            .context("No in_progress label configured to claim with")?;
        tracker::claim(client, picked.id, label, &config.toml.pickup.labels).await?;
        println!("  Claimed #{} with label '{}'", picked.id, label);
    }

    Ok(Verdict::Pass)
}
