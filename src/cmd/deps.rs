//! `shipyard deps <id>`: dependency check for a single issue.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use shipyard::lookup::{ItemLookup, Snapshot};
use shipyard::scheduler::UnresolvedCause;
use shipyard::tracker::{self, Tracker};

use super::{Verdict, load_config};
use crate::Cli;

pub async fn cmd_deps(cli: &Cli, project_dir: &Path, id: u64, snapshot_file: Option<&Path>) -> Result<Verdict> {
    let config = load_config(cli, project_dir)?;
    let scheduler = config.scheduler()?;

    let (item, snapshot) = match snapshot_file {
        Some(path) => {
            let snapshot = Snapshot::load(path)?;
            let item = snapshot
                .lookup(id)
                .with_context(|| format!("Issue #{} is not in {}", id, path.display()))?;
            (item, snapshot)
        }
        None => {
            let client = config.tracker()?;
            let item = client.get_issue(id).await?;
            let mut snapshot = Snapshot::from_items([item.clone()]);
            tracker::fetch_into(&client, &mut snapshot, scheduler.parser().extract(&item.body)).await;
            (item, snapshot)
        }
    };

    let report = scheduler.check_dependencies(&item.body, &snapshot);
    if report.referenced.is_empty() {
        println!("{} #{} declares no dependencies", style("✓").green(), id);
        return Ok(Verdict::Pass);
    }

    for dep in &report.referenced {
        match report.unresolved.iter().find(|u| u.id == *dep) {
            None => println!("  {} #{} closed", style("✓").green(), dep),
            Some(u) => match &u.cause {
                UnresolvedCause::NotClosed { state } => {
                    println!("  {} #{} is {}", style("✗").red(), dep, state)
                }
                UnresolvedCause::LookupFailed { error } => {
                    println!("  {} #{} unknown: {}", style("✗").red(), dep, error)
                }
            },
        }
    }

    if report.is_resolved() {
        println!("{} All dependencies of #{} are closed", style("✓").green(), id);
        Ok(Verdict::Pass)
    } else {
        println!(
            "{} #{} is waiting on {} dependencies",
            style("⏸").yellow(),
            id,
            report.unresolved.len()
        );
        Ok(Verdict::Fail)
    }
}
