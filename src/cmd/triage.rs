//! `shipyard triage`: classify the whole pool and write the report.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use shipyard::scheduler::build_report;

use super::{Prefetch, Verdict, load_config, load_pool};
use crate::Cli;

pub async fn cmd_triage(cli: &Cli, project_dir: &Path, snapshot_file: Option<&Path>) -> Result<Verdict> {
    let config = load_config(cli, project_dir)?;
    let scheduler = config.scheduler()?;
    let pool = load_pool(&config, &scheduler, snapshot_file, Prefetch::Full).await?;

    let report = build_report(&scheduler, &pool.items, &pool.snapshot);

    let path = config.triage_report_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(&report).context("Failed to serialize triage report")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write triage report: {}", path.display()))?;

    let s = &report.summary;
    println!("Triage of {} issues:", s.total);
    println!("  {} ready", style(s.ready).green());
    println!("  {} in progress", s.in_progress);
    println!("  {} blocked", style(s.blocked).yellow());
    println!("  {} need a human", style(s.needs_human).red());
    println!("  {} skipped", s.skip);

    match report.next_ready() {
        Some(next) => println!("Next: #{} [{}] {}", next.number, next.priority, next.title),
        None => println!("Next: none ready"),
    }
    println!("Report written to {}", path.display());

    Ok(Verdict::Pass)
}
