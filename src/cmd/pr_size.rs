//! `shipyard pr-size`: check a change against the file and line limits.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use shipyard::config::ShipyardConfig;
use shipyard::pr_size::{check, fetch_pr_stat, parse_stat};

use super::Verdict;

pub async fn cmd_pr_size(project_dir: &Path, number: Option<u64>, stat_file: Option<&Path>) -> Result<Verdict> {
    let config = ShipyardConfig::new(project_dir.to_path_buf())?;

    let text = match (stat_file, number) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stat file: {}", path.display()))?,
        (None, Some(number)) => fetch_pr_stat(number, &config.project_dir).await?,
        (None, None) => bail!("Pass a pull request number or --stat-file"),
    };

    let verdict = check(parse_stat(&text), config.toml.size_limits());
    let stat = &verdict.stat;
    let limits = &verdict.limits;

    let mark = |over: bool| if over { style("✗").red() } else { style("✓").green() };
    println!(
        "{} {} files changed (limit {})",
        mark(verdict.too_many_files),
        stat.file_count(),
        limits.max_files
    );
    println!(
        "{} {} lines changed, +{} -{} (limit {})",
        mark(verdict.too_many_lines),
        stat.total_lines(),
        stat.additions,
        stat.deletions,
        limits.max_lines
    );

    if !verdict.passed() {
        println!("Split this change into smaller pull requests.");
    }

    Ok(Verdict::from_passed(verdict.passed()))
}
