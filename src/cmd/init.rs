//! `shipyard init`.

use std::path::Path;

use anyhow::Result;
use console::style;
use shipyard::config::CONFIG_FILE;
use shipyard::init::init_project;

use super::Verdict;

pub fn cmd_init(project_dir: &Path) -> Result<Verdict> {
    let result = init_project(project_dir)?;

    if result.created {
        println!("{} Created {}", style("✓").green(), result.shipyard_dir.display());
    } else {
        println!("{} already exists", result.shipyard_dir.display());
    }

    let config_path = result.shipyard_dir.join(CONFIG_FILE);
    if result.config_written {
        println!("{} Wrote default {}", style("✓").green(), config_path.display());
        println!();
        println!("Next steps:");
        println!("  1. Set [tracker] repo in {} (or export GITHUB_REPOSITORY)", CONFIG_FILE);
        println!("  2. Export GITHUB_TOKEN");
        println!("  3. Run 'shipyard next'");
    } else {
        println!("{} left unchanged", config_path.display());
    }

    Ok(Verdict::Pass)
}
