//! Configuration view and validation commands: `shipyard config`.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use shipyard::handoff::Handoff;
use shipyard::init::is_initialized;

use super::{Verdict, load_config};
use crate::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<Verdict> {
    let config = load_config(cli, project_dir)?;
    let config_path = config.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Shipyard Configuration");
            println!("======================");
            println!();

            if is_initialized(&config.project_dir) {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No shipyard.toml found at {}; using defaults.", config_path.display());
            }
            println!();

            let rendered = toml::to_string_pretty(&config.toml).context("Failed to render configuration")?;
            println!("{}", rendered.trim_end());
            println!();

            println!("Effective values (with env/CLI overrides):");
            match config.repo() {
                Ok(repo) => println!("  repo = \"{}\"", repo),
                Err(_) => println!("  repo = (not set)"),
            }
            println!(
                "  token = {}",
                if config.token().is_ok() {
                    format!("set (from {})", config.toml.tracker.token_env)
                } else {
                    "(not set)".to_string()
                }
            );
            if let Ok(policy) = config.selection_policy(None)
                && let Some(id) = policy.forced_id
            {
                println!("  forced issue = #{}", id);
            }
            println!();

            let handoff_path = config.handoff_path();
            if handoff_path.exists() {
                match Handoff::load(&handoff_path) {
                    Ok(handoff) => println!(
                        "Current hand-off: #{} [{}] {}",
                        handoff.issue_number, handoff.priority, handoff.title
                    ),
                    Err(e) => println!("{} Hand-off file unreadable: {:#}", style("⚠").yellow(), e),
                }
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("{} Configuration is valid.", style("✓").green());
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(Verdict::Pass)
}
