use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(version, about = "Pick the next ready issue for an automated delivery pipeline")]
pub struct Cli {
    /// Debug-level logs (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Repository as owner/repo. Overrides GITHUB_REPOSITORY and shipyard.toml.
    #[arg(long, global = true)]
    pub repo: Option<String>,

    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .shipyard/ with a default shipyard.toml
    Init,
    /// Select the next issue and write the hand-off file
    Next {
        /// Pick this issue regardless of priority and dependencies
        #[arg(long)]
        force: Option<u64>,

        /// Read the pool from a JSON file instead of the tracker
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Mark the picked issue as in progress on the tracker
        #[arg(long, conflicts_with = "snapshot")]
        claim: bool,
    },
    /// Check whether an issue's dependencies are all closed
    Deps {
        id: u64,

        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Classify every issue and write out/prioritized_issues.json
    Triage {
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Scan a source tree for hardcoded secrets and risky code
    Scan {
        /// Directory to scan (defaults to the project directory)
        path: Option<PathBuf>,
    },
    /// Check a pull request against the size limits
    PrSize {
        /// Pull request number (fetched with `gh pr diff --stat`)
        #[arg(required_unless_present = "stat_file")]
        number: Option<u64>,

        /// Read `git diff --stat` output from a file instead
        #[arg(long)]
        stat_file: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let fallback = if verbose { "shipyard=debug" } else { "shipyard=info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(false).try_init(),
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    // A missing .env is normal.
    let _ = dotenvy::from_path(project_dir.join(".env"));

    let verdict = match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Next {
            force,
            snapshot,
            claim,
        } => cmd::cmd_next(&cli, &project_dir, *force, snapshot.as_deref(), *claim).await?,
        Commands::Deps { id, snapshot } => cmd::cmd_deps(&cli, &project_dir, *id, snapshot.as_deref()).await?,
        Commands::Triage { snapshot } => cmd::cmd_triage(&cli, &project_dir, snapshot.as_deref()).await?,
        Commands::Scan { path } => cmd::cmd_scan(&project_dir, path.as_deref())?,
        Commands::PrSize { number, stat_file } => {
            cmd::cmd_pr_size(&project_dir, *number, stat_file.as_deref()).await?
        }
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command.clone())?,
    };

    if verdict == cmd::Verdict::Fail {
        std::process::exit(1);
    }
    Ok(())
}
