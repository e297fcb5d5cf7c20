//! CLI command implementations.
//!
//! | Module    | Commands handled          |
//! |-----------|---------------------------|
//! | `next`    | `Next`                    |
//! | `deps`    | `Deps`                    |
//! | `triage`  | `Triage`                  |
//! | `scan`    | `Scan`                    |
//! | `pr_size` | `PrSize`                  |
//! | `config`  | `Config`                  |
//! | `init`    | `Init`                    |

pub mod config;
pub mod deps;
pub mod init;
pub mod next;
pub mod pr_size;
pub mod scan;
pub mod triage;

pub use config::cmd_config;
pub use deps::cmd_deps;
pub use init::cmd_init;
pub use next::cmd_next;
pub use pr_size::cmd_pr_size;
pub use scan::cmd_scan;
pub use triage::cmd_triage;

use std::path::Path;

use anyhow::Result;
use shipyard::config::ShipyardConfig;
use shipyard::lookup::Snapshot;
use shipyard::model::WorkItem;
use shipyard::scheduler::{Scheduler, SelectionPolicy};
use shipyard::tracker::{self, GitHubClient, Tracker};

use crate::Cli;

/// Process exit status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_passed(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }
}

pub(crate) fn load_config(cli: &Cli, project_dir: &Path) -> Result<ShipyardConfig> {
    Ok(ShipyardConfig::new(project_dir.to_path_buf())?.with_cli_repo(cli.repo.clone()))
}

/// The pickup pool and a lookup covering what its pass needs.
pub(crate) struct Pool {
    pub items: Vec<WorkItem>,
    pub snapshot: Snapshot,
    /// Present when the pool came from the live tracker.
    pub tracker: Option<GitHubClient>,
}

/// How much to fetch from the tracker beyond the pool itself.
pub(crate) enum Prefetch<'a> {
    /// Lazy and capped by `[dependencies] max_lookups`.
    Selection(&'a SelectionPolicy),
    /// Every dependency of every ready candidate.
    Full,
}

/// Load the pool from `snapshot_file`, or fetch it from the tracker and
/// prefetch dependencies.
pub(crate) async fn load_pool(
    config: &ShipyardConfig,
    scheduler: &Scheduler,
    snapshot_file: Option<&Path>,
    prefetch: Prefetch<'_>,
) -> Result<Pool> {
    let pickup = &config.toml.pickup.labels;

    if let Some(path) = snapshot_file {
        let snapshot = Snapshot::load(path)?;
        let items = snapshot.open_with_labels(pickup);
        tracing::info!(pool = items.len(), known = snapshot.len(), "loaded snapshot");
        return Ok(Pool {
            items,
            snapshot,
            tracker: None,
        });
    }

    let client = config.tracker()?;
    let items = client.list_open_issues(pickup).await?;
    tracing::info!(pool = items.len(), repo = client.repo(), "fetched pickup pool");
    let snapshot = match prefetch {
        Prefetch::Selection(policy) => {
            let max_fetches = config.toml.dependencies.max_lookups;
            tracker::prefetch_for_selection(&client, &items, scheduler, policy, max_fetches).await
        }
        Prefetch::Full => tracker::prefetch_snapshot(&client, &items, scheduler).await,
    };

    Ok(Pool {
        items,
        snapshot,
        tracker: Some(client),
    })
}
