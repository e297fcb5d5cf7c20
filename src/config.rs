//! Layered configuration read from `.shipyard/shipyard.toml`.
//!
//! Values resolve file → environment → CLI. Every field has a default, so a
//! missing file or a partial file is fine.
//!
//! # Configuration File Format
//!
//! ```toml
//! [tracker]
//! repo = "acme/app"
//! api_url = "https://api.github.com"
//! token_env = "GITHUB_TOKEN"
//!
//! [pickup]
//! labels = ["ai:ready"]
//!
//! [labels]
//! in_progress = ["ai:implementing", "ai:pr-created", "ai:completed", "done", "closed"]
//! needs_human = ["ai:failed", "ai:test-failed"]
//! blocked = ["blocked", "waiting", "dependency"]
//! skip = ["wontfix", "duplicate", "skip"]
//!
//! [priority]
//! tags = ["P0", "P1", "P2", "P3"]
//! body_fallback = false
//!
//! [dependencies]
//! extra_markers = ["Blocked by"]
//! max_lookups = 50
//!
//! [handoff]
//! path = "out/next_issue.json"
//!
//! [triage]
//! report_path = "out/prioritized_issues.json"
//!
//! [scan]
//! exclude_dirs = [".git", "node_modules", "target"]
//! fail_on = "critical"
//!
//! [pr]
//! max_files = 10
//! max_lines = 500
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, TrackerError};
use crate::handoff::DEFAULT_HANDOFF_PATH;
use crate::init::SHIPYARD_DIR;
use crate::model::{PriorityScheme, default_priority_tags};
use crate::pr_size::{DEFAULT_MAX_FILES, DEFAULT_MAX_LINES, SizeLimits};
use crate::scan::{DEFAULT_REPORT_PATH, SecurityScanner, Severity, default_exclude_dirs};
use crate::scheduler::triage::DEFAULT_REPORT_PATH as DEFAULT_TRIAGE_PATH;
use crate::scheduler::{DependencyParser, LabelPolicy, Scheduler, SelectionPolicy};
use crate::tracker::GitHubClient;
use crate::tracker::github::{DEFAULT_API_URL, is_valid_github_token, parse_repo_slug};

pub const CONFIG_FILE: &str = "shipyard.toml";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_MAX_LOOKUPS: usize = 50;

/// Fallback token variable used by the GitHub CLI.
const GH_TOKEN_ENV: &str = "GH_TOKEN";
const REPO_ENV: &str = "GITHUB_REPOSITORY";
const FORCE_ENV: &str = "FORCE_ISSUE";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_pickup_labels() -> Vec<String> {
    vec!["ai:ready".to_string()]
}

fn default_max_lookups() -> usize {
    DEFAULT_MAX_LOOKUPS
}

fn default_handoff_path() -> String {
    DEFAULT_HANDOFF_PATH.to_string()
}

fn default_triage_path() -> String {
    DEFAULT_TRIAGE_PATH.to_string()
}

fn default_report_path() -> String {
    DEFAULT_REPORT_PATH.to_string()
}

fn default_fail_on() -> Severity {
    Severity::Critical
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSection {
    /// `owner/repo`; `GITHUB_REPOSITORY` or `--repo` override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            repo: None,
            api_url: default_api_url(),
            token_env: default_token_env(),
        }
    }
}

/// Which issues are fetched as the candidate pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupSection {
    #[serde(default = "default_pickup_labels")]
    pub labels: Vec<String>,
}

impl Default for PickupSection {
    fn default() -> Self {
        Self {
            labels: default_pickup_labels(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySection {
    /// Most urgent first.
    #[serde(default = "default_priority_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub body_fallback: bool,
}

impl Default for PrioritySection {
    fn default() -> Self {
        Self {
            tags: default_priority_tags(),
            body_fallback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesSection {
    /// Literal markers accepted in addition to the built-in ones.
    #[serde(default)]
    pub extra_markers: Vec<String>,
    #[serde(default = "default_max_lookups")]
    pub max_lookups: usize,
}

impl Default for DependenciesSection {
    fn default() -> Self {
        Self {
            extra_markers: Vec::new(),
            max_lookups: default_max_lookups(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffSection {
    #[serde(default = "default_handoff_path")]
    pub path: String,
}

impl Default for HandoffSection {
    fn default() -> Self {
        Self {
            path: default_handoff_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageSection {
    #[serde(default = "default_triage_path")]
    pub report_path: String,
}

impl Default for TriageSection {
    fn default() -> Self {
        Self {
            report_path: default_triage_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSection {
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    #[serde(default = "default_report_path")]
    pub report_path: String,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            exclude_dirs: default_exclude_dirs(),
            fail_on: default_fail_on(),
            report_path: default_report_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrSection {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for PrSection {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_lines: default_max_lines(),
        }
    }
}

/// The complete shipyard.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipyardToml {
    #[serde(default)]
    pub tracker: TrackerSection,
    #[serde(default)]
    pub pickup: PickupSection,
    #[serde(default)]
    pub labels: LabelPolicy,
    #[serde(default)]
    pub priority: PrioritySection,
    #[serde(default)]
    pub dependencies: DependenciesSection,
    #[serde(default)]
    pub handoff: HandoffSection,
    #[serde(default)]
    pub triage: TriageSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub pr: PrSection,
}

impl ShipyardToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse shipyard.toml")
    }

    /// Load `.shipyard/shipyard.toml`, or defaults if the file doesn't exist.
    pub fn load_or_default(shipyard_dir: &Path) -> Result<Self> {
        let config_path = shipyard_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize shipyard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn priority_scheme(&self) -> Result<PriorityScheme, ConfigError> {
        Ok(PriorityScheme::new(self.priority.tags.clone())?.with_body_fallback(self.priority.body_fallback))
    }

    pub fn dependency_parser(&self) -> Result<DependencyParser, ConfigError> {
        DependencyParser::with_extra_markers(&self.dependencies.extra_markers)
    }

    /// Scheduler for passes over a prefetched snapshot. Snapshot lookups are
    /// free, so `max_lookups` is not applied here; it bounds the remote
    /// fetches of `tracker::prefetch_for_selection` instead.
    pub fn scheduler(&self) -> Result<Scheduler, ConfigError> {
        Ok(Scheduler::new(
            self.labels.clone(),
            self.priority_scheme()?,
            self.dependency_parser()?,
        ))
    }

    pub fn scanner(&self) -> SecurityScanner {
        SecurityScanner::new(self.scan.exclude_dirs.clone(), self.scan.fail_on)
    }

    pub fn size_limits(&self) -> SizeLimits {
        SizeLimits {
            max_files: self.pr.max_files,
            max_lines: self.pr.max_lines,
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.priority_scheme() {
            warnings.push(format!("[priority] {}", e));
        }
        if let Err(e) = self.dependency_parser() {
            warnings.push(format!("[dependencies] {}", e));
        }
        if self.dependencies.max_lookups == 0 {
            warnings.push(
                "[dependencies] max_lookups = 0: every item with a dependency outside the pool will be blocked"
                    .to_string(),
            );
        }
        if self.pickup.labels.is_empty() {
            warnings.push("[pickup] labels is empty: every open issue becomes a candidate".to_string());
        }

        let excluded = [
            ("in_progress", &self.labels.in_progress),
            ("needs_human", &self.labels.needs_human),
            ("blocked", &self.labels.blocked),
            ("skip", &self.labels.skip),
        ];
        for label in &self.pickup.labels {
            for (set, labels) in &excluded {
                if labels.contains(label) {
                    warnings.push(format!(
                        "Pickup label '{}' is also in [labels] {}: no candidate can ever be ready",
                        label, set
                    ));
                }
            }
        }
        for tag in &self.priority.tags {
            for (set, labels) in &excluded {
                if labels.contains(tag) {
                    warnings.push(format!("Priority tag '{}' is also in [labels] {}", tag, set));
                }
            }
        }

        if let Some(repo) = &self.tracker.repo
            && parse_repo_slug(repo).is_err()
        {
            warnings.push(format!("[tracker] repo '{}' is not in owner/repo form", repo));
        }
        if self.pr.max_files == 0 || self.pr.max_lines == 0 {
            warnings.push("[pr] a zero limit rejects every pull request".to_string());
        }

        warnings
    }
}

/// Values taken from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub force_issue: Option<String>,
}

impl EnvOverrides {
    /// Read the token from `token_env`, falling back to `GH_TOKEN`.
    /// Empty values count as unset.
    pub fn from_env(token_env: &str) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            token: read(token_env).or_else(|| read(GH_TOKEN_ENV)),
            repo: read(REPO_ENV),
            force_issue: read(FORCE_ENV),
        }
    }
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct ShipyardConfig {
    pub project_dir: PathBuf,
    pub shipyard_dir: PathBuf,
    pub toml: ShipyardToml,
    pub env: EnvOverrides,
    /// CLI override for the repository.
    pub cli_repo: Option<String>,
}

impl ShipyardConfig {
    /// Load the file and the environment for `project_dir`.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory: {}", project_dir.display()))?;
        let shipyard_dir = project_dir.join(SHIPYARD_DIR);
        let toml = ShipyardToml::load_or_default(&shipyard_dir)?;
        let env = EnvOverrides::from_env(&toml.tracker.token_env);

        Ok(Self::from_parts(project_dir, toml, env))
    }

    pub fn from_parts(project_dir: PathBuf, toml: ShipyardToml, env: EnvOverrides) -> Self {
        Self {
            shipyard_dir: project_dir.join(SHIPYARD_DIR),
            project_dir,
            toml,
            env,
            cli_repo: None,
        }
    }

    pub fn with_cli_repo(mut self, repo: Option<String>) -> Self {
        self.cli_repo = repo;
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.shipyard_dir.join(CONFIG_FILE)
    }

    /// Repository slug (CLI → env → file).
    pub fn repo(&self) -> Result<String, TrackerError> {
        let raw = self
            .cli_repo
            .as_ref()
            .or(self.env.repo.as_ref())
            .or(self.toml.tracker.repo.as_ref())
            .ok_or_else(|| TrackerError::InvalidRepo(String::new()))?;
        parse_repo_slug(raw)
    }

    pub fn token(&self) -> Result<&str, TrackerError> {
        self.env
            .token
            .as_deref()
            .ok_or_else(|| TrackerError::MissingToken {
                env_var: self.toml.tracker.token_env.clone(),
            })
    }

    /// Forced id (CLI → `FORCE_ISSUE`). An unparseable env value is an error,
    /// not a silent fallback to normal selection.
    pub fn selection_policy(&self, cli_force: Option<u64>) -> Result<SelectionPolicy> {
        let forced_id = match (cli_force, &self.env.force_issue) {
            (Some(id), _) => Some(id),
            (None, Some(raw)) => Some(
                raw.trim()
                    .trim_start_matches('#')
                    .parse::<u64>()
                    .with_context(|| format!("Invalid {} value: '{}'", FORCE_ENV, raw))?,
            ),
            (None, None) => None,
        };
        Ok(SelectionPolicy { forced_id })
    }

    pub fn scheduler(&self) -> Result<Scheduler> {
        self.toml.scheduler().context("Invalid scheduling configuration")
    }

    pub fn handoff_path(&self) -> PathBuf {
        self.project_dir.join(&self.toml.handoff.path)
    }

    pub fn scan_report_path(&self) -> PathBuf {
        self.project_dir.join(&self.toml.scan.report_path)
    }

    pub fn triage_report_path(&self) -> PathBuf {
        self.project_dir.join(&self.toml.triage.report_path)
    }

    pub fn tracker(&self) -> Result<GitHubClient> {
        let repo = self.repo().context(
            "No repository configured; set [tracker] repo, GITHUB_REPOSITORY, or pass --repo",
        )?;
        let token = self.token()?;
        Ok(GitHubClient::new(&self.toml.tracker.api_url, &repo, token)?)
    }

    /// File warnings plus environment checks.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if let Some(token) = &self.env.token
            && !is_valid_github_token(token)
        {
            warnings.push("Tracker token does not look like a GitHub token".to_string());
        }
        if let Some(raw) = &self.env.force_issue
            && raw.trim().trim_start_matches('#').parse::<u64>().is_err()
        {
            warnings.push(format!("{} '{}' is not an issue number", FORCE_ENV, raw));
        }
        warnings
    }
}
