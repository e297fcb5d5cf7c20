//! Typed error hierarchy for Shipyard.
//!
//! Three top-level enums cover the three seams:
//! - `LookupError`: the dependency lookup capability (every variant means "unresolved")
//! - `TrackerError`: the hosted issue tracker client
//! - `ConfigError`: invalid values in `shipyard.toml`

use thiserror::Error;

/// Failure of a single `ItemLookup::lookup` call.
///
/// The scheduler never treats any of these as a satisfied dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Work item #{id} not found")]
    NotFound { id: u64 },

    #[error("Work item #{id} could not be fetched: {reason}")]
    Unavailable { id: u64, reason: String },

    #[error("Lookup budget of {limit} calls exhausted before resolving #{id}")]
    BudgetExhausted { id: u64, limit: usize },
}

impl LookupError {
    /// The id whose lookup failed.
    pub fn id(&self) -> u64 {
        match self {
            Self::NotFound { id } | Self::Unavailable { id, .. } | Self::BudgetExhausted { id, .. } => {
                *id
            }
        }
    }
}

/// Errors from the issue tracker client.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Tracker returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode tracker response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No tracker token found; set {env_var} or GH_TOKEN")]
    MissingToken { env_var: String },

    #[error("Invalid repository slug '{0}': expected owner/repo")]
    InvalidRepo(String),

    #[error("Issue #{number} not found")]
    IssueNotFound { number: u64 },

    #[error("Cannot build a request URL from '{0}'")]
    InvalidUrl(String),
}

/// Errors raised while validating configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Dependency marker must not be empty")]
    EmptyMarker,

    #[error("Failed to compile dependency pattern: {0}")]
    InvalidMarker(#[from] regex::Error),

    #[error("Priority tag list must contain at least one tag")]
    NoPriorityTags,

    #[error("Duplicate priority tag '{0}'")]
    DuplicatePriorityTag(String),
}
