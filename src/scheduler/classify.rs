//! Label-driven scheduling categories.
//!
//! Every item falls into exactly one [`SchedulingCategory`]. When an item
//! carries markers from several sets, the first match in this order wins:
//!
//! | Order | Category                  | Default markers                                   |
//! |-------|---------------------------|---------------------------------------------------|
//! | 1     | `InProgress`              | `ai:implementing`, `ai:pr-created`, `ai:completed`, `done`, `closed` (and any closed item) |
//! | 2     | `NeedsHumanIntervention`  | `ai:failed`, `ai:test-failed`, `ai:review-failed`, `ai:security-failed`, `ai:pr-failed` |
//! | 3     | `Blocked`                 | `blocked`, `waiting`, `dependency`                |
//! | 4     | `Skip`                    | `wontfix`, `duplicate`, `skip`                    |
//! | 5     | `Ready`                   | everything else                                   |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::WorkItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingCategory {
    InProgress,
    NeedsHumanIntervention,
    Blocked,
    Skip,
    Ready,
}

impl SchedulingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::NeedsHumanIntervention => "needs_human_intervention",
            Self::Blocked => "blocked",
            Self::Skip => "skip",
            Self::Ready => "ready",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for SchedulingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker label sets, one per excluded category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    #[serde(default = "default_in_progress")]
    pub in_progress: Vec<String>,
    #[serde(default = "default_needs_human")]
    pub needs_human: Vec<String>,
    #[serde(default = "default_blocked")]
    pub blocked: Vec<String>,
    #[serde(default = "default_skip")]
    pub skip: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_in_progress() -> Vec<String> {
    strings(&["ai:implementing", "ai:pr-created", "ai:completed", "done", "closed"])
}

fn default_needs_human() -> Vec<String> {
    strings(&[
        "ai:failed",
        "ai:test-failed",
        "ai:review-failed",
        "ai:security-failed",
        "ai:pr-failed",
    ])
}

fn default_blocked() -> Vec<String> {
    strings(&["blocked", "waiting", "dependency"])
}

fn default_skip() -> Vec<String> {
    strings(&["wontfix", "duplicate", "skip"])
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            in_progress: default_in_progress(),
            needs_human: default_needs_human(),
            blocked: default_blocked(),
            skip: default_skip(),
        }
    }
}

impl LabelPolicy {
    /// Classify one item. Closed items count as completed work.
    pub fn classify(&self, item: &WorkItem) -> SchedulingCategory {
        if item.is_closed() || item.has_any_label(&self.in_progress) {
            SchedulingCategory::InProgress
        } else if item.has_any_label(&self.needs_human) {
            SchedulingCategory::NeedsHumanIntervention
        } else if item.has_any_label(&self.blocked) {
            SchedulingCategory::Blocked
        } else if item.has_any_label(&self.skip) {
            SchedulingCategory::Skip
        } else {
            SchedulingCategory::Ready
        }
    }

    /// Label the CLI applies when it claims a picked item.
    pub fn claim_label(&self) -> Option<&str> {
        self.in_progress.first().map(String::as_str)
    }
}
