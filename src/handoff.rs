//! The hand-off file read by downstream pipeline stages.
//!
//! Exactly one pick is ever on disk: a pick overwrites the file, and every
//! other outcome removes it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::PriorityScheme;
use crate::scheduler::{Pick, Selection};

pub const DEFAULT_HANDOFF_PATH: &str = "out/next_issue.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub issue_number: u64,
    pub title: String,
    pub priority: String,
    #[serde(default)]
    pub forced: bool,
}

impl Handoff {
    pub fn from_pick(pick: &Pick, scheme: &PriorityScheme) -> Self {
        Self {
            issue_number: pick.item.id,
            title: pick.item.title.clone(),
            priority: scheme.label_for(pick.rank).to_string(),
            forced: pick.forced,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read hand-off file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse hand-off file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize hand-off")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write hand-off file: {}", path.display()))
    }
}

/// Delete a stale hand-off file. Returns whether one existed.
pub fn clear(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove hand-off file: {}", path.display())),
    }
}

/// Write the pick, or clear the file for any other outcome.
pub fn record(selection: &Selection, scheme: &PriorityScheme, path: &Path) -> Result<Option<Handoff>> {
    match selection {
        Selection::Selected(pick) => {
            let handoff = Handoff::from_pick(pick, scheme);
            handoff.save(path)?;
            Ok(Some(handoff))
        }
        _ => {
            if clear(path)? {
                tracing::debug!(path = %path.display(), "removed stale hand-off file");
            }
            Ok(None)
        }
    }
}
