//! Work item model shared by the scheduler, the tracker client and the CLI.
//!
//! A [`WorkItem`] is a read-only snapshot of one tracker issue. Priority is
//! derived from labels through a [`PriorityScheme`], which maps a fixed,
//! ordered tag vocabulary onto a [`PriorityRank`].

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Lifecycle state as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Open,
    Closed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid item state: {}", s)),
        }
    }
}

/// One unit of work (an issue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub state: ItemState,
}

impl WorkItem {
    pub fn new(id: u64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: String::new(),
            labels: Vec::new(),
            state: ItemState::Open,
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    pub fn closed(self) -> Self {
        self.with_state(ItemState::Closed)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn has_any_label(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| self.has_label(l))
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// Position of an item in the priority order; lower is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PriorityRank(pub usize);

impl PriorityRank {
    pub fn value(self) -> usize {
        self.0
    }
}

// Localized urgency words accepted in bodies when body fallback is on.
static URGENT_WORDS: &[&str] = &["最高優先", "緊急"];
static HIGH_WORDS: &[&str] = &["高優先"];

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_:\-]+").unwrap());

/// Ordered priority vocabulary, most urgent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityScheme {
    tags: Vec<String>,
    body_fallback: bool,
}

impl Default for PriorityScheme {
    fn default() -> Self {
        Self {
            tags: default_priority_tags(),
            body_fallback: false,
        }
    }
}

/// `P0` through `P3`.
pub fn default_priority_tags() -> Vec<String> {
    (0..=3).map(|i| format!("P{}", i)).collect()
}

impl PriorityScheme {
    pub fn new(tags: Vec<String>) -> Result<Self, ConfigError> {
        if tags.is_empty() {
            return Err(ConfigError::NoPriorityTags);
        }
        for (i, tag) in tags.iter().enumerate() {
            if tags[..i].contains(tag) {
                return Err(ConfigError::DuplicatePriorityTag(tag.clone()));
            }
        }
        Ok(Self {
            tags,
            body_fallback: false,
        })
    }

    /// Also look for a priority token in the body when no label matches.
    pub fn with_body_fallback(mut self, enabled: bool) -> Self {
        self.body_fallback = enabled;
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Rank given to items without any recognized priority.
    pub fn lowest(&self) -> PriorityRank {
        PriorityRank(self.tags.len())
    }

    /// Rank of an item: the first scheme tag present among its labels wins.
    pub fn rank(&self, item: &WorkItem) -> PriorityRank {
        if let Some(idx) = self.tags.iter().position(|t| item.has_label(t)) {
            return PriorityRank(idx);
        }
        if self.body_fallback
            && let Some(rank) = self.rank_from_body(&item.body)
        {
            return rank;
        }
        self.lowest()
    }

    /// Display name of a rank (`P1`, or `none` for the lowest rank).
    pub fn label_for(&self, rank: PriorityRank) -> &str {
        self.tags.get(rank.0).map(String::as_str).unwrap_or("none")
    }

    fn rank_from_body(&self, body: &str) -> Option<PriorityRank> {
        let best_token = TOKEN_REGEX
            .find_iter(body)
            .filter_map(|m| self.tags.iter().position(|t| t == m.as_str()))
            .min();
        if let Some(idx) = best_token {
            return Some(PriorityRank(idx));
        }
        if URGENT_WORDS.iter().any(|w| body.contains(w)) {
            return Some(PriorityRank(0));
        }
        if HIGH_WORDS.iter().any(|w| body.contains(w)) {
            return Some(PriorityRank(1.min(self.tags.len())));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, labels: &[&str]) -> WorkItem {
        WorkItem::new(id, &format!("Item {}", id)).with_labels(labels)
    }

    #[test]
    fn test_item_state_from_str() {
        assert_eq!("open".parse::<ItemState>().unwrap(), ItemState::Open);
        assert_eq!("CLOSED".parse::<ItemState>().unwrap(), ItemState::Closed);
        assert!("merged".parse::<ItemState>().is_err());
    }

    #[test]
    fn test_work_item_deserialize_defaults() {
        let json = r#"{"id": 3, "title": "Setup"}"#;
        let item: WorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 3);
        assert!(item.body.is_empty());
        assert!(item.labels.is_empty());
        assert_eq!(item.state, ItemState::Open);
    }

    #[test]
    fn test_rank_follows_tag_order() {
        let scheme = PriorityScheme::default();
        assert_eq!(scheme.rank(&item(1, &["P0"])), PriorityRank(0));
        assert_eq!(scheme.rank(&item(2, &["bug", "P2"])), PriorityRank(2));
    }

    #[test]
    fn test_rank_without_tag_is_lowest() {
        let scheme = PriorityScheme::default();
        assert_eq!(scheme.rank(&item(1, &["ai:ready"])), scheme.lowest());
        assert_eq!(scheme.lowest(), PriorityRank(4));
    }

    #[test]
    fn test_rank_uses_most_urgent_of_several_tags() {
        let scheme = PriorityScheme::default();
        assert_eq!(scheme.rank(&item(1, &["P3", "P1"])), PriorityRank(1));
    }

    #[test]
    fn test_rank_requires_exact_label_match() {
        let scheme = PriorityScheme::default();
        assert_eq!(scheme.rank(&item(1, &["p0"])), scheme.lowest());
        assert_eq!(scheme.rank(&item(2, &["P0-urgent"])), scheme.lowest());
    }

    #[test]
    fn test_body_fallback_disabled_by_default() {
        let scheme = PriorityScheme::default();
        let it = WorkItem::new(1, "x").with_body("This is P0");
        assert_eq!(scheme.rank(&it), scheme.lowest());
    }

    #[test]
    fn test_body_fallback_token() {
        let scheme = PriorityScheme::default().with_body_fallback(true);
        let it = WorkItem::new(1, "x").with_body("Priority: P1, see notes");
        assert_eq!(scheme.rank(&it), PriorityRank(1));
    }

    #[test]
    fn test_body_fallback_ignores_embedded_token() {
        let scheme = PriorityScheme::default().with_body_fallback(true);
        let it = WorkItem::new(1, "x").with_body("see XP0Y for details");
        assert_eq!(scheme.rank(&it), scheme.lowest());
    }

    #[test]
    fn test_body_fallback_localized_words() {
        let scheme = PriorityScheme::default().with_body_fallback(true);
        let urgent = WorkItem::new(1, "x").with_body("緊急の対応が必要");
        let high = WorkItem::new(2, "y").with_body("高優先で進める");
        assert_eq!(scheme.rank(&urgent), PriorityRank(0));
        assert_eq!(scheme.rank(&high), PriorityRank(1));
    }

    #[test]
    fn test_label_wins_over_body() {
        let scheme = PriorityScheme::default().with_body_fallback(true);
        let it = item(1, &["P2"]).with_body("P0");
        assert_eq!(scheme.rank(&it), PriorityRank(2));
    }

    #[test]
    fn test_scheme_rejects_empty_and_duplicates() {
        assert!(matches!(
            PriorityScheme::new(vec![]),
            Err(ConfigError::NoPriorityTags)
        ));
        assert!(matches!(
            PriorityScheme::new(vec!["P0".into(), "P0".into()]),
            Err(ConfigError::DuplicatePriorityTag(_))
        ));
    }

    #[test]
    fn test_label_for_rank() {
        let scheme = PriorityScheme::default();
        assert_eq!(scheme.label_for(PriorityRank(1)), "P1");
        assert_eq!(scheme.label_for(scheme.lowest()), "none");
    }
}
