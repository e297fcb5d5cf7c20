//! Dependency extraction and resolution.
//!
//! Dependencies are declared in free text with one of a small set of named
//! markers followed by an issue reference:
//!
//! - `Depends on #12` (English)
//! - `依存: #12`, `依存 #12` (localized)
//! - `依存タスク: #12` (localized)
//!
//! Each marker accepts an optional `:` or `：` and optional whitespace before
//! `#<digits>`. Matching is case-insensitive. Any other phrasing is ignored.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::{ConfigError, LookupError};
use crate::lookup::ItemLookup;
use crate::model::ItemState;

/// Built-in dependency markers. Longer markers come first so alternation
/// prefers them.
pub const BUILTIN_MARKERS: &[&str] = &["Depends on", "依存タスク", "依存"];

static DEFAULT_PARSER: LazyLock<DependencyParser> = LazyLock::new(|| {
    DependencyParser::with_markers(BUILTIN_MARKERS.iter().map(|m| m.to_string()))
        .expect("built-in dependency markers compile")
});

/// Extracts dependency references from item bodies.
#[derive(Debug, Clone)]
pub struct DependencyParser {
    markers: Vec<String>,
    pattern: Regex,
}

impl Default for DependencyParser {
    fn default() -> Self {
        DEFAULT_PARSER.clone()
    }
}

impl DependencyParser {
    /// Build a parser from literal marker strings.
    pub fn with_markers(markers: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        let mut markers: Vec<String> = markers.into_iter().map(|m| m.trim().to_string()).collect();
        if markers.iter().any(|m| m.is_empty()) {
            return Err(ConfigError::EmptyMarker);
        }
        markers.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        markers.dedup();

        let alternation = markers
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)(?:{})\s*[:：]?\s*#(\d+)", alternation))?;

        Ok(Self { markers, pattern })
    }

    /// Built-in markers plus extra literal markers from configuration.
    pub fn with_extra_markers(extra: &[String]) -> Result<Self, ConfigError> {
        Self::with_markers(
            BUILTIN_MARKERS
                .iter()
                .map(|m| m.to_string())
                .chain(extra.iter().cloned()),
        )
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Distinct referenced ids in ascending order.
    pub fn extract(&self, body: &str) -> BTreeSet<u64> {
        self.pattern
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .filter_map(|m| m.as_str().parse::<u64>().ok())
            .collect()
    }
}

/// Why a single dependency reference is not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum UnresolvedCause {
    /// The referenced item exists but is not closed.
    NotClosed { state: ItemState },
    /// The lookup itself failed.
    LookupFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedDependency {
    pub id: u64,
    #[serde(flatten)]
    pub cause: UnresolvedCause,
}

/// Outcome of checking every dependency an item declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub referenced: Vec<u64>,
    pub unresolved: Vec<UnresolvedDependency>,
}

impl DependencyReport {
    /// True when there are no references or every reference is closed.
    pub fn is_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn unresolved_ids(&self) -> Vec<u64> {
        self.unresolved.iter().map(|u| u.id).collect()
    }
}

/// Check every dependency declared in `body`, continuing past failures so the
/// report lists all of them.
pub fn resolve(parser: &DependencyParser, body: &str, lookup: &dyn ItemLookup) -> DependencyReport {
    let referenced = parser.extract(body);
    let mut report = DependencyReport {
        referenced: referenced.iter().copied().collect(),
        unresolved: Vec::new(),
    };

    for id in referenced {
        match lookup.lookup(id) {
            Ok(dep) if dep.is_closed() => {
                tracing::debug!(dependency = id, "dependency closed");
            }
            Ok(dep) => {
                tracing::debug!(dependency = id, state = %dep.state, "dependency still open");
                report.unresolved.push(UnresolvedDependency {
                    id,
                    cause: UnresolvedCause::NotClosed { state: dep.state },
                });
            }
            Err(err) => {
                tracing::warn!(dependency = id, error = %err, "dependency lookup failed");
                report.unresolved.push(lookup_failure(err));
            }
        }
    }

    report
}

fn lookup_failure(err: LookupError) -> UnresolvedDependency {
    UnresolvedDependency {
        id: err.id(),
        cause: UnresolvedCause::LookupFailed {
            error: err.to_string(),
        },
    }
}

/// Whether every dependency declared in `body` is closed.
pub fn is_unblocked(parser: &DependencyParser, body: &str, lookup: &dyn ItemLookup) -> bool {
    resolve(parser, body, lookup).is_resolved()
}
