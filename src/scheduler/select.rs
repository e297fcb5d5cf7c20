//! Readiness scheduler: pick the single next work item.
//!
//! Candidates are classified, ranked by `(priority rank, id)`, and checked
//! for dependencies lazily in that order. The first unblocked candidate wins
//! and no further lookups are made.

use serde::Serialize;

use crate::errors::LookupError;
use crate::lookup::{BoundedLookup, ItemLookup};
use crate::model::{PriorityRank, PriorityScheme, WorkItem};
use crate::scheduler::classify::{LabelPolicy, SchedulingCategory};
use crate::scheduler::deps::{self, DependencyParser, DependencyReport};

/// Per-call selection options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Operator override: pick this id if it is not closed.
    pub forced_id: Option<u64>,
}

impl SelectionPolicy {
    pub fn forced(id: u64) -> Self {
        Self { forced_id: Some(id) }
    }
}

/// The chosen item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pick {
    pub item: WorkItem,
    pub rank: PriorityRank,
    /// True when chosen through the forced override.
    pub forced: bool,
}

/// Outcome of [`Scheduler::select_next`]. Only `Selected` carries an item;
/// the other variants are normal results, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(Pick),
    /// Every candidate was excluded or blocked.
    NoRunnable {
        evaluated: usize,
        blocked: Vec<u64>,
    },
    /// The forced item is already closed.
    ForcedClosed { id: u64 },
    /// The forced item could not be looked up.
    ForcedUnavailable { id: u64, error: LookupError },
}

impl Selection {
    pub fn item(&self) -> Option<&WorkItem> {
        match self {
            Self::Selected(pick) => Some(&pick.item),
            _ => None,
        }
    }

    /// Stable reason code for logs and hand-off consumers.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Selected(pick) if pick.forced => "forced",
            Self::Selected(_) => "selected",
            Self::NoRunnable { .. } => "no_runnable_item",
            Self::ForcedClosed { .. } => "forced_item_closed",
            Self::ForcedUnavailable { .. } => "forced_item_unavailable",
        }
    }
}

/// A ready candidate with its rank, in scheduling order.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub item: &'a WorkItem,
    pub rank: PriorityRank,
}

/// Readiness scheduler configured with label, priority and marker rules.
///
/// Holds no per-call state, so one instance can serve any number of calls.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    labels: LabelPolicy,
    priority: PriorityScheme,
    parser: DependencyParser,
    max_lookups: Option<usize>,
}

impl Scheduler {
    pub fn new(labels: LabelPolicy, priority: PriorityScheme, parser: DependencyParser) -> Self {
        Self {
            labels,
            priority,
            parser,
            max_lookups: None,
        }
    }

    /// Cap dependency lookups per `select_next` call.
    pub fn with_max_lookups(mut self, limit: usize) -> Self {
        self.max_lookups = Some(limit);
        self
    }

    pub fn labels(&self) -> &LabelPolicy {
        &self.labels
    }

    pub fn priority(&self) -> &PriorityScheme {
        &self.priority
    }

    pub fn parser(&self) -> &DependencyParser {
        &self.parser
    }

    pub fn classify(&self, item: &WorkItem) -> SchedulingCategory {
        self.labels.classify(item)
    }

    pub fn rank(&self, item: &WorkItem) -> PriorityRank {
        self.priority.rank(item)
    }

    /// Ready items sorted ascending by `(rank, id)`.
    pub fn ready_candidates<'a>(&self, pool: &'a [WorkItem]) -> Vec<Candidate<'a>> {
        let mut candidates: Vec<Candidate<'a>> = pool
            .iter()
            .filter(|item| self.classify(item).is_ready())
            .map(|item| Candidate {
                item,
                rank: self.rank(item),
            })
            .collect();
        candidates.sort_by_key(|c| (c.rank, c.item.id));
        candidates
    }

    /// Dependency report for one body.
    pub fn check_dependencies(&self, body: &str, lookup: &dyn ItemLookup) -> DependencyReport {
        deps::resolve(&self.parser, body, lookup)
    }

    /// Whether every dependency declared in `body` is closed.
    pub fn is_unblocked(&self, body: &str, lookup: &dyn ItemLookup) -> bool {
        deps::is_unblocked(&self.parser, body, lookup)
    }

    /// Pick the next runnable item from `pool`.
    pub fn select_next(
        &self,
        pool: &[WorkItem],
        policy: &SelectionPolicy,
        lookup: &dyn ItemLookup,
    ) -> Selection {
        if let Some(id) = policy.forced_id {
            return self.select_forced(id, pool, lookup);
        }

        let candidates = self.ready_candidates(pool);
        tracing::debug!(
            pool = pool.len(),
            candidates = candidates.len(),
            "evaluating ready candidates"
        );

        let bounded;
        let lookup: &dyn ItemLookup = match self.max_lookups {
            Some(limit) => {
                bounded = BoundedLookup::new(lookup, limit);
                &bounded
            }
            None => lookup,
        };

        let mut blocked = Vec::new();
        for candidate in &candidates {
            let report = self.check_dependencies(&candidate.item.body, lookup);
            if report.is_resolved() {
                tracing::info!(
                    id = candidate.item.id,
                    priority = self.priority.label_for(candidate.rank),
                    "selected work item"
                );
                return Selection::Selected(Pick {
                    item: candidate.item.clone(),
                    rank: candidate.rank,
                    forced: false,
                });
            }
            tracing::info!(
                id = candidate.item.id,
                waiting_on = ?report.unresolved_ids(),
                "candidate blocked by dependencies"
            );
            blocked.push(candidate.item.id);
        }

        tracing::info!(candidates = candidates.len(), "no runnable work item");
        Selection::NoRunnable {
            evaluated: candidates.len(),
            blocked,
        }
    }

    fn select_forced(&self, id: u64, pool: &[WorkItem], lookup: &dyn ItemLookup) -> Selection {
        let found = match pool.iter().find(|item| item.id == id) {
            Some(item) => Ok(item.clone()),
            None => lookup.lookup(id),
        };

        match found {
            Ok(item) if item.is_closed() => {
                tracing::warn!(id, "forced work item is already closed");
                Selection::ForcedClosed { id }
            }
            Ok(item) => {
                tracing::info!(id, "forced work item selected");
                let rank = self.rank(&item);
                Selection::Selected(Pick {
                    item,
                    rank,
                    forced: true,
                })
            }
            Err(error) => {
                tracing::warn!(id, %error, "forced work item unavailable");
                Selection::ForcedUnavailable { id, error }
            }
        }
    }
}

/// Select with a default-configured scheduler.
pub fn select_next(pool: &[WorkItem], policy: &SelectionPolicy, lookup: &dyn ItemLookup) -> Selection {
    Scheduler::default().select_next(pool, policy, lookup)
}
