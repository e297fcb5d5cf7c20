//! Hosted issue tracker access.
//!
//! The scheduler's lookup is synchronous and in-memory, so the CLI fetches
//! what a scheduling pass can need up front and hands the resulting
//! [`Snapshot`] to the scheduler. [`prefetch_for_selection`] is lazy and
//! bounded; [`prefetch_snapshot`] fetches everything for the triage report.

pub mod github;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::errors::TrackerError;
use crate::lookup::Snapshot;
use crate::model::WorkItem;
use crate::scheduler::{Scheduler, SelectionPolicy};

pub use github::GitHubClient;

/// Abstraction over the issue tracker for testability.
///
/// Real implementation: [`GitHubClient`]. Test double: `MockTracker`.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Open issues that carry every label in `labels`.
    async fn list_open_issues(&self, labels: &[String]) -> Result<Vec<WorkItem>, TrackerError>;

    async fn get_issue(&self, number: u64) -> Result<WorkItem, TrackerError>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), TrackerError>;

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;
}

/// Remote fetches left for one pass.
#[derive(Debug, Clone, Copy)]
struct FetchBudget {
    limit: usize,
    remaining: usize,
}

impl FetchBudget {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    fn take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Snapshot for one `select_next` pass, fetched lazily.
///
/// Ready candidates are walked in `(rank, id)` order. Each one's missing
/// dependencies are fetched, and the walk stops at the first candidate whose
/// dependencies are all closed, since selection cannot look past it. A
/// forced pass fetches only the forced id. At most `max_fetches` remote
/// calls are made; ids refused by the cap are recorded as budget-exhausted,
/// so only items that needed a remote fetch are affected.
pub async fn prefetch_for_selection(
    tracker: &dyn Tracker,
    pool: &[WorkItem],
    scheduler: &Scheduler,
    policy: &SelectionPolicy,
    max_fetches: usize,
) -> Snapshot {
    let mut snapshot = Snapshot::from_items(pool.iter().cloned());
    let mut budget = FetchBudget::new(max_fetches);

    if let Some(id) = policy.forced_id {
        fetch_within(tracker, &mut snapshot, [id], &mut budget).await;
        return snapshot;
    }

    for candidate in scheduler.ready_candidates(pool) {
        let wanted = scheduler.parser().extract(&candidate.item.body);
        fetch_within(tracker, &mut snapshot, wanted, &mut budget).await;
        if scheduler.is_unblocked(&candidate.item.body, &snapshot) {
            tracing::debug!(id = candidate.item.id, "runnable candidate found, prefetch stops");
            break;
        }
    }

    tracing::debug!(
        fetched = budget.limit - budget.remaining,
        limit = budget.limit,
        "selection prefetch finished"
    );
    snapshot
}

/// Snapshot holding the pool plus every item its ready candidates depend
/// on. Unbounded; used where every candidate is reported.
pub async fn prefetch_snapshot(tracker: &dyn Tracker, pool: &[WorkItem], scheduler: &Scheduler) -> Snapshot {
    let mut snapshot = Snapshot::from_items(pool.iter().cloned());

    let wanted: BTreeSet<u64> = scheduler
        .ready_candidates(pool)
        .iter()
        .flat_map(|c| scheduler.parser().extract(&c.item.body))
        .collect();

    fetch_into(tracker, &mut snapshot, wanted).await;
    snapshot
}

/// Fetch each id not already in `snapshot` and add it.
///
/// Fetch failures other than "not found" are recorded per id so lookups
/// report them as unavailable rather than missing.
pub async fn fetch_into(tracker: &dyn Tracker, snapshot: &mut Snapshot, ids: impl IntoIterator<Item = u64>) {
    fetch_within(tracker, snapshot, ids, &mut FetchBudget::unlimited()).await;
}

async fn fetch_within(
    tracker: &dyn Tracker,
    snapshot: &mut Snapshot,
    ids: impl IntoIterator<Item = u64>,
    budget: &mut FetchBudget,
) {
    let wanted: BTreeSet<u64> = ids.into_iter().filter(|id| !snapshot.contains(*id)).collect();
    if wanted.is_empty() {
        return;
    }
    tracing::debug!(count = wanted.len(), "prefetching referenced items");

    for id in wanted {
        if !budget.take() {
            tracing::warn!(id, limit = budget.limit, "fetch budget exhausted");
            snapshot.record_exhausted(id, budget.limit);
            continue;
        }
        match tracker.get_issue(id).await {
            Ok(item) => snapshot.insert(item),
            Err(TrackerError::IssueNotFound { .. }) => {
                tracing::debug!(id, "referenced item does not exist");
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to fetch referenced item");
                snapshot.record_failure(id, e.to_string());
            }
        }
    }
}

/// Move a picked item out of the pickup queue: add `claim_label`, then drop
/// every pickup label so the next pass does not see it as a candidate.
pub async fn claim(tracker: &dyn Tracker, id: u64, claim_label: &str, pickup: &[String]) -> Result<(), TrackerError> {
    tracker.add_labels(id, &[claim_label.to_string()]).await?;
    for label in pickup.iter().filter(|l| l.as_str() != claim_label) {
        tracker.remove_label(id, label).await?;
    }
    tracing::info!(id, label = claim_label, "claimed work item");
    Ok(())
}
