//! The lookup capability the scheduler consumes.
//!
//! [`ItemLookup`] resolves a referenced id to its current [`WorkItem`]. The
//! scheduler only ever calls it synchronously, so remote trackers are put
//! behind a prefetched [`Snapshot`]; [`BoundedLookup`] caps how many calls a
//! single scheduling pass may make.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::LookupError;
use crate::model::WorkItem;

/// Resolve a work item id against the current pool.
pub trait ItemLookup {
    fn lookup(&self, id: u64) -> Result<WorkItem, LookupError>;
}

impl<L: ItemLookup + ?Sized> ItemLookup for &L {
    fn lookup(&self, id: u64) -> Result<WorkItem, LookupError> {
        (**self).lookup(id)
    }
}

/// In-memory id → item map, plus ids whose fetch is known to have failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    items: BTreeMap<u64, WorkItem>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    failures: BTreeMap<u64, String>,
    /// Ids never fetched because the fetch budget ran out, with that budget.
    #[serde(skip)]
    exhausted: BTreeMap<u64, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let mut snapshot = Self::new();
        for item in items {
            snapshot.insert(item);
        }
        snapshot
    }

    /// Load a snapshot from a JSON array of work items.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let items: Vec<WorkItem> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;
        Ok(Self::from_items(items))
    }

    pub fn insert(&mut self, item: WorkItem) {
        self.failures.remove(&item.id);
        self.exhausted.remove(&item.id);
        self.items.insert(item.id, item);
    }

    /// Remember that fetching `id` failed, so lookups report it as unavailable.
    pub fn record_failure(&mut self, id: u64, reason: impl Into<String>) {
        if !self.items.contains_key(&id) {
            self.failures.insert(id, reason.into());
        }
    }

    /// Remember that `id` was skipped once `limit` fetches were spent.
    pub fn record_exhausted(&mut self, id: u64, limit: usize) {
        if !self.items.contains_key(&id) {
            self.exhausted.insert(id, limit);
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.values()
    }

    /// Open items carrying every label in `labels`, in id order. This is the
    /// pickup pool when the snapshot stands in for the tracker.
    pub fn open_with_labels(&self, labels: &[String]) -> Vec<WorkItem> {
        self.items
            .values()
            .filter(|item| !item.is_closed() && labels.iter().all(|l| item.has_label(l)))
            .cloned()
            .collect()
    }
}

impl ItemLookup for Snapshot {
    fn lookup(&self, id: u64) -> Result<WorkItem, LookupError> {
        if let Some(item) = self.items.get(&id) {
            return Ok(item.clone());
        }
        if let Some(&limit) = self.exhausted.get(&id) {
            return Err(LookupError::BudgetExhausted { id, limit });
        }
        match self.failures.get(&id) {
            Some(reason) => Err(LookupError::Unavailable {
                id,
                reason: reason.clone(),
            }),
            None => Err(LookupError::NotFound { id }),
        }
    }
}

/// Wraps a lookup and refuses calls beyond `limit`.
///
/// Refused calls surface as [`LookupError::BudgetExhausted`], which the
/// resolver counts as unresolved.
pub struct BoundedLookup<L> {
    inner: L,
    limit: usize,
    calls: Cell<usize>,
}

impl<L: ItemLookup> BoundedLookup<L> {
    pub fn new(inner: L, limit: usize) -> Self {
        Self {
            inner,
            limit,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn is_exhausted(&self) -> bool {
        self.calls.get() >= self.limit
    }
}

impl<L: ItemLookup> ItemLookup for BoundedLookup<L> {
    fn lookup(&self, id: u64) -> Result<WorkItem, LookupError> {
        if self.is_exhausted() {
            tracing::warn!(id, limit = self.limit, "lookup budget exhausted");
            return Err(LookupError::BudgetExhausted {
                id,
                limit: self.limit,
            });
        }
        self.calls.set(self.calls.get() + 1);
        self.inner.lookup(id)
    }
}
