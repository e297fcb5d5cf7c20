//! Readiness scheduling over a pool of work items.
//!
//! The scheduler answers one question: which single item should the
//! pipeline pick up next? It is pure. Item state comes in through the
//! [`ItemLookup`](crate::lookup::ItemLookup) capability and the result is a
//! [`Selection`] value; nothing here touches the network or the filesystem.
//!
//! ## Pipeline
//!
//! 1. **Classify** - label markers put each item into a
//!    [`SchedulingCategory`]; only `Ready` items are candidates.
//! 2. **Rank** - candidates are ordered by `(priority rank, id)`.
//! 3. **Resolve** - dependencies are checked lazily in that order and the
//!    first unblocked candidate is selected.
//!
//! A forced id bypasses all three steps and is only checked for being
//! closed.
//!
//! ## Example
//!
//! ```
//! use shipyard::lookup::Snapshot;
//! use shipyard::model::WorkItem;
//! use shipyard::scheduler::{Scheduler, SelectionPolicy};
//!
//! let pool = vec![
//!     WorkItem::new(1, "API").with_labels(&["P0"]).with_body("Depends on #2"),
//!     WorkItem::new(2, "Schema").with_labels(&["P1"]),
//! ];
//! let snapshot = Snapshot::from_items(pool.iter().cloned());
//!
//! let selection = Scheduler::default().select_next(&pool, &SelectionPolicy::default(), &snapshot);
//! assert_eq!(selection.item().map(|i| i.id), Some(2));
//! ```

pub mod classify;
pub mod deps;
pub mod select;
pub mod triage;

pub use classify::{LabelPolicy, SchedulingCategory};
pub use deps::{DependencyParser, DependencyReport, UnresolvedCause, UnresolvedDependency, is_unblocked};
pub use select::{Pick, Scheduler, Selection, SelectionPolicy, select_next};
pub use triage::{TriageReport, TriageStatus, TriageSummary, build_report};
