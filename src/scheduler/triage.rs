//! Whole-pool triage report.
//!
//! Unlike [`Scheduler::select_next`], triage resolves the dependencies of
//! every ready item so the report shows the full state of the queue.

use serde::Serialize;

use crate::lookup::ItemLookup;
use crate::model::{PriorityRank, WorkItem};
use crate::scheduler::classify::SchedulingCategory;
use crate::scheduler::deps::DependencyReport;
use crate::scheduler::select::Scheduler;

pub const DEFAULT_REPORT_PATH: &str = "out/prioritized_issues.json";

/// Per-item status in the report. Ready items whose dependencies are not
/// all closed become `BlockedByDependency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    InProgress,
    NeedsHumanIntervention,
    Blocked,
    BlockedByDependency,
    Skip,
    Ready,
}

impl From<SchedulingCategory> for TriageStatus {
    fn from(category: SchedulingCategory) -> Self {
        match category {
            SchedulingCategory::InProgress => Self::InProgress,
            SchedulingCategory::NeedsHumanIntervention => Self::NeedsHumanIntervention,
            SchedulingCategory::Blocked => Self::Blocked,
            SchedulingCategory::Skip => Self::Skip,
            SchedulingCategory::Ready => Self::Ready,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageEntry {
    pub number: u64,
    pub title: String,
    pub priority: String,
    pub rank: PriorityRank,
    pub status: TriageStatus,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriageSummary {
    pub ready: usize,
    pub in_progress: usize,
    /// Label-blocked plus dependency-blocked.
    pub blocked: usize,
    pub needs_human: usize,
    pub skip: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub summary: TriageSummary,
    pub issues: Vec<TriageEntry>,
}

impl TriageReport {
    /// First ready entry, i.e. what an unforced `select_next` would pick.
    pub fn next_ready(&self) -> Option<&TriageEntry> {
        self.issues.iter().find(|e| e.status == TriageStatus::Ready)
    }
}

/// Classify, rank and resolve every item in `pool`.
pub fn build_report(scheduler: &Scheduler, pool: &[WorkItem], lookup: &dyn ItemLookup) -> TriageReport {
    let mut issues: Vec<TriageEntry> = pool
        .iter()
        .map(|item| entry_for(scheduler, item, lookup))
        .collect();
    issues.sort_by_key(|e| (e.rank, e.number));

    let mut summary = TriageSummary {
        total: issues.len(),
        ..Default::default()
    };
    for entry in &issues {
        match entry.status {
            TriageStatus::Ready => summary.ready += 1,
            TriageStatus::InProgress => summary.in_progress += 1,
            TriageStatus::Blocked | TriageStatus::BlockedByDependency => summary.blocked += 1,
            TriageStatus::NeedsHumanIntervention => summary.needs_human += 1,
            TriageStatus::Skip => summary.skip += 1,
        }
    }

    tracing::debug!(?summary, "triage complete");
    TriageReport { summary, issues }
}

fn entry_for(scheduler: &Scheduler, item: &WorkItem, lookup: &dyn ItemLookup) -> TriageEntry {
    let rank = scheduler.rank(item);
    let category = scheduler.classify(item);
    let mut status = TriageStatus::from(category);
    let mut dependencies = None;

    if category.is_ready() {
        let report = scheduler.check_dependencies(&item.body, lookup);
        if !report.is_resolved() {
            status = TriageStatus::BlockedByDependency;
        }
        if !report.referenced.is_empty() {
            dependencies = Some(report);
        }
    }

    TriageEntry {
        number: item.id,
        title: item.title.clone(),
        priority: scheduler.priority().label_for(rank).to_string(),
        rank,
        status,
        labels: item.labels.clone(),
        dependencies,
    }
}
