//! Policy evaluation.
//!
//! Decides which labels to add and remove, and whether the selection breaks
//! the single-label or missing-label rules.

use std::collections::BTreeSet;

use super::{CurrentLabelSet, DesiredLabels, LabelName, RepoLabelSet, WatchSet};

/// Rules applied when reconciling labels.
#[derive(Debug, Clone)]
pub struct LabelPolicy {
    /// Labels managed through the checklist.
    pub watch: WatchSet,
    /// Sentinel label applied when nothing is selected.
    pub missing_label: LabelName,
    /// Apply the sentinel and fail the run when nothing is selected.
    pub enable_missing: bool,
    /// Allow more than one checked label.
    pub enable_multiple: bool,
}

/// Outcome of policy evaluation. Computed fresh per run and consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_add: BTreeSet<LabelName>,
    pub to_remove: BTreeSet<LabelName>,
    /// More than one label selected while multi-select is off. When set, both
    /// label sets are empty.
    pub violates_multiple: bool,
    /// Nothing is selected and the missing-label check is on.
    pub needs_missing_label: bool,
    /// Checked or unchecked names the repository does not define.
    pub unknown: BTreeSet<LabelName>,
    /// Number of selected labels the decision was based on.
    pub selected: usize,
}

impl ReconciliationPlan {
    /// True when no label mutation is planned.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Plan the label changes for a checklist edit (opened / edited).
///
/// `desired` is filtered to labels the repository defines before anything
/// else. An empty checklist clears every watched label on the issue.
pub fn evaluate(
    current: &CurrentLabelSet,
    desired: &DesiredLabels,
    repo_labels: &RepoLabelSet,
    policy: &LabelPolicy,
) -> ReconciliationPlan {
    let (desired, unknown) = desired.partition_by_repo(repo_labels);
    let selected = desired.checked_count();

    let mut plan = ReconciliationPlan {
        unknown,
        selected,
        ..ReconciliationPlan::default()
    };

    if !policy.enable_multiple && selected > 1 {
        plan.violates_multiple = true;
        return plan;
    }

    plan.to_remove = if desired.is_empty() {
        policy
            .watch
            .iter()
            .filter(|name| current.contains(*name))
            .cloned()
            .collect()
    } else {
        current
            .iter()
            .filter(|name| **name != policy.missing_label && !desired.is_checked(name))
            .cloned()
            .collect()
    };

    if selected > 0 && current.contains(&policy.missing_label) {
        plan.to_remove.insert(policy.missing_label.clone());
    }

    plan.to_add = desired
        .checked()
        .filter(|name| !current.contains(*name))
        .cloned()
        .collect();

    plan.needs_missing_label = policy.enable_missing && selected == 0;
    plan
}

/// Plan the label changes after a label was added or removed directly
/// (labeled / unlabeled).
///
/// The issue's labels are the selection here, so watched labels are never
/// removed; only the sentinel can be removed or requested.
pub fn evaluate_label_event(current: &CurrentLabelSet, policy: &LabelPolicy) -> ReconciliationPlan {
    let selected = current
        .iter()
        .filter(|name| **name != policy.missing_label)
        .count();

    let mut plan = ReconciliationPlan {
        selected,
        ..ReconciliationPlan::default()
    };

    if !policy.enable_multiple && selected > 1 {
        plan.violates_multiple = true;
        return plan;
    }

    if selected > 0 && current.contains(&policy.missing_label) {
        plan.to_remove.insert(policy.missing_label.clone());
    }

    plan.needs_missing_label = policy.enable_missing && selected == 0;
    plan
}
