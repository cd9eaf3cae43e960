//! # Checklist label reconciliation
//!
//! Pure functions that keep a pull request's labels and the checklist in its
//! description consistent with each other:
//!
//! - [`extract`] reads the checklist into [`DesiredLabels`]
//! - [`evaluate`] and [`evaluate_label_event`] turn current and desired state
//!   into a [`ReconciliationPlan`]
//! - [`sync_body`] rewrites the checklist after labels were edited directly
//!
//! Nothing here performs I/O; the dispatcher feeds these functions with data
//! fetched from the label store.

pub mod body;
pub mod extract;
pub mod policy;

use std::collections::BTreeSet;

pub use body::{checkbox_line, plan_body_edit, sync_body, BodyEditPlan};
pub use extract::{extract, ChecklistPattern, DesiredLabels, WatchSet, DEFAULT_LABEL_PATTERN};
pub use policy::{evaluate, evaluate_label_event, LabelPolicy, ReconciliationPlan};

/// A label name. Case-sensitive and matched literally.
pub type LabelName = String;

/// Labels currently on the pull request, limited to the watch list plus the
/// missing-label sentinel.
pub type CurrentLabelSet = BTreeSet<LabelName>;

/// Every label defined in the repository.
pub type RepoLabelSet = BTreeSet<LabelName>;

/// Restrict the labels attached to an issue to the ones docbot manages.
pub fn current_labels<I, S>(issue_labels: I, watch: &WatchSet, missing_label: &str) -> CurrentLabelSet
where
    I: IntoIterator<Item = S>,
    S: Into<LabelName>,
{
    issue_labels
        .into_iter()
        .map(Into::into)
        .filter(|label| watch.contains(label) || label == missing_label)
        .collect()
}
