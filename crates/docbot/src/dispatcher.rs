//! # Event dispatcher
//!
//! Routes one pull request event through extraction, policy evaluation and
//! body synchronization, then applies the result to the label store.
//!
//! - `opened` / `edited`: the checklist is the source of truth and labels
//!   follow it.
//! - `labeled` / `unlabeled`: the labels are the source of truth. The
//!   sentinel is reconciled and, on `labeled`, the checklist is rewritten.
//!
//! Reads are fatal: nothing is mutated without full knowledge of the current
//! state. Individual writes are logged and the run continues.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::DispatchError;
use crate::event::{PullRequestAction, PullRequestEvent};
use crate::github::{LabelStore, PullRequestInfo};
use crate::labels::{
    current_labels, evaluate, evaluate_label_event, extract, plan_body_edit, CurrentLabelSet,
    ReconciliationPlan, RepoLabelSet,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action is not one docbot reacts to.
    Skipped,
    /// Labels (and checklist) are consistent.
    Synced,
    /// More than one label selected while multi-select is off.
    MultipleLabels,
    /// No label selected while the missing-label check is on.
    MissingLabel,
}

impl Outcome {
    /// Policy violations fail the CI check until the author fixes them.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::MultipleLabels | Self::MissingLabel)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Skipped => "skipped",
            Self::Synced => "synced",
            Self::MultipleLabels => "multiple labels selected",
            Self::MissingLabel => "no label selected",
        };
        f.write_str(text)
    }
}

/// Result of a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Writes that failed and were skipped, e.g. `remove label doc`.
    pub failed_writes: Vec<String>,
}

impl RunReport {
    fn new(outcome: Outcome, failed_writes: Vec<String>) -> Self {
        Self {
            outcome,
            failed_writes,
        }
    }
}

/// Label state fetched at the start of a run.
struct LabelState {
    repo_labels: RepoLabelSet,
    current: CurrentLabelSet,
}

/// Applies one pull request event to a label store.
pub struct Dispatcher<'a, S: LabelStore + ?Sized> {
    config: &'a Config,
    store: &'a S,
}

impl<'a, S: LabelStore + ?Sized> Dispatcher<'a, S> {
    pub fn new(config: &'a Config, store: &'a S) -> Self {
        Self { config, store }
    }

    pub async fn run(&self, event: &PullRequestEvent) -> Result<RunReport, DispatchError> {
        let number = event.number;
        match event.action {
            PullRequestAction::Opened | PullRequestAction::Edited => {
                info!(pr_number = number, action = ?event.action, "Syncing labels from checklist");
                self.on_opened_or_edited(number, event.body()).await
            }
            PullRequestAction::Labeled | PullRequestAction::Unlabeled => {
                info!(pr_number = number, action = ?event.action, "Syncing checklist from labels");
                self.on_labeled_or_unlabeled(number, event.action).await
            }
            PullRequestAction::Other => {
                debug!(pr_number = number, "Ignoring pull request action");
                Ok(RunReport::new(Outcome::Skipped, Vec::new()))
            }
        }
    }

    async fn on_opened_or_edited(
        &self,
        number: u64,
        body: &str,
    ) -> Result<RunReport, DispatchError> {
        let policy = &self.config.policy;
        let pr = self.get_pull_request(number).await?;
        let state = self.load_state(number).await?;

        let desired = extract(body, &self.config.pattern, &policy.watch);
        debug!(desired = ?desired, "Extracted checklist");

        let plan = evaluate(&state.current, &desired, &state.repo_labels, policy);
        warn_unknown(&plan);

        let mut failed = Vec::new();

        if plan.violates_multiple {
            info!(selected = plan.selected, "Multiple labels selected");
            self.comment(&pr, &self.config.messages.label_multiple, &mut failed)
                .await;
            return Ok(RunReport::new(Outcome::MultipleLabels, failed));
        }

        self.apply(number, &plan, &mut failed).await;

        if plan.needs_missing_label {
            self.flag_missing(&pr, &state.current, &mut failed).await;
            return Ok(RunReport::new(Outcome::MissingLabel, failed));
        }

        Ok(RunReport::new(Outcome::Synced, failed))
    }

    async fn on_labeled_or_unlabeled(
        &self,
        number: u64,
        action: PullRequestAction,
    ) -> Result<RunReport, DispatchError> {
        let policy = &self.config.policy;
        let pr = self.get_pull_request(number).await?;
        let state = self.load_state(number).await?;

        let (desired, unknown) = extract(&pr.body, &self.config.pattern, &policy.watch)
            .partition_by_repo(&state.repo_labels);
        for label in &unknown {
            warn!(label = %label, "Checklist label does not exist in repository");
        }

        let plan = evaluate_label_event(&state.current, policy);
        let mut failed = Vec::new();

        if plan.violates_multiple {
            info!(selected = plan.selected, "Multiple labels selected");
            self.comment(&pr, &self.config.messages.label_multiple, &mut failed)
                .await;
            return Ok(RunReport::new(Outcome::MultipleLabels, failed));
        }

        self.apply(number, &plan, &mut failed).await;

        if plan.needs_missing_label {
            self.flag_missing(&pr, &state.current, &mut failed).await;
            return Ok(RunReport::new(Outcome::MissingLabel, failed));
        }

        if action == PullRequestAction::Unlabeled {
            return Ok(RunReport::new(Outcome::Synced, failed));
        }

        let edit = plan_body_edit(&pr.body, &state.current, &desired, &policy.missing_label);
        if edit.is_empty() {
            debug!("Checklist already matches labels");
        } else {
            info!(
                replaced = edit.replacements.len(),
                appended = edit.appends.len(),
                "Updating checklist in PR body"
            );
            let body = edit.apply(&pr.body);
            if let Err(e) = self.store.edit_pull_request_body(number, &body).await {
                error!(error = %e, "Failed to update PR body");
                failed.push("edit pull request body".to_string());
            }
        }

        Ok(RunReport::new(Outcome::Synced, failed))
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo, DispatchError> {
        self.store
            .get_pull_request(number)
            .await
            .map_err(DispatchError::read("get pull request"))
    }

    async fn load_state(&self, number: u64) -> Result<LabelState, DispatchError> {
        let repo_labels: RepoLabelSet = self
            .store
            .list_repo_labels()
            .await
            .map_err(DispatchError::read("list repository labels"))?
            .into_iter()
            .collect();
        debug!(labels = ?repo_labels, "Repository labels");

        let issue_labels = self
            .store
            .list_issue_labels(number)
            .await
            .map_err(DispatchError::read("list issue labels"))?;
        debug!(labels = ?issue_labels, "Issue labels");

        let policy = &self.config.policy;
        let current = current_labels(issue_labels, &policy.watch, &policy.missing_label);
        info!(labels = ?current, "Current labels");

        Ok(LabelState {
            repo_labels,
            current,
        })
    }

    /// Remove, then add, one label per call. Each failure is recorded and the
    /// rest still applied.
    async fn apply(&self, number: u64, plan: &ReconciliationPlan, failed: &mut Vec<String>) {
        if plan.is_noop() {
            info!("Labels already in sync");
            return;
        }

        for label in &plan.to_remove {
            if let Err(e) = self.store.remove_label(number, label).await {
                error!(label = %label, error = %e, "Failed to remove label");
                failed.push(format!("remove label {label}"));
            }
        }

        for label in &plan.to_add {
            if let Err(e) = self
                .store
                .add_labels(number, std::slice::from_ref(label))
                .await
            {
                error!(label = %label, error = %e, "Failed to add label");
                failed.push(format!("add label {label}"));
            }
        }
    }

    /// Apply the sentinel (unless already present) and tell the author.
    async fn flag_missing(
        &self,
        pr: &PullRequestInfo,
        current: &CurrentLabelSet,
        failed: &mut Vec<String>,
    ) {
        let missing = &self.config.policy.missing_label;
        info!(label = %missing, "No label selected");

        if !current.contains(missing) {
            if let Err(e) = self
                .store
                .add_labels(pr.number, std::slice::from_ref(missing))
                .await
            {
                error!(label = %missing, error = %e, "Failed to add missing label");
                failed.push(format!("add label {missing}"));
            }
        }

        self.comment(pr, &self.config.messages.label_missing, failed)
            .await;
    }

    async fn comment(&self, pr: &PullRequestInfo, message: &str, failed: &mut Vec<String>) {
        let body = format!("@{} {message}", pr.author);
        if let Err(e) = self.store.create_comment(pr.number, &body).await {
            error!(error = %e, "Failed to comment on PR");
            failed.push("create comment".to_string());
        }
    }
}

fn warn_unknown(plan: &ReconciliationPlan) {
    for label in &plan.unknown {
        warn!(label = %label, "Checklist label does not exist in repository");
    }
}
