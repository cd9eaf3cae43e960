//! Pull request label checklist bot.
//!
//! docbot keeps the labels on a pull request and a checklist in its
//! description in agreement:
//!
//! ```text
//! ### Documentation
//! - [x] `doc`
//! - [ ] `doc-required`
//! - [ ] `doc-not-needed`
//! ```
//!
//! Editing the checklist adds and removes labels. Adding a label directly
//! checks its box. Selecting nothing applies a missing-label marker, selecting
//! more than one label (unless allowed) is rejected; both post a comment to the
//! author and fail the run.
//!
//! # Architecture
//!
//! - [`labels`] holds the pure reconciliation logic
//! - [`github`] defines the [`LabelStore`] seam and its REST client
//! - [`event`] decodes the triggering event
//! - [`dispatcher`] ties them together for one event
//! - [`config`] validates options from flags and environment

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod github;
pub mod labels;

pub use config::{Config, ConfigArgs, Messages};
pub use dispatcher::{Dispatcher, Outcome, RunReport};
pub use error::{ConfigError, DispatchError, EventError, GitHubError};
pub use event::{EventContext, EventName, PullRequestAction, PullRequestEvent};
pub use github::{GitHubLabelClient, LabelStore, PullRequestInfo};
pub use labels::{DesiredLabels, LabelPolicy, ReconciliationPlan, WatchSet};
