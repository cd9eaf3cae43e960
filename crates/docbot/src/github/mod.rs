//! # Label store
//!
//! The remote state docbot reads and mutates: repository labels, the labels on
//! one pull request, its comments, and its description. [`LabelStore`] is the
//! seam between the dispatcher and GitHub; [`GitHubLabelClient`] is the REST
//! implementation.

pub mod client;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GitHubError;
use crate::labels::LabelName;

pub use client::GitHubLabelClient;

/// The parts of a pull request docbot needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub number: u64,
    pub author: String,
    pub body: String,
}

/// A user as returned by the GitHub API and in webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

/// Remote label storage for a single repository.
///
/// Every call may fail independently. Listing calls return the complete,
/// de-paginated result.
#[async_trait]
pub trait LabelStore: Send + Sync {
    /// All labels defined in the repository.
    async fn list_repo_labels(&self) -> Result<Vec<LabelName>, GitHubError>;

    /// Labels currently attached to an issue or pull request.
    async fn list_issue_labels(&self, number: u64) -> Result<Vec<LabelName>, GitHubError>;

    /// Attach labels to an issue or pull request.
    async fn add_labels(&self, number: u64, labels: &[LabelName]) -> Result<(), GitHubError>;

    /// Detach one label. Removing a label that is not attached succeeds.
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), GitHubError>;

    /// Post a comment on an issue or pull request.
    async fn create_comment(&self, number: u64, body: &str) -> Result<(), GitHubError>;

    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo, GitHubError>;

    /// Replace the pull request description.
    async fn edit_pull_request_body(&self, number: u64, body: &str) -> Result<(), GitHubError>;
}
