//! Triggering event, decoded once from the payload the CI host provides.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::EventError;
use crate::github::GitHubUser;

/// Name of the workflow event that started the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventName {
    Issues,
    PullRequest,
    PullRequestTarget,
    Other(String),
}

impl EventName {
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "issues" => Self::Issues,
            "pull_request" => Self::PullRequest,
            "pull_request_target" => Self::PullRequestTarget,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        matches!(self, Self::PullRequest | Self::PullRequestTarget)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Issues => "issues",
            Self::PullRequest => "pull_request",
            Self::PullRequestTarget => "pull_request_target",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull request activity type. Anything docbot does not handle is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Edited,
    Labeled,
    Unlabeled,
    #[serde(other)]
    Other,
}

/// `pull_request` / `pull_request_target` payload, reduced to what docbot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub number: u64,
    pub pull_request: PullRequestPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    /// GitHub sends `null` for an empty description.
    #[serde(default)]
    pub body: Option<String>,
    pub user: GitHubUser,
}

impl PullRequestEvent {
    #[must_use]
    pub fn body(&self) -> &str {
        self.pull_request.body.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.pull_request.user.login
    }
}

/// The event that triggered this run.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub name: EventName,
    /// Present only for pull request events.
    pub pull_request: Option<PullRequestEvent>,
}

impl EventContext {
    /// Load the event named `name` from the payload file at `path`.
    ///
    /// The payload is only read and decoded for pull request events.
    pub fn load(name: &str, path: &Path) -> Result<Self, EventError> {
        let name = EventName::parse(name);
        if !name.is_pull_request() {
            return Ok(Self {
                name,
                pull_request: None,
            });
        }

        let payload = std::fs::read_to_string(path).map_err(|source| EventError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(name, &payload)
    }

    /// Decode a payload that has already been read.
    pub fn from_json(name: EventName, payload: &str) -> Result<Self, EventError> {
        if !name.is_pull_request() {
            return Ok(Self {
                name,
                pull_request: None,
            });
        }

        let event = serde_json::from_str(payload).map_err(|source| EventError::Decode {
            event: name.to_string(),
            source,
        })?;

        Ok(Self {
            name,
            pull_request: Some(event),
        })
    }
}
