//! Error types for docbot.
//!
//! Configuration and read errors are fatal for a run. Write errors are
//! produced by the label store but the dispatcher logs them and keeps going.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Invalid or incomplete configuration, detected before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("repository must be in owner/repo form, got {0:?}")]
    InvalidRepository(String),

    #[error("GitHub token is not set")]
    MissingToken,

    #[error("invalid label pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("label pattern {pattern:?} must have exactly 2 capture groups, found {groups}")]
    PatternGroups { pattern: String, groups: usize },

    #[error("missing label {0:?} is also in the label watch list")]
    MissingLabelWatched(String),

    #[error("invalid value {value:?} for {name}, expected true or false")]
    InvalidFlag { name: &'static str, value: String },
}

/// Failure to load or decode the triggering event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to read event payload {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {event} event payload: {source}")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by the GitHub label store.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("rate limit exceeded, reset in {reset_in:?}")]
    RateLimited { reset_in: Duration },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal errors raised while dispatching an event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A read the reconciliation depends on failed; nothing was mutated.
    #[error("failed to {what}: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: GitHubError,
    },
}

impl DispatchError {
    pub(crate) fn read(what: &'static str) -> impl FnOnce(GitHubError) -> Self {
        move |source| Self::Read { what, source }
    }
}
