//! Configuration for docbot.
//!
//! Options come from flags or from the environment variables a GitHub Actions
//! step exposes. [`ConfigArgs`] is the raw input; [`Config`] is the validated,
//! immutable value handed to the dispatcher.

use clap::Args;
use tracing::warn;

use crate::error::ConfigError;
use crate::github::client::GITHUB_API_URL;
use crate::labels::{ChecklistPattern, LabelPolicy, WatchSet, DEFAULT_LABEL_PATTERN};

/// Default sentinel label.
pub const DEFAULT_LABEL_MISSING: &str = "label-missing";

pub const DEFAULT_MESSAGE_LABEL_MISSING: &str =
    "Please provide a correct documentation label for your PR.";

pub const DEFAULT_MESSAGE_LABEL_MULTIPLE: &str =
    "Please select only one documentation label for your PR.";

/// Raw configuration as given on the command line or in the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Repository in owner/repo form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// GitHub token used for all API calls
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Checklist pattern with two capture groups: mark and label name
    #[arg(long, env = "LABEL_PATTERN")]
    pub label_pattern: Option<String>,

    /// Comma separated labels managed through the checklist
    #[arg(long, env = "LABEL_WATCH_LIST")]
    pub label_watch_list: Option<String>,

    /// Apply the missing label when nothing is checked (true/false)
    #[arg(long, env = "ENABLE_LABEL_MISSING")]
    pub enable_label_missing: Option<String>,

    /// Label applied when nothing is checked
    #[arg(long, env = "LABEL_MISSING")]
    pub label_missing: Option<String>,

    /// Allow more than one checked label (true/false)
    #[arg(long, env = "ENABLE_LABEL_MULTIPLE")]
    pub enable_label_multiple: Option<String>,

    /// Comment posted when nothing is checked
    #[arg(long, env = "MESSAGE_LABEL_MISSING")]
    pub message_label_missing: Option<String>,

    /// Comment posted when more than one label is checked
    #[arg(long, env = "MESSAGE_LABEL_MULTIPLE")]
    pub message_label_multiple: Option<String>,
}

/// Comment bodies addressed to the pull request author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub label_missing: String,
    pub label_multiple: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            label_missing: DEFAULT_MESSAGE_LABEL_MISSING.to_string(),
            label_multiple: DEFAULT_MESSAGE_LABEL_MULTIPLE.to_string(),
        }
    }
}

/// Validated docbot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub api_url: String,
    pub pattern: ChecklistPattern,
    pub policy: LabelPolicy,
    pub messages: Messages,
}

impl TryFrom<ConfigArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: ConfigArgs) -> Result<Self, Self::Error> {
        let repository = args.repository.unwrap_or_default();
        let (owner, repo) = parse_repository(&repository)?;

        let token = non_empty(args.token).ok_or(ConfigError::MissingToken)?;

        let api_url = non_empty(args.api_url).unwrap_or_else(|| GITHUB_API_URL.to_string());

        let pattern = ChecklistPattern::new(
            non_empty(args.label_pattern)
                .as_deref()
                .unwrap_or(DEFAULT_LABEL_PATTERN),
        )?;

        let watch = WatchSet::from_list(args.label_watch_list.as_deref().unwrap_or_default());
        if watch.is_empty() {
            warn!("Label watch list is empty, no labels will be managed");
        }

        let missing_label = non_empty(args.label_missing)
            .map_or_else(|| DEFAULT_LABEL_MISSING.to_string(), |s| s.trim().to_string());
        if watch.contains(&missing_label) {
            return Err(ConfigError::MissingLabelWatched(missing_label));
        }

        let policy = LabelPolicy {
            watch,
            missing_label,
            enable_missing: parse_flag(
                "ENABLE_LABEL_MISSING",
                args.enable_label_missing.as_deref(),
                true,
            )?,
            enable_multiple: parse_flag(
                "ENABLE_LABEL_MULTIPLE",
                args.enable_label_multiple.as_deref(),
                false,
            )?,
        };

        let defaults = Messages::default();
        let messages = Messages {
            label_missing: non_empty(args.message_label_missing).unwrap_or(defaults.label_missing),
            label_multiple: non_empty(args.message_label_multiple)
                .unwrap_or(defaults.label_multiple),
        };

        Ok(Self {
            owner,
            repo,
            token,
            api_url,
            pattern,
            policy,
            messages,
        })
    }
}

/// Split `owner/repo`.
pub fn parse_repository(repository: &str) -> Result<(String, String), ConfigError> {
    let invalid = || ConfigError::InvalidRepository(repository.to_string());

    let (owner, repo) = repository.trim().split_once('/').ok_or_else(invalid)?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid());
    }

    Ok((owner.to_string(), repo.to_string()))
}

fn parse_flag(name: &'static str, value: Option<&str>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
