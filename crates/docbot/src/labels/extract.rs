//! Checklist extraction.
//!
//! Scans free text with a two-group pattern (mark, name) and folds the matches
//! into a label -> checked mapping, keeping only watched labels.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use super::{LabelName, RepoLabelSet};
use crate::error::ConfigError;

/// Matches lines such as ``- [x] `doc` `` and ``- [ ] `doc` ``.
pub const DEFAULT_LABEL_PATTERN: &str = r"- \[(.*?)\] ?`(.+?)`";

/// A compiled checklist pattern with exactly two capture groups.
///
/// Group 1 is the checkbox mark, group 2 the label name.
#[derive(Debug, Clone)]
pub struct ChecklistPattern {
    regex: Regex,
}

impl ChecklistPattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        // captures_len includes the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 2 {
            return Err(ConfigError::PatternGroups {
                pattern: pattern.to_string(),
                groups,
            });
        }

        Ok(Self { regex })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// The set of labels docbot is allowed to manage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet(BTreeSet<LabelName>);

impl WatchSet {
    /// Parse a comma separated list. Entries are trimmed and empty entries
    /// are skipped.
    #[must_use]
    pub fn from_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelName> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<LabelName> for WatchSet {
    fn from_iter<T: IntoIterator<Item = LabelName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Checkbox state per watched label, as last seen in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredLabels(BTreeMap<LabelName, bool>);

impl DesiredLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a checkbox. A later entry for the same name overwrites.
    pub fn set(&mut self, name: impl Into<LabelName>, checked: bool) {
        self.0.insert(name.into(), checked);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    #[must_use]
    pub fn is_checked(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    /// Names whose box is checked, in name order.
    pub fn checked(&self) -> impl Iterator<Item = &LabelName> {
        self.0
            .iter()
            .filter_map(|(name, checked)| checked.then_some(name))
    }

    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.0.values().filter(|checked| **checked).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LabelName, bool)> {
        self.0.iter().map(|(name, checked)| (name, *checked))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Split into the entries the repository defines and the names it does
    /// not.
    #[must_use]
    pub fn partition_by_repo(&self, repo_labels: &RepoLabelSet) -> (Self, BTreeSet<LabelName>) {
        let mut known = Self::new();
        let mut unknown = BTreeSet::new();
        for (name, checked) in self.iter() {
            if repo_labels.contains(name) {
                known.set(name.clone(), checked);
            } else {
                unknown.insert(name.clone());
            }
        }
        (known, unknown)
    }
}

impl<S: Into<LabelName>> FromIterator<(S, bool)> for DesiredLabels {
    fn from_iter<T: IntoIterator<Item = (S, bool)>>(iter: T) -> Self {
        let mut desired = Self::new();
        for (name, checked) in iter {
            desired.set(name, checked);
        }
        desired
    }
}

/// Read the checklist out of `text`.
///
/// A match is checked when its trimmed, lower-cased mark is `x`. Names outside
/// `watch` are ignored. No match at all yields an empty mapping.
pub fn extract(text: &str, pattern: &ChecklistPattern, watch: &WatchSet) -> DesiredLabels {
    let mut desired = DesiredLabels::new();

    for captures in pattern.regex.captures_iter(text) {
        let Some(name) = captures.get(2) else {
            continue;
        };
        // an optional mark group that did not take part reads as unchecked
        let mark = captures.get(1).map_or("", |m| m.as_str());

        let name = name.as_str().trim();
        if !watch.contains(name) {
            continue;
        }

        let checked = mark.trim().eq_ignore_ascii_case("x");
        desired.set(name, checked);
    }

    desired
}
