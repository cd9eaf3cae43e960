//! Checklist write-back.
//!
//! When a label is added or removed directly on the pull request, the
//! checklist in the description is rewritten so both agree again. Edits are
//! literal: flip the first matching checkbox line, or append a new one.

use super::{CurrentLabelSet, DesiredLabels};

/// Render the canonical checklist line for a label.
#[must_use]
pub fn checkbox_line(name: &str, checked: bool) -> String {
    let mark = if checked { 'x' } else { ' ' };
    format!("- [{mark}] `{name}`")
}

/// Literal edits to apply to a pull request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyEditPlan {
    /// `(from, to)` pairs; only the first occurrence of `from` is replaced.
    pub replacements: Vec<(String, String)>,
    /// Lines appended to the end of the body, in order.
    pub appends: Vec<String>,
}

impl BodyEditPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.appends.is_empty()
    }

    /// Number of labels whose checkbox changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.replacements.len() + self.appends.len()
    }

    #[must_use]
    pub fn apply(&self, body: &str) -> String {
        let mut body = body.to_string();

        for (from, to) in &self.replacements {
            body = body.replacen(from.as_str(), to, 1);
        }

        for line in &self.appends {
            if !body.is_empty() && !body.ends_with('\n') {
                body.push_str("\r\n");
            }
            body.push_str(line);
            body.push_str("\r\n");
        }

        body
    }
}

/// Work out how the checklist in `body` must change so it reflects `current`.
///
/// `desired` is the checklist state last read from `body`. Labels present on
/// the issue but not checked get checked; labels checked but no longer on the
/// issue get unchecked. The sentinel is never written to the checklist.
pub fn plan_body_edit(
    body: &str,
    current: &CurrentLabelSet,
    desired: &DesiredLabels,
    missing_label: &str,
) -> BodyEditPlan {
    let to_check = current
        .iter()
        .filter(|name| name.as_str() != missing_label && !desired.is_checked(name))
        .map(|name| (name, true));
    let to_uncheck = desired
        .checked()
        .filter(|name| !current.contains(*name))
        .map(|name| (name, false));

    let mut plan = BodyEditPlan::default();
    for (name, checked) in to_check.chain(to_uncheck) {
        let from = checkbox_line(name, !checked);
        let to = checkbox_line(name, checked);

        if body.contains(&from) {
            plan.replacements.push((from, to));
        } else {
            plan.appends.push(to);
        }
    }

    plan
}

/// Rewrite `body` so its checklist matches `current`.
///
/// Returns the new body and whether anything changed.
pub fn sync_body(
    body: &str,
    current: &CurrentLabelSet,
    desired: &DesiredLabels,
    missing_label: &str,
) -> (String, bool) {
    let plan = plan_body_edit(body, current, desired, missing_label);
    if plan.is_empty() {
        return (body.to_string(), false);
    }
    (plan.apply(body), true)
}
