//! End-to-end dispatcher tests against an in-memory label store.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use docbot::labels::LabelName;
use docbot::{
    Config, ConfigArgs, DispatchError, Dispatcher, EventContext, EventName, GitHubError,
    LabelStore, Outcome, PullRequestEvent, PullRequestInfo,
};
use serde_json::json;

const PR: u64 = 42;
const AUTHOR: &str = "octocat";
const MISSING: &str = "label-missing";

const TEMPLATE: &str = "### Motivation\r\n\r\nFix the thing.\r\n\r\n\
                        ### Documentation\r\n\r\n\
                        - [ ] `doc`\r\n\
                        - [ ] `doc-required`\r\n\
                        - [ ] `doc-not-needed`\r\n";

#[derive(Default)]
struct State {
    repo_labels: Vec<LabelName>,
    issue_labels: Vec<LabelName>,
    body: String,
    comments: Vec<String>,
    mutations: Vec<String>,
    failing: HashSet<String>,
}

/// In-memory label store. Calls listed in `failing` (e.g. `remove doc`,
/// `list repo`) return an API error.
struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    fn new(repo_labels: &[&str], issue_labels: &[&str], body: &str) -> Self {
        Self {
            state: Mutex::new(State {
                repo_labels: repo_labels.iter().map(|s| (*s).to_string()).collect(),
                issue_labels: issue_labels.iter().map(|s| (*s).to_string()).collect(),
                body: body.to_string(),
                ..State::default()
            }),
        }
    }

    fn fail(&self, call: &str) {
        self.state.lock().unwrap().failing.insert(call.to_string());
    }

    fn check(&self, call: &str) -> Result<(), GitHubError> {
        if self.state.lock().unwrap().failing.contains(call) {
            return Err(GitHubError::Api {
                status: 500,
                message: format!("{call} failed"),
            });
        }
        Ok(())
    }

    fn issue_labels(&self) -> Vec<String> {
        let mut labels = self.state.lock().unwrap().issue_labels.clone();
        labels.sort();
        labels
    }

    fn body(&self) -> String {
        self.state.lock().unwrap().body.clone()
    }

    fn comments(&self) -> Vec<String> {
        self.state.lock().unwrap().comments.clone()
    }

    fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    fn clear_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.comments.clear();
        state.mutations.clear();
    }

    /// A label added by hand, outside docbot.
    fn add_by_hand(&self, label: &str) {
        self.state.lock().unwrap().issue_labels.push(label.to_string());
    }

    fn remove_by_hand(&self, label: &str) {
        self.state
            .lock()
            .unwrap()
            .issue_labels
            .retain(|l| l != label);
    }
}

#[async_trait]
impl LabelStore for FakeStore {
    async fn list_repo_labels(&self) -> Result<Vec<LabelName>, GitHubError> {
        self.check("list repo")?;
        Ok(self.state.lock().unwrap().repo_labels.clone())
    }

    async fn list_issue_labels(&self, number: u64) -> Result<Vec<LabelName>, GitHubError> {
        assert_eq!(number, PR);
        self.check("list issue")?;
        Ok(self.state.lock().unwrap().issue_labels.clone())
    }

    async fn add_labels(&self, number: u64, labels: &[LabelName]) -> Result<(), GitHubError> {
        assert_eq!(number, PR);
        self.check(&format!("add {}", labels.join(",")))?;
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("add {}", labels.join(",")));
        for label in labels {
            if !state.issue_labels.contains(label) {
                state.issue_labels.push(label.clone());
            }
        }
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), GitHubError> {
        assert_eq!(number, PR);
        self.check(&format!("remove {label}"))?;
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("remove {label}"));
        state.issue_labels.retain(|l| l != label);
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        assert_eq!(number, PR);
        self.check("comment")?;
        self.state.lock().unwrap().comments.push(body.to_string());
        Ok(())
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo, GitHubError> {
        self.check("get pr")?;
        Ok(PullRequestInfo {
            number,
            author: AUTHOR.to_string(),
            body: self.body(),
        })
    }

    async fn edit_pull_request_body(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        assert_eq!(number, PR);
        self.check("edit")?;
        let mut state = self.state.lock().unwrap();
        state.mutations.push("edit".to_string());
        state.body = body.to_string();
        Ok(())
    }
}

fn config_with(overrides: impl FnOnce(&mut ConfigArgs)) -> Config {
    let mut args = ConfigArgs {
        repository: Some("apache/pulsar".to_string()),
        token: Some("ghp_test".to_string()),
        label_watch_list: Some("doc,doc-required,doc-not-needed".to_string()),
        ..ConfigArgs::default()
    };
    overrides(&mut args);
    Config::try_from(args).unwrap()
}

fn config() -> Config {
    config_with(|_| {})
}

fn repo_labels() -> Vec<&'static str> {
    vec!["doc", "doc-required", "doc-not-needed", MISSING, "bug"]
}

fn event(action: &str, body: Option<&str>) -> PullRequestEvent {
    let payload = json!({
        "action": action,
        "number": PR,
        "pull_request": {
            "number": PR,
            "body": body,
            "user": { "login": AUTHOR }
        }
    });
    EventContext::from_json(EventName::PullRequest, &payload.to_string())
        .unwrap()
        .pull_request
        .unwrap()
}

fn checked(body: &str, label: &str) -> String {
    body.replace(&format!("- [ ] `{label}`"), &format!("- [x] `{label}`"))
}

#[tokio::test]
async fn test_checked_label_is_added() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&repo_labels(), &[], &body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("opened", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert!(report.failed_writes.is_empty());
    assert_eq!(store.issue_labels(), vec!["doc"]);
    assert_eq!(store.mutations(), vec!["add doc"]);
    assert!(store.comments().is_empty());
}

#[tokio::test]
async fn test_multiple_checked_labels_are_rejected() {
    let body = checked(&checked(TEMPLATE, "doc"), "doc-required");
    let store = FakeStore::new(&repo_labels(), &["doc-not-needed", "bug"], &body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::MultipleLabels);
    assert!(report.outcome.is_failure());
    assert!(store.mutations().is_empty());
    assert_eq!(store.issue_labels(), vec!["bug", "doc-not-needed"]);
    assert_eq!(
        store.comments(),
        vec!["@octocat Please select only one documentation label for your PR."]
    );
}

#[tokio::test]
async fn test_multiple_labels_allowed_when_enabled() {
    let body = checked(&checked(TEMPLATE, "doc"), "doc-required");
    let store = FakeStore::new(&repo_labels(), &[], &body);
    let config = config_with(|args| args.enable_label_multiple = Some("true".to_string()));

    let report = Dispatcher::new(&config, &store)
        .run(&event("opened", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert_eq!(store.issue_labels(), vec!["doc", "doc-required"]);
}

#[tokio::test]
async fn test_removed_checklist_clears_labels() {
    let body = "No checklist in this description.";
    let store = FakeStore::new(&repo_labels(), &["doc", "bug"], body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", Some(body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::MissingLabel);
    assert_eq!(store.issue_labels(), vec!["bug", MISSING]);
    assert_eq!(
        store.mutations(),
        vec!["remove doc".to_string(), format!("add {MISSING}")]
    );
    assert_eq!(
        store.comments(),
        vec!["@octocat Please provide a correct documentation label for your PR."]
    );
}

#[tokio::test]
async fn test_removed_checklist_without_missing_check() {
    let store = FakeStore::new(&repo_labels(), &["doc"], "");
    let config = config_with(|args| args.enable_label_missing = Some("false".to_string()));

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", None))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert!(store.issue_labels().is_empty());
    assert!(store.comments().is_empty());
}

#[tokio::test]
async fn test_missing_label_not_added_twice() {
    let store = FakeStore::new(&repo_labels(), &[MISSING], TEMPLATE);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", Some(TEMPLATE)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::MissingLabel);
    assert!(store.mutations().is_empty());
    assert_eq!(store.comments().len(), 1);
}

#[tokio::test]
async fn test_selection_replaces_missing_label() {
    let body = checked(TEMPLATE, "doc-not-needed");
    let store = FakeStore::new(&repo_labels(), &[MISSING, "doc"], &body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert_eq!(store.issue_labels(), vec!["doc-not-needed"]);
    assert_eq!(
        store.mutations(),
        vec!["remove doc", "remove label-missing", "add doc-not-needed"]
    );
}

#[tokio::test]
async fn test_label_unknown_to_repository_is_not_added() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&["doc-required", MISSING], &[], &body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("opened", Some(&body)))
        .await
        .unwrap();

    // the only checked label does not exist, so nothing is selected
    assert_eq!(report.outcome, Outcome::MissingLabel);
    assert_eq!(store.issue_labels(), vec![MISSING]);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&repo_labels(), &[MISSING, "doc-required"], &body);
    let config = config();
    let dispatcher = Dispatcher::new(&config, &store);

    let first = dispatcher.run(&event("edited", Some(&body))).await.unwrap();
    assert_eq!(first.outcome, Outcome::Synced);
    assert!(!store.mutations().is_empty());

    store.clear_log();
    let second = dispatcher.run(&event("edited", Some(&body))).await.unwrap();
    assert_eq!(second.outcome, Outcome::Synced);
    assert!(store.mutations().is_empty());
    assert_eq!(store.issue_labels(), vec!["doc"]);
}

#[tokio::test]
async fn test_failed_write_does_not_stop_run() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&repo_labels(), &["doc-required", "doc-not-needed"], &body);
    store.fail("remove doc-not-needed");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert_eq!(report.failed_writes, vec!["remove label doc-not-needed"]);
    assert_eq!(store.issue_labels(), vec!["doc", "doc-not-needed"]);
}

#[tokio::test]
async fn test_failed_add_does_not_block_other_labels() {
    let body = checked(&checked(TEMPLATE, "doc"), "doc-required");
    let store = FakeStore::new(&repo_labels(), &[MISSING], &body);
    store.fail("add doc");
    let config = config_with(|args| args.enable_label_multiple = Some("true".to_string()));

    let report = Dispatcher::new(&config, &store)
        .run(&event("edited", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert_eq!(report.failed_writes, vec!["add label doc"]);
    assert_eq!(store.issue_labels(), vec!["doc-required"]);
    assert_eq!(
        store.mutations(),
        vec!["remove label-missing", "add doc-required"]
    );
}

#[tokio::test]
async fn test_failed_comment_still_fails_run() {
    let body = checked(&checked(TEMPLATE, "doc"), "doc-required");
    let store = FakeStore::new(&repo_labels(), &[], &body);
    store.fail("comment");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("opened", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::MultipleLabels);
    assert_eq!(report.failed_writes, vec!["create comment"]);
}

#[tokio::test]
async fn test_read_failure_is_fatal() {
    for call in ["list repo", "list issue", "get pr"] {
        let body = checked(TEMPLATE, "doc");
        let store = FakeStore::new(&repo_labels(), &["doc-required"], &body);
        store.fail(call);
        let config = config();

        let err = Dispatcher::new(&config, &store)
            .run(&event("edited", Some(&body)))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Read { .. }), "{call}");
        assert!(store.mutations().is_empty(), "{call}");
        assert!(store.comments().is_empty(), "{call}");
    }
}

#[tokio::test]
async fn test_direct_label_updates_checklist() {
    let store = FakeStore::new(&repo_labels(), &[MISSING], TEMPLATE);
    store.add_by_hand("doc");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("labeled", Some(TEMPLATE)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert_eq!(store.issue_labels(), vec!["doc"]);
    assert_eq!(store.mutations(), vec!["remove label-missing", "edit"]);
    assert_eq!(store.body(), checked(TEMPLATE, "doc"));
    assert!(store.comments().is_empty());
}

#[tokio::test]
async fn test_direct_label_appends_missing_line() {
    let body = "Short description";
    let store = FakeStore::new(&repo_labels(), &["doc-required"], body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("labeled", Some(body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert_eq!(store.body(), "Short description\r\n- [x] `doc-required`\r\n");
}

#[tokio::test]
async fn test_direct_label_in_sync_body_not_edited() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&repo_labels(), &["doc", "bug"], &body);
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("labeled", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert!(store.mutations().is_empty());
}

#[tokio::test]
async fn test_direct_unlabel_leaves_body() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&repo_labels(), &["doc", "doc-required"], &body);
    store.remove_by_hand("doc");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("unlabeled", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Synced);
    assert!(store.mutations().is_empty());
    assert_eq!(store.body(), body);
}

#[tokio::test]
async fn test_direct_unlabel_of_last_label_flags_missing() {
    let body = checked(TEMPLATE, "doc");
    let store = FakeStore::new(&repo_labels(), &["doc"], &body);
    store.remove_by_hand("doc");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("unlabeled", Some(&body)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::MissingLabel);
    assert_eq!(store.issue_labels(), vec![MISSING]);
    assert_eq!(store.comments().len(), 1);
    assert_eq!(store.body(), body);
}

#[tokio::test]
async fn test_direct_second_label_is_rejected() {
    let store = FakeStore::new(&repo_labels(), &["doc"], TEMPLATE);
    store.add_by_hand("doc-required");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("labeled", Some(TEMPLATE)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::MultipleLabels);
    assert!(store.mutations().is_empty());
    assert_eq!(store.body(), TEMPLATE);
}

#[tokio::test]
async fn test_unrelated_action_is_skipped() {
    let store = FakeStore::new(&repo_labels(), &[], TEMPLATE);
    store.fail("list repo");
    let config = config();

    let report = Dispatcher::new(&config, &store)
        .run(&event("synchronize", Some(TEMPLATE)))
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Skipped);
    assert!(!report.outcome.is_failure());
}
