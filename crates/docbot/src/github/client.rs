//! # GitHub Label API Client
//!
//! REST client for the label, comment and pull request endpoints docbot
//! uses. Listing endpoints are followed page by page through the `Link`
//! header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{GitHubUser, LabelStore, PullRequestInfo};
use crate::error::GitHubError;
use crate::labels::LabelName;

/// Public GitHub API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("docbot/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: u32 = 100;
const MAX_PAGES: usize = 100;

/// GitHub API client scoped to one repository.
#[derive(Clone)]
pub struct GitHubLabelClient {
    http_client: HttpClient,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequest {
    number: u64,
    #[serde(default)]
    body: Option<String>,
    user: GitHubUser,
}

#[derive(Debug, Serialize)]
struct AddLabelsRequest<'a> {
    labels: &'a [LabelName],
}

#[derive(Debug, Serialize)]
struct BodyRequest<'a> {
    body: &'a str,
}

impl GitHubLabelClient {
    /// Create a client for `owner/repo` against `base_url`.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{path}", self.base_url, self.owner, self.repo)
    }

    /// Fetch every label name from a paginated label listing.
    async fn list_label_pages(&self, path: &str) -> Result<Vec<LabelName>, GitHubError> {
        let mut url = Some(format!("{}?per_page={PER_PAGE}", self.repo_url(path)));
        let mut labels = Vec::new();
        let mut pages = 0;

        while let Some(page_url) = url.take() {
            if pages == MAX_PAGES {
                warn!(path, pages, "Stopped following label pages at page limit");
                break;
            }
            pages += 1;

            let response = self.send(Method::GET, &page_url, None::<&()>).await?;
            url = response
                .headers()
                .get(header::LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);

            let page: Vec<GitHubLabel> = response.json().await?;
            labels.extend(page.into_iter().map(|label| label.name));
        }

        debug!(path, pages, count = labels.len(), "Listed labels");
        Ok(labels)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, GitHubError> {
        let response = self.request(method, url, body).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    /// Send a request with authentication. The status is not checked.
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, GitHubError> {
        let mut request = self
            .http_client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    async fn error_from(response: Response) -> GitHubError {
        let status = response.status();

        if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
            && header_value(&response, "x-ratelimit-remaining") == Some("0")
        {
            let reset_in = header_value(&response, "x-ratelimit-reset")
                .and_then(|s| s.parse::<i64>().ok())
                .map_or(Duration::from_secs(60), |reset| {
                    reset_delay(reset, chrono::Utc::now().timestamp())
                });
            return GitHubError::RateLimited { reset_in };
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GitHubErrorBody>(&text)
            .map(|error| error.message)
            .unwrap_or(text);

        GitHubError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn header_value<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

/// Time until the epoch second `reset`, clamped at zero.
fn reset_delay(reset: i64, now: i64) -> Duration {
    #[allow(clippy::cast_sign_loss)]
    let seconds = reset.saturating_sub(now).max(0) as u64;
    Duration::from_secs(seconds)
}

/// Pull the `rel="next"` target out of a `Link` header.
pub(crate) fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .is_some_and(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
        });

        is_next.then(|| {
            target
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}

#[async_trait]
impl LabelStore for GitHubLabelClient {
    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    async fn list_repo_labels(&self) -> Result<Vec<LabelName>, GitHubError> {
        self.list_label_pages("labels").await
    }

    #[instrument(skip(self), fields(pr_number = %number))]
    async fn list_issue_labels(&self, number: u64) -> Result<Vec<LabelName>, GitHubError> {
        self.list_label_pages(&format!("issues/{number}/labels"))
            .await
    }

    #[instrument(skip(self), fields(pr_number = %number, labels = ?labels))]
    async fn add_labels(&self, number: u64, labels: &[LabelName]) -> Result<(), GitHubError> {
        if labels.is_empty() {
            return Ok(());
        }

        let url = self.repo_url(&format!("issues/{number}/labels"));
        self.send(Method::POST, &url, Some(&AddLabelsRequest { labels }))
            .await?;

        info!("Added {} labels to PR #{}", labels.len(), number);
        Ok(())
    }

    #[instrument(skip(self), fields(pr_number = %number, label = %label))]
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), GitHubError> {
        let url = self.repo_url(&format!(
            "issues/{number}/labels/{}",
            urlencoding::encode(label)
        ));

        let response = self.request(Method::DELETE, &url, None::<&()>).await?;
        match response.status() {
            status if status.is_success() => {
                info!("Removed label '{}' from PR #{}", label, number);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                debug!(
                    "Label '{}' not found on PR #{} (already removed)",
                    label, number
                );
                Ok(())
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    #[instrument(skip(self, body), fields(pr_number = %number))]
    async fn create_comment(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        let url = self.repo_url(&format!("issues/{number}/comments"));
        self.send(Method::POST, &url, Some(&BodyRequest { body }))
            .await?;

        info!("Commented on PR #{}", number);
        Ok(())
    }

    #[instrument(skip(self), fields(pr_number = %number))]
    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo, GitHubError> {
        let url = self.repo_url(&format!("pulls/{number}"));
        let response = self.send(Method::GET, &url, None::<&()>).await?;
        let pr: GitHubPullRequest = response.json().await?;

        Ok(PullRequestInfo {
            number: pr.number,
            author: pr.user.login,
            body: pr.body.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, body), fields(pr_number = %number))]
    async fn edit_pull_request_body(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        let url = self.repo_url(&format!("pulls/{number}"));
        self.send(Method::PATCH, &url, Some(&BodyRequest { body }))
            .await?;

        info!("Updated description of PR #{}", number);
        Ok(())
    }
}
