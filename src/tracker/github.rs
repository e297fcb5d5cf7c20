use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::TrackerError;
use crate::model::{ItemState, WorkItem};
use crate::tracker::Tracker;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "shipyard";
const PER_PAGE: usize = 100;

/// A GitHub issue label (only the name matters here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

/// A GitHub issue (subset of fields).
#[derive(Debug, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    /// Pull requests also come through the issues endpoint; filter them out.
    pub pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn into_work_item(self) -> WorkItem {
        let state = self.state.parse().unwrap_or(ItemState::Open);
        WorkItem {
            id: self.number,
            title: self.title,
            body: self.body.unwrap_or_default(),
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            state,
        }
    }
}

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
];

/// Prefix check only. Does not verify the token is active or scoped.
pub fn is_valid_github_token(token: &str) -> bool {
    !token.is_empty() && GITHUB_TOKEN_PREFIXES.iter().any(|p| token.starts_with(p))
}

/// Normalize a repository reference to `owner/repo`.
///
/// Accepts:
/// - `owner/repo`
/// - `https://github.com/owner/repo`
/// - `https://github.com/owner/repo.git`
pub fn parse_repo_slug(input: &str) -> Result<String, TrackerError> {
    let trimmed = input.trim();
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .unwrap_or(trimmed);
    let path = path.strip_suffix(".git").unwrap_or(path);

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() == 2 && parts.iter().all(|p| !p.is_empty() && !p.contains(':')) {
        Ok(format!("{}/{}", parts[0], parts[1]))
    } else {
        Err(TrackerError::InvalidRepo(input.to_string()))
    }
}

/// REST client for one repository's issues.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, repo: &str, token: &str) -> Result<Self, TrackerError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: parse_repo_slug(repo)?,
            token: token.to_string(),
        })
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.api_url, self.repo)
    }

    fn issue_url(&self, number: u64) -> String {
        format!("{}/{}", self.issues_url(), number)
    }

    /// `.../issues/<number>/labels/<label>` with `label` encoded as one path
    /// segment, so names like `area/ready` or `needs review?` stay intact.
    fn label_url(&self, number: u64, label: &str) -> Result<reqwest::Url, TrackerError> {
        let base = format!("{}/labels", self.issue_url(number));
        let mut url = reqwest::Url::parse(&base).map_err(|_| TrackerError::InvalidUrl(base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| TrackerError::InvalidUrl(base.clone()))?
            .push(label);
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }

    async fn send(&self, req: RequestBuilder, url: &str) -> Result<Response, TrackerError> {
        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(|source| TrackerError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: Response, url: &str) -> Result<T, TrackerError> {
        resp.json::<T>().await.map_err(|source| TrackerError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Tracker for GitHubClient {
    /// Paginates through all pages; pull requests are dropped.
    async fn list_open_issues(&self, labels: &[String]) -> Result<Vec<WorkItem>, TrackerError> {
        let url = self.issues_url();
        let label_param = labels.join(",");
        let mut all_issues = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = vec![
                ("state", "open".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            if !label_param.is_empty() {
                query.push(("labels", label_param.clone()));
            }

            let resp = self.send(self.http.get(&url).query(&query), &url).await?;
            let issues: Vec<GitHubIssue> = Self::decode(resp, &url).await?;
            let count = issues.len();
            tracing::debug!(page, count, repo = %self.repo, "fetched issue page");

            all_issues.extend(
                issues
                    .into_iter()
                    .filter(|i| !i.is_pull_request())
                    .map(GitHubIssue::into_work_item),
            );

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all_issues)
    }

    async fn get_issue(&self, number: u64) -> Result<WorkItem, TrackerError> {
        let url = self.issue_url(number);
        let resp = match self.send(self.http.get(&url), &url).await {
            Err(TrackerError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(TrackerError::IssueNotFound { number });
            }
            other => other?,
        };
        let issue: GitHubIssue = Self::decode(resp, &url).await?;
        Ok(issue.into_work_item())
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), TrackerError> {
        let url = format!("{}/labels", self.issue_url(number));
        let body = serde_json::json!({ "labels": labels });
        self.send(self.http.post(&url).json(&body), &url).await?;
        tracing::info!(number, ?labels, "added labels");
        Ok(())
    }

    /// Removing a label the issue does not carry is not an error.
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let url = self.label_url(number, label)?;
        match self.send(self.http.delete(url.clone()), url.as_str()).await {
            Ok(_) => {
                tracing::info!(number, label, "removed label");
                Ok(())
            }
            Err(TrackerError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
