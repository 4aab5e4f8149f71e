//! GitHub REST implementation of [`PullRequestProvider`].
//!
//! One client per repository. The base URL defaults to the public API and can
//! be pointed at a test server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use release_bot_core::contract::{
    Commit, NewPullRequest, NewRelease, PullRequest, PullRequestProvider, Release,
};
use release_bot_core::error::ProviderError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("release-bot/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    http: Client,
    base_url: String,
    repository: String,
    token: String,
}

impl GitHubClient {
    /// `repository` is `owner/repo`.
    pub fn new(base_url: &str, repository: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            token: token.to_string(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/repos/{}{}", self.base_url, self.repository, path)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorised(self.http.get(url))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorised(self.http.post(url))
    }

    fn authorised(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        req.send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status.as_u16() == 401 {
            Err(ProviderError::Unauthorized)
        } else if status.as_u16() == 429 {
            Err(ProviderError::RateLimited)
        } else if status.as_u16() == 404 {
            Err(ProviderError::NotFound(response.url().path().to_string()))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        self.check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ProviderError> {
        self.check_status(response).await.map(|_| ())
    }

    /// Follows `page=` until a page comes back short.
    async fn get_all<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Vec<T>, ProviderError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        for page in 1.. {
            let url = self.api_url(&format!("{path}{separator}per_page={PER_PAGE}&page={page}"));
            let resp = self.send(self.get(&url)).await?;
            let batch: Vec<T> = self.handle_response(resp).await?;
            let last = batch.len() < PER_PAGE;
            items.extend(batch);
            if last {
                break;
            }
        }
        tracing::debug!(path, count = items.len(), "[GITHUB] Fetched all pages");
        Ok(items)
    }
}

/// Request types for the GitHub API
#[derive(Serialize)]
struct CreatePullRequestBody<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct CreateLabelBody<'a> {
    name: &'a str,
    color: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct AddLabelsBody<'a> {
    labels: [&'a str; 1],
}

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    target_commitish: &'a str,
    generate_release_notes: bool,
}

/// Response types from the GitHub API
#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    number: u64,
    title: String,
    body: Option<String>,
    user: UserResponse,
    html_url: String,
}

impl From<PullRequestResponse> for PullRequest {
    fn from(r: PullRequestResponse) -> Self {
        PullRequest {
            number: r.number,
            title: r.title,
            body: r.body.filter(|b| !b.is_empty()),
            author: r.user.login,
            url: r.html_url,
        }
    }
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
}

#[derive(Deserialize)]
struct ParentResponse {
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
    #[serde(default)]
    parents: Vec<ParentResponse>,
}

impl From<CommitResponse> for Commit {
    fn from(r: CommitResponse) -> Self {
        Commit {
            sha: r.sha,
            message: r.commit.message,
            parents: r.parents.into_iter().map(|p| p.sha).collect(),
        }
    }
}

#[derive(Deserialize)]
struct LabelResponse {
    name: String,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
    html_url: String,
}

impl From<ReleaseResponse> for Release {
    fn from(r: ReleaseResponse) -> Self {
        Release {
            name: r.name.unwrap_or_else(|| r.tag_name.clone()),
            tag: r.tag_name,
            body: r.body.unwrap_or_default(),
            url: r.html_url,
        }
    }
}

#[async_trait]
impl PullRequestProvider for GitHubClient {
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ProviderError> {
        let resp = self
            .send(self.get(&self.api_url(&format!("/pulls/{number}"))))
            .await?;
        let pr: PullRequestResponse = self.handle_response(resp).await?;
        Ok(pr.into())
    }

    async fn get_commit(&self, sha: &str) -> Result<Commit, ProviderError> {
        let resp = self
            .send(self.get(&self.api_url(&format!("/commits/{sha}"))))
            .await?;
        let commit: CommitResponse = self.handle_response(resp).await?;
        Ok(commit.into())
    }

    async fn list_open_pull_requests(&self, base: &str) -> Result<Vec<PullRequest>, ProviderError> {
        let url = self.api_url(&format!("/pulls?state=open&base={base}&sort=created&direction=desc"));
        let resp = self.send(self.get(&url)).await?;
        let prs: Vec<PullRequestResponse> = self.handle_response(resp).await?;
        Ok(prs.into_iter().map(|pr| pr.into()).collect())
    }

    async fn list_pull_request_commits(&self, number: u64) -> Result<Vec<String>, ProviderError> {
        let commits: Vec<CommitResponse> = self.get_all(&format!("/pulls/{number}/commits")).await?;
        Ok(commits.into_iter().map(|c| c.commit.message).collect())
    }

    async fn latest_release_tag(&self) -> Result<Option<String>, ProviderError> {
        let resp = self.send(self.get(&self.api_url("/releases/latest"))).await?;
        match self.handle_response::<ReleaseResponse>(resp).await {
            Ok(release) => Ok(Some(release.tag_name)),
            Err(ProviderError::NotFound(_)) => {
                tracing::info!("[GITHUB] Repository has no releases yet");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_pull_request(&self, req: NewPullRequest) -> Result<PullRequest, ProviderError> {
        let resp = self
            .send(self.post(&self.api_url("/pulls")).json(&CreatePullRequestBody {
                title: &req.title,
                body: &req.body,
                head: &req.head,
                base: &req.base,
            }))
            .await?;
        let pr: PullRequestResponse = self.handle_response(resp).await?;
        Ok(pr.into())
    }

    async fn update_pull_request_body(&self, number: u64, body: &str) -> Result<(), ProviderError> {
        let url = self.api_url(&format!("/pulls/{number}"));
        let resp = self
            .send(self.authorised(self.http.patch(&url)).json(&UpdateBody { body }))
            .await?;
        self.handle_empty_response(resp).await
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ProviderError> {
        let url = self.api_url(&format!("/issues/{number}/comments"));
        let resp = self.send(self.post(&url).json(&UpdateBody { body })).await?;
        self.handle_empty_response(resp).await
    }

    async fn list_labels(&self) -> Result<Vec<String>, ProviderError> {
        let labels: Vec<LabelResponse> = self.get_all("/labels").await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn create_label(
        &self,
        name: &str,
        color: &str,
        description: &str,
    ) -> Result<(), ProviderError> {
        let resp = self
            .send(self.post(&self.api_url("/labels")).json(&CreateLabelBody {
                name,
                color,
                description,
            }))
            .await?;
        self.handle_empty_response(resp).await
    }

    async fn add_label(&self, number: u64, name: &str) -> Result<(), ProviderError> {
        let url = self.api_url(&format!("/issues/{number}/labels"));
        let resp = self
            .send(self.post(&url).json(&AddLabelsBody { labels: [name] }))
            .await?;
        self.handle_empty_response(resp).await
    }

    async fn create_release(&self, req: NewRelease) -> Result<Release, ProviderError> {
        let resp = self
            .send(self.post(&self.api_url("/releases")).json(&CreateReleaseBody {
                tag_name: &req.tag,
                name: &req.name,
                body: &req.body,
                target_commitish: &req.target_sha,
                generate_release_notes: true,
            }))
            .await?;
        let release: ReleaseResponse = self.handle_response(resp).await?;
        Ok(release.into())
    }

    async fn get_release(&self, tag: &str) -> Result<Release, ProviderError> {
        let resp = self
            .send(self.get(&self.api_url(&format!("/releases/tags/{tag}"))))
            .await?;
        let release: ReleaseResponse = self.handle_response(resp).await?;
        Ok(release.into())
    }
}
