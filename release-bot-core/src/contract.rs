//! # contract: interfaces to the source-control and chat providers
//!
//! The release pipeline never talks to a network directly. Everything it reads
//! or writes goes through one of the two traits below, constructed once at
//! process start and passed into every operation:
//!
//! - [`PullRequestProvider`]: pull requests, commits, labels and releases
//! - [`ChatClient`]: posting and reading channel messages
//!
//! Both traits are annotated for `mockall` (`MockPullRequestProvider`,
//! `MockChatClient`), exported behind the `test-export-mocks` feature so that
//! downstream crates can use them in their own tests.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ProviderError};

/// A pull request as the pipeline needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// The description as authored; `None` when the author left it empty.
    pub body: Option<String>,
    /// Author handle (login), not the display name.
    pub author: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub parents: Vec<String>,
}

/// Request to open a pull request from `head` into `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub tag: String,
    pub name: String,
    pub body: String,
    pub target_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub name: String,
    pub body: String,
    pub url: String,
}

/// Read and write access to the source-control provider for one repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PullRequestProvider: Send + Sync {
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ProviderError>;

    async fn get_commit(&self, sha: &str) -> Result<Commit, ProviderError>;

    /// Open pull requests targeting `base`, newest first.
    async fn list_open_pull_requests(&self, base: &str) -> Result<Vec<PullRequest>, ProviderError>;

    /// Messages of every commit in the pull request, across all pages.
    async fn list_pull_request_commits(&self, number: u64) -> Result<Vec<String>, ProviderError>;

    /// Tag of the latest published release, `None` when the repository has none.
    async fn latest_release_tag(&self) -> Result<Option<String>, ProviderError>;

    async fn create_pull_request(&self, req: NewPullRequest) -> Result<PullRequest, ProviderError>;

    async fn update_pull_request_body(&self, number: u64, body: &str) -> Result<(), ProviderError>;

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ProviderError>;

    /// Names of all labels defined in the repository.
    async fn list_labels(&self) -> Result<Vec<String>, ProviderError>;

    async fn create_label(
        &self,
        name: &str,
        color: &str,
        description: &str,
    ) -> Result<(), ProviderError>;

    async fn add_label(&self, number: u64, name: &str) -> Result<(), ProviderError>;

    async fn create_release(&self, req: NewRelease) -> Result<Release, ProviderError>;

    async fn get_release(&self, tag: &str) -> Result<Release, ProviderError>;
}

/// Result of a chat post. `ok == false` carries the provider's error string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedMessage {
    pub ok: bool,
    pub timestamp: Option<String>,
    pub error: Option<String>,
}

/// Access to the chat provider.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Posts `text` to `channel`, as a threaded reply when `thread_id` is set.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_id: Option<String>,
    ) -> Result<PostedMessage, ChatError>;

    async fn get_permalink(&self, channel: &str, timestamp: &str) -> Result<String, ChatError>;

    /// Texts of the latest `limit` messages in `channel`.
    async fn list_recent_messages(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<String>, ChatError>;
}
