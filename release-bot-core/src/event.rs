//! Resolving a CI trigger to the pull requests it releases.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::ReleaseConfig;
use crate::contract::{PullRequest, PullRequestProvider};
use crate::error::ReleaseError;

/// `Title of change (#123)` as written by squash merges.
static SQUASH_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(#(\d+)\)").unwrap());
/// `Merge pull request #123 from org/branch` as written by merge commits.
static MERGE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Merge pull request #(\d+)").unwrap());

/// The CI trigger a run was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseEvent {
    /// A push to a branch, identified by the pushed commit.
    Push { sha: String },
    /// A pull request event (opened, merged, edited).
    PullRequest { number: u64 },
    /// A manual dispatch: the open deploy pull request is the release.
    Dispatch,
}

/// Extracts the pull request number a commit message refers to.
///
/// The subject line's last `(#<digits>)` wins; otherwise the number following
/// `Merge pull request #` anywhere in the message.
pub fn pull_request_number(message: &str) -> Option<u64> {
    let subject = message.lines().next().unwrap_or_default();
    SQUASH_REF_RE
        .captures_iter(subject)
        .last()
        .or_else(|| MERGE_REF_RE.captures(message))
        .and_then(|caps| caps[1].parse().ok())
}

/// Pull request numbers referenced by `messages`, in order, without repeats.
pub fn pull_request_numbers<'a>(messages: impl IntoIterator<Item = &'a str>) -> Vec<u64> {
    let mut numbers = Vec::new();
    for number in messages.into_iter().filter_map(pull_request_number) {
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    numbers
}

/// The open pull request titled `deploy_title` that targets the main branch.
pub async fn find_deploy_pull_request<P>(
    provider: &P,
    config: &ReleaseConfig,
) -> Result<Option<PullRequest>, ReleaseError>
where
    P: PullRequestProvider + ?Sized,
{
    let open = provider.list_open_pull_requests(&config.main_branch).await?;
    debug!(count = open.len(), base = %config.main_branch, "[EVENT] Listed open pull requests");
    Ok(open.into_iter().find(|pr| pr.title == config.deploy_title))
}

/// True when `sha` was pushed directly: a single-parent commit that does not
/// reference a squash-merged pull request.
pub async fn is_direct_push<P>(provider: &P, sha: &str) -> Result<bool, ReleaseError>
where
    P: PullRequestProvider + ?Sized,
{
    let commit = provider.get_commit(sha).await?;
    let direct = commit.parents.len() < 2 && !SQUASH_REF_RE.is_match(&commit.message);
    info!(sha, parents = commit.parents.len(), direct, "[EVENT] Checked push commit");
    Ok(direct)
}

async fn numbers_from_commits<P>(provider: &P, number: u64) -> Result<Vec<u64>, ReleaseError>
where
    P: PullRequestProvider + ?Sized,
{
    let messages = provider.list_pull_request_commits(number).await?;
    let numbers = pull_request_numbers(messages.iter().map(String::as_str));
    info!(
        pr = number,
        commits = messages.len(),
        contributing = numbers.len(),
        "[EVENT] Resolved contributing pull requests from commits"
    );
    Ok(numbers)
}

/// Resolves `event` to the numbers of its contributing pull requests, in
/// discovery order and without repeats.
pub async fn resolve_contributing_prs<P>(
    provider: &P,
    event: &ReleaseEvent,
    config: &ReleaseConfig,
) -> Result<Vec<u64>, ReleaseError>
where
    P: PullRequestProvider + ?Sized,
{
    match event {
        ReleaseEvent::Push { sha } => {
            let commit = provider.get_commit(sha).await?;
            let Some(number) = pull_request_number(&commit.message) else {
                info!(sha = %sha, "[EVENT] Push commit references no pull request");
                return Ok(Vec::new());
            };
            let pr = provider.get_pull_request(number).await?;
            if pr.title == config.deploy_title {
                numbers_from_commits(provider, number).await
            } else {
                Ok(vec![number])
            }
        }
        ReleaseEvent::PullRequest { number } => numbers_from_commits(provider, *number).await,
        ReleaseEvent::Dispatch => {
            let deploy = find_deploy_pull_request(provider, config)
                .await?
                .ok_or_else(|| ReleaseError::DeployPullRequestNotFound(config.deploy_title.clone()))?;
            numbers_from_commits(provider, deploy.number).await
        }
    }
}
