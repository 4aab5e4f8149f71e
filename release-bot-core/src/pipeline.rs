//! Run-level operations: one per CI job.
//!
//! Each operation wires the collaborators passed in by the caller to the
//! aggregation and rendering steps and resolves to a [`RunOutcome`]; no error
//! escapes past this boundary. Recoverable conditions (a missing description,
//! a failed fetch of one contributing pull request) are logged and the run
//! carries on.
//!
//! # Operations
//! - [`open_deploy_pull_request`]: make sure a deploy pull request exists
//! - [`summarize_deploy_pull_request`]: rewrite the deploy pull request body from its contributors
//! - [`fill_release_summary`]: overwrite the release summary section of one pull request
//! - [`publish_release`] / [`release`]: tag the next version and optionally announce it
//! - [`announce_release`]: post a published release to chat
//! - [`notify_pull_request`]: post a pull request (plus external review text) to chat

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::{aggregate, ReleaseAggregate, SkipReason};
use crate::chat::{
    deploy_headline, release_announcement_body, render_chat, review_headline, ChatBody,
    ChatMessage, ChatRequest, Priority,
};
use crate::config::{BotConfig, ChatConfig};
use crate::contract::{ChatClient, NewPullRequest, NewRelease, PullRequestProvider, Release};
use crate::document::{render_document, render_summary, ReleaseActions};
use crate::error::{ChatError, ProviderError, ReleaseError};
use crate::event::{find_deploy_pull_request, resolve_contributing_prs, ReleaseEvent};
use crate::section::{extract_summary, from_heading, replace_section, RELEASE_SUMMARY_HEADING};
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Skipped,
    Error,
}

/// What a run did, printed as JSON for the CI job log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_url: Option<String>,
}

impl RunOutcome {
    fn new(status: RunStatus, reason: Option<String>) -> Self {
        Self {
            status,
            reason,
            priority: None,
            thread_url: None,
        }
    }

    pub fn success(reason: impl Into<String>) -> Self {
        Self::new(RunStatus::Success, Some(reason.into()))
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::new(RunStatus::Skipped, Some(reason.into()))
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(RunStatus::Error, Some(reason.into()))
    }

    pub fn with_priority(mut self, priority: &Priority) -> Self {
        self.priority = Some(priority.label().to_string());
        self
    }

    pub fn with_thread_url(mut self, thread_url: Option<String>) -> Self {
        self.thread_url = thread_url;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == RunStatus::Error
    }
}

impl From<ReleaseError> for RunOutcome {
    fn from(e: ReleaseError) -> Self {
        error!(error = %e, "[RUN] Run failed");
        RunOutcome::error(e.to_string())
    }
}

/// Opens the deploy pull request from the staging branch unless one is already open.
pub async fn open_deploy_pull_request<P>(provider: &P, config: &BotConfig) -> RunOutcome
where
    P: PullRequestProvider + ?Sized,
{
    let release = &config.release;
    match find_deploy_pull_request(provider, release).await {
        Ok(Some(existing)) => {
            info!(pr = existing.number, "[DEPLOY] Deploy pull request already open");
            return RunOutcome::skipped(format!(
                "Deploy pull request already open (#{})",
                existing.number
            ));
        }
        Ok(None) => {}
        Err(e) => return e.into(),
    }

    let req = NewPullRequest {
        title: release.deploy_title.clone(),
        body: format!(
            "## {}\nComputing summaries of merged PRs...\n",
            config.sections.summary_heading
        ),
        head: release.staging_branch.clone(),
        base: release.main_branch.clone(),
    };
    match provider.create_pull_request(req).await {
        Ok(pr) => {
            info!(pr = pr.number, "[DEPLOY] Opened deploy pull request");
            RunOutcome::success(format!("Opened deploy pull request #{}", pr.number))
        }
        Err(e) => ReleaseError::from(e).into(),
    }
}

/// Rewrites the open deploy pull request's body with the summary of every
/// pull request merged into it, and leaves a placeholder comment on those
/// without a description.
pub async fn summarize_deploy_pull_request<P>(provider: &P, config: &BotConfig) -> RunOutcome
where
    P: PullRequestProvider + ?Sized,
{
    let deploy = match find_deploy_pull_request(provider, &config.release).await {
        Ok(Some(pr)) => pr,
        Ok(None) => {
            info!("[SUMMARY] No open deploy pull request, nothing to summarise");
            return RunOutcome::skipped(format!(
                "No open pull request titled '{}'",
                config.release.deploy_title
            ));
        }
        Err(e) => return e.into(),
    };

    let event = ReleaseEvent::PullRequest {
        number: deploy.number,
    };
    let numbers = match resolve_contributing_prs(provider, &event, &config.release).await {
        Ok(numbers) => numbers,
        Err(e) => return e.into(),
    };

    let release = aggregate(provider, &numbers, config).await;
    let body = render_document(&release);
    debug!(pr = deploy.number, body = %body, "[SUMMARY] Rendered deploy pull request body");

    if let Err(e) = provider.update_pull_request_body(deploy.number, &body).await {
        return ReleaseError::from(e).into();
    }
    info!(
        pr = deploy.number,
        entries = release.entries().len(),
        "[SUMMARY] Updated deploy pull request body"
    );
    debug!(
        skipped = %serde_json::to_string(release.skipped()).unwrap_or_default(),
        "[SUMMARY] Skipped pull requests"
    );

    comment_on_missing_bodies(provider, &release, config).await;

    RunOutcome::success(format!(
        "Summarised {} pull requests into #{}",
        release.entries().len(),
        deploy.number
    ))
}

/// Leaves the placeholder comment on every contributor skipped for having no description.
async fn comment_on_missing_bodies<P>(provider: &P, release: &ReleaseAggregate, config: &BotConfig)
where
    P: PullRequestProvider + ?Sized,
{
    if !config.release.comment_on_missing_body {
        return;
    }
    for skipped in release.skipped() {
        if skipped.reason != SkipReason::MissingBody {
            continue;
        }
        match provider
            .create_comment(skipped.number, &config.release.placeholder_comment)
            .await
        {
            Ok(()) => info!(pr = skipped.number, "[SUMMARY] Left placeholder comment"),
            Err(e) => {
                warn!(pr = skipped.number, error = %e, "[SUMMARY] Failed to leave placeholder comment")
            }
        }
    }
}

/// Overwrites the release summary section of pull request `target` with the
/// summaries of `numbers`. Re-running with the same input changes nothing.
pub async fn fill_release_summary<P>(
    provider: &P,
    target: u64,
    numbers: &[u64],
    config: &BotConfig,
) -> RunOutcome
where
    P: PullRequestProvider + ?Sized,
{
    let pr = match provider.get_pull_request(target).await {
        Ok(pr) => pr,
        Err(e) => return ReleaseError::from(e).into(),
    };
    let Some(body) = pr.body.filter(|b| !b.trim().is_empty()) else {
        return ReleaseError::MissingBody(target).into();
    };

    let release = aggregate(provider, numbers, config).await;
    comment_on_missing_bodies(provider, &release, config).await;

    let updated = replace_section(&body, RELEASE_SUMMARY_HEADING, &render_summary(&release));
    if updated == body {
        return RunOutcome::skipped(format!("Release summary of #{target} is up to date"));
    }

    match provider.update_pull_request_body(target, &updated).await {
        Ok(()) => {
            info!(pr = target, entries = release.entries().len(), "[SUMMARY] Filled release summary");
            RunOutcome::success(format!(
                "Filled release summary of #{target} from {} pull requests",
                release.entries().len()
            ))
        }
        Err(e) => ReleaseError::from(e).into(),
    }
}

/// Publishes the next release for the merge commit `sha`.
///
/// The bump comes from the release actions listed in the commit message; the
/// body is the message from the release summary heading on.
pub async fn publish_release<P>(
    provider: &P,
    sha: &str,
) -> Result<Release, ReleaseError>
where
    P: PullRequestProvider + ?Sized,
{
    let latest = match provider.latest_release_tag().await {
        Ok(tag) => tag,
        Err(ProviderError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };
    let current = Version::parse_tag(latest.as_deref())?;

    let commit = provider.get_commit(sha).await?;
    let bump = ReleaseActions::parse(&commit.message).change_type();
    let next = current.bump(bump)?;
    info!(current = %current, next = %next, bump = %bump, "[RELEASE] Computed next version");

    let body = from_heading(&commit.message, RELEASE_SUMMARY_HEADING)
        .unwrap_or(&commit.message)
        .trim()
        .to_string();

    let release = provider
        .create_release(NewRelease {
            tag: next.tag(),
            name: next.tag(),
            body,
            target_sha: sha.to_string(),
        })
        .await?;
    info!(tag = %release.tag, url = %release.url, "[RELEASE] Published release");
    Ok(release)
}

/// Publishes the next release and, when a chat client is given, announces it.
pub async fn release<P, C>(
    provider: &P,
    chat: Option<&C>,
    sha: &str,
    repository: &str,
    config: &BotConfig,
) -> RunOutcome
where
    P: PullRequestProvider + ?Sized,
    C: ChatClient + ?Sized,
{
    let published = match publish_release(provider, sha).await {
        Ok(release) => release,
        Err(e) => return e.into(),
    };

    match chat {
        Some(chat) => announce_release(chat, &published, repository, config).await,
        None => RunOutcome::success(format!("Published {}", published.tag)),
    }
}

async fn already_posted<C>(chat: &C, config: &ChatConfig, headline: &str) -> bool
where
    C: ChatClient + ?Sized,
{
    match chat
        .list_recent_messages(&config.channel, config.history_limit)
        .await
    {
        Ok(messages) => messages.iter().any(|text| text.contains(headline)),
        Err(e) => {
            warn!(error = %e, "[CHAT] Could not read channel history, assuming no duplicate");
            false
        }
    }
}

async fn post<C>(
    chat: &C,
    channel: &str,
    text: &str,
    thread_id: Option<String>,
) -> Result<String, ReleaseError>
where
    C: ChatClient + ?Sized,
{
    let posted = chat.post_message(channel, text, thread_id).await?;
    match (posted.ok, posted.timestamp) {
        (true, Some(timestamp)) => Ok(timestamp),
        _ => Err(ChatError::Rejected(
            posted.error.unwrap_or_else(|| "no timestamp returned".to_string()),
        )
        .into()),
    }
}

/// Posts `message` as a root message with its body as a threaded reply and
/// returns the permalink of the root message.
async fn post_threaded<C>(
    chat: &C,
    config: &ChatConfig,
    message: &ChatMessage,
) -> Result<Option<String>, ReleaseError>
where
    C: ChatClient + ?Sized,
{
    let root = post(chat, &config.channel, &message.main_text, None).await?;
    if let Some(thread_text) = &message.thread_text {
        post(chat, &config.channel, thread_text, Some(root.clone())).await?;
    }
    match chat.get_permalink(&config.channel, &root).await {
        Ok(url) => Ok(Some(url)),
        Err(e) => {
            warn!(error = %e, "[CHAT] Posted, but could not fetch permalink");
            Ok(None)
        }
    }
}

/// Announces a published release in the configured channel as one message.
pub async fn announce_release<C>(
    chat: &C,
    release: &Release,
    repository: &str,
    config: &BotConfig,
) -> RunOutcome
where
    C: ChatClient + ?Sized,
{
    let body = release_announcement_body(&release.body, &config.release.deploy_title);
    let message = render_chat(
        &ChatRequest {
            headline: deploy_headline(release, repository),
            body: ChatBody::FreeText(&body),
            external_bodies: Vec::new(),
            priority: None,
        },
        &config.chat,
    );

    if already_posted(chat, &config.chat, &message.headline).await {
        info!(tag = %release.tag, "[ANNOUNCE] Release already announced");
        return RunOutcome::skipped("Release already announced");
    }

    let text = match &message.thread_text {
        Some(thread_text) => format!("{}\n{}", message.main_text, thread_text),
        None => message.main_text.clone(),
    };
    let timestamp = match post(chat, &config.chat.channel, &text, None).await {
        Ok(timestamp) => timestamp,
        Err(e) => return e.into(),
    };
    let permalink = chat.get_permalink(&config.chat.channel, &timestamp).await.ok();

    info!(tag = %release.tag, "[ANNOUNCE] Announced release");
    RunOutcome::success(format!("Announced {}", release.tag)).with_thread_url(permalink)
}

/// True when a title names a release, production or deploy pull request.
pub fn is_release_title(title: &str, keywords: &[String]) -> bool {
    title
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| keywords.iter().any(|k| k.eq_ignore_ascii_case(word)))
}

/// Posts pull request `number` to chat with its summary and any external
/// review text, threaded under a headline with the priority banner. High
/// priority notifications are escalated on the pull request itself.
pub async fn notify_pull_request<P, C>(
    provider: &P,
    chat: &C,
    number: u64,
    priority: Option<Priority>,
    external_bodies: Vec<String>,
    config: &BotConfig,
) -> RunOutcome
where
    P: PullRequestProvider + ?Sized,
    C: ChatClient + ?Sized,
{
    let pr = match provider.get_pull_request(number).await {
        Ok(pr) => pr,
        Err(e) => return ReleaseError::from(e).into(),
    };

    if is_release_title(&pr.title, &config.release.skip_title_keywords) {
        info!(pr = number, title = %pr.title, "[NOTIFY] Skipping release pull request");
        return RunOutcome::skipped("Production deploy or release PR");
    }

    let heading = &config.sections.summary_heading;
    let summary = pr
        .body
        .as_deref()
        .and_then(|body| extract_summary(body, &config.sections))
        .unwrap_or_default();
    let body = format!("## {heading}\n\n{summary}");
    let external_bodies = external_bodies
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>();

    let message = render_chat(
        &ChatRequest {
            headline: review_headline(&pr),
            body: ChatBody::FreeText(&body),
            external_bodies: external_bodies.clone(),
            priority: priority.clone(),
        },
        &config.chat,
    );

    if already_posted(chat, &config.chat, &message.headline).await {
        info!(pr = number, "[NOTIFY] Notification already posted");
        return RunOutcome::skipped("Review already exists");
    }

    let thread_url = match post_threaded(chat, &config.chat, &message).await {
        Ok(url) => url,
        Err(e) => return e.into(),
    };
    info!(pr = number, thread_url = ?thread_url, "[NOTIFY] Posted notification");

    let mut outcome = RunOutcome::success(format!("Notified #{number}")).with_thread_url(thread_url.clone());
    if let Some(priority) = &priority {
        outcome = outcome.with_priority(priority);
        if priority.escalates() {
            if let Err(e) = escalate(provider, number, &external_bodies, thread_url.as_deref(), config).await {
                warn!(pr = number, error = %e, "[NOTIFY] Escalation failed");
                outcome.reason = Some(format!("Notified #{number}, escalation failed: {e}"));
            }
        }
    }
    outcome
}

fn escalation_comment(findings: &[String], thread_url: Option<&str>) -> String {
    let thread = match thread_url {
        Some(url) => format!("3. Join the [review thread]({url}) to discuss the findings and your planned fixes"),
        None => "3. Follow up in the review channel to discuss the findings and your planned fixes".to_string(),
    };
    format!(
        "🚨 **High priority concerns detected**\n\
         The automated review flagged concerns that should be addressed in this PR.\n\
         ### Review findings\n\
         <details>\n\
         <summary>Review details</summary>\n\n\
         {}\n\
         </details>\n\n\
         ### Required actions\n\
         1. Read the findings above ⚠️\n\
         2. Address them in this PR\n\
         {thread}\n\n\
         ⚠️ **Important:** do not merge until every concern is resolved.\n",
        findings.join("\n\n")
    )
}

async fn escalate<P>(
    provider: &P,
    number: u64,
    findings: &[String],
    thread_url: Option<&str>,
    config: &BotConfig,
) -> Result<(), ReleaseError>
where
    P: PullRequestProvider + ?Sized,
{
    provider
        .create_comment(number, &escalation_comment(findings, thread_url))
        .await?;

    let escalation = &config.escalation;
    let labels = provider.list_labels().await?;
    if !labels.iter().any(|label| label == &escalation.label) {
        provider
            .create_label(&escalation.label, &escalation.label_color, &escalation.label_description)
            .await?;
    }
    provider.add_label(number, &escalation.label).await?;
    info!(pr = number, label = %escalation.label, "[NOTIFY] Escalated pull request");
    Ok(())
}
