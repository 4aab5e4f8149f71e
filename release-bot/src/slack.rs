//! Slack Web API implementation of [`ChatClient`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use release_bot_core::contract::{ChatClient, PostedMessage};
use release_bot_core::error::ChatError;

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

pub struct SlackClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Slack answers HTTP 200 for most failures and reports them in `ok`/`error`.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, ChatError> {
        let response = response.map_err(|e| ChatError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport(format!("{status}: {message}")));
        }
        response
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))
    }
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<String>,
    unfurl_links: bool,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct PermalinkResponse {
    ok: bool,
    permalink: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
    error: Option<String>,
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_id: Option<String>,
    ) -> Result<PostedMessage, ChatError> {
        let threaded = thread_id.is_some();
        let resp = self
            .http
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&PostMessageRequest {
                channel,
                text,
                thread_ts: thread_id,
                unfurl_links: false,
            })
            .send()
            .await;
        let posted: PostMessageResponse = self.handle_response(resp).await?;
        tracing::debug!(channel, threaded, ok = posted.ok, "[SLACK] chat.postMessage");
        Ok(PostedMessage {
            ok: posted.ok,
            timestamp: posted.ts,
            error: posted.error,
        })
    }

    async fn get_permalink(&self, channel: &str, timestamp: &str) -> Result<String, ChatError> {
        let resp = self
            .http
            .get(self.api_url("chat.getPermalink"))
            .bearer_auth(&self.token)
            .query(&[("channel", channel), ("message_ts", timestamp)])
            .send()
            .await;
        let link: PermalinkResponse = self.handle_response(resp).await?;
        match (link.ok, link.permalink) {
            (true, Some(permalink)) => Ok(permalink),
            _ => Err(ChatError::Rejected(
                link.error.unwrap_or_else(|| "no permalink returned".to_string()),
            )),
        }
    }

    async fn list_recent_messages(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<String>, ChatError> {
        let limit = limit.to_string();
        let resp = self
            .http
            .get(self.api_url("conversations.history"))
            .bearer_auth(&self.token)
            .query(&[("channel", channel), ("limit", limit.as_str())])
            .send()
            .await;
        let history: HistoryResponse = self.handle_response(resp).await?;
        if !history.ok {
            return Err(ChatError::Rejected(history.error.unwrap_or_default()));
        }
        Ok(history.messages.into_iter().map(|m| m.text).collect())
    }
}
