/// `load_config` module: loads the static YAML config and reads secrets from the environment.
///
/// The YAML file holds no secrets; every section is optional and falls back to
/// the defaults in [`release_bot_core::config`]. Tokens and the repository come
/// from the environment only (see [`AppEnv`]).
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at the CLI boundary.
use anyhow::{anyhow, Context, Result};
use release_bot_core::config::BotConfig;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::github::{self, GitHubClient};
use crate::slack::{self, SlackClient};

/// Loads the YAML config at `path`, or the defaults when no path is given.
/// `SLACK_CHANNEL` overrides `chat.channel` when set.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    let mut config = match path {
        Some(path_ref) => {
            info!(config_path = ?path_ref, "Loading configuration from file");
            let config_content = fs::read_to_string(path_ref).map_err(|e| {
                error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
                anyhow!("Failed to read config file {:?}: {}", path_ref, e)
            })?;
            let parsed: BotConfig = serde_yaml::from_str(&config_content).map_err(|e| {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                anyhow!("Failed to parse config YAML: {e}")
            })?;
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            parsed
        }
        None => {
            info!("No config file given, using defaults");
            BotConfig::default()
        }
    };

    if let Some(channel) = non_empty_var("SLACK_CHANNEL") {
        config.chat.channel = channel;
    }

    config.trace_loaded();
    Ok(config)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Secrets and endpoints read from the environment.
#[derive(Clone)]
pub struct AppEnv {
    pub github_token: String,
    /// `owner/repo`
    pub repository: String,
    pub github_api_url: String,
    pub slack_token: Option<String>,
    pub slack_api_url: String,
}

impl std::fmt::Debug for AppEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppEnv")
            .field("repository", &self.repository)
            .field("github_api_url", &self.github_api_url)
            .field("slack_token_set", &self.slack_token.is_some())
            .field("slack_api_url", &self.slack_api_url)
            .finish()
    }
}

impl AppEnv {
    pub fn from_env() -> Result<Self> {
        let github_token = non_empty_var("GITHUB_TOKEN")
            .or_else(|| non_empty_var("GTP_TOKEN"))
            .ok_or_else(|| {
                error!("GITHUB_TOKEN missing in environment");
                anyhow!("GITHUB_TOKEN (or GTP_TOKEN) must be set")
            })?;
        let repository = non_empty_var("GITHUB_REPOSITORY")
            .context("GITHUB_REPOSITORY must be set to owner/repo")?;
        if !repository.contains('/') {
            return Err(anyhow!(
                "GITHUB_REPOSITORY must be owner/repo, got '{repository}'"
            ));
        }

        let app_env = AppEnv {
            github_token,
            repository,
            github_api_url: non_empty_var("GITHUB_API_URL")
                .unwrap_or_else(|| github::DEFAULT_API_URL.to_string()),
            slack_token: non_empty_var("SLACK_TOKEN"),
            slack_api_url: non_empty_var("SLACK_API_URL")
                .unwrap_or_else(|| slack::DEFAULT_API_URL.to_string()),
        };
        info!(?app_env, "Read environment");
        Ok(app_env)
    }

    pub fn github_client(&self) -> GitHubClient {
        GitHubClient::new(&self.github_api_url, &self.repository, &self.github_token)
    }

    /// The Slack client, or `None` when `SLACK_TOKEN` is not set.
    pub fn slack_client(&self) -> Option<SlackClient> {
        self.slack_token
            .as_deref()
            .map(|token| SlackClient::new(&self.slack_api_url, token))
    }

    pub fn require_slack_client(&self) -> Result<SlackClient> {
        self.slack_client()
            .ok_or_else(|| anyhow!("SLACK_TOKEN must be set for chat notifications"))
    }
}
