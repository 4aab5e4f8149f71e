//! Per-component configuration.
//!
//! Every struct deserialises from the matching YAML section and falls back to
//! the defaults below for any field that is left out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::section::{SUMMARY_HEADING, TYPE_OF_CHANGE_HEADING};

/// Everything a run needs, bundled per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub sections: SectionConfig,
    pub normalizer: NormalizerConfig,
    pub classifier: ClassifierConfig,
    pub release: ReleaseConfig,
    pub chat: ChatConfig,
    pub escalation: EscalationConfig,
}

impl BotConfig {
    pub fn trace_loaded(&self) {
        info!(
            main_branch = %self.release.main_branch,
            staging_branch = %self.release.staging_branch,
            channel = %self.chat.channel,
            mentions = self.chat.mentions.len(),
            "Loaded BotConfig"
        );
        debug!(?self, "BotConfig loaded (full debug)");
    }
}

/// Headings delimiting the summary inside a pull request description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub summary_heading: String,
    pub type_of_change_heading: String,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            summary_heading: SUMMARY_HEADING.to_string(),
            type_of_change_heading: TYPE_OF_CHANGE_HEADING.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Trimmed bodies shorter than this many characters are replaced by the title.
    pub min_body_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { min_body_len: 3 }
    }
}

/// Checklist markers recognised in pull request descriptions. Matching is case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub bugfix_marker: String,
    pub feature_marker: String,
    pub breaking_marker: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            bugfix_marker: "[x] Bugfix".to_string(),
            feature_marker: "[x] Feature".to_string(),
            breaking_marker: "[x] Breaking changes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Branch releases are cut from; the deploy pull request targets it.
    pub main_branch: String,
    /// Branch feature pull requests are merged into.
    pub staging_branch: String,
    /// Title of the pull request that carries a release from staging to main.
    pub deploy_title: String,
    /// Pull requests whose title contains one of these words are never announced.
    pub skip_title_keywords: Vec<String>,
    /// Comment left on contributing pull requests that have no description.
    pub placeholder_comment: String,
    pub comment_on_missing_body: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            main_branch: "main".to_string(),
            staging_branch: "staging".to_string(),
            deploy_title: "Deploy to production".to_string(),
            skip_title_keywords: vec![
                "release".to_string(),
                "production".to_string(),
                "deploy".to_string(),
            ],
            placeholder_comment: "**No PR description provided**: Please provide a description for the PR so it can be included in the release summary.".to_string(),
            comment_on_missing_body: true,
        }
    }
}

/// Emoji shown in the priority banner, per level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityEmojis {
    pub high: String,
    pub medium: String,
    pub low: String,
}

impl Default for PriorityEmojis {
    fn default() -> Self {
        Self {
            high: ":red_circle:".to_string(),
            medium: ":large_yellow_circle:".to_string(),
            low: ":large_green_circle:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub channel: String,
    /// Group mention appended to the banner of high priority notifications.
    pub escalation_mention: String,
    /// How many recent channel messages the duplicate guard inspects.
    pub history_limit: usize,
    /// Source-control handle -> chat user id.
    pub mentions: BTreeMap<String, String>,
    pub priority_emojis: PriorityEmojis,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            escalation_mention: String::new(),
            history_limit: 20,
            mentions: BTreeMap::new(),
            priority_emojis: PriorityEmojis::default(),
        }
    }
}

/// Label added to a pull request after a high priority notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub label: String,
    pub label_color: String,
    pub label_description: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            label: "security-review-required".to_string(),
            label_color: "d73a4a".to_string(),
            label_description: "Requires security review before merge".to_string(),
        }
    }
}
