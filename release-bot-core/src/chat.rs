//! Chat projection of a release aggregate or of free text.
//!
//! The body goes through mention rewriting, then a fixed sequence of repairs:
//! comment stripping, hard-wrap joining, bullet de-indenting, link rewriting of
//! generated release notes, conversion to chat markup and finally line-break
//! collapsing. The headline and priority banner form the main message; the
//! formatted body is returned separately so callers can thread it.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::aggregate::ReleaseAggregate;
use crate::config::ChatConfig;
use crate::contract::{PullRequest, Release};
use crate::document::render_document;
use crate::section::{from_heading, heading_title, is_heading, WHATS_CHANGED_HEADING};

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static INDENTED_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]+([-*•])").unwrap());
static GENERATED_NOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\* (.+) by (\S+) in (https://\S+)[ \t]*$").unwrap()
});
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)[-*][ \t]+").unwrap());
static BOLD_STAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());
static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap());
/// `@handle` not already inside a `<@id>` mention.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^<\w])@([A-Za-z0-9][A-Za-z0-9-]*)").unwrap());

const CHAT_BULLET: char = '•';

/// Review priority of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
    /// A level outside the table; rendered without emoji or escalation.
    Other(String),
}

impl Priority {
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Other(level.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Other(level) => level,
        }
    }

    /// Whether the notification calls for the escalation mention.
    pub fn escalates(&self) -> bool {
        matches!(self, Priority::High)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the thread body is rendered from.
#[derive(Debug, Clone, Copy)]
pub enum ChatBody<'a> {
    Aggregate(&'a ReleaseAggregate),
    FreeText(&'a str),
}

#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    /// Markdown headline, e.g. `Reviewing [title](url)`.
    pub headline: String,
    pub body: ChatBody<'a>,
    /// Further free-text bodies appended after the main body.
    pub external_bodies: Vec<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// The headline alone, as posted; used by the duplicate guard.
    pub headline: String,
    /// Headline plus priority banner.
    pub main_text: String,
    /// The formatted body; `None` when there is nothing to say beyond the headline.
    pub thread_text: Option<String>,
}

pub fn render_chat(request: &ChatRequest<'_>, config: &ChatConfig) -> ChatMessage {
    let headline = convert_inline(&rewrite_mentions(&request.headline, &config.mentions));

    let main_text = match &request.priority {
        Some(priority) => format!("{headline}\n{}", priority_banner(priority, config)),
        None => headline.clone(),
    };

    let mut source = match request.body {
        ChatBody::Aggregate(aggregate) => render_document(aggregate),
        ChatBody::FreeText(text) => text.to_string(),
    };
    for external in request.external_bodies.iter().filter(|b| !b.trim().is_empty()) {
        source.push_str("\n\n");
        source.push_str(external);
    }

    let body = format_body(&source, config);
    debug!(headline = %headline, body_len = body.len(), "[CHAT] Rendered chat message");

    ChatMessage {
        headline,
        main_text,
        thread_text: (!body.is_empty()).then_some(body),
    }
}

/// `*Priority: <level> <emoji>*`, with the escalation mention for high priority.
pub fn priority_banner(priority: &Priority, config: &ChatConfig) -> String {
    let emojis = &config.priority_emojis;
    let emoji = match priority {
        Priority::High if !config.escalation_mention.is_empty() => {
            format!("{} {} Please Review", emojis.high, config.escalation_mention)
        }
        Priority::High => emojis.high.clone(),
        Priority::Medium => emojis.medium.clone(),
        Priority::Low => emojis.low.clone(),
        Priority::Other(_) => String::new(),
    };

    if emoji.is_empty() {
        format!("*Priority: {}*", priority.label())
    } else {
        format!("*Priority: {} {}*", priority.label(), emoji)
    }
}

/// Mentions, repairs and converts a markdown body into chat markup.
pub fn format_body(text: &str, config: &ChatConfig) -> String {
    let text = rewrite_mentions(text, &config.mentions);
    let text = COMMENT_RE.replace_all(&text, "");
    let text = join_hard_wraps(&text);
    let text = INDENTED_BULLET_RE.replace_all(&text, "\n$1");
    let text = GENERATED_NOTE_RE.replace_all(&text, "* [$1]($3) by $2");
    let text = to_chat_markup(&text);
    collapse_line_breaks(&text)
}

/// Replaces `@handle` with the chat mention of its mapped id. Handles are
/// matched case-insensitively and only as whole handles; unmapped handles are
/// left as written.
pub fn rewrite_mentions(text: &str, mentions: &BTreeMap<String, String>) -> String {
    let lookup: HashMap<String, &str> = mentions
        .iter()
        .map(|(handle, id)| (handle.to_ascii_lowercase(), id.as_str()))
        .collect();

    MENTION_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let handle = &caps[2];
            match lookup.get(&handle.to_ascii_lowercase()) {
                Some(id) => format!("{}<@{}>", &caps[1], id),
                None => {
                    debug!(handle, "[CHAT] Leaving unmapped mention as written");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn ends_with_word(line: &str) -> bool {
    line.chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '`')
}

fn starts_with_word(line: &str) -> bool {
    line.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '`')
}

/// Joins a line ending in a word (or backtick) with the next non-blank line
/// when that one starts with a word, undoing hard wraps. Headings are never joined.
fn join_hard_wraps(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run.push(line);
            continue;
        }
        let joinable = lines.last().is_some_and(|prev: &String| {
            ends_with_word(prev) && !is_heading(prev) && starts_with_word(line)
        });
        match lines.last_mut() {
            Some(prev) if joinable => {
                prev.push(' ');
                prev.push_str(line);
            }
            _ => {
                lines.extend(blank_run.iter().map(|l| l.to_string()));
                lines.push(line.to_string());
            }
        }
        blank_run.clear();
    }
    lines.join("\n")
}

/// Markdown inline markup to chat markup: bold, strike-through and links.
fn convert_inline(text: &str) -> String {
    let text = BOLD_STAR_RE.replace_all(text, "*$1*");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "*$1*");
    let text = STRIKE_RE.replace_all(&text, "~$1~");
    LINK_RE.replace_all(&text, "<$2|$1>").into_owned()
}

/// Markdown to chat markup: headings become bold lines, bullets become `•`.
fn to_chat_markup(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| match heading_title(line) {
            Some(title) => format!("*{}*", title.replace("**", "")),
            None => BULLET_RE
                .replace(line, format!("${{1}}{CHAT_BULLET} ").as_str())
                .into_owned(),
        })
        .collect();
    convert_inline(&lines.join("\n"))
}

fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with(CHAT_BULLET)
}

fn is_marker_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with(CHAT_BULLET) || trimmed.starts_with('*')
}

/// Line breaks survive only before bullets and headings; every other break
/// becomes a space. Bullets following free text and headings get a blank line
/// before them.
fn collapse_line_breaks(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        match lines.last_mut() {
            Some(prev) if !is_marker_line(line) => {
                prev.push(' ');
                prev.push_str(line.trim());
            }
            _ => lines.push(line.to_string()),
        }
    }

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            let prev = &lines[i - 1];
            let heading = !is_bullet(line);
            out.push('\n');
            if heading || !is_bullet(prev) {
                out.push('\n');
            }
        }
        out.push_str(line);
    }
    out
}

/// `Reviewing [title](url)`.
pub fn review_headline(pr: &PullRequest) -> String {
    format!("Reviewing [{}]({})", pr.title, pr.url)
}

/// ``[Deploying <name>](<url>) to `owner/repo` ``.
pub fn deploy_headline(release: &Release, repository: &str) -> String {
    format!("[Deploying {}]({}) to `{}`", release.name, release.url, repository)
}

/// Rearranges a published release body for announcement: the generated
/// "What's Changed" notes come first, the summary after them, and the line of
/// the deploy pull request itself (and anything after it) is dropped.
pub fn release_announcement_body(release_body: &str, deploy_title: &str) -> String {
    let cut_marker = format!("* {deploy_title} ");
    let body = match release_body.find(&cut_marker) {
        Some(at) => &release_body[..at],
        None => release_body,
    }
    .trim();

    match from_heading(body, WHATS_CHANGED_HEADING) {
        Some(changes) => {
            let summary = body[..body.len() - changes.len()].trim();
            format!("{}\n\n{}", changes.trim(), summary)
                .trim()
                .to_string()
        }
        None => body.to_string(),
    }
}
