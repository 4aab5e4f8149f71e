//! Markdown projection of a release aggregate, used as the deploy pull request
//! and release body.
//!
//! Section order is fixed: pull requests, summary, then actions (only when any
//! checklist marker was ticked). The action lines written here are the ones
//! [`ReleaseActions::parse`] reads back when the release is published.

use crate::aggregate::ReleaseAggregate;
use crate::classify::{ChangeMarkers, ChangeType};
use crate::normalize::{split_list_item, SUB_BULLET_INDENT};
use crate::section::{
    extract_section, RELEASE_ACTIONS_HEADING, RELEASE_PULL_REQUESTS_HEADING,
    RELEASE_SUMMARY_HEADING,
};

pub const BUG_FIX_ACTION: &str = "Bug Fix";
pub const NEW_FEATURE_ACTION: &str = "New Feature";
pub const BREAKING_CHANGE_ACTION: &str = "Breaking Change";

/// The release actions that applied across a release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseActions(pub ChangeMarkers);

impl ReleaseActions {
    /// Action lines in fixed order: bug fix, feature, breaking change.
    pub fn lines(&self) -> Vec<String> {
        let markers = self.0;
        [
            (markers.bugfix, BUG_FIX_ACTION),
            (markers.feature, NEW_FEATURE_ACTION),
            (markers.breaking, BREAKING_CHANGE_ACTION),
        ]
        .into_iter()
        .filter(|(applies, _)| *applies)
        .map(|(_, action)| format!("- {action}"))
        .collect()
    }

    /// Reads the actions back from a rendered document (or a merge commit
    /// message that embeds one). No actions section means a patch release.
    pub fn parse(document: &str) -> Self {
        let section = extract_section(document, RELEASE_ACTIONS_HEADING).unwrap_or_default();
        let mut markers = ChangeMarkers::default();
        for line in section.lines() {
            let action = split_list_item(line).map_or(line.trim(), |(_, text)| text);
            match action {
                BUG_FIX_ACTION => markers.bugfix = true,
                NEW_FEATURE_ACTION => markers.feature = true,
                BREAKING_CHANGE_ACTION => markers.breaking = true,
                _ => {}
            }
        }
        Self(markers)
    }

    pub fn change_type(&self) -> ChangeType {
        self.0.change_type()
    }
}

/// Renders normalised bullets as markdown list lines.
fn bullet_lines(bullets: &[String]) -> Vec<String> {
    bullets
        .iter()
        .enumerate()
        .map(|(i, bullet)| {
            if i == 0 {
                return format!("- {bullet}");
            }
            let text = bullet.strip_prefix(SUB_BULLET_INDENT).unwrap_or(bullet);
            if split_list_item(text).is_some() {
                format!("{SUB_BULLET_INDENT}{text}")
            } else {
                format!("{SUB_BULLET_INDENT}- {text}")
            }
        })
        .collect()
}

/// The summary bullets of every entry, entries separated by a blank line.
pub fn render_summary(aggregate: &ReleaseAggregate) -> String {
    aggregate
        .entries()
        .iter()
        .map(|entry| bullet_lines(&entry.normalized_bullets).join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_document(aggregate: &ReleaseAggregate) -> String {
    let mut doc = format!("## {RELEASE_PULL_REQUESTS_HEADING}\n");
    for entry in aggregate.entries() {
        doc.push_str(&format!("- #{} by @{}\n", entry.number, entry.author));
    }

    doc.push_str(&format!("\n## {RELEASE_SUMMARY_HEADING}\n"));
    let summary = render_summary(aggregate);
    if !summary.is_empty() {
        doc.push_str(&summary);
        doc.push('\n');
    }

    let actions = ReleaseActions(aggregate.markers());
    if actions.0.any() {
        doc.push_str(&format!("\n## {RELEASE_ACTIONS_HEADING}\n"));
        doc.push_str(&actions.lines().join("\n"));
        doc.push('\n');
    }

    doc
}
