//! Two-marker section scanner for markdown bodies.
//!
//! A section is the text between a start heading and the first following
//! heading of the same or a higher level, or an explicit end heading, or the
//! end of the text. Sub-headings inside a section belong to it. The heading
//! titles used by both the extractor and the renderers live here so that a
//! rendered document can always be scanned back.

use crate::config::SectionConfig;

/// Heading that opens the free-text summary in a pull request template.
pub const SUMMARY_HEADING: &str = "What does this PR do?";
/// Heading that follows the summary in the pull request template.
pub const TYPE_OF_CHANGE_HEADING: &str = "Type of change";
pub const RELEASE_PULL_REQUESTS_HEADING: &str = "Release Pull Requests";
pub const RELEASE_SUMMARY_HEADING: &str = "Release Summary";
pub const RELEASE_ACTIONS_HEADING: &str = "Release Actions";
/// Heading GitHub uses for generated release notes.
pub const WHATS_CHANGED_HEADING: &str = "What's Changed";

/// Returns the title of a markdown ATX heading line, or `None` for any other line.
///
/// `"## Release Summary"` yields `Some("Release Summary")`; `"#123 fixed"` and
/// `"##"` yield `None`.
pub fn heading_title(line: &str) -> Option<&str> {
    parse_heading(line).map(|(_, title)| title)
}

/// Number of `#` markers of a heading line: `1` for `#`, `3` for `###`.
pub fn heading_level(line: &str) -> Option<usize> {
    parse_heading(line).map(|(level, _)| level)
}

pub fn is_heading(line: &str) -> bool {
    parse_heading(line).is_some()
}

fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim();
    let rest = trimmed.trim_start_matches('#');
    if rest.len() == trimmed.len() || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        None
    } else {
        Some((trimmed.len() - rest.len(), title))
    }
}

fn same_title(found: &str, wanted: &str) -> bool {
    found.eq_ignore_ascii_case(wanted.trim())
}

/// Byte spans of a section: where its heading line starts, where its content
/// starts (just after the heading line) and where it ends.
struct SectionSpan {
    heading_start: usize,
    content_start: usize,
    end: usize,
}

fn find_section(body: &str, title: &str, end_title: Option<&str>) -> Option<SectionSpan> {
    let mut offset = 0;
    // (heading level, heading start, content start)
    let mut found: Option<(usize, usize, usize)> = None;

    for line in body.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let Some((level, heading)) = parse_heading(line) else {
            continue;
        };
        match found {
            None if same_title(heading, title) => found = Some((level, start, offset)),
            Some((start_level, heading_start, content_start))
                if level <= start_level || end_title.is_some_and(|end| same_title(heading, end)) =>
            {
                return Some(SectionSpan {
                    heading_start,
                    content_start,
                    end: start,
                });
            }
            _ => {}
        }
    }

    found.map(|(_, heading_start, content_start)| SectionSpan {
        heading_start,
        content_start,
        end: body.len(),
    })
}

/// Extracts the trimmed content of the section opened by the heading `title`.
///
/// Returns `None` when the heading is absent. A heading with nothing below it
/// yields `Some("")`.
pub fn extract_section<'a>(body: &'a str, title: &str) -> Option<&'a str> {
    extract_between(body, title, None)
}

/// Like [`extract_section`], but the heading `end_title` also closes the
/// section whatever its level.
pub fn extract_between<'a>(body: &'a str, title: &str, end_title: Option<&str>) -> Option<&'a str> {
    find_section(body, title, end_title).map(|span| body[span.content_start..span.end].trim())
}

/// The free-text summary of a pull request description, delimited by the
/// configured summary and type-of-change headings.
pub fn extract_summary<'a>(body: &'a str, sections: &SectionConfig) -> Option<&'a str> {
    extract_between(
        body,
        &sections.summary_heading,
        Some(&sections.type_of_change_heading),
    )
}

/// Returns `body` from the heading `title` (inclusive) to the end of the text.
pub fn from_heading<'a>(body: &'a str, title: &str) -> Option<&'a str> {
    find_section(body, title, None).map(|span| &body[span.heading_start..])
}

/// Overwrites the content of the section `title` with `content`, or appends a
/// new `## title` section when the heading is absent.
///
/// Applying the same call twice yields the same text as applying it once.
pub fn replace_section(body: &str, title: &str, content: &str) -> String {
    let content = content.trim();
    match find_section(body, title, None) {
        Some(span) => {
            let mut out = String::with_capacity(body.len() + content.len());
            out.push_str(&body[..span.content_start]);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(content);
            out.push('\n');
            if span.end < body.len() {
                out.push('\n');
                out.push_str(&body[span.end..]);
            }
            out
        }
        None => {
            let mut out = body.trim_end().to_string();
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&format!("## {title}\n\n{content}\n"));
            out
        }
    }
}
