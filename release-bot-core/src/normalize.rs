//! Turns one pull request's free-form summary into canonical bullet text.
//!
//! The first returned string is always the top-level bullet; every following
//! string is a sub-bullet prefixed with [`SUB_BULLET_INDENT`]. Bullet markers
//! are only kept where the author wrote them (list items); rendering adds the
//! rest. Blank lines never appear in the output.

use crate::config::NormalizerConfig;

pub const SUB_BULLET_INDENT: &str = "  ";

/// Normalises `raw_body` into bullets, falling back to `fallback_title` when the
/// body is trivial or has no text of its own to head a list.
///
/// Anything after a detected list block is dropped.
pub fn normalize(raw_body: &str, fallback_title: &str, config: &NormalizerConfig) -> Vec<String> {
    let body = raw_body.trim();
    let title = fallback_title.trim().to_string();

    if body.chars().count() < config.min_body_len {
        return vec![title];
    }

    let lines: Vec<&str> = body.lines().collect();

    if let Some(start) = lines.iter().position(|line| split_list_item(line).is_some()) {
        let preamble = join_wrapped(&lines[..start]);
        let heading = if preamble.is_empty() { title } else { preamble };
        let mut bullets = vec![heading];
        bullets.extend(
            collect_list(&lines[start..])
                .into_iter()
                .map(|item| format!("{SUB_BULLET_INDENT}{item}")),
        );
        return bullets;
    }

    let paragraphs = split_paragraphs(&lines);
    if paragraphs.len() >= 2 {
        let mut bullets = vec![title];
        bullets.extend(
            paragraphs
                .into_iter()
                .map(|paragraph| format!("{SUB_BULLET_INDENT}{paragraph}")),
        );
        return bullets;
    }

    vec![join_wrapped(&lines)]
}

/// Splits a list line into its marker (`-`, `*` or `<digits>.`) and its text.
pub(crate) fn split_list_item(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();

    let marker_len = if trimmed.starts_with('-') || trimmed.starts_with('*') {
        1
    } else {
        let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || !trimmed[digits..].starts_with('.') {
            return None;
        }
        digits + 1
    };

    let rest = &trimmed[marker_len..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((&trimmed[..marker_len], rest.trim()))
}

/// Collects the list block at the start of `lines`: items separated by blank
/// lines stay in the block, indented plain lines continue the previous item
/// and the first unindented plain line ends it.
fn collect_list(lines: &[&str]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some((marker, text)) = split_list_item(line) {
            if !text.is_empty() {
                items.push(format!("{marker} {text}"));
            }
        } else if line.trim().is_empty() {
            let next = lines[i + 1..].iter().find(|l| !l.trim().is_empty());
            if !next.is_some_and(|l| split_list_item(l).is_some()) {
                break;
            }
        } else if line.starts_with(char::is_whitespace) {
            if let Some(last) = items.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
            }
        } else {
            break;
        }
    }

    items
}

fn split_paragraphs(lines: &[&str]) -> Vec<String> {
    lines
        .split(|line| line.trim().is_empty())
        .map(join_wrapped)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Joins hard-wrapped lines into one line separated by single spaces.
fn join_wrapped(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
