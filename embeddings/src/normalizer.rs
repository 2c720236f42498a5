//! Text normalization ahead of embedding.
//!
//! Turns raw markdown into the canonical string handed to an
//! [`EmbeddingProvider`](crate::EmbeddingProvider): headings are collected,
//! front matter, code fences and link syntax are stripped, stop words are
//! dropped and a fixed word window is selected.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::config::{LinkMode, NormalizerConfig};

/// Separator placed between collected headings.
pub const HEADING_SEPARATOR: &str = " | ";

/// Words dropped when stop-word filtering is enabled.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through",
    "during", "before", "after", "above", "below", "between", "under", "again", "further",
    "then", "once", "here", "there", "when", "where", "why", "how", "all", "each", "few",
    "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so",
    "than", "too", "very", "just", "and", "but", "if", "or", "because", "until", "while",
    "what", "which", "who", "whom", "this", "that", "these", "those", "am", "i", "my", "me",
    "we", "our", "you", "your", "he", "she", "it", "they", "them", "his", "her", "its",
    "their", "about", "up", "out", "over", "also",
];

// Compiled once; a pattern that fails to compile leaves its syntax in place.
static IMAGE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").ok());
static LINK: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").ok());
static ALIASED_WIKILINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]*)\|([^\]]*)\]\]").ok());
static WIKILINK: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[\[([^\]]*)\]\]").ok());

/// Body text and headings of a document with markup removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct StrippedDocument {
    headings: Vec<String>,
    body: String,
}

/// Normalize raw document content into the string that gets embedded.
///
/// Never fails; empty or markup-only input yields an empty string.
pub fn normalize(raw: &str, config: &NormalizerConfig) -> String {
    let stripped = strip_markup(raw);
    let body = strip_links(&stripped.body, config.link_mode);

    let words: Vec<&str> = body
        .split_whitespace()
        .filter(|word| !(config.filter_stop_words && is_stop_word(word)))
        .collect();

    let start = config.word_skip.min(words.len());
    let end = start.saturating_add(config.word_limit).min(words.len());
    let window = words[start..end].join(" ");

    let output = if config.exclude_headings || stripped.headings.is_empty() {
        window
    } else {
        format!("{}\n\n{window}", stripped.headings.join(HEADING_SEPARATOR))
    };

    output.trim().to_string()
}

/// Extract the heading texts of a document, in order.
///
/// Headings inside front matter or code fences are ignored.
pub fn extract_headings(raw: &str) -> Vec<String> {
    strip_markup(raw).headings
}

/// Remove a leading front-matter block, if present.
pub fn strip_front_matter(raw: &str) -> &str {
    let mut lines = raw.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return raw;
    };
    if first.trim_end() != "---" {
        return raw;
    }

    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        if line.trim_end() == "---" {
            return &raw[offset..];
        }
    }

    // Unterminated block: treat it as ordinary content.
    raw
}

fn strip_markup(raw: &str) -> StrippedDocument {
    let mut doc = StrippedDocument::default();
    let mut fence: Option<char> = None;

    for line in strip_front_matter(raw).lines() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence_marker(trimmed) {
            match fence {
                Some(open) if open == marker => fence = None,
                Some(_) => {}
                None => fence = Some(marker),
            }
            continue;
        }
        if fence.is_some() {
            continue;
        }

        if let Some(heading) = heading_text(trimmed) {
            if !heading.is_empty() {
                doc.headings.push(heading.to_string());
            }
            continue;
        }

        doc.body.push_str(line);
        doc.body.push('\n');
    }

    doc
}

fn fence_marker(line: &str) -> Option<char> {
    if line.starts_with("```") {
        Some('`')
    } else if line.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

/// Returns the trimmed heading text when `line` is an ATX heading.
///
/// `#tag` (no whitespace after the markers) is a tag, not a heading.
fn heading_text(line: &str) -> Option<&str> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().trim_end_matches('#').trim_end())
}

fn strip_links(body: &str, mode: LinkMode) -> String {
    let mut text = body.to_string();

    if let Some(image) = IMAGE.as_ref() {
        text = image.replace_all(&text, "").into_owned();
    }

    let (label, alias) = match mode {
        LinkMode::KeepText => ("$1", "$2"),
        LinkMode::Remove => ("", ""),
    };

    if let Some(link) = LINK.as_ref() {
        text = link.replace_all(&text, label).into_owned();
    }

    // `[[target]]` keeps the target, `[[target|alias]]` keeps the alias.
    if let Some(wikilink) = ALIASED_WIKILINK.as_ref() {
        text = wikilink.replace_all(&text, alias).into_owned();
    }
    if let Some(wikilink) = WIKILINK.as_ref() {
        text = wikilink.replace_all(&text, label).into_owned();
    }

    text
}

fn is_stop_word(word: &str) -> bool {
    let bare = word
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    !bare.is_empty() && STOP_WORDS.contains(&bare.as_str())
}
