//! `@Stage.Value[.Field]` mentions inside prompt text.
//!
//! Prompt text is stored verbatim and is never rewritten when stages or
//! values are renamed. Scanning it against the current candidates reports
//! which mentions still resolve.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::ReferenceCandidate;

static MENTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s,;@]+").expect("mention token regex should compile"));

/// An `@` mention found in text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Mention {
    /// The mention matches a visible output.
    Resolved {
        /// Byte range of the mention, `@` included.
        span: Range<usize>,
        /// The matched output.
        candidate: ReferenceCandidate,
    },
    /// Nothing visible carries this label.
    Unresolved {
        /// Byte range of the mention, `@` included.
        span: Range<usize>,
        /// The mention as written.
        text: String,
    },
}

impl Mention {
    /// Returns the byte range of the mention.
    pub fn span(&self) -> &Range<usize> {
        match self {
            Self::Resolved { span, .. } | Self::Unresolved { span, .. } => span,
        }
    }

    /// Returns true if the mention resolves.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Finds every mention in `text`.
///
/// Labels may contain spaces, so the longest candidate label following an
/// `@` wins, provided the text does not continue the label with another word
/// or path segment. An `@` directly after a word character is not a mention.
pub fn scan_mentions(text: &str, candidates: &[ReferenceCandidate]) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('@') {
        let start = cursor + offset;
        let rest = &text[start + 1..];
        cursor = start + 1;

        if text[..start]
            .chars()
            .next_back()
            .is_some_and(|previous| previous.is_alphanumeric() || previous == '_')
        {
            continue;
        }

        let matched = candidates
            .iter()
            .filter(|candidate| {
                rest.strip_prefix(candidate.label.as_str())
                    .is_some_and(ends_label)
            })
            .max_by_key(|candidate| candidate.label.len());

        if let Some(candidate) = matched {
            let end = start + 1 + candidate.label.len();
            mentions.push(Mention::Resolved {
                span: start..end,
                candidate: candidate.clone(),
            });
            cursor = end;
        } else if let Some(token) = MENTION_TOKEN.find(rest) {
            let token = token.as_str().trim_end_matches(['.', ':', '!', '?', ')']);
            if token.is_empty() {
                continue;
            }
            let end = start + 1 + token.len();
            mentions.push(Mention::Unresolved {
                span: start..end,
                text: text[start..end].to_owned(),
            });
            cursor = end;
        }
    }

    mentions
}

fn ends_label(after: &str) -> bool {
    let mut chars = after.chars();
    match chars.next() {
        None => true,
        Some('.') => !chars.next().is_some_and(is_word_char),
        Some(c) => !is_word_char(c),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
