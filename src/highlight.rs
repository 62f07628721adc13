//! Locating suspicious phrases inside free text.
//!
//! [`highlight`] finds every case-insensitive literal occurrence of each phrase
//! and returns the matches sorted by start offset. [`segments`] turns that list
//! into plain and highlighted runs for rendering.

use crate::model::{Severity, SuspiciousPhrase};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{debug, warn};

/// A located occurrence of a suspicious phrase.
///
/// `start` and `end` count characters (Unicode scalar values) from the start of
/// the analysed content; `end` is exclusive and always greater than `start`.
/// These are not UTF-16 code units: a character outside the Basic Multilingual
/// Plane, such as most emoji, advances the offset by one, not two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMatch {
    /// Matched substring in its original casing.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub reason: String,
    pub severity: Severity,
}

/// Returns every occurrence of every phrase in `content`, ordered by `start`.
///
/// Phrase text is matched literally and case-insensitively. Matches from
/// different phrases may overlap and are all kept; equal starts keep phrase
/// order. Phrases with empty text never match.
pub fn highlight(content: &str, phrases: &[SuspiciousPhrase]) -> Vec<HighlightMatch> {
    let mut matches = Vec::new();
    if content.is_empty() {
        return matches;
    }

    for phrase in phrases {
        if phrase.text.is_empty() {
            debug!(reason = %phrase.reason, "skipping phrase with empty text");
            continue;
        }
        let Some(pattern) = literal_pattern(&phrase.text) else {
            continue;
        };
        let mut cursor = CharCursor::new(content);
        for found in pattern.find_iter(content) {
            if found.is_empty() {
                continue;
            }
            let start = cursor.advance_to(found.start());
            let end = cursor.advance_to(found.end());
            matches.push(HighlightMatch {
                text: found.as_str().to_string(),
                start,
                end,
                reason: phrase.reason.clone(),
                severity: phrase.severity,
            });
        }
    }

    // `sort_by_key` is stable, so ties keep insertion order.
    matches.sort_by_key(|m| m.start);
    debug!(count = matches.len(), "highlighted suspicious phrases");
    matches
}

fn literal_pattern(text: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(text))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            warn!(error = %err, phrase = text, "phrase cannot be compiled into a matcher");
            None
        }
    }
}

/// Converts increasing byte offsets into character offsets in one pass.
struct CharCursor<'a> {
    content: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCursor<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            byte: 0,
            chars: 0,
        }
    }

    fn advance_to(&mut self, byte: usize) -> usize {
        self.chars += self.content[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

/// A run of content produced by [`segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Highlight {
        text: &'a str,
        source: &'a HighlightMatch,
    },
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Plain(text) | Segment::Highlight { text, .. } => text,
        }
    }
}

/// Partitions `content` into alternating plain and highlighted runs.
///
/// Overlapping matches are resolved here, not in [`highlight`]: the higher
/// severity wins, then the earlier start, then the earlier position in
/// `matches`. Matches whose offsets fall outside `content` are ignored.
pub fn segments<'a>(content: &'a str, matches: &'a [HighlightMatch]) -> Vec<Segment<'a>> {
    let boundaries: Vec<usize> = content
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(content.len()))
        .collect();

    let mut ranked: Vec<(usize, usize, usize)> = matches
        .iter()
        .enumerate()
        .filter_map(|(idx, m)| {
            let start = *boundaries.get(m.start)?;
            let end = *boundaries.get(m.end)?;
            (start < end).then_some((idx, start, end))
        })
        .collect();
    ranked.sort_by_key(|&(idx, start, _)| (Reverse(matches[idx].severity), start, idx));

    let mut accepted: Vec<(usize, usize, usize)> = Vec::with_capacity(ranked.len());
    for candidate in ranked {
        let (_, start, end) = candidate;
        let overlaps = accepted
            .iter()
            .any(|&(_, other_start, other_end)| start < other_end && other_start < end);
        if !overlaps {
            accepted.push(candidate);
        }
    }
    accepted.sort_by_key(|&(_, start, _)| start);

    let mut out = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut last = 0;
    for (idx, start, end) in accepted {
        if start > last {
            out.push(Segment::Plain(&content[last..start]));
        }
        out.push(Segment::Highlight {
            text: &content[start..end],
            source: &matches[idx],
        });
        last = end;
    }
    if last < content.len() {
        out.push(Segment::Plain(&content[last..]));
    }
    out
}

const MARKDOWN_SPECIAL: &[char] = &[
    '\\', '*', '_', '`', '#', '~', '|', '>', '[', ']', '-', '+', '!',
];

/// Renders content as markdown with highlighted runs in bold.
///
/// Markdown metacharacters in the content are backslash-escaped, and
/// whitespace at the edges of a highlighted run stays outside the `**` so the
/// emphasis still applies.
pub fn to_markdown(content: &str, matches: &[HighlightMatch]) -> String {
    let mut out = String::with_capacity(content.len() + matches.len() * 4);
    for segment in segments(content, matches) {
        match segment {
            Segment::Plain(text) => push_escaped(&mut out, text),
            Segment::Highlight { text, .. } => {
                let inner = text.trim();
                if inner.is_empty() {
                    out.push_str(text);
                    continue;
                }
                let lead = text.len() - text.trim_start().len();
                let tail = lead + inner.len();
                out.push_str(&text[..lead]);
                out.push_str("**");
                push_escaped(&mut out, inner);
                out.push_str("**");
                out.push_str(&text[tail..]);
            }
        }
    }
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if MARKDOWN_SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn phrase(text: &str, severity: Severity) -> SuspiciousPhrase {
        SuspiciousPhrase::new(text, format!("reason for {text}"), severity)
    }

    fn spans(matches: &[HighlightMatch]) -> Vec<(usize, usize)> {
        matches.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn no_occurrences_yield_nothing() {
        let matches = highlight("plain reporting", &[phrase("weird trick", Severity::High)]);
        assert!(matches.is_empty());
    }

    #[test]
    fn matching_ignores_case_and_keeps_original_text() {
        let matches = highlight("The CAT sat", &[phrase("cat", Severity::Low)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "CAT");
        assert_eq!((matches[0].start, matches[0].end), (4, 7));
        assert_eq!(matches[0].reason, "reason for cat");
        assert_eq!(matches[0].severity, Severity::Low);
    }

    #[test]
    fn every_occurrence_is_reported() {
        let matches = highlight("a a a", &[phrase("a", Severity::Low)]);
        assert_eq!(spans(&matches), vec![(0, 1), (2, 3), (4, 5)]);
    }

    #[test]
    fn occurrences_of_one_phrase_do_not_overlap() {
        let matches = highlight("aaaa", &[phrase("aa", Severity::Low)]);
        assert_eq!(spans(&matches), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn results_sorted_by_start_regardless_of_phrase_order() {
        let content = "red blue red blue";
        let matches = highlight(
            content,
            &[phrase("blue", Severity::Low), phrase("red", Severity::High)],
        );
        assert_eq!(spans(&matches), vec![(0, 3), (4, 8), (9, 12), (13, 17)]);
        assert_eq!(matches[0].text, "red");
        assert_eq!(matches[1].text, "blue");
    }

    #[test]
    fn metacharacters_are_matched_literally() {
        let content = "it will cost $5.00? no, cost $5a00 really";
        let matches = highlight(content, &[phrase("cost $5.00?", Severity::Medium)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "cost $5.00?");
        assert_eq!(matches[0].start, 8);

        let brackets = highlight("see [1] and (a|b)", &[phrase("(a|b)", Severity::Low)]);
        assert_eq!(spans(&brackets), vec![(12, 17)]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(highlight("", &[phrase("a", Severity::Low)]).is_empty());
        assert!(highlight("anything", &[]).is_empty());
    }

    #[test]
    fn empty_phrase_text_is_skipped() {
        let matches = highlight(
            "abc",
            &[phrase("", Severity::High), phrase("b", Severity::Low)],
        );
        assert_eq!(spans(&matches), vec![(1, 2)]);
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let content = "Ünïcode café CAFÉ";
        let matches = highlight(content, &[phrase("café", Severity::Low)]);
        assert_eq!(spans(&matches), vec![(8, 12), (13, 17)]);
        assert_eq!(matches[1].text, "CAFÉ");
    }

    #[test]
    fn overlapping_phrases_are_both_kept() {
        let matches = highlight(
            "breaking news today",
            &[
                phrase("news today", Severity::Low),
                phrase("breaking news", Severity::High),
            ],
        );
        assert_eq!(spans(&matches), vec![(0, 13), (9, 19)]);
    }

    #[test]
    fn equal_starts_keep_phrase_order() {
        let matches = highlight(
            "one weird trick",
            &[phrase("one weird", Severity::Low), phrase("one", Severity::High)],
        );
        assert_eq!(matches[0].text, "one weird");
        assert_eq!(matches[1].text, "one");
    }

    #[test]
    fn segments_reconstruct_content() {
        let content = "Scientists don't want you to know this one weird trick!";
        let matches = highlight(
            content,
            &[
                phrase("this one weird trick", Severity::Medium),
                phrase("scientists don't want you to know", Severity::High),
            ],
        );
        let parts = segments(content, &matches);
        let rebuilt: String = parts.iter().map(Segment::text).collect();
        assert_eq!(rebuilt, content);
        assert!(matches!(parts[0], Segment::Highlight { .. }));
        assert_eq!(parts.last().map(Segment::text), Some("!"));
    }

    #[test]
    fn segments_prefer_higher_severity_on_overlap() {
        let content = "breaking news today";
        let matches = highlight(
            content,
            &[
                phrase("breaking news", Severity::Low),
                phrase("news today", Severity::High),
            ],
        );
        let parts = segments(content, &matches);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Segment::Plain("breaking "));
        match &parts[1] {
            Segment::Highlight { text, source } => {
                assert_eq!(*text, "news today");
                assert_eq!(source.severity, Severity::High);
            }
            other => panic!("expected highlight, got {other:?}"),
        }
    }

    #[test]
    fn segments_prefer_earlier_start_on_equal_severity() {
        let content = "abcdef";
        let matches = highlight(
            content,
            &[phrase("cde", Severity::Low), phrase("abcd", Severity::Low)],
        );
        let texts: Vec<_> = segments(content, &matches)
            .into_iter()
            .map(|s| s.text())
            .collect();
        assert_eq!(texts, vec!["abcd", "ef"]);
    }

    #[test]
    fn markdown_wraps_highlights() {
        let content = "some experts believe it";
        let matches = highlight(content, &[phrase("some experts believe", Severity::Low)]);
        assert_eq!(to_markdown(content, &matches), "**some experts believe** it");
    }

    #[test]
    fn markdown_escapes_content_and_keeps_spaces_outside_emphasis() {
        let content = "# Breaking: *this* one_weird trick";
        let matches = highlight(content, &[phrase(" one_weird ", Severity::Medium)]);
        assert_eq!(
            to_markdown(content, &matches),
            "\\# Breaking: \\*this\\* **one\\_weird** trick"
        );
    }

    proptest! {
        #[test]
        fn single_phrase_segments_rebuild_content(
            content in "[a-cA-C ]{0,40}",
            needle in "[a-c]{1,3}",
        ) {
            let matches = highlight(&content, &[phrase(&needle, Severity::Low)]);
            let rebuilt: String = segments(&content, &matches).iter().map(Segment::text).collect();
            prop_assert_eq!(rebuilt, content.clone());
            for m in &matches {
                prop_assert!(m.start < m.end);
                prop_assert!(m.text.eq_ignore_ascii_case(&needle));
            }
        }

        #[test]
        fn matches_are_sorted_by_start(
            content in "[a-dA-D ]{0,60}",
            needles in proptest::collection::vec("[a-d]{1,2}", 0..4),
        ) {
            let phrases: Vec<_> = needles.iter().map(|n| phrase(n, Severity::Medium)).collect();
            let matches = highlight(&content, &phrases);
            prop_assert!(matches.windows(2).all(|w| w[0].start <= w[1].start));
        }
    }
}
