//! Text Comparator: literal phrase matches with fixed-width context.
//!
//! Quality is judged by counting exact, case-sensitive occurrences of a known
//! phrase in each text source and reading the characters around them. There
//! is deliberately no fuzzy matching here: a phrase broken by an inserted
//! space simply does not match, and that miss is the signal.
//!
//! [`profile_text`] adds a few descriptive counts (unknown-glyph markers,
//! spaced-out letter runs) so two sources can be read side by side.

use crate::output::{ComparisonReport, MatchReport, TextMatch, TextProfile, TextSource};
use once_cell::sync::Lazy;
use regex::Regex;

/// Every non-overlapping occurrence of `phrase` in `text`, left to right.
///
/// `window` is measured in characters on each side and is truncated at the
/// start and end of the text. An empty phrase yields an empty report.
pub fn find_matches(source: TextSource, text: &str, phrase: &str, window: usize) -> MatchReport {
    let matches = if phrase.is_empty() {
        Vec::new()
    } else {
        text.match_indices(phrase)
            .map(|(start, matched)| {
                let end = start + matched.len();
                TextMatch {
                    offset: start,
                    preceding_context: last_chars(&text[..start], window).to_string(),
                    matched_phrase: matched.to_string(),
                    following_context: first_chars(&text[end..], window).to_string(),
                }
            })
            .collect()
    };

    MatchReport {
        source,
        phrase: phrase.to_string(),
        matches,
    }
}

/// Match `phrase` in both sources and profile each one.
pub fn compare_sources(
    baseline: &str,
    cloud_ocr: &str,
    phrase: &str,
    window: usize,
) -> ComparisonReport {
    ComparisonReport {
        phrase: phrase.to_string(),
        baseline: find_matches(TextSource::Baseline, baseline, phrase, window),
        cloud_ocr: find_matches(TextSource::CloudOcr, cloud_ocr, phrase, window),
        baseline_profile: profile_text(baseline),
        cloud_ocr_profile: profile_text(cloud_ocr),
    }
}

// Three or more one-letter words separated by single spaces: "M e r e d".
static RE_SPACED_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\w ){2,}\w\b").unwrap());

/// Descriptive counts for one text source.
pub fn profile_text(text: &str) -> TextProfile {
    TextProfile {
        char_count: text.chars().count(),
        word_count: text.split_whitespace().count(),
        line_count: text.lines().count(),
        unknown_markers: text.chars().filter(|&c| c == '\u{FFFD}').count(),
        spaced_letter_runs: RE_SPACED_LETTERS.find_iter(text).count(),
    }
}

fn last_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

fn first_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
