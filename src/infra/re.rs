//! Compilation helpers for the crate's literal pattern statics.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;

/// Compile a pattern written into the source as a literal.
///
/// Every caller passes a constant pattern exercised by unit tests, so a
/// failure here is a programming error rather than a runtime condition.
pub fn literal(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal regex must compile")
}

/// Case-insensitive, leftmost-longest automaton over a literal word list.
pub fn word_automaton(words: &[&str]) -> AhoCorasick {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(words)
        .expect("literal word list must build")
}
