//! Grammar-level canonicalization of raw utterances
//!
//! Rewrites only the scaffolding around line references:
//! - `line5`, `ln5`, `ln 5` become `line 5`
//! - `rm 5` / `dl 3-4` become `remove line 5` / `remove lines 3-4` when
//!   nothing else in the utterance competes for the number
//! - number words zero..one hundred after a line keyword become digits
//! - range separators (`-`, `~`, `to`, `through`, `thru`) collapse to `lines A-B`
//!
//! Quoted spans and free-text payloads (after `with`, `:`, a non-numeric
//! `to`, or a leading `add` / `insert` / `append` / `prepend` verb) are
//! copied through untouched, so user content is never altered. The function
//! is total and idempotent.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument};

use crate::core::handlers::payload::{clean_token, looks_like_path};
use crate::infra::re::literal;

/// Raw user input, optionally with a multi-line block collected separately
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    text: String,
    block: Option<String>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), block: None }
    }

    /// Attach a block collected in block mode
    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = Some(block.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn block(&self) -> Option<&str> {
        self.block.as_deref()
    }

    pub fn is_block_mode(&self) -> bool {
        self.block.is_some()
    }
}

impl From<&str> for Utterance {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Utterance after canonicalization; handlers only ever see this
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUtterance {
    text: String,
    lower: String,
    block: Option<String>,
    spans: Vec<Range<usize>>,
}

/// Stand-in byte for protected text in `scaffold`
const MASK: char = '\u{1a}';

impl NormalizedUtterance {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lowercased copy for keyword probing
    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn block(&self) -> Option<&str> {
        self.block.as_deref()
    }

    pub fn is_block_mode(&self) -> bool {
        self.block.is_some()
    }

    /// Text with quoted strings and payloads masked out, byte offsets intact.
    /// Vocabulary guards and grammar patterns probe this, never user content.
    pub fn scaffold(&self) -> String {
        masked(&self.text, &self.spans)
    }
}

/// Replace every byte inside `spans` with `MASK`
pub(crate) fn masked(text: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if in_any(i, spans) {
            out.extend(std::iter::repeat_n(MASK, c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    out
}

impl std::fmt::Display for NormalizedUtterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Canonicalize an utterance. The block, if any, is carried verbatim.
#[instrument(level = "debug", skip_all, fields(block_mode = utterance.is_block_mode()))]
pub fn normalize(utterance: &Utterance) -> NormalizedUtterance {
    let text = normalize_text(utterance.text());
    if text != utterance.text() {
        debug!(from = utterance.text(), to = %text, "normalized");
    }
    let lower = text.to_lowercase();
    let spans = protected_spans(&text);
    NormalizedUtterance { text, lower, block: utterance.block.clone(), spans }
}

/// Text-only normalization used by `normalize`
pub fn normalize_text(input: &str) -> String {
    let protected = protected_spans(input);
    let mut out = String::with_capacity(input.len() + 8);
    let mut cursor = 0usize;

    for span in protected.iter().chain(std::iter::once(&(input.len()..input.len()))) {
        if span.start > cursor {
            let whole = cursor == 0 && span.start == input.len();
            out.push_str(&rewrite_scaffold(&input[cursor..span.start], cursor == 0, whole));
        }
        out.push_str(&input[span.start..span.end]);
        cursor = cursor.max(span.end);
    }
    out
}

// ---------------------------------------------------------------------------
// Number words
// ---------------------------------------------------------------------------

const UNITS: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 8] =
    ["twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety"];

/// Alternation of number phrases, longest words first
fn number_phrase_pattern() -> String {
    let mut units: Vec<&str> = UNITS.to_vec();
    units.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let mut small: Vec<&str> = UNITS[1..10].to_vec();
    small.sort_by_key(|w| std::cmp::Reverse(w.len()));

    format!(
        r"(?:(?:one|a)[\s-]+hundred|hundred|(?:{tens})(?:[\s-]+(?:{small}))?|(?:{units}))",
        tens = TENS.join("|"),
        small = small.join("|"),
        units = units.join("|"),
    )
}

/// Value of a phrase matched by `number_phrase_pattern`
fn number_value(phrase: &str) -> Option<u32> {
    let mut total = 0u32;
    for word in phrase
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
    {
        let word = word.to_ascii_lowercase();
        if word == "hundred" {
            return Some(100);
        }
        if word == "a" {
            continue;
        }
        if let Some(v) = UNITS.iter().position(|u| *u == word) {
            total += v as u32;
        } else if let Some(v) = TENS.iter().position(|t| *t == word) {
            total += 20 + 10 * v as u32;
        } else {
            return None;
        }
    }
    Some(total)
}

/// Convert a spelled-out number, e.g. "twenty-five" -> 25
pub fn parse_number_word(phrase: &str) -> Option<u32> {
    static WHOLE_RE: LazyLock<Regex> =
        LazyLock::new(|| literal(&format!(r"(?i)^\s*{}\s*$", number_phrase_pattern())));
    if WHOLE_RE.is_match(phrase) { number_value(phrase) } else { None }
}

// ---------------------------------------------------------------------------
// Scaffold rewrites
// ---------------------------------------------------------------------------

static RM_SHORTHAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)^(\s*)(?:rm|dl|del)\s+(\d+)(?:\s*(?:-|~|\bto\b|\bthrough\b|\bthru\b)\s*(\d+))?(\s+(?:in|from)\s+\S+)?(\s*)$",
    )
});

static LN_ABBREV_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)\bln\s*(\d+)"));

static LINE_GLUE_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)\b(lines?)\s*(\d+)"));

static LINE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(&format!(r"(?i)\b(lines?)\s+({})\b", number_phrase_pattern()))
});

static RANGE_END_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(&format!(
        r"(?i)\b(lines?\s+\d+\s*(?:-|~|\bto\b|\bthrough\b|\bthru\b)\s*)({})\b",
        number_phrase_pattern()
    ))
});

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\blines?\s+(\d+)\s*(?:-|~|\bto\b|\bthrough\b|\bthru\b)\s*(?:lines?\s+)?(\d+)\b",
    )
});

fn rewrite_scaffold(segment: &str, at_start: bool, whole: bool) -> String {
    let mut text = segment.to_string();

    // Shorthand deletes only when the utterance is nothing but a line reference
    if at_start && whole {
        text = RM_SHORTHAND_RE
            .replace(&text, |c: &Captures| {
                let lead = &c[1];
                let tail = c.get(4).map_or("", |m| m.as_str());
                let trail = &c[5];
                match c.get(3) {
                    Some(end) => {
                        format!("{lead}remove lines {}-{}{tail}{trail}", &c[2], end.as_str())
                    }
                    None => format!("{lead}remove line {}{tail}{trail}", &c[2]),
                }
            })
            .into_owned();
    }

    text = LN_ABBREV_RE.replace_all(&text, "line $1").into_owned();
    text = LINE_GLUE_RE.replace_all(&text, "$1 $2").into_owned();

    text = LINE_WORD_RE
        .replace_all(&text, |c: &Captures| match number_value(&c[2]) {
            Some(n) => format!("{} {n}", &c[1]),
            None => c[0].to_string(),
        })
        .into_owned();

    text = RANGE_END_WORD_RE
        .replace_all(&text, |c: &Captures| match number_value(&c[2]) {
            Some(n) => format!("{}{n}", &c[1]),
            None => c[0].to_string(),
        })
        .into_owned();

    RANGE_RE.replace_all(&text, "lines $1-$2").into_owned()
}

// ---------------------------------------------------------------------------
// Protected spans: quotes and payloads
// ---------------------------------------------------------------------------

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)\s(with|to)\s+(\S+)|:(?:\s|$)"));

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)\s(?:on|at|in)\s+(?:lines?|ln)(?:\s|\d|$)"));

/// Placement clauses that close a bare-verb payload
static PLACEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\s(?:on|at|in|to|before|above|after|below|under)\s+(?:lines?|ln)(?:\s|\d|$)|\s(?:at|to|on|in)\s+(?:the\s+)?(?:top|beginning|start|head|bottom|end)\b|\s(?:into|inside|in|to)\s+(?:the\s+)?(?:function|method|def|class)\b|\safter\s+(?:the\s+)?imports?\b",
    )
});

/// `to the top` places text rather than introducing it
static EDGE_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s+to\s+(?:the\s+)?(?:top|beginning|start|head|bottom|end)\b")
});

static BARE_VERB_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)^\s*(?:append|prepend|add|insert)\b"));

/// `add line 3 ...` addresses a line rather than carrying text
static LINE_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(&format!(
        r"(?i)^\s*(?:(?:a|new)\s+)*(?:lines?|ln)\s*(?:\d|{}\b)",
        number_phrase_pattern()
    ))
});

static TARGET_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)\s(?:in|inside|into)\s+(?:the\s+)?(?:file\s+)?(\S+)\s*$")
});

static NUMBER_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(&format!(r"(?i)^(?:\d|ln\d|ln\b|lines?\d|lines?\b|{}\b)", number_phrase_pattern()))
});

/// Byte ranges never rewritten, sorted and non-overlapping
pub(crate) fn protected_spans(text: &str) -> Vec<Range<usize>> {
    let quotes = quoted_spans(text);
    let mut spans = quotes.clone();

    let payload = match payload_start(text, &quotes) {
        // A trailing location clause stays rewritable
        Some(start) => {
            Some(start..last_location_clause(text, start, &quotes).unwrap_or(text.len()))
        }
        None => bare_payload(text, &quotes),
    };
    if let Some(span) = payload
        .map(|p| without_target_clause(text, p, &quotes))
        .filter(|p| !p.is_empty())
    {
        spans.retain(|q| q.end <= span.start || q.start >= span.end);
        spans.push(span);
        spans.sort_by_key(|r| r.start);
    }
    spans
}

fn in_any(pos: usize, spans: &[Range<usize>]) -> bool {
    spans.iter().any(|r| r.contains(&pos))
}

/// Start of the free-text payload, just past a marker found outside quotes
fn payload_start(text: &str, quotes: &[Range<usize>]) -> Option<usize> {
    for caps in MARKER_RE.captures_iter(text) {
        let m = caps.get(0)?;
        if in_any(m.start(), quotes) {
            continue;
        }
        let is_to = caps.get(1).is_some_and(|w| w.as_str().eq_ignore_ascii_case("to"));
        if is_to {
            let next = caps.get(2).map_or("", |n| n.as_str());
            if NUMBER_START_RE.is_match(next) || EDGE_TO_RE.is_match(&text[m.start()..]) {
                continue;
            }
        }
        return Some(caps.get(2).map_or(m.end(), |word| word.start()));
    }
    None
}

/// Text between a leading insertion verb and its placement clause
fn bare_payload(text: &str, quotes: &[Range<usize>]) -> Option<Range<usize>> {
    let verb = BARE_VERB_RE.find(text)?;
    let rest = &text[verb.end()..];
    if LINE_LEAD_RE.is_match(rest) {
        return None;
    }
    let start = verb.end() + (rest.len() - rest.trim_start().len());
    let end = PLACEMENT_RE
        .find_iter(rest)
        .map(|m| verb.end() + m.start())
        .find(|pos| !in_any(*pos, quotes))
        .unwrap_or(text.len());
    (start < end).then_some(start..end)
}

/// Leave a trailing `in <path>` clause outside the payload
fn without_target_clause(
    text: &str,
    span: Range<usize>,
    quotes: &[Range<usize>],
) -> Range<usize> {
    let Some(c) = TARGET_CLAUSE_RE.captures(&text[span.clone()]) else {
        return span;
    };
    let (Some(clause), Some(path)) = (c.get(0), c.get(1)) else {
        return span;
    };
    let at = span.start + clause.start();
    if in_any(at, quotes) || !looks_like_path(&clean_token(path.as_str())) {
        return span;
    }
    span.start..at
}

fn last_location_clause(text: &str, from: usize, quotes: &[Range<usize>]) -> Option<usize> {
    LOCATION_RE
        .find_iter(&text[from..])
        .map(|m| from + m.start())
        .filter(|pos| !in_any(*pos, quotes))
        .last()
}

/// Quoted spans: fences, triple quotes, and single/double/back quotes
fn quoted_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let rest = &text[i..];

        // Fences and triple quotes; unterminated ones run to the end
        if let Some(fence) = ["```", "\"\"\"", "'''"].iter().find(|f| rest.starts_with(**f)) {
            let end = text[i + 3..]
                .find(fence)
                .map_or(text.len(), |p| i + 3 + p + 3);
            spans.push(i..end);
            i = end;
            continue;
        }

        let b = bytes[i];
        if matches!(b, b'"' | b'\'' | b'`') && opens_quote(bytes, i) {
            if let Some(close) = closing_quote(bytes, i) {
                spans.push(i..close + 1);
                i = close + 1;
                continue;
            }
        }
        i += 1;
    }
    spans
}

fn opens_quote(bytes: &[u8], i: usize) -> bool {
    i == 0 || matches!(bytes[i - 1], b' ' | b'\t' | b'\n' | b'(' | b'[' | b'{' | b':' | b'=' | b',')
}

fn closing_quote(bytes: &[u8], open: usize) -> Option<usize> {
    let q = bytes[open];
    let mut j = open + 1;
    while j < bytes.len() {
        if bytes[j] == q {
            // An apostrophe inside a word (don't) does not close
            let next_is_word = bytes.get(j + 1).is_some_and(|c| c.is_ascii_alphanumeric());
            if q != b'\'' || !next_is_word {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}
