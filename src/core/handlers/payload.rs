//! Payload and target extraction shared by the handlers
//!
//! Extraction order for free text: block (block mode), fenced code block,
//! triple-quoted string, quoted string, then the unquoted text the handler
//! captured. Outer quotes are stripped; nothing else is rewritten.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::core::normalize::{NormalizedUtterance, masked, protected_spans};
use crate::infra::re::literal;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?s)```(?:[A-Za-z0-9_+.-]*[ \t]*\n)?(.*?)\n?```"));

static TRIPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r#"(?s)"""(.*?)"""|'''(.*?)'''"#));

static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r#"(?:^|[\s(:=,\[])(?:"([^"]*)"|'((?:[^']|'[A-Za-z0-9])*)'|`([^`]*)`)"#)
});

static TRAILING_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)\s+(?:in|inside|into|from|of)\s+(?:the\s+)?(?:file\s+)?(\S+)\s*$")
});

static SCAFFOLD_END_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)\s(?:with|saying|containing)\s|:\s"));

static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^(?:(?:a|an|the|new)\s+)*(?:line|text|code|comment|content)(?:\s+(?:saying|that\s+says))?(?:\s+|$)")
});

static TRAILING_LEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?is)^\s*(?::|\bwith\b|\bsaying\b|\bcontaining\b)\s*(.*)$"));

const FILLER_WORDS: &[&str] = &["a", "an", "the", "line", "text", "code", "comment", "content"];

static PATH_MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)\b(?:in|inside|into|from|of)\s+(?:the\s+)?(?:file\s+)?([\w./~-]+)")
});

/// Strip one pair of matching outer quotes (and surrounding whitespace)
pub fn unquote(s: &str) -> &str {
    let t = s.trim();
    for q in ["\"\"\"", "'''", "\"", "'", "`"] {
        if t.len() >= 2 * q.len() && t.starts_with(q) && t.ends_with(q) {
            return &t[q.len()..t.len() - q.len()];
        }
    }
    t
}

/// Body of the first fenced code block
pub fn fenced_block(text: &str) -> Option<String> {
    FENCE_RE.captures(text).map(|c| c[1].to_string())
}

/// Body of the first triple-quoted string
pub fn triple_quoted(text: &str) -> Option<String> {
    TRIPLE_RE
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Every quoted string, in order of appearance
pub fn quoted_strings(text: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn first_quoted(text: &str) -> Option<String> {
    quoted_strings(text).into_iter().next()
}

/// Payload sitting between the verb and a location clause, or trailing it
///
/// `middle` is the text between verb and location (`insert <middle> at line 3`),
/// `trailing` whatever follows the location (`insert at line 3: <trailing>`).
pub fn inline_payload(
    utterance: &NormalizedUtterance,
    middle: &str,
    trailing: &str,
) -> Option<String> {
    if let Some(block) = utterance.block() {
        return Some(block.to_string());
    }
    let text = utterance.as_str();
    if let Some(p) = fenced_block(text)
        .or_else(|| triple_quoted(text))
        .or_else(|| first_quoted(text))
    {
        return Some(p);
    }

    let target = mentioned_path(text);
    let stripped = FILLER_RE.replace(middle.trim(), "");
    let candidate = unquote(strip_target_clause(&stripped, target.as_deref())).trim();
    if !candidate.is_empty() && !FILLER_WORDS.iter().any(|w| candidate.eq_ignore_ascii_case(w)) {
        return Some(candidate.to_string());
    }

    let lead = TRAILING_LEAD_RE.captures(trailing)?;
    let rest = unquote(strip_target_clause(lead[1].trim_end(), target.as_deref()));
    (!rest.is_empty()).then(|| rest.to_string())
}

/// True for tokens shaped like a file path (extension or separator)
pub fn looks_like_path(token: &str) -> bool {
    let t = token.trim_matches(|c| matches!(c, '"' | '\'' | '`' | ',' | ';'));
    if t.is_empty() || t.chars().any(char::is_whitespace) {
        return false;
    }
    if t.contains('/') || t.contains('\\') || t.starts_with('~') {
        return true;
    }
    match t.rsplit_once('.') {
        Some((stem, ext)) => {
            let ext_ok = !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric());
            let numeric = !stem.is_empty()
                && stem.chars().all(|c| c.is_ascii_digit())
                && ext.chars().all(|c| c.is_ascii_digit());
            ext_ok && !numeric
        }
        None => false,
    }
}

/// Remove a trailing `in|from|of <path>` clause naming `target`; a clause
/// naming anything else is payload text
pub fn strip_target_clause<'a>(
    text: &'a str,
    target: Option<&Utf8Path>,
) -> &'a str {
    let Some(target) = target else {
        return text;
    };
    match TRAILING_PATH_RE.captures(text) {
        Some(c) if c.get(1).is_some_and(|m| clean_token(m.as_str()) == target.as_str()) => {
            let cut = c.get(0).map_or(text.len(), |m| m.start());
            &text[..cut]
        }
        _ => text,
    }
}

/// File target named in the utterance
///
/// Quoted strings and payload text are masked first, so only scaffold
/// mentions count. A trailing `in|from|of <path>` clause wins; otherwise the
/// last mention before a `with` / `saying` / `:` lead-in.
pub fn mentioned_path(text: &str) -> Option<Utf8PathBuf> {
    let text = &masked(text, &protected_spans(text));
    if let Some(m) = TRAILING_PATH_RE.captures(text).and_then(|c| c.get(1)) {
        let p = clean_token(m.as_str());
        if looks_like_path(&p) {
            return Some(Utf8PathBuf::from(p));
        }
    }

    let cut = SCAFFOLD_END_RE.find(text).map_or(text.len(), |m| m.start());
    PATH_MENTION_RE
        .captures_iter(&text[..cut])
        .filter_map(|c| c.get(1))
        .map(|m| clean_token(m.as_str()))
        .filter(|p| looks_like_path(p))
        .last()
        .map(Utf8PathBuf::from)
}

/// Clean a captured name or path token
pub fn clean_token(token: &str) -> String {
    unquote(token)
        .trim_end_matches(['.', ',', ';'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{Utterance, normalize};

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("  'hello'  "), "hello");
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'''x'''"), "x");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_fenced_and_triple() {
        let t = "add at bottom ```python\nprint(1)\nprint(2)\n```";
        assert_eq!(fenced_block(t).as_deref(), Some("print(1)\nprint(2)"));
        assert_eq!(triple_quoted("insert \"\"\"a\nb\"\"\" at top").as_deref(), Some("a\nb"));
        assert_eq!(fenced_block("add ```print(1)``` at top").as_deref(), Some("print(1)"));
    }

    #[test]
    fn test_quoted_strings_skip_apostrophes() {
        assert_eq!(quoted_strings("replace 'foo' with \"bar\""), vec!["foo", "bar"]);
        assert_eq!(quoted_strings("don't stop"), Vec::<String>::new());
        assert_eq!(first_quoted("say 'it's fine'").as_deref(), Some("it's fine"));
    }

    #[test]
    fn test_strip_target_clause_only_for_target() {
        let target = Some(Utf8Path::new("app.py"));
        assert_eq!(strip_target_clause("x = 1 in app.py", target), "x = 1");
        assert_eq!(strip_target_clause("import x from lib.py", target), "import x from lib.py");
        assert_eq!(strip_target_clause("import x from lib.py", None), "import x from lib.py");
    }

    #[test]
    fn test_inline_payload_skips_filler() {
        let u = normalize(&Utterance::new("add a comment at the top"));
        assert_eq!(inline_payload(&u, " a comment ", ""), None);
        assert_eq!(inline_payload(&u, " the line hello ", "").as_deref(), Some("hello"));
        assert_eq!(inline_payload(&u, " ", ": x = 1").as_deref(), Some("x = 1"));
    }

    #[test]
    fn test_looks_like_path() {
        assert!(looks_like_path("app.py"));
        assert!(looks_like_path("src/lib.rs"));
        assert!(looks_like_path(".env"));
        assert!(looks_like_path("~/notes"));
        assert!(!looks_like_path("3.14"));
        assert!(!looks_like_path("hello"));
        assert!(!looks_like_path("end."));
    }

    #[test]
    fn test_mentioned_path() {
        assert_eq!(mentioned_path("remove line 5 in app.py"), Some(Utf8PathBuf::from("app.py")));
        assert_eq!(mentioned_path("remove line 5 from src/main.rs."), Some(Utf8PathBuf::from("src/main.rs")));
        assert_eq!(mentioned_path("put it in place"), None);
        // Paths inside the payload are not targets
        assert_eq!(mentioned_path("replace line 2 with from x.y import z"), None);
        assert_eq!(
            mentioned_path("insert 'a' in notes.md at line 1"),
            Some(Utf8PathBuf::from("notes.md"))
        );
        assert_eq!(
            mentioned_path("insert 'see b.py' in notes.md at line 1"),
            Some(Utf8PathBuf::from("notes.md"))
        );
        assert_eq!(mentioned_path("replace line 3 with import x from lib.py"), None);
        assert_eq!(mentioned_path("replace line 3 with x = 1 in app.py"), Some(Utf8PathBuf::from("app.py")));
    }
}
