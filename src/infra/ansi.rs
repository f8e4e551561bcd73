//! Terminal control sequence stripping for inserted payloads.
//!
//! Removes well-formed escape sequences (CSI, OSC, two-byte ESC) and the
//! corrupted fragments that survive when the ESC byte is lost upstream,
//! e.g. `[1;32m` or `38;5;46m`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::infra::re::literal;

/// Well-formed sequences: CSI, OSC (BEL or ST terminated), two-byte ESC.
static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]|\x1b")
});

/// Fragments missing their ESC prefix: a bracketed `[1;32m`, or a bare
/// SGR list at line start or glued to an opening bracket.
static FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?m)\[[0-9;]+m|(^|[(\[{])[0-9]{1,3}(?:;[0-9]{1,3})+m")
});

/// Strip control sequences, borrowing when there is nothing to remove.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();

    // Fast path: no ESC and no 'm' means no sequence or fragment
    if memchr::memchr(0x1b, bytes).is_none() && memchr::memchr(b'm', bytes).is_none() {
        return Cow::Borrowed(text);
    }

    let pass1 = ESCAPE_RE.replace_all(text, "");
    if !FRAGMENT_RE.is_match(&pass1) {
        return pass1;
    }
    // Keep the bracket or line start the bare form was anchored on
    Cow::Owned(FRAGMENT_RE.replace_all(&pass1, "${1}").into_owned())
}

/// True when the text carries anything `strip_ansi` would remove.
pub fn has_ansi(text: &str) -> bool {
    matches!(strip_ansi(text), Cow::Owned(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_full_sequences() {
        assert_eq!(strip_ansi("\x1b[38;5;46mgreen\x1b[0m"), "green");
        assert_eq!(strip_ansi("\x1b[1;31mERR\x1b[m done"), "ERR done");
        assert_eq!(strip_ansi("\x1b]0;title\x07body"), "body");
    }

    #[test]
    fn test_strip_corrupted_fragments() {
        assert_eq!(strip_ansi("[1;32mok[0m"), "ok");
        assert_eq!(strip_ansi("print(38;5;46m\"text\")"), "print(\"text\")");
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        let s = "def main():\n    return 42";
        assert!(matches!(strip_ansi(s), Cow::Borrowed(_)));
        assert!(!has_ansi(s));
    }

    #[test]
    fn test_ordinary_m_words_survive() {
        assert_eq!(strip_ansi("timeout 5m and room 12"), "timeout 5m and room 12");
        assert_eq!(strip_ansi("arr[i] = item"), "arr[i] = item");
    }

    #[test]
    fn test_sgr_lookalikes_in_text_survive() {
        assert_eq!(strip_ansi("ratio 1;2m here"), "ratio 1;2m here");
        assert_eq!(strip_ansi("x = a;12;3m"), "x = a;12;3m");
        assert!(!has_ansi("steps: 1;2m"));
        // Bare lists at line start are still fragments
        assert_eq!(strip_ansi("1;32mok\n0;1mdone"), "ok\ndone");
    }
}
