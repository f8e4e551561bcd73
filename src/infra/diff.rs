//! Unified diff previews for buffer edits

use owo_colors::OwoColorize;
use similar::TextDiff;

/// Unified diff of `old` → `new`, empty when nothing changed
pub fn unified(
    path: &str,
    old: &str,
    new: &str,
    context: usize,
) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(context)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .missing_newline_hint(false)
        .to_string()
}

/// Color added/removed lines and hunk headers for a terminal
pub fn colorize(diff: &str) -> String {
    let mut out = String::with_capacity(diff.len() + diff.len() / 4);
    for line in diff.split_inclusive('\n') {
        let (body, nl) = match line.strip_suffix('\n') {
            Some(b) => (b, "\n"),
            None => (line, ""),
        };
        let painted = if body.starts_with("+++") || body.starts_with("---") {
            body.bold().to_string()
        } else if body.starts_with("@@") {
            body.cyan().to_string()
        } else if body.starts_with('+') {
            body.green().to_string()
        } else if body.starts_with('-') {
            body.red().to_string()
        } else {
            body.to_string()
        };
        out.push_str(&painted);
        out.push_str(nl);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_marks_changes() {
        let d = unified("app.py", "a\nb\nc\n", "a\nB\nc\n", 3);
        assert!(d.starts_with("--- a/app.py\n+++ b/app.py\n"));
        assert!(d.contains("\n-b\n"));
        assert!(d.contains("\n+B\n"));
    }

    #[test]
    fn test_no_change_is_empty() {
        assert_eq!(unified("x", "same\n", "same\n", 3), "");
    }

    #[test]
    fn test_colorize_keeps_text() {
        let d = unified("f", "a\n", "b\n", 1);
        let colored = colorize(&d);
        assert!(colored.contains("\u{1b}["));
        assert_eq!(crate::infra::ansi::strip_ansi(&colored), d);
    }
}
