//! Line-level edits addressed by number or by file edge

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use super::payload::{
    fenced_block, inline_payload, mentioned_path, strip_target_clause, triple_quoted, unquote,
};
use super::{Handler, HandlerPriority, KEYWORD_MATCH, LINE_WORDS, PATTERN_MATCH, Vocabulary};
use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::literal;

static NUMBERED_REF_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)\blines?\s+\d+"));

static RANGE_REF_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)\blines?\s+(\d+)-(\d+)\b"));

static DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\b(?:remove|delete|rm|dl|del|erase|drop|cut)\s+(?:the\s+)?(?:(block)\s+(?:at\s+|of\s+)?)?lines?\s+(\d+)(?:-(\d+))?\b",
    )
});

static DELETE_EDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)\b(?:remove|delete|rm|dl|del|erase|drop|cut)\s+(?:the\s+)?(first|last)\s+line\b")
});

static REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\b(?:replace|update|change|edit|set|overwrite|rewrite)\s+(?:the\s+)?(?:(?:content|contents|text)\s+(?:of|on|at)\s+)?lines?\s+(\d+)(?:-(\d+))?\s*(?:\b(?:with|to|by)\b|:)\s*",
    )
});

static ADD_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\b(?:add|insert|write|put)\s+(?:(?:a|new)\s+)*line\s+(\d+)\s*(?:\b(?:with|saying|containing)\b|:)\s*",
    )
});

static POSITIONAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(insert|add|write|put|place|append|prepend)\b(.*?)\b(before|above|after|below|under|at|on|in)\s+line\s+(\d+)\b(.*)$",
    )
});

static EDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(insert|add|write|put|place|append|prepend)\b(.*?)\b(?:at|to|on|in)\s+(?:the\s+)?(top|beginning|start|head|bottom|end)\b(?:\s+of\s+(?:the\s+)?(?:file\s+)?\S+)?(.*)$",
    )
});

static BARE_APPEND_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?is)^\s*(append|prepend)\s+(.+?)\s*$"));

/// Version-control phrasing; a line number here belongs to a message
static VCS_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)^\s*(?:git|commit)\b"));

/// Structure vocabulary; without a numbered line these belong elsewhere
static STRUCTURE_WORDS: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::new(&[
        "function", "method", "def", "class", "decorator", "import", "imports", "marker",
        "markers", "pattern", "regex", "matching",
    ])
});

pub struct LineHandler;

impl Handler for LineHandler {
    fn name(&self) -> &'static str {
        "line"
    }

    fn family(&self) -> ActionFamily {
        ActionFamily::LineEdit
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::Normal
    }

    fn score(
        &self,
        utterance: &NormalizedUtterance,
        ctx: &ActiveContext,
    ) -> f32 {
        let text = &utterance.scaffold();
        if VCS_LEAD_RE.is_match(text) {
            return 0.0;
        }
        let numbered = NUMBERED_REF_RE.is_match(text);

        if !numbered && STRUCTURE_WORDS.any_in(text) {
            return 0.0;
        }
        // Reversed ranges are never valid
        if RANGE_REF_RE
            .captures_iter(text)
            .any(|c| number(&c, 2) < number(&c, 1))
        {
            return 0.0;
        }
        if let Some(c) = DELETE_EDGE_RE.captures(text) {
            let known = c[1].eq_ignore_ascii_case("first") || ctx.line_count().is_some();
            return if known { PATTERN_MATCH } else { 0.0 };
        }

        let pattern = DELETE_RE.is_match(text)
            || REPLACE_RE.is_match(text)
            || ADD_LINE_RE.is_match(text)
            || POSITIONAL_RE.is_match(text)
            || EDGE_RE.is_match(text)
            || BARE_APPEND_RE.is_match(text);
        if pattern {
            PATTERN_MATCH
        } else if numbered && LINE_WORDS.any_in(text) && has_edit_verb(text) {
            KEYWORD_MATCH
        } else {
            0.0
        }
    }

    fn parse(
        &self,
        utterance: &NormalizedUtterance,
        ctx: &ActiveContext,
    ) -> Option<Action> {
        let action = parse_line_action(utterance, ctx)?;
        debug!(kind = action.kind(), "line handler parsed");
        Some(action)
    }
}

/// Grammar is matched on the scaffold; payload slices come from the full
/// text at the same offsets
fn parse_line_action(
    u: &NormalizedUtterance,
    ctx: &ActiveContext,
) -> Option<Action> {
    let text = u.as_str();
    let scaffold = &u.scaffold();
    let path = mentioned_path(text);
    let group = |c: &Captures<'_>, i: usize| c.get(i).map_or("", |m| &text[m.range()]);

    if let Some(c) = DELETE_RE.captures(scaffold) {
        let start = number(&c, 2);
        let end = c.get(3).map_or(start, |_| number(&c, 3));
        if end < start {
            return None;
        }
        // Line 0 is left for the engine to reject as out of range
        return Some(if c.get(1).is_some() {
            Action::RemoveBlock { path, start, end }
        } else {
            Action::DeleteLineRange { path, start, end }
        });
    }

    if let Some(c) = DELETE_EDGE_RE.captures(scaffold) {
        let line = if c[1].eq_ignore_ascii_case("first") { 1 } else { ctx.line_count()? };
        return Some(Action::DeleteLineRange { path, start: line, end: line });
    }

    if let Some(c) = REPLACE_RE.captures(scaffold) {
        let start = number(&c, 1);
        let ranged = c.get(2).is_some();
        let end = if ranged { number(&c, 2) } else { start };
        if end < start {
            return None;
        }
        let tail = c.get(0).map_or("", |m| &text[m.end()..]);
        let payload = tail_payload(u, tail, path.as_deref())?;
        let block = ranged || u.is_block_mode() || payload.contains('\n');
        return Some(if block {
            Action::ReplaceBlock { path, start, end, text: payload }
        } else {
            Action::ReplaceLine { path, line: start, text: payload }
        });
    }

    if let Some(c) = ADD_LINE_RE.captures(scaffold) {
        let line = number(&c, 1);
        let tail = c.get(0).map_or("", |m| &text[m.end()..]);
        let payload = tail_payload(u, tail, path.as_deref())?;
        return Some(insert_at(u, path, line, payload));
    }

    if let Some(c) = POSITIONAL_RE.captures(scaffold) {
        let line = number(&c, 4);
        let payload = inline_payload(u, group(&c, 2), group(&c, 5))?;
        let multi = u.is_block_mode() || payload.contains('\n');
        let action = match c[3].to_ascii_lowercase().as_str() {
            "after" | "below" | "under" if multi => {
                Action::InsertBlockAtLine { path, line: line.checked_add(1)?, text: payload }
            }
            "after" | "below" | "under" => Action::InsertAfterLine { path, line, text: payload },
            _ => insert_at(u, path, line, payload),
        };
        return Some(action);
    }

    if let Some(c) = EDGE_RE.captures(scaffold) {
        let payload = inline_payload(u, group(&c, 2), group(&c, 4))?;
        let top = matches!(
            c[3].to_ascii_lowercase().as_str(),
            "top" | "beginning" | "start" | "head"
        );
        return Some(if top {
            Action::InsertAtTop { path, text: payload }
        } else {
            Action::InsertAtBottom { path, text: payload }
        });
    }

    if let Some(c) = BARE_APPEND_RE.captures(scaffold) {
        let payload = inline_payload(u, group(&c, 2), "")?;
        let prepend = c[1].eq_ignore_ascii_case("prepend");
        let multi = u.is_block_mode() || payload.contains('\n');
        return Some(match (prepend, multi) {
            (true, true) => Action::InsertAtTop { path, text: payload },
            (true, false) => Action::PrependText { path, text: payload },
            (false, true) => Action::InsertAtBottom { path, text: payload },
            (false, false) => Action::AppendText { path, text: payload },
        });
    }

    None
}

/// Insert that pushes the addressed line down
fn insert_at(
    u: &NormalizedUtterance,
    path: Option<camino::Utf8PathBuf>,
    line: usize,
    text: String,
) -> Action {
    if u.is_block_mode() || text.contains('\n') {
        Action::InsertBlockAtLine { path, line, text }
    } else {
        Action::InsertBeforeLine { path, line, text }
    }
}

/// Payload following the scaffold (`replace line 3 with <payload>`)
fn tail_payload(
    u: &NormalizedUtterance,
    tail: &str,
    target: Option<&camino::Utf8Path>,
) -> Option<String> {
    if let Some(block) = u.block() {
        return Some(block.to_string());
    }
    if let Some(p) = fenced_block(tail).or_else(|| triple_quoted(tail)) {
        return Some(p);
    }
    let tail = tail.trim();
    if tail.is_empty() {
        return None;
    }
    Some(unquote(strip_target_clause(tail, target)).to_string())
}

fn has_edit_verb(text: &str) -> bool {
    static VERBS: LazyLock<Vocabulary> = LazyLock::new(|| {
        Vocabulary::new(&[
            "insert", "add", "write", "put", "place", "append", "prepend", "remove", "delete",
            "rm", "replace", "update", "change", "edit", "set", "overwrite",
        ])
    });
    VERBS.any_in(text)
}

fn number(
    caps: &Captures<'_>,
    group: usize,
) -> usize {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{Utterance, normalize};

    fn parse(text: &str) -> Option<Action> {
        parse_with(text, &ActiveContext::new())
    }

    fn parse_with(
        text: &str,
        ctx: &ActiveContext,
    ) -> Option<Action> {
        LineHandler
            .evaluate(&normalize(&Utterance::new(text)), ctx)
            .into_action()
    }

    #[test]
    fn test_delete_single_and_range() {
        assert_eq!(
            parse("remove line 5"),
            Some(Action::DeleteLineRange { path: None, start: 5, end: 5 })
        );
        assert_eq!(
            parse("delete lines 3 to 7"),
            Some(Action::DeleteLineRange { path: None, start: 3, end: 7 })
        );
        assert_eq!(
            parse("rm 4"),
            Some(Action::DeleteLineRange { path: None, start: 4, end: 4 })
        );
        assert_eq!(
            parse("remove block lines 2-4"),
            Some(Action::RemoveBlock { path: None, start: 2, end: 4 })
        );
    }

    #[test]
    fn test_reversed_range_is_not_claimed() {
        let u = normalize(&Utterance::new("delete lines 7-3"));
        assert_eq!(LineHandler.score(&u, &ActiveContext::new()), 0.0);
    }

    #[test]
    fn test_last_line_needs_known_length() {
        assert_eq!(parse("delete the last line"), None);
        let ctx = ActiveContext::with_path("a.txt").with_content("a\nb\nc\n");
        assert_eq!(
            parse_with("delete the last line", &ctx),
            Some(Action::DeleteLineRange { path: None, start: 3, end: 3 })
        );
    }

    #[test]
    fn test_replace_line_and_block() {
        assert_eq!(
            parse("replace line 3 with return x"),
            Some(Action::ReplaceLine { path: None, line: 3, text: "return x".into() })
        );
        assert_eq!(
            parse("change line two to 'done'"),
            Some(Action::ReplaceLine { path: None, line: 2, text: "done".into() })
        );
        assert_eq!(
            parse("replace lines 2-3 with x"),
            Some(Action::ReplaceBlock { path: None, start: 2, end: 3, text: "x".into() })
        );
    }

    #[test]
    fn test_block_mode_promotes_to_block_ops() {
        let u = normalize(&Utterance::new("replace line 2 with").with_block("a\nb"));
        assert_eq!(
            LineHandler.evaluate(&u, &ActiveContext::new()).into_action(),
            Some(Action::ReplaceBlock { path: None, start: 2, end: 2, text: "a\nb".into() })
        );

        let u = normalize(&Utterance::new("insert at line 4").with_block("x\ny"));
        assert_eq!(
            LineHandler.evaluate(&u, &ActiveContext::new()).into_action(),
            Some(Action::InsertBlockAtLine { path: None, line: 4, text: "x\ny".into() })
        );
    }

    #[test]
    fn test_positional_inserts() {
        assert_eq!(
            parse("insert hello at line 1"),
            Some(Action::InsertBeforeLine { path: None, line: 1, text: "hello".into() })
        );
        assert_eq!(
            parse("add 'import os' after line 0"),
            Some(Action::InsertAfterLine { path: None, line: 0, text: "import os".into() })
        );
        assert_eq!(
            parse("insert before line 3: x = 1"),
            Some(Action::InsertBeforeLine { path: None, line: 3, text: "x = 1".into() })
        );
        assert_eq!(
            parse("add line 2 with pass"),
            Some(Action::InsertBeforeLine { path: None, line: 2, text: "pass".into() })
        );
    }

    #[test]
    fn test_edges_and_bare_append() {
        assert_eq!(
            parse("add '# header' at the top"),
            Some(Action::InsertAtTop { path: None, text: "# header".into() })
        );
        assert_eq!(
            parse("append footer to the end of file"),
            Some(Action::InsertAtBottom { path: None, text: "footer".into() })
        );
        assert_eq!(
            parse("append done"),
            Some(Action::AppendText { path: None, text: "done".into() })
        );
        assert_eq!(
            parse("prepend #!/bin/sh"),
            Some(Action::PrependText { path: None, text: "#!/bin/sh".into() })
        );
    }

    #[test]
    fn test_mentioned_path_is_carried() {
        assert_eq!(
            parse("remove line 5 in app.py"),
            Some(Action::DeleteLineRange { path: Some("app.py".into()), start: 5, end: 5 })
        );
    }

    #[test]
    fn test_quoted_line_words_are_not_edits() {
        let ctx = ActiveContext::with_path("app.py");
        assert_eq!(parse_with("git commit -m 'delete line 4 bug'", &ctx), None);
        assert_eq!(parse_with("git commit -m fix bug on line 5", &ctx), None);
        assert_eq!(parse_with("commit with message 'remove line 2'", &ctx), None);
    }

    #[test]
    fn test_payload_file_clause_stays_in_text() {
        assert_eq!(
            parse("replace line 3 with import x from lib.py"),
            Some(Action::ReplaceLine { path: None, line: 3, text: "import x from lib.py".into() })
        );
        assert_eq!(
            parse("replace line 3 with x = 1 in app.py"),
            Some(Action::ReplaceLine { path: Some("app.py".into()), line: 3, text: "x = 1".into() })
        );
        assert_eq!(
            parse("insert 'a' in notes.md at line 1"),
            Some(Action::InsertBeforeLine { path: Some("notes.md".into()), line: 1, text: "a".into() })
        );
    }

    #[test]
    fn test_bare_payload_kept_verbatim() {
        assert_eq!(
            parse("add # TODO fix ln2 at the top"),
            Some(Action::InsertAtTop { path: None, text: "# TODO fix ln2".into() })
        );
        assert_eq!(
            parse("prepend # lines 1 to 3 are generated"),
            Some(Action::PrependText { path: None, text: "# lines 1 to 3 are generated".into() })
        );
        assert_eq!(
            parse("append see line5 for details"),
            Some(Action::AppendText { path: None, text: "see line5 for details".into() })
        );
    }

    #[test]
    fn test_line_zero_reaches_engine() {
        assert_eq!(
            parse("remove line 0"),
            Some(Action::DeleteLineRange { path: None, start: 0, end: 0 })
        );
    }

    #[test]
    fn test_line_number_overflow_is_rejected() {
        let u = normalize(&Utterance::new("insert after line 18446744073709551615").with_block("a\nb"));
        assert_eq!(LineHandler.evaluate(&u, &ActiveContext::new()).into_action(), None);
    }

    #[test]
    fn test_structure_words_without_line_number() {
        let u = normalize(&Utterance::new("add print(x) to function main at top"));
        assert_eq!(LineHandler.score(&u, &ActiveContext::new()), 0.0);

        let u = normalize(&Utterance::new("replace line 3 with def main():"));
        assert_eq!(LineHandler.score(&u, &ActiveContext::new()), PATTERN_MATCH);
    }
}
