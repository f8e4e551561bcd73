//! Transactional editing engine
//!
//! `apply` takes a [`Buffer`] and a text-mutation [`Action`] and returns a
//! new buffer or a typed error. All validation runs before the successor is
//! built, so an error always leaves the caller holding the untouched input.

use std::sync::Arc;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::action::Action;
use crate::core::buffer::Buffer;
use crate::core::structure::{self, DefKind, splice};
use crate::infra::ansi::strip_ansi;

/// Rejected edit; the input buffer is unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("line {line} is out of range (valid: {min}..={max})")]
    OutOfRange { line: usize, min: usize, max: usize },

    #[error("invalid range {start}-{end}: end is before start")]
    InvalidRange { start: usize, end: usize },

    #[error("{kind} needs a target file")]
    MissingTarget { kind: &'static str },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("no match: {0}")]
    NoMatch(String),

    #[error("{kind} is not a text edit")]
    UnsupportedAction { kind: &'static str },
}

/// Successful edit: the successor buffer plus a one-line summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub buffer: Buffer,
    pub summary: String,
}

/// Core edit engine
#[derive(Debug, Clone)]
pub struct EditEngine {
    strip_ansi: bool,
}

impl Default for EditEngine {
    fn default() -> Self {
        Self { strip_ansi: true }
    }
}

/// Apply with default settings
pub fn apply(
    buffer: &Buffer,
    action: &Action,
) -> Result<EditOutcome, EditError> {
    EditEngine::new().apply(buffer, action)
}

impl EditEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strip_ansi(
        mut self,
        enabled: bool,
    ) -> Self {
        self.strip_ansi = enabled;
        self
    }

    #[instrument(level = "debug", skip_all, fields(kind = action.kind(), lines = buffer.len()))]
    pub fn apply(
        &self,
        buffer: &Buffer,
        action: &Action,
    ) -> Result<EditOutcome, EditError> {
        if !action.is_text_mutation() {
            return Err(EditError::UnsupportedAction { kind: action.kind() });
        }
        let result = self.build(buffer, action);
        match &result {
            Ok((_, summary)) => debug!(%summary, "edit applied"),
            Err(e) => debug!(error = %e, "edit rejected"),
        }
        let (lines, summary) = result?;
        Ok(EditOutcome { buffer: buffer.with_lines(lines), summary })
    }

    /// Validate and compute the successor lines
    fn build(
        &self,
        buffer: &Buffer,
        action: &Action,
    ) -> Result<(Vec<Arc<str>>, String), EditError> {
        let lines = buffer.shared_lines();
        let len = lines.len();

        match action {
            Action::InsertBeforeLine { line, text, .. } => {
                check(*line, 1, len + 1)?;
                let at = line - 1;
                Ok((splice(lines, at, at, self.single(text)?), format!("inserted line before {line}")))
            }
            Action::InsertAfterLine { line, text, .. } => {
                check(*line, 0, len)?;
                Ok((splice(lines, *line, *line, self.single(text)?), format!("inserted line after {line}")))
            }
            Action::ReplaceLine { line, text, .. } => {
                check(*line, 1, len)?;
                Ok((splice(lines, line - 1, *line, self.single(text)?), format!("replaced line {line}")))
            }
            Action::DeleteLineRange { start, end, .. } => {
                range(*start, *end, len)?;
                Ok((splice(lines, start - 1, *end, Vec::new()), span("deleted", *start, *end)))
            }
            Action::RemoveBlock { start, end, .. } => {
                range(*start, *end, len)?;
                Ok((splice(lines, start - 1, *end, Vec::new()), span("removed block", *start, *end)))
            }
            Action::InsertAtTop { text, .. } => {
                let block = self.block(text);
                let n = block.len();
                Ok((splice(lines, 0, 0, block), format!("inserted {} at top", count(n))))
            }
            Action::InsertAtBottom { text, .. } => {
                let block = self.block(text);
                let n = block.len();
                Ok((splice(lines, len, len, block), format!("inserted {} at bottom", count(n))))
            }
            Action::PrependText { text, .. } => {
                Ok((splice(lines, 0, 0, self.single(text)?), "prepended line at top".into()))
            }
            Action::AppendText { text, .. } => {
                Ok((splice(lines, len, len, self.single(text)?), "appended line at bottom".into()))
            }
            Action::ReplaceBlock { start, end, text, .. } => {
                range(*start, *end, len)?;
                let block = self.block(text);
                if text.trim().is_empty() {
                    return Err(EditError::MalformedPayload(
                        "replace-block needs at least one replacement line".into(),
                    ));
                }
                let n = block.len();
                Ok((
                    splice(lines, start - 1, *end, block),
                    format!("{} with {}", span("replaced", *start, *end), count(n)),
                ))
            }
            Action::InsertBlockAtLine { line, text, .. } => {
                check(*line, 1, len + 1)?;
                let block = self.block(text);
                let n = block.len();
                Ok((splice(lines, line - 1, line - 1, block), format!("inserted {} at line {line}", count(n))))
            }
            Action::ReplaceText { find, replace, .. } => self.replace_text(lines, find, replace),
            Action::ReplacePattern { pattern, replacement, .. } => {
                let re = user_regex(pattern)?;
                let replacement = self.clean(replacement);
                let mut hits = 0usize;
                let mut out = Vec::with_capacity(len);
                for line in lines {
                    if re.is_match(line) {
                        hits += 1;
                        let replaced = re.replace_all(line, replacement.as_str());
                        out.extend(replaced.split('\n').map(Arc::from));
                    } else {
                        out.push(Arc::clone(line));
                    }
                }
                if hits == 0 {
                    return Err(EditError::NoMatch(format!("pattern `{pattern}` matched nothing")));
                }
                Ok((out, format!("replaced pattern on {}", count(hits))))
            }
            Action::DeletePattern { pattern, .. } => {
                let re = user_regex(pattern)?;
                let kept: Vec<Arc<str>> = lines.iter().filter(|l| !re.is_match(l)).cloned().collect();
                let removed = len - kept.len();
                if removed == 0 {
                    return Err(EditError::NoMatch(format!("pattern `{pattern}` matched nothing")));
                }
                Ok((kept, format!("deleted {} matching `{pattern}`", count(removed))))
            }
            Action::InsertAfterImports { text, .. } => {
                let block = self.block(text);
                let n = block.len();
                let (out, at) = structure::insert_after_imports(lines, block);
                Ok((out, format!("inserted {} after imports (line {})", count(n), at + 1)))
            }
            Action::AutoImport { symbol, module, .. } => {
                let (out, statement) = structure::auto_import(lines, symbol, module.as_deref())?;
                Ok((out, format!("added `{statement}`")))
            }
            Action::InsertIntoFunction { function, text, position, .. } => {
                let (out, at) =
                    structure::insert_into_body(lines, DefKind::Function, function, &self.clean(text), *position)?;
                Ok((out, format!("inserted into function `{function}` at line {at}")))
            }
            Action::InsertIntoClass { class, text, position, .. } => {
                let (out, at) =
                    structure::insert_into_body(lines, DefKind::Class, class, &self.clean(text), *position)?;
                Ok((out, format!("inserted into class `{class}` at line {at}")))
            }
            Action::AddDecorator { name, decorator, .. } => {
                let (out, deco) = structure::add_decorator(lines, name, &self.clean(decorator))?;
                Ok((out, format!("decorated `{name}` with `{deco}`")))
            }
            Action::DeleteFunction { function, .. } => {
                let (out, start, end) = structure::delete_function(lines, function)?;
                Ok((out, format!("deleted function `{function}` (lines {start}-{end})")))
            }
            Action::RemoveBetweenMarkers { start, end, inclusive, .. } => {
                let (out, removed) = structure::remove_between_markers(lines, start, end, *inclusive)?;
                Ok((out, format!("removed {} between markers", count(removed))))
            }
            other => Err(EditError::UnsupportedAction { kind: other.kind() }),
        }
    }

    fn replace_text(
        &self,
        lines: &[Arc<str>],
        find: &str,
        replace: &str,
    ) -> Result<(Vec<Arc<str>>, String), EditError> {
        if find.is_empty() {
            return Err(EditError::MalformedPayload("text to find is empty".into()));
        }
        let replace = self.clean(replace);
        let mut hits = 0usize;
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            let n = line.matches(find).count();
            if n == 0 {
                out.push(Arc::clone(line));
                continue;
            }
            hits += n;
            out.extend(line.replace(find, &replace).split('\n').map(Arc::from));
        }
        if hits == 0 {
            return Err(EditError::NoMatch(format!("`{find}` not found")));
        }
        let times = if hits == 1 { "occurrence" } else { "occurrences" };
        Ok((out, format!("replaced {hits} {times} of `{find}`")))
    }

    /// Payload with control sequences removed and line endings unified
    fn clean(
        &self,
        text: &str,
    ) -> String {
        let text = if self.strip_ansi { strip_ansi(text) } else { text.into() };
        if text.contains('\r') {
            text.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            text.into_owned()
        }
    }

    /// Exactly one line; a single trailing newline is tolerated
    fn single(
        &self,
        text: &str,
    ) -> Result<Vec<Arc<str>>, EditError> {
        let text = self.clean(text);
        let line = text.strip_suffix('\n').unwrap_or(&text);
        if line.contains('\n') {
            return Err(EditError::MalformedPayload(
                "single-line edit received multi-line text; use a block edit".into(),
            ));
        }
        Ok(vec![Arc::from(line)])
    }

    fn block(
        &self,
        text: &str,
    ) -> Vec<Arc<str>> {
        let text = self.clean(text);
        let body = text.strip_suffix('\n').unwrap_or(&text);
        body.split('\n').map(Arc::from).collect()
    }
}

fn check(
    line: usize,
    min: usize,
    max: usize,
) -> Result<(), EditError> {
    if (min..=max).contains(&line) {
        Ok(())
    } else {
        Err(EditError::OutOfRange { line, min, max })
    }
}

fn range(
    start: usize,
    end: usize,
    len: usize,
) -> Result<(), EditError> {
    if end < start {
        return Err(EditError::InvalidRange { start, end });
    }
    check(start, 1, len)?;
    check(end, 1, len)
}

fn user_regex(pattern: &str) -> Result<Regex, EditError> {
    if pattern.is_empty() {
        return Err(EditError::MalformedPayload("empty pattern".into()));
    }
    Regex::new(pattern).map_err(|e| EditError::MalformedPayload(format!("invalid pattern `{pattern}`: {e}")))
}

fn span(
    verb: &str,
    start: usize,
    end: usize,
) -> String {
    if start == end {
        format!("{verb} line {start}")
    } else {
        format!("{verb} lines {start}-{end}")
    }
}

fn count(n: usize) -> String {
    if n == 1 { "1 line".into() } else { format!("{n} lines") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::BodyPosition;

    fn ten() -> Buffer {
        Buffer::from_lines((1..=10).map(|i| format!("line{i}")))
    }

    fn text(b: &Buffer) -> Vec<&str> {
        b.lines().collect()
    }

    #[test]
    fn test_delete_single_line() {
        let out = apply(&ten(), &Action::DeleteLineRange { path: None, start: 5, end: 5 }).unwrap();
        assert_eq!(out.buffer.len(), 9);
        assert!(!text(&out.buffer).contains(&"line5"));
        assert!(out.buffer.is_dirty());
        assert_eq!(out.summary, "deleted line 5");
    }

    #[test]
    fn test_delete_range_inclusive() {
        let out = apply(&ten(), &Action::DeleteLineRange { path: None, start: 3, end: 7 }).unwrap();
        assert_eq!(text(&out.buffer), vec!["line1", "line2", "line8", "line9", "line10"]);
        assert_eq!(out.summary, "deleted lines 3-7");
    }

    #[test]
    fn test_out_of_range_leaves_input_untouched() {
        let buf = ten();
        let before = buf.clone();
        let err = apply(&buf, &Action::ReplaceLine { path: None, line: 15, text: "x".into() }).unwrap_err();
        assert_eq!(err, EditError::OutOfRange { line: 15, min: 1, max: 10 });
        assert_eq!(buf, before);
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_insert_bounds() {
        let buf = ten();
        let top = apply(&buf, &Action::InsertAfterLine { path: None, line: 0, text: "zero".into() }).unwrap();
        assert_eq!(top.buffer.line(1), Some("zero"));

        let end = apply(&buf, &Action::InsertBeforeLine { path: None, line: 11, text: "end".into() }).unwrap();
        assert_eq!(end.buffer.line(11), Some("end"));

        assert!(matches!(
            apply(&buf, &Action::InsertBeforeLine { path: None, line: 0, text: "x".into() }),
            Err(EditError::OutOfRange { .. })
        ));
        assert!(matches!(
            apply(&buf, &Action::InsertAfterLine { path: None, line: 11, text: "x".into() }),
            Err(EditError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_reversed_range_is_invalid() {
        assert_eq!(
            apply(&ten(), &Action::RemoveBlock { path: None, start: 7, end: 3 }).unwrap_err(),
            EditError::InvalidRange { start: 7, end: 3 }
        );
    }

    #[test]
    fn test_payload_is_stripped_of_escape_sequences() {
        let out = apply(
            &ten(),
            &Action::ReplaceLine { path: None, line: 1, text: "\u{1b}[1;32mok\u{1b}[0m [0m".into() },
        )
        .unwrap();
        assert_eq!(out.buffer.line(1), Some("ok "));

        let raw = EditEngine::new()
            .with_strip_ansi(false)
            .apply(&ten(), &Action::ReplaceLine { path: None, line: 1, text: "\u{1b}[0m".into() })
            .unwrap();
        assert_eq!(raw.buffer.line(1), Some("\u{1b}[0m"));
    }

    #[test]
    fn test_single_line_ops_reject_multiline() {
        let err = apply(&ten(), &Action::AppendText { path: None, text: "a\nb".into() }).unwrap_err();
        assert!(matches!(err, EditError::MalformedPayload(_)));
        // One trailing newline is fine
        let ok = apply(&ten(), &Action::AppendText { path: None, text: "tail\n".into() }).unwrap();
        assert_eq!(ok.buffer.line(11), Some("tail"));
    }

    #[test]
    fn test_blocks() {
        let out = apply(
            &ten(),
            &Action::ReplaceBlock { path: None, start: 2, end: 9, text: "a\r\nb\n".into() },
        )
        .unwrap();
        assert_eq!(text(&out.buffer), vec!["line1", "a", "b", "line10"]);

        let err = apply(&ten(), &Action::ReplaceBlock { path: None, start: 2, end: 3, text: String::new() });
        assert!(matches!(err, Err(EditError::MalformedPayload(_))));

        let out = apply(&ten(), &Action::InsertBlockAtLine { path: None, line: 2, text: "x\ny".into() }).unwrap();
        assert_eq!(&text(&out.buffer)[..4], &["line1", "x", "y", "line2"]);

        let out = apply(&Buffer::default(), &Action::InsertAtBottom { path: None, text: "only".into() }).unwrap();
        assert_eq!(out.buffer.to_text(), "only\n");
    }

    #[test]
    fn test_replace_text_and_patterns() {
        let buf = Buffer::from_text("let a = foo();\nlet b = bar();\nfoo(foo);\n");
        let out = apply(&buf, &Action::ReplaceText { path: None, find: "foo".into(), replace: "baz".into() }).unwrap();
        assert_eq!(out.buffer.to_text(), "let a = baz();\nlet b = bar();\nbaz(baz);\n");
        assert_eq!(out.summary, "replaced 3 occurrences of `foo`");

        assert!(matches!(
            apply(&buf, &Action::ReplaceText { path: None, find: "qux".into(), replace: "x".into() }),
            Err(EditError::NoMatch(_))
        ));

        let out = apply(
            &buf,
            &Action::ReplacePattern { path: None, pattern: r"let (\w+)".into(), replacement: "const $1".into() },
        )
        .unwrap();
        assert_eq!(out.buffer.line(2), Some("const b = bar();"));

        let out = apply(&buf, &Action::DeletePattern { path: None, pattern: "^let".into() }).unwrap();
        assert_eq!(text(&out.buffer), vec!["foo(foo);"]);

        assert!(matches!(
            apply(&buf, &Action::DeletePattern { path: None, pattern: "(".into() }),
            Err(EditError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_structure_edits_route_through_engine() {
        let buf = Buffer::from_text("import os\n\ndef run():\n    pass\n");
        let out = apply(
            &buf,
            &Action::InsertIntoFunction {
                path: None,
                function: "run".into(),
                text: "print('hi')".into(),
                position: BodyPosition::Top,
            },
        )
        .unwrap();
        assert_eq!(out.buffer.to_text(), "import os\n\ndef run():\n    print('hi')\n    pass\n");

        let out = apply(&buf, &Action::AutoImport { path: None, symbol: "sys".into(), module: None }).unwrap();
        assert_eq!(out.buffer.line(2), Some("import sys"));
    }

    #[test]
    fn test_non_text_action_is_unsupported() {
        assert_eq!(
            apply(&ten(), &Action::GitStatus).unwrap_err(),
            EditError::UnsupportedAction { kind: "GitStatus" }
        );
    }

    #[test]
    fn test_insert_then_delete_round_trips() {
        let buf = ten();
        let ins = apply(&buf, &Action::InsertAfterLine { path: None, line: 4, text: "new".into() }).unwrap();
        let del = apply(&ins.buffer, &Action::DeleteLineRange { path: None, start: 5, end: 5 }).unwrap();
        assert_eq!(del.buffer.to_text(), buf.to_text());
    }
}
