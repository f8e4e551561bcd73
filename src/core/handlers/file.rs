//! Whole-file operations; the lowest-priority catch for path-shaped commands

use std::sync::LazyLock;

use camino::Utf8PathBuf;
use regex::Regex;
use tracing::debug;

use super::payload::{clean_token, fenced_block, first_quoted, looks_like_path, triple_quoted, unquote};
use super::{FOLDER_WORDS, HOST_WORDS, Handler, HandlerPriority, LINE_WORDS, PATTERN_MATCH, Vocabulary};
use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::literal;

static CREATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)^\s*(?:create|make|new|touch)\s+(?:an?\s+)?(?:new\s+)?(?:(?:empty\s+)?file\s+)?(?:called\s+|named\s+)?(\S+)(?:\s+(?:with|containing)\s+(?:(?:the\s+)?content\s+)?(.+?))?\s*$",
    )
});

static READ_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:read|open|show|view|cat|display|load)\s+(?:the\s+)?(?:file\s*)?(\S+)?\s*$")
});

static DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:delete|remove|rm|del|erase)\s+(?:the\s+)?(?:file\s+)?(\S+)\s*$")
});

static RENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*rename\s+(?:(?:the|this|that)\s+)?(?:file\s+)?(?:(\S+)\s+)?(?:to|as)\s+(\S+)\s*$")
});

static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:move|mv)\s+(?:(?:the|this|that)\s+)?(?:file\s+)?(?:(\S+)\s+)?(?:to|into)\s+(\S+)\s*$")
});

static COPY_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:copy|cp|duplicate)\s+(?:(?:the|this|that)\s+)?(?:file\s+)?(?:(\S+)\s+)?(?:to|into|as)\s+(\S+)\s*$")
});

static FILE_WORD: LazyLock<Vocabulary> = LazyLock::new(|| Vocabulary::new(&["file"]));

/// Pronouns that point at the open file rather than name one
const DEICTIC: &[&str] = &["it", "this", "that", "file", "current"];

pub struct FileHandler;

impl Handler for FileHandler {
    fn name(&self) -> &'static str {
        "file"
    }

    fn family(&self) -> ActionFamily {
        ActionFamily::Filesystem
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::Low
    }

    fn score(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> f32 {
        let text = utterance.as_str();
        let scaffold = utterance.scaffold();
        if [&*FOLDER_WORDS, &*HOST_WORDS, &*LINE_WORDS].iter().any(|v| v.any_in(&scaffold)) {
            return 0.0;
        }

        let file_word = FILE_WORD.any_in(text);
        let target = [&*CREATE_RE, &*READ_RE, &*DELETE_RE, &*RENAME_RE, &*MOVE_RE, &*COPY_RE]
            .iter()
            .find_map(|re| re.captures(text))
            .map(|c| {
                c.iter()
                    .skip(1)
                    .flatten()
                    .any(|m| looks_like_path(m.as_str()))
            });
        match target {
            Some(path_like) if path_like || file_word => PATTERN_MATCH,
            _ => 0.0,
        }
    }

    fn parse(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> Option<Action> {
        let text = utterance.as_str();
        let action = if let Some(c) = CREATE_RE.captures(text) {
            let path = explicit(c.get(1).map(|m| m.as_str()))?;
            let content = utterance
                .block()
                .map(str::to_string)
                .or_else(|| fenced_block(text))
                .or_else(|| triple_quoted(text))
                .or_else(|| c.get(2).map(|m| inline_content(m.as_str())));
            Action::CreateFile { path, content }
        } else if let Some(c) = READ_RE.captures(text) {
            Action::ReadFile { path: explicit(c.get(1).map(|m| m.as_str())) }
        } else if let Some(c) = DELETE_RE.captures(text) {
            Action::DeleteFile { path: explicit(c.get(1).map(|m| m.as_str()))? }
        } else if let Some(c) = RENAME_RE.captures(text) {
            Action::RenameFile {
                path: explicit(c.get(1).map(|m| m.as_str())),
                new_name: clean_token(&c[2]),
            }
        } else if let Some(c) = MOVE_RE.captures(text) {
            Action::MoveFile {
                path: explicit(c.get(1).map(|m| m.as_str())),
                destination: Utf8PathBuf::from(clean_token(&c[2])),
            }
        } else if let Some(c) = COPY_RE.captures(text) {
            Action::CopyFile {
                path: explicit(c.get(1).map(|m| m.as_str())),
                destination: Utf8PathBuf::from(clean_token(&c[2])),
            }
        } else {
            return None;
        };

        debug!(kind = action.kind(), "file handler parsed");
        Some(action)
    }
}

fn inline_content(raw: &str) -> String {
    first_quoted(raw).unwrap_or_else(|| unquote(raw).to_string())
}

/// A named path, or `None` for pronouns like "it" / "this"
fn explicit(token: Option<&str>) -> Option<Utf8PathBuf> {
    let t = clean_token(token?);
    if t.is_empty() || DEICTIC.iter().any(|d| t.eq_ignore_ascii_case(d)) {
        return None;
    }
    Some(Utf8PathBuf::from(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{Utterance, normalize};

    fn parse(text: &str) -> Option<Action> {
        FileHandler
            .evaluate(&normalize(&Utterance::new(text)), &ActiveContext::new())
            .into_action()
    }

    #[test]
    fn test_create_with_content() {
        assert_eq!(
            parse("create file notes.md"),
            Some(Action::CreateFile { path: "notes.md".into(), content: None })
        );
        assert_eq!(
            parse("create hello.py with content 'print(1)'"),
            Some(Action::CreateFile { path: "hello.py".into(), content: Some("print(1)".into()) })
        );
    }

    #[test]
    fn test_read_binds_later_when_unnamed() {
        assert_eq!(parse("open app.py"), Some(Action::ReadFile { path: Some("app.py".into()) }));
        assert_eq!(parse("show the file"), Some(Action::ReadFile { path: None }));
        // Neither a path nor the word "file"
        assert_eq!(parse("show graph"), None);
    }

    #[test]
    fn test_delete_rename_move_copy() {
        assert_eq!(parse("rm 5.txt"), Some(Action::DeleteFile { path: "5.txt".into() }));
        assert_eq!(
            parse("rename a.py to b.py"),
            Some(Action::RenameFile { path: Some("a.py".into()), new_name: "b.py".into() })
        );
        assert_eq!(
            parse("rename this file to main.rs"),
            Some(Action::RenameFile { path: None, new_name: "main.rs".into() })
        );
        assert_eq!(
            parse("move app.py into src/"),
            Some(Action::MoveFile { path: Some("app.py".into()), destination: "src/".into() })
        );
        assert_eq!(parse("cp a.txt b.txt"), None);
        assert_eq!(
            parse("copy a.txt to b.txt"),
            Some(Action::CopyFile { path: Some("a.txt".into()), destination: "b.txt".into() })
        );
    }

    #[test]
    fn test_bleed_guards() {
        for text in ["create folder src", "create github repo x", "delete line 5", "create issue 'a.b'"] {
            let u = normalize(&Utterance::new(text));
            assert_eq!(FileHandler.score(&u, &ActiveContext::new()), 0.0, "{text}");
        }
    }
}
