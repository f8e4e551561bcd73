//! Folder operations; always carry an explicit path

use std::sync::LazyLock;

use camino::Utf8PathBuf;
use regex::Regex;
use tracing::debug;

use super::payload::clean_token;
use super::{FOLDER_WORDS, Handler, HandlerPriority, KEYWORD_MATCH, PATTERN_MATCH};
use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::literal;

static CREATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)^\s*(?:(?:create|make|add)\s+(?:a\s+)?(?:new\s+)?(?:folder|directory|dir)|new\s+(?:folder|directory|dir)|mkdir(?:\s+-p)?)\s+(?:called\s+|named\s+)?(\S+)\s*$",
    )
});

static CREATE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:create|make|add)\s+(?:a\s+)?(?:new\s+)?(\S+)\s+(?:folder|directory|dir)\s*$")
});

static DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)^\s*(?:(?:delete|remove|rm)\s+(?:the\s+)?(?:folder|directory|dir)|rmdir|rm\s+-r[f]?)\s+(\S+)\s*$",
    )
});

static DELETE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:delete|remove|rm)\s+(?:the\s+)?(\S+)\s+(?:folder|directory|dir)\s*$")
});

static RENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*rename\s+(?:the\s+)?(?:folder|directory|dir)\s+(\S+)\s+(?:to|as)\s+(\S+)\s*$")
});

static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*move\s+(?:the\s+)?(?:folder|directory|dir)\s+(\S+)\s+(?:to|into)\s+(\S+)\s*$")
});

static COPY_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)^\s*(?:copy|duplicate)\s+(?:the\s+)?(?:folder|directory|dir)\s+(\S+)\s+(?:to|into|as)\s+(\S+)\s*$",
    )
});

pub struct FolderHandler;

impl Handler for FolderHandler {
    fn name(&self) -> &'static str {
        "folder"
    }

    fn family(&self) -> ActionFamily {
        ActionFamily::Filesystem
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::High
    }

    fn score(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> f32 {
        let text = utterance.as_str();
        if !FOLDER_WORDS.any_in(text) {
            return 0.0;
        }
        let pattern = [
            &*CREATE_RE,
            &*CREATE_SUFFIX_RE,
            &*DELETE_RE,
            &*DELETE_SUFFIX_RE,
            &*RENAME_RE,
            &*MOVE_RE,
            &*COPY_RE,
        ]
        .iter()
        .any(|re| re.is_match(text));
        if pattern { PATTERN_MATCH } else { KEYWORD_MATCH }
    }

    fn parse(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> Option<Action> {
        let text = utterance.as_str();
        let path = |s: &str| Utf8PathBuf::from(clean_token(s));

        let action = if let Some(c) = CREATE_RE.captures(text).or_else(|| CREATE_SUFFIX_RE.captures(text)) {
            Action::CreateFolder { path: path(&c[1]) }
        } else if let Some(c) = DELETE_RE.captures(text).or_else(|| DELETE_SUFFIX_RE.captures(text)) {
            Action::DeleteFolder { path: path(&c[1]) }
        } else if let Some(c) = RENAME_RE.captures(text) {
            Action::RenameFolder { path: path(&c[1]), new_name: clean_token(&c[2]) }
        } else if let Some(c) = MOVE_RE.captures(text) {
            Action::MoveFolder { path: path(&c[1]), destination: path(&c[2]) }
        } else if let Some(c) = COPY_RE.captures(text) {
            Action::CopyFolder { path: path(&c[1]), destination: path(&c[2]) }
        } else {
            return None;
        };

        debug!(kind = action.kind(), "folder handler parsed");
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{Utterance, normalize};

    fn parse(text: &str) -> Option<Action> {
        FolderHandler
            .evaluate(&normalize(&Utterance::new(text)), &ActiveContext::new())
            .into_action()
    }

    #[test]
    fn test_create_and_delete() {
        assert_eq!(parse("create folder src/utils"), Some(Action::CreateFolder { path: "src/utils".into() }));
        assert_eq!(parse("mkdir build"), Some(Action::CreateFolder { path: "build".into() }));
        assert_eq!(parse("make a new docs directory"), Some(Action::CreateFolder { path: "docs".into() }));
        assert_eq!(parse("remove directory tmp"), Some(Action::DeleteFolder { path: "tmp".into() }));
    }

    #[test]
    fn test_rename_move_copy() {
        assert_eq!(
            parse("rename folder old to new"),
            Some(Action::RenameFolder { path: "old".into(), new_name: "new".into() })
        );
        assert_eq!(
            parse("move folder assets into public"),
            Some(Action::MoveFolder { path: "assets".into(), destination: "public".into() })
        );
        assert_eq!(
            parse("copy dir templates to backup"),
            Some(Action::CopyFolder { path: "templates".into(), destination: "backup".into() })
        );
    }

    #[test]
    fn test_keyword_without_shape_yields_nothing() {
        let u = normalize(&Utterance::new("what is in this folder"));
        assert_eq!(FolderHandler.score(&u, &ActiveContext::new()), KEYWORD_MATCH);
        assert_eq!(FolderHandler.evaluate(&u, &ActiveContext::new()).action(), None);
    }

    #[test]
    fn test_no_folder_words() {
        let u = normalize(&Utterance::new("create file a.txt"));
        assert_eq!(FolderHandler.score(&u, &ActiveContext::new()), 0.0);
    }
}
