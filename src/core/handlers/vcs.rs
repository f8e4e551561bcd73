//! Version-control commands

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::payload::{clean_token, first_quoted};
use super::{Handler, HandlerPriority, KEYWORD_MATCH, LINE_WORDS, PATTERN_MATCH, Vocabulary};
use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::literal;

static INIT_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)\bgit\s+init\b|\binit(?:ialize)?\s+(?:a\s+)?(?:git\s+)?repo(?:sitory)?\s+here\b"));

static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)^\s*(?:git\s+status|status|show\s+(?:git\s+)?status)\s*$"));

static ADD_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)^\s*(?:git\s+)?(?:add|stage)\s+(.+?)\s*$"));

static COMMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r#"(?i)^\s*(?:git\s+)?commit(?:\s+all)?(?:\s+(?:with\s+)?(?:the\s+)?message|\s+-a?m)?(?:\s*[:=]\s*|\s+)(?:"([^"]*)"|'([^']*)'|(\S.*?))\s*$"#)
});

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:git\s+)?(?:create\s+)?(?:a\s+)?(?:new\s+)?branch\s+(?:called\s+|named\s+)?(\S+)\s*$")
});

static CHECKOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:git\s+)?(?:switch\s+to|switch|checkout)\s+(-b\s+)?(?:branch\s+)?(\S+)\s*$")
});

static MERGE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)^\s*(?:git\s+)?merge\s+(?:branch\s+)?(\S+)\s*$"));

static PUSH_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:git\s+)?push(?:\s+(-u|--set-upstream))?(?:\s+(?:to\s+)?(\S+))?(?:\s+(\S+))?\s*$")
});

static PULL_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)^\s*(?:git\s+)?pull(?:\s+(?:from\s+)?(\S+))?(?:\s+(\S+))?\s*$")
});

static REMOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)^\s*(?:git\s+)?remote\s+add\s+(\S+)\s+(\S+)\s*$"));

static GRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)\bshow\s+(?:the\s+)?(?:git\s+|commit\s+)?graph\b|\b(?:git\s+)?log\s+--graph\b")
});

static GIT_WORDS: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::new(&[
        "git", "commit", "branch", "checkout", "merge", "push", "pull", "remote", "stage",
        "status", "graph",
    ])
});

pub struct GitHandler;

impl Handler for GitHandler {
    fn name(&self) -> &'static str {
        "git"
    }

    fn family(&self) -> ActionFamily {
        ActionFamily::VersionControl
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::Normal
    }

    fn score(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> f32 {
        let text = utterance.as_str();
        // `git ...` and commit messages outrank line vocabulary
        let explicit = utterance.lower().trim_start().starts_with("git ");
        if !explicit && !COMMIT_RE.is_match(text) && LINE_WORDS.any_in(&utterance.scaffold()) {
            return 0.0;
        }

        if let Some(c) = ADD_RE.captures(text) {
            // Bare "add X" belongs to git only for the whole tree
            if !explicit && pathspec(c[1].trim()) != "." {
                return 0.0;
            }
            return PATTERN_MATCH;
        }

        let pattern = INIT_RE.is_match(text)
            || STATUS_RE.is_match(text)
            || COMMIT_RE.is_match(text)
            || CHECKOUT_RE.is_match(text)
            || BRANCH_RE.is_match(text)
            || MERGE_RE.is_match(text)
            || PUSH_RE.is_match(text)
            || PULL_RE.is_match(text)
            || REMOTE_RE.is_match(text)
            || GRAPH_RE.is_match(text);
        if pattern {
            PATTERN_MATCH
        } else if explicit && GIT_WORDS.any_in(text) {
            KEYWORD_MATCH
        } else {
            0.0
        }
    }

    fn parse(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> Option<Action> {
        let action = parse_git(utterance.as_str())?;
        debug!(kind = action.kind(), "git handler parsed");
        Some(action)
    }
}

fn parse_git(text: &str) -> Option<Action> {
    if INIT_RE.is_match(text) {
        return Some(Action::GitInit);
    }
    if STATUS_RE.is_match(text) {
        return Some(Action::GitStatus);
    }
    if let Some(c) = COMMIT_RE.captures(text) {
        let message = c
            .get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().to_string())
            .or_else(|| first_quoted(text))
            .or_else(|| c.get(3).map(|m| m.as_str().trim().to_string()))?;
        if message.is_empty() {
            return None;
        }
        return Some(Action::GitCommit { message });
    }
    if let Some(c) = CHECKOUT_RE.captures(text) {
        return Some(Action::GitCheckout {
            branch: clean_token(&c[2]),
            create_new: c.get(1).is_some(),
        });
    }
    if let Some(c) = BRANCH_RE.captures(text) {
        return Some(Action::GitBranch { name: clean_token(&c[1]) });
    }
    if let Some(c) = MERGE_RE.captures(text) {
        return Some(Action::GitMerge { branch: clean_token(&c[1]) });
    }
    if let Some(c) = PUSH_RE.captures(text) {
        let (remote, branch) = remote_and_branch(c.get(2), c.get(3));
        return Some(Action::GitPush { remote, branch, set_upstream: c.get(1).is_some() });
    }
    if let Some(c) = PULL_RE.captures(text) {
        let (remote, branch) = remote_and_branch(c.get(1), c.get(2));
        return Some(Action::GitPull { remote, branch });
    }
    if let Some(c) = REMOTE_RE.captures(text) {
        return Some(Action::GitRemoteAdd { name: clean_token(&c[1]), url: clean_token(&c[2]) });
    }
    if let Some(c) = ADD_RE.captures(text) {
        let paths = c[1]
            .split([' ', ','])
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("and"))
            .map(pathspec)
            .collect::<Vec<_>>();
        return (!paths.is_empty()).then_some(Action::GitAdd { paths });
    }
    if GRAPH_RE.is_match(text) {
        return Some(Action::ShowGraph);
    }
    None
}

/// Whole-tree spellings collapse to `.`
fn pathspec(token: &str) -> String {
    match token.to_ascii_lowercase().as_str() {
        "." | "all" | "-a" | "--all" | "everything" => ".".to_string(),
        _ => clean_token(token),
    }
}

/// `push origin main` / `push main` / `push`
fn remote_and_branch(
    first: Option<regex::Match<'_>>,
    second: Option<regex::Match<'_>>,
) -> (Option<String>, Option<String>) {
    match (first, second) {
        (Some(r), Some(b)) => (Some(clean_token(r.as_str())), Some(clean_token(b.as_str()))),
        (Some(one), None) if one.as_str() == "origin" || one.as_str() == "upstream" => {
            (Some(one.as_str().to_string()), None)
        }
        (Some(b), None) => (None, Some(clean_token(b.as_str()))),
        _ => (None, None),
    }
}
