//! Remote repository host operations (repositories, issues, pull requests)

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::payload::{clean_token, first_quoted, unquote};
use super::{HOST_WORDS, Handler, HandlerPriority, KEYWORD_MATCH, PATTERN_MATCH};
use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::literal;

static REPO_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\b(?:create|make|new)\s+(?:a\s+)?(?:new\s+)?(?:(private|public)\s+)?(?:github\s+)?(?:repo|repository)\s+(?:called\s+|named\s+)?(\S+)(?:\s+(?:as\s+)?(private|public))?\s*$",
    )
});

static ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:create|open|file|submit|new|raise)\s+(?:a\s+|an\s+)?(?:new\s+)?(?:github\s+)?issue\b\s*(?:titled\s+|called\s+|named\s+|:\s*)?(.*)$",
    )
});

static PR_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:create|open|file|submit|make|new|raise)\s+(?:a\s+)?(?:new\s+)?(?:github\s+)?(?:pr|pull\s+request)\b\s*(?:titled\s+|called\s+|named\s+|:\s*)?(.*)$",
    )
});

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?is)\s*\b(?:with\s+(?:the\s+|a\s+)?(?:body|description)|(?:body|description)\s*[:=])\s*[:=]?\s*(.*)$"));

static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)\s*\b(?:from\s+(?:branch\s+)?|head\s+)(\S+)"));

static BASE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)\s*\b(?:(?:into|onto)\s+(?:branch\s+)?|base\s+)(\S+)"));

pub struct HostHandler;

impl Handler for HostHandler {
    fn name(&self) -> &'static str {
        "host"
    }

    fn family(&self) -> ActionFamily {
        ActionFamily::Host
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
        if !HOST_WORDS.any_in(text) {
            return 0.0;
        }
        if REPO_RE.is_match(text) || ISSUE_RE.is_match(text) || PR_RE.is_match(text) {
            PATTERN_MATCH
        } else if utterance.lower().contains("github") {
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
        let text = utterance.as_str();
        let action = if let Some(c) = REPO_RE.captures(text) {
            let visibility = c.get(1).or_else(|| c.get(3)).map(|m| m.as_str().to_ascii_lowercase());
            Action::HostCreateRepo {
                name: clean_token(&c[2]),
                private: visibility.as_deref() == Some("private"),
            }
        } else if let Some(c) = PR_RE.captures(text) {
            let (rest, body) = split_body(&c[1]);
            let head = HEAD_RE.captures(rest).map(|h| clean_token(&h[1]));
            let base = BASE_RE.captures(rest).map(|b| clean_token(&b[1]));
            let title_part = [HEAD_RE.find(rest), BASE_RE.find(rest)]
                .into_iter()
                .flatten()
                .map(|m| m.start())
                .min()
                .map_or(rest, |cut| &rest[..cut]);
            Action::HostCreatePr { title: title(title_part)?, body, head, base }
        } else if let Some(c) = ISSUE_RE.captures(text) {
            let (rest, body) = split_body(&c[1]);
            Action::HostCreateIssue { title: title(rest)?, body }
        } else {
            return None;
        };

        debug!(kind = action.kind(), "host handler parsed");
        Some(action)
    }
}

/// Separate a trailing `with body ...` clause
fn split_body(rest: &str) -> (&str, Option<String>) {
    match BODY_RE.captures(rest) {
        Some(c) => {
            let cut = c.get(0).map_or(rest.len(), |m| m.start());
            let body = unquote(&c[1]).to_string();
            (&rest[..cut], (!body.is_empty()).then_some(body))
        }
        None => (rest, None),
    }
}

fn title(segment: &str) -> Option<String> {
    let t = first_quoted(segment).unwrap_or_else(|| unquote(segment).to_string());
    let t = t.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{Utterance, normalize};

    fn parse(text: &str) -> Option<Action> {
        HostHandler
            .evaluate(&normalize(&Utterance::new(text)), &ActiveContext::new())
            .into_action()
    }

    #[test]
    fn test_create_repo_visibility() {
        assert_eq!(
            parse("create github repo gitvision private"),
            Some(Action::HostCreateRepo { name: "gitvision".into(), private: true })
        );
        assert_eq!(
            parse("make repository tools"),
            Some(Action::HostCreateRepo { name: "tools".into(), private: false })
        );
    }

    #[test]
    fn test_issue_title_and_body() {
        assert_eq!(
            parse("create issue 'Login fails' with body 'steps to reproduce'"),
            Some(Action::HostCreateIssue {
                title: "Login fails".into(),
                body: Some("steps to reproduce".into())
            })
        );
        assert_eq!(
            parse("open an issue crash on start"),
            Some(Action::HostCreateIssue { title: "crash on start".into(), body: None })
        );
    }

    #[test]
    fn test_pull_request_branches() {
        assert_eq!(
            parse("create github pr 'Add parser' from feature into main"),
            Some(Action::HostCreatePr {
                title: "Add parser".into(),
                body: None,
                head: Some("feature".into()),
                base: Some("main".into())
            })
        );
    }

    #[test]
    fn test_issue_without_title_yields_nothing() {
        assert_eq!(parse("create issue"), None);
    }
}
