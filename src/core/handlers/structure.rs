//! Text-pattern and code-structure edits (imports, functions, classes,
//! decorators, markers). Pattern level only; no parsing of the target language.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::debug;

use super::payload::{clean_token, inline_payload, mentioned_path, quoted_strings, strip_target_clause, unquote};
use super::{Handler, HandlerPriority, KEYWORD_MATCH, PATTERN_MATCH, Vocabulary};
use crate::core::action::{Action, ActionFamily, BodyPosition};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::literal;

static NUMBERED_REF_RE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)\blines?\s+\d+"));

static DECORATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\badd\s+(?:a\s+|the\s+)?decorator\s+(@?[\w.]+(?:\([^)]*\))?)\s+(?:to|on|above)\s+(?:the\s+)?(?:function\s+|method\s+|class\s+|def\s+)?(\w+)",
    )
});

static DECORATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)\bdecorate\s+(?:the\s+)?(?:function\s+|method\s+|class\s+)?(\w+)\s+with\s+(@?[\w.]+(?:\([^)]*\))?)",
    )
});

static DELETE_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?i)\b(?:delete|remove|drop)\s+(?:the\s+)?(?:function|method|def)\s+(\w+)")
});

static INTO_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:insert|add|put|write|place|append)\b(.*?)\b(?:into|to|inside|in)\s+(?:the\s+)?(function|method|def|class)\s+(\w+)(?:\s+(?:at\s+)?(?:the\s+)?(top|start|beginning|bottom|end))?(.*)$",
    )
});

static EDGE_OF_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:insert|add|put|write|place)\b(.*?)\bat\s+(?:the\s+)?(top|start|beginning|bottom|end)\s+of\s+(?:the\s+)?(function|method|def|class)\s+(\w+)(.*)$",
    )
});

static AFTER_IMPORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:insert|add|put|write|place)\b(.*?)\bafter\s+(?:the\s+)?(?:imports?|import\s+(?:block|section))\b(.*)$",
    )
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)^\s*(?:add\s+(?:an?\s+)?)?import\s+(?:for\s+)?([A-Za-z_][\w.]*)(?:\s+from\s+([A-Za-z_][\w.]*))?(?:\s+(?:in|into|to)\s+(\S+))?\s*$",
    )
});

static FROM_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?i)^\s*(?:add\s+)?from\s+([A-Za-z_][\w.]*)\s+import\s+([A-Za-z_]\w*)(?:\s+(?:in|into|to)\s+(\S+))?\s*$",
    )
});

static REPLACE_PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?is)\b(?:replace|substitute)\s+(?:all\s+)?(?:matches\s+of\s+)?(?:the\s+)?(?:pattern|regex|regexp)\s+(.+?)\s+with\s+(.+)$")
});

static DELETE_MATCHING_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:delete|remove)\s+(?:all\s+)?(?:the\s+)?lines?\s+(matching|that\s+match|containing|with)\s+(?:the\s+)?(?:pattern\s+|regex\s+|text\s+)?(.+?)\s*$",
    )
});

static DELETE_PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r"(?is)\b(?:delete|remove)\s+(?:all\s+)?(?:the\s+)?(?:pattern|regex|regexp)\s+(.+?)\s*$")
});

static BETWEEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)\b(?:remove|delete)\s+(?:everything\s+|(?:all\s+)?(?:the\s+)?(?:lines|text|content)\s+)?between\s+(?:the\s+)?(?:markers?\s+)?(.+?)\s+and\s+(.+?)(\s+(?:exclusive|excluding\s+(?:the\s+)?markers|keeping\s+(?:the\s+)?markers))?\s*$",
    )
});

static REPLACE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(
        r"(?is)^\s*(?:replace|change|swap|substitute)\s+(?:all\s+)?(?:(?:occurrences|instances)\s+of\s+)?(?:the\s+)?(?:text\s+|string\s+|word\s+)?(.+?)\s+(?:with|to|by)\s+(.+)$",
    )
});

static STRUCTURE_WORDS: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::new(&[
        "function", "method", "def", "class", "decorator", "decorate", "import", "imports",
        "marker", "markers", "between", "pattern", "regex", "regexp", "matching", "containing",
        "replace", "substitute",
    ])
});

pub struct StructureHandler;

impl Handler for StructureHandler {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn family(&self) -> ActionFamily {
        ActionFamily::Structure
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
        // Numbered lines belong to the line handler
        if NUMBERED_REF_RE.is_match(text) || !STRUCTURE_WORDS.any_in(text) {
            return 0.0;
        }
        let pattern = [
            &*DECORATOR_RE,
            &*DECORATE_RE,
            &*DELETE_FUNCTION_RE,
            &*INTO_BODY_RE,
            &*EDGE_OF_BODY_RE,
            &*AFTER_IMPORTS_RE,
            &*IMPORT_RE,
            &*FROM_IMPORT_RE,
            &*REPLACE_PATTERN_RE,
            &*DELETE_MATCHING_RE,
            &*DELETE_PATTERN_RE,
            &*BETWEEN_RE,
        ]
        .iter()
        .any(|re| re.is_match(text))
            || replace_text_pair(text, mentioned_path(text).as_deref()).is_some();
        if pattern { PATTERN_MATCH } else { KEYWORD_MATCH }
    }

    fn parse(
        &self,
        utterance: &NormalizedUtterance,
        _ctx: &ActiveContext,
    ) -> Option<Action> {
        let action = parse_structure(utterance)?;
        debug!(kind = action.kind(), "structure handler parsed");
        Some(action)
    }
}

fn parse_structure(u: &NormalizedUtterance) -> Option<Action> {
    let text = u.as_str();

    if let Some(c) = IMPORT_RE.captures(text) {
        let path = c.get(3).map(|m| Utf8PathBuf::from(clean_token(m.as_str())));
        let symbol = c[1].to_string();
        let module = c.get(2).map(|m| m.as_str().to_string());
        return Some(Action::AutoImport { path, symbol, module });
    }
    if let Some(c) = FROM_IMPORT_RE.captures(text) {
        let path = c.get(3).map(|m| Utf8PathBuf::from(clean_token(m.as_str())));
        return Some(Action::AutoImport {
            path,
            symbol: c[2].to_string(),
            module: Some(c[1].to_string()),
        });
    }

    let path = mentioned_path(text);

    if let Some(c) = DECORATOR_RE.captures(text) {
        return Some(Action::AddDecorator {
            path,
            name: c[2].to_string(),
            decorator: c[1].to_string(),
        });
    }
    if let Some(c) = DECORATE_RE.captures(text) {
        return Some(Action::AddDecorator {
            path,
            name: c[1].to_string(),
            decorator: c[2].to_string(),
        });
    }
    if let Some(c) = DELETE_FUNCTION_RE.captures(text) {
        return Some(Action::DeleteFunction { path, function: c[1].to_string() });
    }
    if let Some(c) = BETWEEN_RE.captures(text) {
        let end = unquote(strip_target_clause(&c[2], path.as_deref())).to_string();
        return Some(Action::RemoveBetweenMarkers {
            path,
            start: unquote(&c[1]).to_string(),
            end,
            inclusive: c.get(3).is_none(),
        });
    }
    if let Some(c) = EDGE_OF_BODY_RE.captures(text) {
        let text = inline_payload(u, &c[1], &c[5])?;
        return Some(body_insert(path, &c[3], c[4].to_string(), text, position(Some(&c[2]))));
    }
    if let Some(c) = INTO_BODY_RE.captures(text) {
        let text = inline_payload(u, &c[1], &c[5])?;
        let pos = position(c.get(4).map(|m| m.as_str()));
        return Some(body_insert(path, &c[2], c[3].to_string(), text, pos));
    }
    if let Some(c) = AFTER_IMPORTS_RE.captures(text) {
        let text = inline_payload(u, &c[1], &c[2])?;
        return Some(Action::InsertAfterImports { path, text });
    }
    if let Some(c) = REPLACE_PATTERN_RE.captures(text) {
        let (pattern, replacement) = match quoted_strings(text).as_slice() {
            [p, r, ..] => (p.clone(), r.clone()),
            _ => (
                unquote(&c[1]).to_string(),
                unquote(strip_target_clause(&c[2], path.as_deref())).to_string(),
            ),
        };
        return Some(Action::ReplacePattern { path, pattern, replacement });
    }
    if let Some(c) = DELETE_MATCHING_RE.captures(text) {
        let raw = unquote(strip_target_clause(&c[2], path.as_deref())).to_string();
        let literal_text = matches!(c[1].to_ascii_lowercase().as_str(), "containing" | "with");
        let pattern = if literal_text { regex::escape(&raw) } else { raw };
        return Some(Action::DeletePattern { path, pattern });
    }
    if let Some(c) = DELETE_PATTERN_RE.captures(text) {
        let pattern = unquote(strip_target_clause(&c[1], path.as_deref())).to_string();
        return Some(Action::DeletePattern { path, pattern });
    }
    if let Some((find, replace)) = replace_text_pair(text, path.as_deref()) {
        return Some(Action::ReplaceText { path, find, replace });
    }
    None
}

/// `replace 'a' with 'b'`; both sides quoted, or a single bare word each
fn replace_text_pair(
    text: &str,
    target: Option<&Utf8Path>,
) -> Option<(String, String)> {
    let c = REPLACE_TEXT_RE.captures(text)?;
    if let [find, replace, ..] = quoted_strings(text).as_slice() {
        return Some((find.clone(), replace.clone()));
    }
    let find = c[1].trim();
    let replace = unquote(strip_target_clause(&c[2], target));
    let bare = |s: &str| !s.is_empty() && !s.chars().any(char::is_whitespace);
    (bare(find) && bare(replace)).then(|| (find.to_string(), replace.to_string()))
}

fn position(word: Option<&str>) -> BodyPosition {
    match word.map(str::to_ascii_lowercase).as_deref() {
        Some("top" | "start" | "beginning") => BodyPosition::Top,
        _ => BodyPosition::Bottom,
    }
}

fn body_insert(
    path: Option<Utf8PathBuf>,
    kind: &str,
    name: String,
    text: String,
    position: BodyPosition,
) -> Action {
    if kind.eq_ignore_ascii_case("class") {
        Action::InsertIntoClass { path, class: name, text, position }
    } else {
        Action::InsertIntoFunction { path, function: name, text, position }
    }
}
