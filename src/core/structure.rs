//! Pattern-level code structure: import sections, definitions and bodies
//!
//! Two body styles are recognized:
//! - indentation bodies (`def name(...):` / `class Name:`)
//! - brace bodies (`function name(...) {` / `fn name() {` / `class Name {`)
//!
//! Nothing here understands the language beyond line shapes; names are
//! matched literally and ambiguity is reported, never guessed.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::core::action::BodyPosition;
use crate::core::edit::EditError;
use crate::infra::re::literal;

type Lines = Vec<Arc<str>>;

static IMPORT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    literal(r#"^\s*(?:import\s+\S|from\s+\S+\s+import\b|use\s+\S.*;\s*$|(?:const|let|var)\s+.*=\s*require\()"#)
});

static HEADER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| literal(r"^(?:#!|#.*coding[:=]|//!|/\*!)"));

/// Kind of named definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Function,
    Class,
}

impl DefKind {
    fn label(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
        }
    }

    fn pattern(
        self,
        name: &str,
    ) -> Result<Regex, EditError> {
        let name = regex::escape(name);
        let src = match self {
            Self::Function => format!(
                r"^\s*(?:(?:export\s+)?(?:default\s+)?(?:async\s+)?(?:def|function)\s+{name}\s*[(<]|(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+{name}\s*[(<])"
            ),
            Self::Class => format!(
                r"^\s*(?:(?:export\s+)?(?:default\s+)?class\s+{name}\b|(?:pub(?:\([^)]*\))?\s+)?(?:struct|impl|trait)\s+{name}\b)"
            ),
        };
        Regex::new(&src).map_err(|e| EditError::MalformedPayload(e.to_string()))
    }
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Index where new imports go: after the leading import block, or after
/// shebang/encoding headers when there are no imports
pub fn import_insertion_index(lines: &[Arc<str>]) -> usize {
    let mut i = 0;
    while i < lines.len() && HEADER_LINE_RE.is_match(&lines[i]) {
        i += 1;
    }
    let header_end = i;

    let mut last_import: Option<usize> = None;
    while i < lines.len() {
        let line = &lines[i];
        if IMPORT_LINE_RE.is_match(line) {
            // Parenthesized multi-line import
            if line.contains('(') && !line.contains(')') {
                while i + 1 < lines.len() && !lines[i].contains(')') {
                    i += 1;
                }
            }
            last_import = Some(i + 1);
        } else if !(is_blank(line) || line.trim_start().starts_with('#')) {
            break;
        }
        i += 1;
    }
    last_import.unwrap_or(header_end)
}

pub fn insert_after_imports(
    lines: &[Arc<str>],
    block: Lines,
) -> (Lines, usize) {
    let at = import_insertion_index(lines);
    (splice(lines, at, at, block), at)
}

/// The statement `AutoImport` writes
pub fn import_statement(
    symbol: &str,
    module: Option<&str>,
) -> String {
    match module.filter(|m| *m != symbol) {
        Some(m) => format!("from {m} import {symbol}"),
        None => format!("import {symbol}"),
    }
}

pub fn auto_import(
    lines: &[Arc<str>],
    symbol: &str,
    module: Option<&str>,
) -> Result<(Lines, String), EditError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(EditError::MalformedPayload("empty import symbol".into()));
    }
    let statement = import_statement(symbol, module);
    if already_imported(lines, symbol, module) {
        return Err(EditError::MalformedPayload(format!("`{statement}` is already present")));
    }
    let at = import_insertion_index(lines);
    Ok((splice(lines, at, at, vec![Arc::from(statement.as_str())]), statement))
}

fn already_imported(
    lines: &[Arc<str>],
    symbol: &str,
    module: Option<&str>,
) -> bool {
    let module = module.filter(|m| *m != symbol);
    lines.iter().map(|l| l.trim()).any(|l| match module {
        Some(m) => l
            .strip_prefix("from ")
            .and_then(|rest| rest.strip_prefix(m))
            .and_then(|rest| rest.trim_start().strip_prefix("import "))
            .is_some_and(|names| {
                names
                    .split(',')
                    .map(|n| n.trim().trim_matches(|c| c == '(' || c == ')'))
                    .any(|n| n == symbol || n.starts_with(&format!("{symbol} as ")))
            }),
        None => l
            .strip_prefix("import ")
            .is_some_and(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .any(|n| n == symbol || n.starts_with(&format!("{symbol} as ")))
            }),
    })
}

/// Unique definition line for `name`
pub fn find_definition(
    lines: &[Arc<str>],
    kind: DefKind,
    name: &str,
) -> Result<usize, EditError> {
    let re = kind.pattern(name)?;
    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| re.is_match(l))
        .map(|(i, _)| i)
        .collect();
    match hits.as_slice() {
        [] => Err(EditError::NoMatch(format!("{} `{name}` not found", kind.label()))),
        [one] => Ok(*one),
        many => Err(EditError::MalformedPayload(format!(
            "{} `{name}` is defined {} times",
            kind.label(),
            many.len()
        ))),
    }
}

/// Body extent of the definition starting at `def`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Body {
    /// First body line
    start: usize,
    /// One past the last body line (for braces: the closing-brace line)
    end: usize,
    indent: String,
    braced: bool,
}

fn body_of(
    lines: &[Arc<str>],
    def: usize,
) -> Body {
    let def_indent = indent_of(&lines[def]).to_string();

    // Header may wrap: scan to the line that opens the body
    let mut header_end = def;
    let mut braced = false;
    for (i, line) in lines.iter().enumerate().skip(def) {
        let code = line.split('#').next().unwrap_or("").trim_end();
        if line.contains('{') {
            braced = true;
            header_end = i;
            break;
        }
        if code.ends_with(':') {
            header_end = i;
            break;
        }
        if i > def + 8 {
            break;
        }
    }

    let (start, end) = if braced {
        let mut depth = 0i64;
        let mut close = lines.len();
        'scan: for (i, line) in lines.iter().enumerate().skip(header_end) {
            for ch in line.chars() {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            close = i;
                            break 'scan;
                        }
                    }
                    _ => {}
                }
            }
        }
        // Single-line `fn f() { x }`: body is empty and sits before the close
        (header_end + 1, close.max(header_end + 1).min(lines.len()))
    } else {
        let mut last = header_end;
        for (i, line) in lines.iter().enumerate().skip(header_end + 1) {
            if is_blank(line) {
                continue;
            }
            if indent_of(line).len() <= def_indent.len() {
                break;
            }
            last = i;
        }
        (header_end + 1, last + 1)
    };

    let indent = lines[start.min(lines.len())..end]
        .iter()
        .find(|l| !is_blank(l))
        .map(|l| indent_of(l).to_string())
        .unwrap_or_else(|| format!("{def_indent}    "));

    Body { start, end, indent, braced }
}

/// Skip a leading docstring in an indentation body
fn after_docstring(
    lines: &[Arc<str>],
    body: &Body,
) -> usize {
    let Some(first) = (body.start..body.end).find(|&i| !is_blank(&lines[i])) else {
        return body.start;
    };
    let trimmed = lines[first].trim_start();
    let Some(quote) = ["\"\"\"", "'''"].into_iter().find(|q| trimmed.starts_with(q)) else {
        return body.start;
    };
    if trimmed.len() >= 6 && trimmed[3..].contains(quote) {
        return first + 1;
    }
    (first + 1..body.end)
        .find(|&i| lines[i].contains(quote))
        .map_or(first + 1, |i| i + 1)
}

fn indent_block(
    text: &str,
    indent: &str,
) -> Lines {
    text.split('\n')
        .map(|l| {
            if l.trim().is_empty() {
                Arc::from("")
            } else {
                Arc::from(format!("{indent}{l}").as_str())
            }
        })
        .collect()
}

/// Insert `text` at the top or bottom of a function/class body
pub fn insert_into_body(
    lines: &[Arc<str>],
    kind: DefKind,
    name: &str,
    text: &str,
    position: BodyPosition,
) -> Result<(Lines, usize), EditError> {
    let def = find_definition(lines, kind, name)?;
    let body = body_of(lines, def);
    let at = match position {
        BodyPosition::Top if body.braced => body.start,
        BodyPosition::Top => after_docstring(lines, &body),
        BodyPosition::Bottom => body.end,
    };
    Ok((splice(lines, at, at, indent_block(text, &body.indent)), at + 1))
}

/// Definition for a decorator target: functions first, then classes
fn find_any_definition(
    lines: &[Arc<str>],
    name: &str,
) -> Result<usize, EditError> {
    match find_definition(lines, DefKind::Function, name) {
        Err(EditError::NoMatch(_)) => find_definition(lines, DefKind::Class, name),
        other => other,
    }
}

/// First line of the decorator stack directly above `def`
fn decorator_stack_start(
    lines: &[Arc<str>],
    def: usize,
) -> usize {
    let mut top = def;
    while top > 0 && lines[top - 1].trim_start().starts_with('@') {
        top -= 1;
    }
    top
}

pub fn add_decorator(
    lines: &[Arc<str>],
    name: &str,
    decorator: &str,
) -> Result<(Lines, String), EditError> {
    let decorator = decorator.trim();
    if decorator.trim_start_matches('@').is_empty() {
        return Err(EditError::MalformedPayload("empty decorator".into()));
    }
    let decorator = if decorator.starts_with('@') {
        decorator.to_string()
    } else {
        format!("@{decorator}")
    };

    let def = find_any_definition(lines, name)?;
    let top = decorator_stack_start(lines, def);
    if lines[top..def].iter().any(|l| l.trim() == decorator) {
        return Err(EditError::MalformedPayload(format!("`{decorator}` already decorates `{name}`")));
    }

    let line = format!("{}{decorator}", indent_of(&lines[def]));
    Ok((splice(lines, top, top, vec![Arc::from(line.as_str())]), decorator))
}

/// Remove a function with its decorators, up to the next definition at the
/// same or lower indent (or EOF)
pub fn delete_function(
    lines: &[Arc<str>],
    name: &str,
) -> Result<(Lines, usize, usize), EditError> {
    let def = find_definition(lines, DefKind::Function, name)?;
    let start = decorator_stack_start(lines, def);
    let def_indent = indent_of(&lines[def]).len();
    let body = body_of(lines, def);

    let mut end = if body.braced { (body.end + 1).min(lines.len()) } else { body.end };
    while end < lines.len() && is_blank(&lines[end]) {
        end += 1;
    }
    // Keep blank separators that belong to a following sibling at lower indent
    if end < lines.len() && indent_of(&lines[end]).len() > def_indent {
        end = body.end;
    }
    Ok((splice(lines, start, end, Vec::new()), start + 1, end))
}

/// Remove from the first line containing `start` through the next line
/// containing `end`
pub fn remove_between_markers(
    lines: &[Arc<str>],
    start: &str,
    end: &str,
    inclusive: bool,
) -> Result<(Lines, usize), EditError> {
    if start.is_empty() || end.is_empty() {
        return Err(EditError::MalformedPayload("markers must not be empty".into()));
    }
    let s = lines
        .iter()
        .position(|l| l.contains(start))
        .ok_or_else(|| EditError::NoMatch(format!("start marker `{start}` not found")))?;
    let e = lines
        .iter()
        .enumerate()
        .skip(s + 1)
        .find(|(_, l)| l.contains(end))
        .map(|(i, _)| i)
        .ok_or_else(|| EditError::NoMatch(format!("end marker `{end}` not found after line {}", s + 1)))?;

    let (from, to) = if inclusive { (s, e + 1) } else { (s + 1, e) };
    Ok((splice(lines, from, to, Vec::new()), to - from))
}

/// Replace `lines[start..end]` with `insert`, sharing everything else
pub fn splice(
    lines: &[Arc<str>],
    start: usize,
    end: usize,
    insert: Lines,
) -> Lines {
    let mut out = Vec::with_capacity(lines.len() - (end - start) + insert.len());
    out.extend_from_slice(&lines[..start]);
    out.extend(insert);
    out.extend_from_slice(&lines[end..]);
    out
}
