//! Immutable line buffer with structural sharing
//!
//! Line endings are normalized exactly once, in [`Buffer::from_text`]; every
//! edit afterwards works on bare LF-free lines. Edits build a new `Buffer`
//! that shares untouched lines (`Arc<str>`) with its predecessor.

use std::sync::Arc;

use serde::Serialize;

/// Content ID for change detection (xxh64 hash)
pub type ContentId = String;

/// Deterministic content ID using xxh64 with a fixed seed
pub fn content_id(content: &str) -> ContentId {
    let h = xxhash_rust::xxh64::xxh64(content.as_bytes(), 0);
    format!("{:016x}", h)
}

/// Line-ending style detected at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Style of the first line break; LF when there is none
    pub fn detect(s: &str) -> Self {
        let bytes = s.as_bytes();
        match memchr::memchr2(b'\r', b'\n', bytes) {
            Some(i) if bytes[i] == b'\n' => Self::Lf,
            Some(i) if bytes.get(i + 1) == Some(&b'\n') => Self::Crlf,
            Some(_) => Self::Cr,
            None => Self::Lf,
        }
    }
}

/// Ordered lines plus load-time formatting and a dirty flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    lines: Vec<Arc<str>>,
    line_ending: LineEnding,
    trailing_newline: bool,
    dirty: bool,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl Buffer {
    /// Load text, normalizing CRLF and CR to LF
    pub fn from_text(text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        let normalized = if text.contains('\r') {
            text.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            text.to_string()
        };

        let trailing_newline = normalized.is_empty() || normalized.ends_with('\n');
        let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
        let lines = if normalized.is_empty() {
            Vec::new()
        } else {
            body.split('\n').map(Arc::from).collect()
        };

        Self { lines, line_ending, trailing_newline, dirty: false }
    }

    /// Buffer from already split lines (LF style, trailing newline)
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            lines: lines.into_iter().map(|l| Arc::from(l.as_ref())).collect(),
            line_ending: LineEnding::Lf,
            trailing_newline: true,
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by 1-based number
    pub fn line(
        &self,
        number: usize,
    ) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(|l| l.as_ref())
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_ref())
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset the dirty flag after the caller persisted the buffer
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Render with LF line endings
    pub fn to_text(&self) -> String {
        self.render("\n")
    }

    /// Render with the line-ending style seen at load time
    pub fn render_with_original_endings(&self) -> String {
        self.render(self.line_ending.as_str())
    }

    pub fn content_id(&self) -> ContentId {
        content_id(&self.to_text())
    }

    fn render(
        &self,
        nl: &str,
    ) -> String {
        let mut out = self.lines.join(nl);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(nl);
        }
        out
    }

    pub(crate) fn shared_lines(&self) -> &[Arc<str>] {
        &self.lines
    }

    /// Successor buffer: same formatting, new lines, dirty
    pub(crate) fn with_lines(
        &self,
        lines: Vec<Arc<str>>,
    ) -> Self {
        Self {
            lines,
            line_ending: self.line_ending,
            trailing_newline: self.trailing_newline,
            dirty: true,
        }
    }
}
