//! Active context: the single piece of cross-call state
//!
//! Records which file is currently open so handlers and the resolver can
//! fill omitted targets. The interpreter only reads it; the surrounding
//! session mutates it on open/close/save.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContext {
    pub path: Option<Utf8PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ActiveContext {
    /// Context with nothing open
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pointing at a file whose content is not loaded
    pub fn with_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: Some(path.into()), content: None }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn open(&mut self, path: impl Into<Utf8PathBuf>, content: Option<String>) {
        self.path = Some(path.into());
        self.content = content;
    }

    pub fn close(&mut self) {
        self.path = None;
        self.content = None;
    }

    pub fn is_open(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Line count of the loaded content, when known
    pub fn line_count(&self) -> Option<usize> {
        self.content.as_deref().map(|c| {
            if c.is_empty() {
                0
            } else {
                c.lines().count()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_cycle() {
        let mut ctx = ActiveContext::new();
        assert!(!ctx.is_open());

        ctx.open("src/app.py", Some("a\nb\n".into()));
        assert_eq!(ctx.path(), Some(Utf8Path::new("src/app.py")));
        assert_eq!(ctx.line_count(), Some(2));

        ctx.close();
        assert!(!ctx.is_open());
        assert_eq!(ctx.line_count(), None);
    }

    #[test]
    fn test_line_count_edge_cases() {
        assert_eq!(ActiveContext::with_path("a").with_content("").line_count(), Some(0));
        assert_eq!(ActiveContext::with_path("a").with_content("x").line_count(), Some(1));
        assert_eq!(ActiveContext::with_path("a").line_count(), None);
    }
}
