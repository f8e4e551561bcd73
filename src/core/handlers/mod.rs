//! Handler set: independent matchers, one per operation family
//!
//! Each handler probes a normalized utterance cheaply (`score`) and, when
//! confident, extracts a fully populated [`Action`] (`parse`). The registry
//! keeps handlers in a stable total order: priority (descending), then
//! registration index. The resolver relies on that order for tie-breaks.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use serde::Serialize;

use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::normalize::NormalizedUtterance;
use crate::infra::re::word_automaton;

pub mod file;
pub mod folder;
pub mod host;
pub mod line;
pub mod payload;
pub mod structure;
pub mod vcs;

pub use file::FileHandler;
pub use folder::FolderHandler;
pub use host::HostHandler;
pub use line::LineHandler;
pub use structure::StructureHandler;
pub use vcs::GitHandler;

/// Score for a full pattern match
pub const PATTERN_MATCH: f32 = 0.95;
/// Score for a keyword-only match
pub const KEYWORD_MATCH: f32 = 0.9;

/// Explicit handler priority; higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HandlerPriority {
    Fallback = 0,
    Low = 25,
    Normal = 50,
    High = 75,
    Critical = 100,
}

impl HandlerPriority {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Outcome of evaluating one handler
///
/// Invariant: a zero confidence never carries an action, and an absent
/// action always reports zero confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    confidence: f32,
    action: Option<Action>,
}

impl HandlerResult {
    pub fn new(confidence: f32, action: Option<Action>) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        match action {
            Some(action) if confidence > 0.0 => Self { confidence, action: Some(action) },
            _ => Self::none(),
        }
    }

    pub fn none() -> Self {
        Self { confidence: 0.0, action: None }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn into_action(self) -> Option<Action> {
        self.action
    }
}

/// Capability interface every matcher implements
pub trait Handler: Send + Sync {
    /// Stable name used in config and logs
    fn name(&self) -> &'static str;

    /// Operation family this handler owns
    fn family(&self) -> ActionFamily;

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::Normal
    }

    /// Side-effect-free probe; 0.0 means "not mine"
    fn score(
        &self,
        utterance: &NormalizedUtterance,
        ctx: &ActiveContext,
    ) -> f32;

    /// Deterministic extraction; `None` when a complete action cannot be built
    fn parse(
        &self,
        utterance: &NormalizedUtterance,
        ctx: &ActiveContext,
    ) -> Option<Action>;

    /// Score then parse, upholding the `HandlerResult` invariant
    fn evaluate(
        &self,
        utterance: &NormalizedUtterance,
        ctx: &ActiveContext,
    ) -> HandlerResult {
        let confidence = self.score(utterance, ctx);
        if confidence <= 0.0 {
            return HandlerResult::none();
        }
        HandlerResult::new(confidence, self.parse(utterance, ctx))
    }
}

struct Entry {
    handler: Box<dyn Handler>,
    index: usize,
}

/// Ordered handler collection
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
    next_index: usize,
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler, in canonical registration order
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FolderHandler));
        registry.register(Box::new(HostHandler));
        registry.register(Box::new(GitHandler));
        registry.register(Box::new(LineHandler));
        registry.register(Box::new(StructureHandler));
        registry.register(Box::new(FileHandler));
        registry
    }

    /// Add a handler; returns its registration index
    pub fn register(&mut self, handler: Box<dyn Handler>) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.entries.push(Entry { handler, index });

        // Stable: equal priorities keep registration order
        self.entries
            .sort_by(|a, b| b.handler.priority().cmp(&a.handler.priority()).then(a.index.cmp(&b.index)));
        index
    }

    /// Drop handlers by name; unknown names are ignored
    pub fn disable<S: AsRef<str>>(&mut self, names: &[S]) {
        self.entries
            .retain(|e| !names.iter().any(|n| n.as_ref() == e.handler.name()));
    }

    /// Handlers in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Handler> {
        self.entries.iter().map(|e| e.handler.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ---------------------------------------------------------------------------
// Shared vocabulary probing
// ---------------------------------------------------------------------------

/// Literal word list matched on word boundaries, case-insensitively
pub struct Vocabulary {
    automaton: AhoCorasick,
}

impl Vocabulary {
    pub fn new(words: &[&str]) -> Self {
        Self { automaton: word_automaton(words) }
    }

    /// True when any word occurs as a whole word
    pub fn any_in(&self, text: &str) -> bool {
        self.automaton
            .find_iter(text)
            .any(|m| is_word_bounded(text, m.start(), m.end()))
    }
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}

/// Words that mark an utterance as a line-level edit
pub static LINE_WORDS: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::new(&["line", "lines", "top", "bottom", "beginning", "end of file"])
});

/// Words that mark a folder operation
pub static FOLDER_WORDS: LazyLock<Vocabulary> =
    LazyLock::new(|| Vocabulary::new(&["folder", "folders", "directory", "directories", "dir", "mkdir", "rmdir"]));

/// Words that mark a remote-host operation
pub static HOST_WORDS: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::new(&["github", "repo", "repository", "issue", "pull request", "pr"])
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{Utterance, normalize};

    struct Fixed {
        name: &'static str,
        priority: HandlerPriority,
        score: f32,
    }

    impl Handler for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn family(&self) -> ActionFamily {
            ActionFamily::VersionControl
        }

        fn priority(&self) -> HandlerPriority {
            self.priority
        }

        fn score(&self, _: &NormalizedUtterance, _: &ActiveContext) -> f32 {
            self.score
        }

        fn parse(&self, _: &NormalizedUtterance, _: &ActiveContext) -> Option<Action> {
            Some(Action::GitStatus)
        }
    }

    #[test]
    fn test_registry_orders_by_priority_then_index() {
        let mut reg = HandlerRegistry::new();
        reg.register(Box::new(Fixed { name: "low", priority: HandlerPriority::Low, score: 1.0 }));
        reg.register(Box::new(Fixed { name: "n1", priority: HandlerPriority::Normal, score: 1.0 }));
        reg.register(Box::new(Fixed { name: "crit", priority: HandlerPriority::Critical, score: 1.0 }));
        reg.register(Box::new(Fixed { name: "n2", priority: HandlerPriority::Normal, score: 1.0 }));
        assert_eq!(reg.names(), vec!["crit", "n1", "n2", "low"]);

        reg.disable(&["n1"]);
        assert_eq!(reg.names(), vec!["crit", "n2", "low"]);
    }

    #[test]
    fn test_default_registry_order() {
        let reg = HandlerRegistry::with_defaults();
        assert_eq!(reg.names(), vec!["folder", "host", "git", "line", "structure", "file"]);
    }

    #[test]
    fn test_handler_result_invariant() {
        assert_eq!(HandlerResult::new(0.0, Some(Action::GitInit)), HandlerResult::none());
        assert_eq!(HandlerResult::new(0.8, None).confidence(), 0.0);
        assert_eq!(HandlerResult::new(f32::NAN, Some(Action::GitInit)).action(), None);
        assert_eq!(HandlerResult::new(1.7, Some(Action::GitInit)).confidence(), 1.0);
    }

    #[test]
    fn test_evaluate_skips_parse_on_zero_score() {
        let h = Fixed { name: "zero", priority: HandlerPriority::Normal, score: 0.0 };
        let u = normalize(&Utterance::new("anything"));
        assert_eq!(h.evaluate(&u, &ActiveContext::new()), HandlerResult::none());
    }

    #[test]
    fn test_vocabulary_word_boundaries() {
        assert!(LINE_WORDS.any_in("remove line 5"));
        assert!(!LINE_WORDS.any_in("pipeline stage"));
        assert!(FOLDER_WORDS.any_in("make Directory src"));
        assert!(!FOLDER_WORDS.any_in("direct"));
        assert!(HOST_WORDS.any_in("open a PR"));
        assert!(!HOST_WORDS.any_in("print it"));
    }
}
