//! Resolver: drives the handler set and binds omitted targets
//!
//! Resolution pipeline:
//! 1. Normalize the utterance
//! 2. Evaluate handlers in registry order, keeping the best candidate
//!    (highest confidence; earlier registration wins exact ties)
//! 3. Bind an empty target slot from the active context
//! 4. Report `NoMatch` / `MissingTarget` / `Ambiguous` as plain data
//!
//! The resolver never asks questions; every outcome is a typed value.

use indexmap::IndexSet;
use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::action::{Action, ActionFamily};
use crate::core::context::ActiveContext;
use crate::core::handlers::{HandlerPriority, HandlerRegistry};
use crate::core::normalize::{NormalizedUtterance, Utterance, normalize};
use crate::infra::config::ResolverConfig;

/// Default acceptance threshold
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;

/// A fully bound action plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub action: Action,
    /// Name of the winning handler
    pub handler: &'static str,
    #[serde(serialize_with = "two_places")]
    pub confidence: f32,
    /// True when the target path came from the active context
    pub bound_from_context: bool,
}

/// Scores are coarse; keep `0.95` from printing as `0.949999988`
fn two_places<S: serde::Serializer>(
    value: &f32,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((f64::from(*value) * 100.0).round() / 100.0)
}

/// Outcome of resolving one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Action(Resolved),
    NoMatch,
    MissingTarget { kind: &'static str },
    Ambiguous { candidates: Vec<&'static str> },
}

impl Resolution {
    pub fn action(&self) -> Option<&Action> {
        match self {
            Self::Action(r) => Some(&r.action),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Resolved, ResolveError> {
        match self {
            Self::Action(r) => Ok(r),
            Self::NoMatch => Err(ResolveError::NoMatch),
            Self::MissingTarget { kind } => Err(ResolveError::MissingTarget { kind }),
            Self::Ambiguous { candidates } => Err(ResolveError::Ambiguous { candidates }),
        }
    }
}

/// Resolution failures, for callers that prefer `?`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no handler recognized the command")]
    NoMatch,

    #[error("{kind} needs a target file and none is open")]
    MissingTarget { kind: &'static str },

    #[error("command is ambiguous between {}", candidates.join(", "))]
    Ambiguous { candidates: Vec<&'static str> },
}

impl From<ResolveError> for Resolution {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoMatch => Self::NoMatch,
            ResolveError::MissingTarget { kind } => Self::MissingTarget { kind },
            ResolveError::Ambiguous { candidates } => Self::Ambiguous { candidates },
        }
    }
}

struct Candidate {
    handler: &'static str,
    family: ActionFamily,
    confidence: f32,
    action: Action,
}

/// Orchestrates the handler set
#[derive(Debug)]
pub struct Resolver {
    registry: HandlerRegistry,
    min_confidence: f32,
    short_circuit: bool,
    strict_ties: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver over the built-in handlers
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::with_defaults(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            short_circuit: true,
            strict_ties: false,
        }
    }

    /// Built-in handlers minus the disabled ones, with configured policy
    pub fn from_config(cfg: &ResolverConfig) -> Self {
        let mut registry = HandlerRegistry::with_defaults();
        registry.disable(&cfg.disabled_handlers);
        Self::new()
            .with_registry(registry)
            .with_min_confidence(cfg.min_confidence as f32)
            .with_short_circuit(cfg.short_circuit)
            .with_strict_ties(cfg.strict_ties)
    }

    pub fn with_min_confidence(
        mut self,
        min: f32,
    ) -> Self {
        self.min_confidence = if min.is_finite() { min.clamp(0.0, 1.0) } else { DEFAULT_MIN_CONFIDENCE };
        self
    }

    pub fn with_registry(
        mut self,
        registry: HandlerRegistry,
    ) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_short_circuit(
        mut self,
        enabled: bool,
    ) -> Self {
        self.short_circuit = enabled;
        self
    }

    pub fn with_strict_ties(
        mut self,
        enabled: bool,
    ) -> Self {
        self.strict_ties = enabled;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Normalize then resolve
    pub fn resolve(
        &self,
        utterance: &Utterance,
        ctx: &ActiveContext,
    ) -> Resolution {
        self.resolve_normalized(&normalize(utterance), ctx)
    }

    /// Resolve an already normalized utterance
    #[instrument(level = "debug", skip_all, fields(utterance = %utterance))]
    pub fn resolve_normalized(
        &self,
        utterance: &NormalizedUtterance,
        ctx: &ActiveContext,
    ) -> Resolution {
        let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();

        for handler in self.registry.iter() {
            let result = handler.evaluate(utterance, ctx);
            let confidence = result.confidence();
            debug!(handler = handler.name(), confidence, "scored");

            if confidence < self.min_confidence {
                continue;
            }
            let Some(action) = result.into_action() else {
                continue;
            };

            let critical = handler.priority() == HandlerPriority::Critical;
            candidates.push(Candidate {
                handler: handler.name(),
                family: handler.family(),
                confidence,
                action,
            });
            if critical && self.short_circuit {
                debug!(handler = handler.name(), "short-circuit on critical handler");
                break;
            }
        }

        let Some(best_index) = best_candidate(&candidates) else {
            debug!("no handler above threshold");
            return Resolution::NoMatch;
        };

        if self.strict_ties {
            let best = &candidates[best_index];
            let tied: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.confidence == best.confidence)
                .collect();
            if tied.iter().any(|c| c.family != best.family) {
                // Distinct kinds, first-seen order
                let kinds: IndexSet<&'static str> = tied.iter().map(|c| c.action.kind()).collect();
                debug!(?kinds, "cross-family tie");
                return Resolution::Ambiguous { candidates: kinds.into_iter().collect() };
            }
        }

        let winner = candidates.swap_remove(best_index);
        bind(winner, ctx)
    }
}

/// Index of the highest confidence; the first one wins exact ties
fn best_candidate(candidates: &[Candidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, c) in candidates.iter().enumerate() {
        match best {
            Some(b) if candidates[b].confidence >= c.confidence => {}
            _ => best = Some(i),
        }
    }
    best
}

fn bind(
    winner: Candidate,
    ctx: &ActiveContext,
) -> Resolution {
    let Candidate { handler, confidence, mut action, .. } = winner;

    let mut bound_from_context = false;
    if action.is_unbound() {
        match ctx.path() {
            Some(path) => {
                action.bind_target(path);
                bound_from_context = true;
            }
            None => {
                debug!(kind = action.kind(), "no target to bind");
                return Resolution::MissingTarget { kind: action.kind() };
            }
        }
    }

    debug!(%action, handler, "resolved");
    Resolution::Action(Resolved { action, handler, confidence, bound_from_context })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handlers::Handler;

    fn resolve(
        text: &str,
        ctx: &ActiveContext,
    ) -> Resolution {
        Resolver::new().resolve(&Utterance::new(text), ctx)
    }

    #[test]
    fn test_binds_target_from_context() {
        let ctx = ActiveContext::with_path("app.py");
        let Resolution::Action(r) = resolve("remove line 5", &ctx) else {
            panic!("expected an action");
        };
        assert_eq!(r.action, Action::DeleteLineRange { path: Some("app.py".into()), start: 5, end: 5 });
        assert!(r.bound_from_context);
        assert_eq!(r.handler, "line");
    }

    #[test]
    fn test_explicit_path_beats_context() {
        let ctx = ActiveContext::with_path("app.py");
        let Resolution::Action(r) = resolve("remove line 5 in lib.py", &ctx) else {
            panic!("expected an action");
        };
        assert_eq!(r.action.target().map(|p| p.as_str()), Some("lib.py"));
        assert!(!r.bound_from_context);
    }

    #[test]
    fn test_quoted_line_words_do_not_become_edits() {
        let ctx = ActiveContext::with_path("app.py");
        for (text, kind) in [
            ("git commit -m 'delete line 4 bug'", "GitCommit"),
            ("git commit -m 'fix bug on line 5'", "GitCommit"),
            ("create issue 'crash on line 4'", "HostCreateIssue"),
        ] {
            let Resolution::Action(r) = resolve(text, &ctx) else {
                panic!("expected an action for {text:?}");
            };
            assert_eq!(r.action.kind(), kind, "{text:?}");
        }
    }

    #[test]
    fn test_quoted_payload_keeps_named_file() {
        let ctx = ActiveContext::with_path("app.py");
        let Resolution::Action(r) = resolve("insert 'a' in notes.md at line 1", &ctx) else {
            panic!("expected an action");
        };
        assert_eq!(r.action.target().map(|p| p.as_str()), Some("notes.md"));
        assert!(!r.bound_from_context);
    }

    #[test]
    fn test_missing_target_without_context() {
        assert_eq!(
            resolve("insert hello at line 1", &ActiveContext::new()),
            Resolution::MissingTarget { kind: "InsertBeforeLine" }
        );
    }

    #[test]
    fn test_no_match_below_threshold() {
        assert_eq!(resolve("what a lovely day", &ActiveContext::new()), Resolution::NoMatch);
        let strict = Resolver::new().with_min_confidence(0.99);
        assert_eq!(
            strict.resolve(&Utterance::new("git init"), &ActiveContext::new()),
            Resolution::NoMatch
        );
    }

    #[test]
    fn test_non_file_actions_need_no_context() {
        let Resolution::Action(r) = resolve("git checkout -b feature", &ActiveContext::new()) else {
            panic!("expected an action");
        };
        assert_eq!(r.action, Action::GitCheckout { branch: "feature".into(), create_new: true });
        assert!(!r.bound_from_context);
    }

    struct Fixed {
        name: &'static str,
        family: ActionFamily,
        priority: HandlerPriority,
        action: Action,
    }

    impl Handler for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn family(&self) -> ActionFamily {
            self.family
        }

        fn priority(&self) -> HandlerPriority {
            self.priority
        }

        fn score(&self, _: &NormalizedUtterance, _: &ActiveContext) -> f32 {
            0.9
        }

        fn parse(&self, _: &NormalizedUtterance, _: &ActiveContext) -> Option<Action> {
            Some(self.action.clone())
        }
    }

    fn tied_registry() -> HandlerRegistry {
        let mut reg = HandlerRegistry::new();
        reg.register(Box::new(Fixed {
            name: "a",
            family: ActionFamily::VersionControl,
            priority: HandlerPriority::Normal,
            action: Action::GitStatus,
        }));
        reg.register(Box::new(Fixed {
            name: "b",
            family: ActionFamily::Host,
            priority: HandlerPriority::Normal,
            action: Action::HostCreateRepo { name: "x".into(), private: false },
        }));
        reg
    }

    #[test]
    fn test_exact_tie_goes_to_earlier_registration() {
        let resolver = Resolver::new().with_registry(tied_registry());
        let r = resolver.resolve(&Utterance::new("x"), &ActiveContext::new());
        assert_eq!(r.action(), Some(&Action::GitStatus));
    }

    #[test]
    fn test_strict_ties_reports_ambiguity() {
        let resolver = Resolver::new().with_registry(tied_registry()).with_strict_ties(true);
        assert_eq!(
            resolver.resolve(&Utterance::new("x"), &ActiveContext::new()),
            Resolution::Ambiguous { candidates: vec!["GitStatus", "HostCreateRepo"] }
        );
    }

    #[test]
    fn test_critical_handler_short_circuits() {
        let mut reg = tied_registry();
        reg.register(Box::new(Fixed {
            name: "crit",
            family: ActionFamily::VersionControl,
            priority: HandlerPriority::Critical,
            action: Action::GitInit,
        }));
        let resolver = Resolver::new().with_registry(reg).with_strict_ties(true);
        assert_eq!(
            resolver.resolve(&Utterance::new("x"), &ActiveContext::new()).action(),
            Some(&Action::GitInit)
        );
    }

    #[test]
    fn test_into_result_round_trip() {
        let err = Resolution::MissingTarget { kind: "ReplaceLine" }.into_result().unwrap_err();
        assert_eq!(err.to_string(), "ReplaceLine needs a target file and none is open");
        assert_eq!(Resolution::from(err), Resolution::MissingTarget { kind: "ReplaceLine" });
    }
}
