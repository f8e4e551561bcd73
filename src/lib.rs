//! **gitvision** - Deterministic free-text command interpreter
//!
//! Short English commands ("delete lines 3 to 7", "commit with message fix")
//! resolve into typed actions through a fixed handler set; text mutations run
//! against an in-memory line buffer and commit atomically.

/// Command-line interface with clap integration
pub mod cli;

/// Subcommand runners and exit-code mapping
pub mod commands;

/// Interpreter and editing engine; no I/O outside the ports
pub mod core {
    /// Action vocabulary shared by handlers, engine and executor
    pub mod action;
    pub use action::{Action, ActionFamily, BodyPosition};

    /// Line buffer with line-ending bookkeeping
    pub mod buffer;
    pub use buffer::{Buffer, LineEnding};

    /// Active file pointer used to bind omitted targets
    pub mod context;
    pub use context::ActiveContext;

    /// Pure line-editing engine
    pub mod edit;
    pub use edit::{EditEngine, EditError, EditOutcome};

    /// Pattern matchers, one per operation family
    pub mod handlers;
    pub use handlers::{Handler, HandlerRegistry};

    /// Utterance canonicalization
    pub mod normalize;
    pub use normalize::{NormalizedUtterance, Utterance, normalize};

    /// Collaborator traits for storage and process execution
    pub mod ports;
    pub use ports::{ContentProvider, ExecOutcome, HostClient, PersistenceSink, VcsRunner};

    /// Handler arbitration
    pub mod resolve;
    pub use resolve::{Resolution, ResolveError, Resolved, Resolver};

    /// Buffer-owning editing session
    pub mod session;
    pub use session::{Applied, Session, SessionError};

    /// Import, definition and marker-aware structural edits
    pub mod structure;
}

/// Infrastructure - configuration, storage and process runners
pub mod infra {
    /// Terminal escape stripping
    pub mod ansi;

    /// Layered configuration (defaults, file, environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Unified diff previews
    pub mod diff;

    /// Action dispatch to the workspace and process runners
    pub mod exec;
    pub use exec::{ExecError, Executor, Report};

    /// Filesystem workspace with atomic commits
    pub mod fs;
    pub use fs::FsWorkspace;

    /// `gh` host runner
    pub mod gh;
    pub use gh::GhCli;

    /// `git` runner
    pub mod git;
    pub use git::GitCli;

    /// tracing subscriber setup
    pub mod logging;

    /// Shared regex helpers
    pub mod re;
}

// Re-exports for library consumers
pub use cli::{AppContext, Cli, Commands};
pub use core::{Action, Buffer, EditEngine, Resolution, Resolver, Session, Utterance};
pub use infra::{Config, Executor, load_config};
