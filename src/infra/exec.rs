//! Executor: routes a resolved Action to the collaborator that performs it
//!
//! Text mutations go through the caller's [`Session`] and are committed
//! atomically; filesystem Actions go to [`FsWorkspace`]; git and host
//! Actions spawn their programs. Dry-run renders the plan instead.

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::core::action::{Action, ActionFamily};
use crate::core::edit::EditEngine;
use crate::core::ports::{ExecOutcome, HostClient, VcsRunner};
use crate::core::session::{Session, SessionError};
use crate::infra::config::Config;
use crate::infra::diff;
use crate::infra::fs::FsWorkspace;
use crate::infra::gh::{GhCli, gh_argv};
use crate::infra::git::{GitCli, git_argv};

/// Collaborator failure; maps to the executor exit code
#[derive(Debug, Error)]
#[error("{kind} failed: {message}")]
pub struct ExecError {
    pub kind: &'static str,
    pub message: String,
}

impl ExecError {
    fn new(
        action: &Action,
        err: anyhow::Error,
    ) -> Self {
        Self { kind: action.kind(), message: format!("{err:#}") }
    }
}

/// What an executed (or planned) Action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    Edit { path: String, summary: String, diff: String, committed: bool },
    File { message: String },
    Process { command: String, outcome: ExecOutcome },
    Planned { command: String },
}

pub struct Executor {
    fs: FsWorkspace,
    git: Box<dyn VcsRunner>,
    host: Box<dyn HostClient>,
    git_program: String,
    host_program: String,
    dry_run: bool,
    diff_context: usize,
}

impl Executor {
    pub fn new(
        fs: FsWorkspace,
        git: Box<dyn VcsRunner>,
        host: Box<dyn HostClient>,
    ) -> Self {
        Self {
            fs,
            git,
            host,
            git_program: "git".into(),
            host_program: "gh".into(),
            dry_run: false,
            diff_context: 3,
        }
    }

    /// Real collaborators wired from configuration
    pub fn from_config(cfg: &Config) -> Self {
        let root = cfg.executor.workspace_root.clone();
        let fs = FsWorkspace::new()
            .with_root(root.clone())
            .with_preserve_line_endings(cfg.editing.preserve_line_endings);
        let git = GitCli::new(&cfg.executor.git_program).with_repo_root(root.clone());
        let host = GhCli::new(&cfg.executor.host_program).with_repo_root(root);
        let mut exec = Self::new(fs, Box::new(git), Box::new(host)).with_diff_context(cfg.editing.diff_context);
        exec.git_program = cfg.executor.git_program.clone();
        exec.host_program = cfg.executor.host_program.clone();
        exec
    }

    pub fn with_dry_run(
        mut self,
        enabled: bool,
    ) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn with_diff_context(
        mut self,
        lines: usize,
    ) -> Self {
        self.diff_context = lines;
        self
    }

    pub fn workspace(&self) -> &FsWorkspace {
        &self.fs
    }

    /// Engine configured the way sessions driven by this executor need
    pub fn engine_for(cfg: &Config) -> EditEngine {
        EditEngine::new().with_strip_ansi(cfg.editing.strip_ansi)
    }

    #[instrument(level = "debug", skip_all, fields(kind = action.kind(), dry_run = self.dry_run))]
    pub fn execute(
        &self,
        session: &mut Session,
        action: &Action,
    ) -> anyhow::Result<Report> {
        let report = match action.family() {
            ActionFamily::LineEdit | ActionFamily::Structure => self.edit(session, action)?,
            ActionFamily::Filesystem => self.filesystem(session, action)?,
            ActionFamily::VersionControl => {
                let argv = git_argv(action).unwrap_or_default();
                self.process(action, &self.git_program, argv, |a| self.git.run(a))?
            }
            ActionFamily::Host => {
                let argv = gh_argv(action).unwrap_or_default();
                self.process(action, &self.host_program, argv, |a| self.host.run(a))?
            }
        };
        info!(kind = action.kind(), "executed");
        Ok(report)
    }

    fn edit(
        &self,
        session: &mut Session,
        action: &Action,
    ) -> Result<Report, SessionError> {
        let applied = session.edit(action, &self.fs)?;
        let after = session.buffer().map(|b| b.to_text()).unwrap_or_default();
        let diff = diff::unified(applied.path.as_str(), &applied.before.to_text(), &after, self.diff_context);
        let committed = if self.dry_run { false } else { session.save(&self.fs)? };
        Ok(Report::Edit { path: applied.path.to_string(), summary: applied.summary, diff, committed })
    }

    fn filesystem(
        &self,
        session: &mut Session,
        action: &Action,
    ) -> anyhow::Result<Report> {
        if self.dry_run {
            return Ok(Report::Planned { command: describe(action) });
        }
        let message = self
            .fs
            .perform(action)
            .map_err(|e| ExecError::new(action, e))?;
        match action {
            Action::ReadFile { path: Some(path) } => {
                session.open(path, &self.fs)?;
            }
            other => session.follow(other),
        }
        Ok(Report::File { message })
    }

    fn process(
        &self,
        action: &Action,
        program: &str,
        argv: Vec<String>,
        run: impl FnOnce(&Action) -> anyhow::Result<ExecOutcome>,
    ) -> anyhow::Result<Report> {
        let command = render_command(program, &argv);
        if self.dry_run {
            return Ok(Report::Planned { command });
        }
        let outcome = run(action).map_err(|e| ExecError::new(action, e))?;
        if !outcome.success {
            return Err(ExecError { kind: action.kind(), message: outcome.message().to_string() }.into());
        }
        Ok(Report::Process { command, outcome })
    }
}

/// `Kind {params}` rendering for Actions that run no program
pub fn describe(action: &Action) -> String {
    match serde_json::to_value(action) {
        Ok(v) => match v.get("params") {
            Some(params) => format!("{} {params}", action.kind()),
            None => action.kind().to_string(),
        },
        Err(_) => action.to_string(),
    }
}

/// Shell-like rendering of argv for previews
pub fn render_command(
    program: &str,
    argv: &[String],
) -> String {
    std::iter::once(program)
        .chain(argv.iter().map(String::as_str))
        .map(|a| {
            if a.is_empty() || a.contains(|c: char| c.is_whitespace() || "\"'$`\\;&|<>".contains(c)) {
                format!("'{}'", a.replace('\'', r"'\''"))
            } else {
                a.to_string()
            }
        })
        .join(" ")
}
