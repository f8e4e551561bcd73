//! Collaborator seams
//!
//! The core produces Actions and Buffers; these traits are how the
//! surrounding system reads files, commits buffers and runs external
//! programs. Infra provides the real implementations; tests use in-memory
//! ones.

use anyhow::Result;
use camino::Utf8Path;
use serde::Serialize;

use crate::core::action::Action;
use crate::core::buffer::Buffer;

/// Read current content for a path
pub trait ContentProvider {
    fn read(
        &self,
        path: &Utf8Path,
    ) -> Result<String>;
}

/// Commit a buffer to storage atomically, or fail and leave storage as it was
pub trait PersistenceSink {
    fn commit(
        &self,
        path: &Utf8Path,
        buffer: &Buffer,
    ) -> Result<()>;
}

/// Execute a version-control Action
pub trait VcsRunner {
    fn run(
        &self,
        action: &Action,
    ) -> Result<ExecOutcome>;
}

/// Execute a remote-repository-host Action
pub trait HostClient {
    fn run(
        &self,
        action: &Action,
    ) -> Result<ExecOutcome>;
}

/// Result of running an external program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecOutcome {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutcome {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { success: true, code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    /// stdout when non-empty, otherwise stderr
    pub fn message(&self) -> &str {
        let out = self.stdout.trim();
        if out.is_empty() { self.stderr.trim() } else { out }
    }
}
