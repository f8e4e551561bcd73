//! Caller-owned session: active context plus the open buffer
//!
//! One session serializes its own calls; independent sessions share
//! nothing and can run side by side.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::action::Action;
use crate::core::buffer::Buffer;
use crate::core::context::ActiveContext;
use crate::core::edit::{EditEngine, EditError};
use crate::core::normalize::Utterance;
use crate::core::ports::{ContentProvider, PersistenceSink};
use crate::core::resolve::{Resolution, Resolver};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("storage failure for {path}: {cause:#}")]
    Storage { path: Utf8PathBuf, cause: anyhow::Error },

    #[error("unsaved changes in {path}; save before opening another file")]
    Dirty { path: Utf8PathBuf },
}

/// A text edit that landed in the session buffer
#[derive(Debug, Clone)]
pub struct Applied {
    pub path: Utf8PathBuf,
    pub summary: String,
    /// Buffer as it was before the edit
    pub before: Buffer,
}

#[derive(Debug, Default)]
pub struct Session {
    context: ActiveContext,
    buffer: Option<Buffer>,
    engine: EditEngine,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(
        mut self,
        engine: EditEngine,
    ) -> Self {
        self.engine = engine;
        self
    }

    /// Start with a file pointer but no loaded buffer
    pub fn with_active_path(
        mut self,
        path: impl Into<Utf8PathBuf>,
    ) -> Self {
        self.context.open(path, None);
        self
    }

    pub fn context(&self) -> &ActiveContext {
        &self.context
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer.as_ref().is_some_and(Buffer::is_dirty)
    }

    /// Resolve against this session's context
    pub fn resolve(
        &self,
        resolver: &Resolver,
        utterance: &Utterance,
    ) -> Resolution {
        resolver.resolve(utterance, &self.context)
    }

    /// Load `path` and make it the active file. Refuses while the open
    /// buffer has unsaved edits.
    #[instrument(level = "debug", skip(self, provider))]
    pub fn open(
        &mut self,
        path: &Utf8Path,
        provider: &dyn ContentProvider,
    ) -> Result<&Buffer, SessionError> {
        if let Some(current) = self.context.path().filter(|_| self.is_dirty()) {
            return Err(SessionError::Dirty { path: current.to_path_buf() });
        }
        let text = provider.read(path).map_err(|cause| SessionError::Storage {
            path: path.to_path_buf(),
            cause,
        })?;
        let buffer = Buffer::from_text(&text);
        self.context.open(path.to_path_buf(), Some(buffer.to_text()));
        debug!(lines = buffer.len(), "opened");
        Ok(&*self.buffer.insert(buffer))
    }

    pub fn close(&mut self) {
        self.context.close();
        self.buffer = None;
    }

    /// Apply a text mutation to its target, loading the target first when it
    /// is not the open buffer
    #[instrument(level = "debug", skip_all, fields(kind = action.kind()))]
    pub fn edit(
        &mut self,
        action: &Action,
        provider: &dyn ContentProvider,
    ) -> Result<Applied, SessionError> {
        if !action.is_text_mutation() {
            return Err(EditError::UnsupportedAction { kind: action.kind() }.into());
        }
        let path = action
            .target()
            .or(self.context.path())
            .map(Utf8Path::to_path_buf)
            .ok_or(EditError::MissingTarget { kind: action.kind() })?;

        let loaded = self.context.path() == Some(path.as_path()) && self.buffer.is_some();
        if !loaded {
            self.open(&path, provider)?;
        }
        let before = self.buffer.clone().unwrap_or_default();

        let outcome = self.engine.apply(&before, action)?;
        self.context.content = Some(outcome.buffer.to_text());
        self.buffer = Some(outcome.buffer);
        Ok(Applied { path, summary: outcome.summary, before })
    }

    /// Track file-level Actions so later commands bind to the right file.
    /// Nothing is read or written.
    pub fn follow(
        &mut self,
        action: &Action,
    ) {
        match action {
            Action::ReadFile { path: Some(path) } | Action::CreateFile { path, .. } => {
                if self.context.path() != Some(path.as_path()) {
                    self.buffer = None;
                    self.context.open(path.clone(), None);
                }
            }
            Action::DeleteFile { path } if self.context.path() == Some(path.as_path()) => self.close(),
            Action::RenameFile { path, new_name } => {
                if let Some(current) = self.retarget(path.as_deref()) {
                    let renamed = current.with_file_name(new_name);
                    self.context.path = Some(renamed);
                }
            }
            Action::MoveFile { path, destination } => {
                if let Some(current) = self.retarget(path.as_deref()) {
                    let moved = match current.file_name() {
                        Some(name) if destination.as_str().ends_with('/') => destination.join(name),
                        _ => destination.clone(),
                    };
                    self.context.path = Some(moved);
                }
            }
            _ => {}
        }
    }

    /// Active path when `named` is absent or names it
    fn retarget(
        &self,
        named: Option<&Utf8Path>,
    ) -> Option<Utf8PathBuf> {
        let current = self.context.path()?;
        match named {
            None => Some(current.to_path_buf()),
            Some(p) if p == current => Some(current.to_path_buf()),
            Some(_) => None,
        }
    }

    /// Commit a dirty buffer; returns false when there was nothing to write
    #[instrument(level = "debug", skip_all)]
    pub fn save(
        &mut self,
        sink: &dyn PersistenceSink,
    ) -> Result<bool, SessionError> {
        let (Some(path), Some(buffer)) = (self.context.path.clone(), self.buffer.as_mut()) else {
            return Ok(false);
        };
        if !buffer.is_dirty() {
            return Ok(false);
        }
        sink.commit(&path, buffer)
            .map_err(|cause| SessionError::Storage { path: path.clone(), cause })?;
        buffer.mark_clean();
        debug!(%path, "saved");
        Ok(true)
    }
}
