//! Closed vocabulary of operations produced by the resolver
//!
//! Every variant carries only the parameters it needs. Line numbers are
//! 1-based and inclusive. Serialized form is `{ "kind": .., "params": {..} }`
//! so actions can be logged, replayed and snapshotted as plain data.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Operation family, used for grouping and bleed checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFamily {
    Filesystem,
    LineEdit,
    Structure,
    VersionControl,
    Host,
}

/// Where inside a function or class body a block lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPosition {
    Top,
    #[default]
    Bottom,
}

/// Structured, executable operation
///
/// Variants whose `path` is an `Option` accept a target bound later from
/// the active context; the resolver never hands out such an action with the
/// slot still empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum Action {
    // --- Filesystem ---
    CreateFile {
        path: Utf8PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    ReadFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
    },
    DeleteFile {
        path: Utf8PathBuf,
    },
    RenameFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        new_name: String,
    },
    MoveFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        destination: Utf8PathBuf,
    },
    CopyFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        destination: Utf8PathBuf,
    },
    CreateFolder {
        path: Utf8PathBuf,
    },
    DeleteFolder {
        path: Utf8PathBuf,
    },
    RenameFolder {
        path: Utf8PathBuf,
        new_name: String,
    },
    MoveFolder {
        path: Utf8PathBuf,
        destination: Utf8PathBuf,
    },
    CopyFolder {
        path: Utf8PathBuf,
        destination: Utf8PathBuf,
    },

    // --- Line editing ---
    InsertBeforeLine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        line: usize,
        text: String,
    },
    InsertAfterLine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        line: usize,
        text: String,
    },
    ReplaceLine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        line: usize,
        text: String,
    },
    DeleteLineRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        start: usize,
        end: usize,
    },
    InsertAtTop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        text: String,
    },
    InsertAtBottom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        text: String,
    },
    AppendText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        text: String,
    },
    PrependText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        text: String,
    },
    ReplaceBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        start: usize,
        end: usize,
        text: String,
    },
    InsertBlockAtLine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        line: usize,
        text: String,
    },
    RemoveBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        start: usize,
        end: usize,
    },

    // --- Text patterns and code structure ---
    ReplaceText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        find: String,
        replace: String,
    },
    ReplacePattern {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        pattern: String,
        replacement: String,
    },
    DeletePattern {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        pattern: String,
    },
    InsertAfterImports {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        text: String,
    },
    AutoImport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        symbol: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
    },
    InsertIntoFunction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        function: String,
        text: String,
        #[serde(default)]
        position: BodyPosition,
    },
    InsertIntoClass {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        class: String,
        text: String,
        #[serde(default)]
        position: BodyPosition,
    },
    AddDecorator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        name: String,
        decorator: String,
    },
    DeleteFunction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        function: String,
    },
    RemoveBetweenMarkers {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        start: String,
        end: String,
        inclusive: bool,
    },

    // --- Version control ---
    GitInit,
    GitStatus,
    GitAdd {
        paths: Vec<String>,
    },
    GitCommit {
        message: String,
    },
    GitBranch {
        name: String,
    },
    GitCheckout {
        branch: String,
        create_new: bool,
    },
    GitMerge {
        branch: String,
    },
    GitPush {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
        #[serde(default)]
        set_upstream: bool,
    },
    GitPull {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    GitRemoteAdd {
        name: String,
        url: String,
    },
    ShowGraph,

    // --- Remote repository host ---
    HostCreateRepo {
        name: String,
        private: bool,
    },
    HostCreateIssue {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    #[serde(rename = "HostCreatePR")]
    HostCreatePr {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        head: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<String>,
    },
}

impl Action {
    /// Stable kind name, identical to the serialized `kind` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateFile { .. } => "CreateFile",
            Self::ReadFile { .. } => "ReadFile",
            Self::DeleteFile { .. } => "DeleteFile",
            Self::RenameFile { .. } => "RenameFile",
            Self::MoveFile { .. } => "MoveFile",
            Self::CopyFile { .. } => "CopyFile",
            Self::CreateFolder { .. } => "CreateFolder",
            Self::DeleteFolder { .. } => "DeleteFolder",
            Self::RenameFolder { .. } => "RenameFolder",
            Self::MoveFolder { .. } => "MoveFolder",
            Self::CopyFolder { .. } => "CopyFolder",
            Self::InsertBeforeLine { .. } => "InsertBeforeLine",
            Self::InsertAfterLine { .. } => "InsertAfterLine",
            Self::ReplaceLine { .. } => "ReplaceLine",
            Self::DeleteLineRange { .. } => "DeleteLineRange",
            Self::InsertAtTop { .. } => "InsertAtTop",
            Self::InsertAtBottom { .. } => "InsertAtBottom",
            Self::AppendText { .. } => "AppendText",
            Self::PrependText { .. } => "PrependText",
            Self::ReplaceBlock { .. } => "ReplaceBlock",
            Self::InsertBlockAtLine { .. } => "InsertBlockAtLine",
            Self::RemoveBlock { .. } => "RemoveBlock",
            Self::ReplaceText { .. } => "ReplaceText",
            Self::ReplacePattern { .. } => "ReplacePattern",
            Self::DeletePattern { .. } => "DeletePattern",
            Self::InsertAfterImports { .. } => "InsertAfterImports",
            Self::AutoImport { .. } => "AutoImport",
            Self::InsertIntoFunction { .. } => "InsertIntoFunction",
            Self::InsertIntoClass { .. } => "InsertIntoClass",
            Self::AddDecorator { .. } => "AddDecorator",
            Self::DeleteFunction { .. } => "DeleteFunction",
            Self::RemoveBetweenMarkers { .. } => "RemoveBetweenMarkers",
            Self::GitInit => "GitInit",
            Self::GitStatus => "GitStatus",
            Self::GitAdd { .. } => "GitAdd",
            Self::GitCommit { .. } => "GitCommit",
            Self::GitBranch { .. } => "GitBranch",
            Self::GitCheckout { .. } => "GitCheckout",
            Self::GitMerge { .. } => "GitMerge",
            Self::GitPush { .. } => "GitPush",
            Self::GitPull { .. } => "GitPull",
            Self::GitRemoteAdd { .. } => "GitRemoteAdd",
            Self::ShowGraph => "ShowGraph",
            Self::HostCreateRepo { .. } => "HostCreateRepo",
            Self::HostCreateIssue { .. } => "HostCreateIssue",
            Self::HostCreatePr { .. } => "HostCreatePR",
        }
    }

    pub fn family(&self) -> ActionFamily {
        match self {
            Self::CreateFile { .. }
            | Self::ReadFile { .. }
            | Self::DeleteFile { .. }
            | Self::RenameFile { .. }
            | Self::MoveFile { .. }
            | Self::CopyFile { .. }
            | Self::CreateFolder { .. }
            | Self::DeleteFolder { .. }
            | Self::RenameFolder { .. }
            | Self::MoveFolder { .. }
            | Self::CopyFolder { .. } => ActionFamily::Filesystem,

            Self::InsertBeforeLine { .. }
            | Self::InsertAfterLine { .. }
            | Self::ReplaceLine { .. }
            | Self::DeleteLineRange { .. }
            | Self::InsertAtTop { .. }
            | Self::InsertAtBottom { .. }
            | Self::AppendText { .. }
            | Self::PrependText { .. }
            | Self::ReplaceBlock { .. }
            | Self::InsertBlockAtLine { .. }
            | Self::RemoveBlock { .. } => ActionFamily::LineEdit,

            Self::ReplaceText { .. }
            | Self::ReplacePattern { .. }
            | Self::DeletePattern { .. }
            | Self::InsertAfterImports { .. }
            | Self::AutoImport { .. }
            | Self::InsertIntoFunction { .. }
            | Self::InsertIntoClass { .. }
            | Self::AddDecorator { .. }
            | Self::DeleteFunction { .. }
            | Self::RemoveBetweenMarkers { .. } => ActionFamily::Structure,

            Self::GitInit
            | Self::GitStatus
            | Self::GitAdd { .. }
            | Self::GitCommit { .. }
            | Self::GitBranch { .. }
            | Self::GitCheckout { .. }
            | Self::GitMerge { .. }
            | Self::GitPush { .. }
            | Self::GitPull { .. }
            | Self::GitRemoteAdd { .. }
            | Self::ShowGraph => ActionFamily::VersionControl,

            Self::HostCreateRepo { .. }
            | Self::HostCreateIssue { .. }
            | Self::HostCreatePr { .. } => ActionFamily::Host,
        }
    }

    /// True for actions the editing engine applies to a buffer
    pub fn is_text_mutation(&self) -> bool {
        matches!(self.family(), ActionFamily::LineEdit | ActionFamily::Structure)
    }

    /// Slot for a context-bindable target, if this kind has one
    fn target_slot(&self) -> Option<&Option<Utf8PathBuf>> {
        match self {
            Self::ReadFile { path }
            | Self::RenameFile { path, .. }
            | Self::MoveFile { path, .. }
            | Self::CopyFile { path, .. }
            | Self::InsertBeforeLine { path, .. }
            | Self::InsertAfterLine { path, .. }
            | Self::ReplaceLine { path, .. }
            | Self::DeleteLineRange { path, .. }
            | Self::InsertAtTop { path, .. }
            | Self::InsertAtBottom { path, .. }
            | Self::AppendText { path, .. }
            | Self::PrependText { path, .. }
            | Self::ReplaceBlock { path, .. }
            | Self::InsertBlockAtLine { path, .. }
            | Self::RemoveBlock { path, .. }
            | Self::ReplaceText { path, .. }
            | Self::ReplacePattern { path, .. }
            | Self::DeletePattern { path, .. }
            | Self::InsertAfterImports { path, .. }
            | Self::AutoImport { path, .. }
            | Self::InsertIntoFunction { path, .. }
            | Self::InsertIntoClass { path, .. }
            | Self::AddDecorator { path, .. }
            | Self::DeleteFunction { path, .. }
            | Self::RemoveBetweenMarkers { path, .. } => Some(path),
            _ => None,
        }
    }

    fn target_slot_mut(&mut self) -> Option<&mut Option<Utf8PathBuf>> {
        match self {
            Self::ReadFile { path }
            | Self::RenameFile { path, .. }
            | Self::MoveFile { path, .. }
            | Self::CopyFile { path, .. }
            | Self::InsertBeforeLine { path, .. }
            | Self::InsertAfterLine { path, .. }
            | Self::ReplaceLine { path, .. }
            | Self::DeleteLineRange { path, .. }
            | Self::InsertAtTop { path, .. }
            | Self::InsertAtBottom { path, .. }
            | Self::AppendText { path, .. }
            | Self::PrependText { path, .. }
            | Self::ReplaceBlock { path, .. }
            | Self::InsertBlockAtLine { path, .. }
            | Self::RemoveBlock { path, .. }
            | Self::ReplaceText { path, .. }
            | Self::ReplacePattern { path, .. }
            | Self::DeletePattern { path, .. }
            | Self::InsertAfterImports { path, .. }
            | Self::AutoImport { path, .. }
            | Self::InsertIntoFunction { path, .. }
            | Self::InsertIntoClass { path, .. }
            | Self::AddDecorator { path, .. }
            | Self::DeleteFunction { path, .. }
            | Self::RemoveBetweenMarkers { path, .. } => Some(path),
            _ => None,
        }
    }

    /// True when this kind takes its file target from context if omitted
    pub fn requires_target(&self) -> bool {
        self.target_slot().is_some()
    }

    /// Bound or explicit file target of a bindable action
    pub fn target(&self) -> Option<&Utf8Path> {
        self.target_slot().and_then(|p| p.as_deref())
    }

    /// True when the action still needs a target before it can execute
    pub fn is_unbound(&self) -> bool {
        matches!(self.target_slot(), Some(None))
    }

    /// Fill an empty target slot; explicit targets are never overwritten.
    /// Returns true when the slot was filled.
    pub fn bind_target(&mut self, path: &Utf8Path) -> bool {
        match self.target_slot_mut() {
            Some(slot) if slot.is_none() => {
                *slot = Some(path.to_path_buf());
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target() {
            Some(path) => write!(f, "{} ({})", self.kind(), path),
            None => write!(f, "{}", self.kind()),
        }
    }
}
