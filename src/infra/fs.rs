//! Filesystem workspace: content provider, atomic persistence sink, and the
//! file/folder Actions

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::{debug, instrument};

use crate::core::action::Action;
use crate::core::buffer::Buffer;
use crate::core::ports::{ContentProvider, PersistenceSink};

/// Workspace rooted at an optional directory; relative Action paths are
/// resolved against it
#[derive(Debug, Clone)]
pub struct FsWorkspace
{
    root: Option<PathBuf>,
    preserve_line_endings: bool,
}

impl Default for FsWorkspace
{
    fn default() -> Self
    {
        Self { root: None, preserve_line_endings: true }
    }
}

impl FsWorkspace
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_root(
        mut self,
        root: Option<PathBuf>,
    ) -> Self
    {
        self.root = root;
        self
    }

    pub fn with_preserve_line_endings(
        mut self,
        enabled: bool,
    ) -> Self
    {
        self.preserve_line_endings = enabled;
        self
    }

    /// Expand `~`/`$VAR` and anchor relative paths at the root
    pub fn resolve(
        &self,
        path: &Utf8Path,
    ) -> PathBuf
    {
        let expanded = shellexpand::full(path.as_str())
            .map(|s| PathBuf::from(s.into_owned()))
            .unwrap_or_else(|_| PathBuf::from(path.as_str()));
        match &self.root
        {
            Some(root) if expanded.is_relative() => root.join(expanded),
            _ => expanded,
        }
    }

    /// Perform a filesystem Action; returns a one-line report (file content
    /// for `ReadFile`)
    #[instrument(level = "debug", skip_all, fields(kind = action.kind()))]
    pub fn perform(
        &self,
        action: &Action,
    ) -> Result<String>
    {
        match action
        {
            Action::CreateFile { path, content } =>
            {
                let target = self.resolve(path);
                if target.exists()
                {
                    anyhow::bail!("{path} already exists");
                }
                ensure_parent(&target)?;
                write_atomic(&target, content.as_deref().unwrap_or("").as_bytes())?;
                Ok(format!("created {path}"))
            }
            Action::ReadFile { path } =>
            {
                let path = bound(path.as_deref(), action)?;
                self.read(path)
            }
            Action::DeleteFile { path } =>
            {
                let target = self.resolve(path);
                fs::remove_file(&target).with_context(|| format!("Failed to delete {path}"))?;
                Ok(format!("deleted {path}"))
            }
            Action::RenameFile { path, new_name } =>
            {
                let path = bound(path.as_deref(), action)?;
                let from = self.resolve(path);
                let to = from.with_file_name(new_name);
                rename(&from, &to)?;
                Ok(format!("renamed {path} to {new_name}"))
            }
            Action::MoveFile { path, destination } =>
            {
                let path = bound(path.as_deref(), action)?;
                let from = self.resolve(path);
                let to = into_destination(&from, &self.resolve(destination), destination.as_str());
                ensure_parent(&to)?;
                rename(&from, &to)?;
                Ok(format!("moved {path} to {}", to.display()))
            }
            Action::CopyFile { path, destination } =>
            {
                let path = bound(path.as_deref(), action)?;
                let from = self.resolve(path);
                let to = into_destination(&from, &self.resolve(destination), destination.as_str());
                ensure_parent(&to)?;
                fs::copy(&from, &to)
                    .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
                Ok(format!("copied {path} to {}", to.display()))
            }
            Action::CreateFolder { path } =>
            {
                let target = self.resolve(path);
                if target.is_file()
                {
                    anyhow::bail!("{path} exists and is a file");
                }
                fs::create_dir_all(&target).with_context(|| format!("Failed to create {path}"))?;
                Ok(format!("created folder {path}"))
            }
            Action::DeleteFolder { path } =>
            {
                let target = self.resolve(path);
                if !target.is_dir()
                {
                    anyhow::bail!("{path} is not a folder");
                }
                fs::remove_dir_all(&target).with_context(|| format!("Failed to delete {path}"))?;
                Ok(format!("deleted folder {path}"))
            }
            Action::RenameFolder { path, new_name } =>
            {
                let from = self.resolve(path);
                let to = from.with_file_name(new_name);
                rename(&from, &to)?;
                Ok(format!("renamed folder {path} to {new_name}"))
            }
            Action::MoveFolder { path, destination } =>
            {
                let from = self.resolve(path);
                let to = into_destination(&from, &self.resolve(destination), destination.as_str());
                ensure_parent(&to)?;
                rename(&from, &to)?;
                Ok(format!("moved folder {path} to {}", to.display()))
            }
            Action::CopyFolder { path, destination } =>
            {
                let from = self.resolve(path);
                let to = into_destination(&from, &self.resolve(destination), destination.as_str());
                copy_tree(&from, &to)?;
                Ok(format!("copied folder {path} to {}", to.display()))
            }
            other => anyhow::bail!("{} is not a filesystem action", other.kind()),
        }
    }
}

impl ContentProvider for FsWorkspace
{
    fn read(
        &self,
        path: &Utf8Path,
    ) -> Result<String>
    {
        let target = self.resolve(path);
        fs::read_to_string(&target).with_context(|| format!("Failed to read file: {:?}", target))
    }
}

impl PersistenceSink for FsWorkspace
{
    fn commit(
        &self,
        path: &Utf8Path,
        buffer: &Buffer,
    ) -> Result<()>
    {
        let text = if self.preserve_line_endings
        {
            buffer.render_with_original_endings()
        }
        else
        {
            buffer.to_text()
        };
        let target = self.resolve(path);
        debug!(path = %target.display(), bytes = text.len(), "commit");
        write_atomic(&target, text.as_bytes())
    }
}

fn bound<'a>(
    path: Option<&'a Utf8Path>,
    action: &Action,
) -> Result<&'a Utf8Path>
{
    path.ok_or_else(|| anyhow::anyhow!("{} has no target file", action.kind()))
}

/// `dest/` or an existing directory receives `from` by name
fn into_destination(
    from: &Path,
    dest: &Path,
    raw: &str,
) -> PathBuf
{
    let into_dir = raw.ends_with('/') || raw.ends_with('\\') || dest.is_dir();
    match from.file_name()
    {
        Some(name) if into_dir => dest.join(name),
        _ => dest.to_path_buf(),
    }
}

fn ensure_parent(path: &Path) -> Result<()>
{
    if let Some(parent) = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn rename(
    from: &Path,
    to: &Path,
) -> Result<()>
{
    if !from.exists()
    {
        anyhow::bail!("{} does not exist", from.display());
    }
    if to.exists()
    {
        anyhow::bail!("{} already exists", to.display());
    }
    fs::rename(from, to)
        .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))
}

fn copy_tree(
    from: &Path,
    to: &Path,
) -> Result<()>
{
    if !from.is_dir()
    {
        anyhow::bail!("{} is not a folder", from.display());
    }
    if to.exists()
    {
        anyhow::bail!("{} already exists", to.display());
    }
    fs::create_dir_all(to).with_context(|| format!("Failed to create {}", to.display()))?;
    for entry in fs::read_dir(from).with_context(|| format!("Failed to list {}", from.display()))?
    {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry
            .file_type()?
            .is_dir()
        {
            copy_tree(&entry.path(), &dest)?;
        }
        else
        {
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Atomic write with robust temp file strategy
pub fn write_atomic(
    path: &Path,
    data: &[u8],
) -> Result<()>
{
    // Prefer same-dir tempfile; fall back to OS temp on EPERM/ENOENT
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Preserve original permissions
    #[cfg(unix)]
    let perms = fs::metadata(path)
        .map(|m| m.permissions())
        .unwrap_or_else(|_| std::os::unix::fs::PermissionsExt::from_mode(0o644));
    #[cfg(not(unix))]
    let perms = fs::metadata(path)
        .map(|m| m.permissions())
        .ok();

    let tmp = match tempfile::NamedTempFile::new_in(dir)
    {
        Ok(t) => t,
        Err(_) => tempfile::NamedTempFile::new()?, // fallback to /tmp
    };

    let mut file = tmp.as_file();
    file.write_all(data)?;
    file.sync_all()?;

    #[cfg(unix)]
    fs::set_permissions(tmp.path(), perms).context("set temp permissions")?;
    #[cfg(not(unix))]
    if let Some(perms) = perms
    {
        fs::set_permissions(tmp.path(), perms).context("set temp permissions")?;
    }

    // Atomically replace the destination
    if let Err(e) = tmp.persist(path)
    {
        // Different filesystem? Try copy fallback
        fs::copy(e.file.path(), path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    // fsync parent dir so the rename is durable
    #[cfg(unix)]
    {
        if let Ok(parent_file) = fs::File::open(dir)
        {
            let _ = parent_file.sync_all();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn ws(dir: &tempfile::TempDir) -> FsWorkspace
    {
        FsWorkspace::new().with_root(Some(dir.path().to_path_buf()))
    }

    #[test]
    fn test_commit_preserves_crlf()
    {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\r\ntwo\r\n").unwrap();
        let ws = ws(&dir);

        let text = ws.read(Utf8Path::new("a.txt")).unwrap();
        let buf = Buffer::from_text(&text);
        ws.commit(Utf8Path::new("a.txt"), &buf).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "one\r\ntwo\r\n");

        let lf = ws.clone().with_preserve_line_endings(false);
        lf.commit(Utf8Path::new("a.txt"), &buf).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_file_actions()
    {
        let dir = tempfile::tempdir().unwrap();
        let ws = ws(&dir);

        ws.perform(&Action::CreateFile { path: "src/app.py".into(), content: Some("x = 1\n".into()) })
            .unwrap();
        assert!(
            ws.perform(&Action::CreateFile { path: "src/app.py".into(), content: None })
                .is_err()
        );
        assert_eq!(
            ws.perform(&Action::ReadFile { path: Some("src/app.py".into()) })
                .unwrap(),
            "x = 1\n"
        );

        ws.perform(&Action::RenameFile { path: Some("src/app.py".into()), new_name: "main.py".into() })
            .unwrap();
        assert!(dir.path().join("src/main.py").exists());

        ws.perform(&Action::CreateFolder { path: "lib".into() })
            .unwrap();
        ws.perform(&Action::MoveFile { path: Some("src/main.py".into()), destination: "lib".into() })
            .unwrap();
        assert!(dir.path().join("lib/main.py").exists());

        ws.perform(&Action::CopyFolder { path: "lib".into(), destination: "lib2".into() })
            .unwrap();
        assert!(dir.path().join("lib2/main.py").exists());

        ws.perform(&Action::DeleteFolder { path: "lib".into() })
            .unwrap();
        assert!(!dir.path().join("lib").exists());
    }

    #[test]
    fn test_unbound_target_is_rejected()
    {
        let dir = tempfile::tempdir().unwrap();
        let err = ws(&dir)
            .perform(&Action::ReadFile { path: None })
            .unwrap_err();
        assert!(err.to_string().contains("no target"));
    }
}
