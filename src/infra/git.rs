//! Version-control runner backed by the `git` program
//!
//! Argv is built from the Action alone; nothing is interpolated through a
//! shell. Output is captured into an [`ExecOutcome`].

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::action::Action;
use crate::core::ports::{ExecOutcome, VcsRunner};

/// Git CLI configuration
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    repo_root: Option<PathBuf>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self { program: PathBuf::from("git"), repo_root: None }
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), repo_root: None }
    }

    pub fn with_repo_root(
        mut self,
        root: Option<PathBuf>,
    ) -> Self {
        self.repo_root = root;
        self
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

/// Arguments passed to `git` for a version-control Action
pub fn git_argv(action: &Action) -> Option<Vec<String>> {
    let args: Vec<String> = match action {
        Action::GitInit => vec!["init".into()],
        Action::GitStatus => vec!["status".into(), "--short".into(), "--branch".into()],
        Action::GitAdd { paths } => {
            let mut v = vec!["add".to_string(), "--".to_string()];
            if paths.is_empty() {
                v.push(".".into());
            } else {
                v.extend(paths.iter().cloned());
            }
            v
        }
        Action::GitCommit { message } => vec!["commit".into(), "-m".into(), message.clone()],
        Action::GitBranch { name } => vec!["branch".into(), name.clone()],
        Action::GitCheckout { branch, create_new } => {
            let mut v = vec!["checkout".to_string()];
            if *create_new {
                v.push("-b".into());
            }
            v.push(branch.clone());
            v
        }
        Action::GitMerge { branch } => vec!["merge".into(), branch.clone()],
        Action::GitPush { remote, branch, set_upstream } => {
            let mut v = vec!["push".to_string()];
            if *set_upstream {
                v.push("-u".into());
            }
            v.extend(remote_and_branch(remote, branch));
            v
        }
        Action::GitPull { remote, branch } => {
            let mut v = vec!["pull".to_string()];
            v.extend(remote_and_branch(remote, branch));
            v
        }
        Action::GitRemoteAdd { name, url } => vec!["remote".into(), "add".into(), name.clone(), url.clone()],
        Action::ShowGraph => ["log", "--graph", "--oneline", "--decorate", "--all", "-n", "50"]
            .map(String::from)
            .to_vec(),
        _ => return None,
    };
    Some(args)
}

/// `git push <branch>` alone would treat the branch as a remote
fn remote_and_branch(
    remote: &Option<String>,
    branch: &Option<String>,
) -> Vec<String> {
    match (remote, branch) {
        (Some(r), Some(b)) => vec![r.clone(), b.clone()],
        (Some(r), None) => vec![r.clone()],
        (None, Some(b)) => vec!["origin".into(), b.clone()],
        (None, None) => Vec::new(),
    }
}

/// Spawn `program args..` in `dir` and capture its output
pub(crate) fn run_program(
    program: &std::path::Path,
    args: &[String],
    dir: Option<&std::path::Path>,
) -> Result<ExecOutcome> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!(program = %program.display(), ?args, "spawn");
    let output = cmd
        .output()
        .with_context(|| format!("Failed to spawn {}", program.display()))?;

    Ok(ExecOutcome {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

impl VcsRunner for GitCli {
    fn run(
        &self,
        action: &Action,
    ) -> Result<ExecOutcome> {
        let args = git_argv(action)
            .ok_or_else(|| anyhow::anyhow!("{} is not a version-control action", action.kind()))?;
        run_program(&self.program, &args, self.repo_root.as_deref())
    }
}
