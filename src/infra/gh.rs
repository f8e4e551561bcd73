//! Remote-repository host runner backed by the GitHub CLI (`gh`)

use std::path::PathBuf;

use anyhow::Result;

use crate::core::action::Action;
use crate::core::ports::{ExecOutcome, HostClient};
use crate::infra::git::run_program;

#[derive(Debug, Clone)]
pub struct GhCli {
    program: PathBuf,
    repo_root: Option<PathBuf>,
}

impl Default for GhCli {
    fn default() -> Self {
        Self { program: PathBuf::from("gh"), repo_root: None }
    }
}

impl GhCli {
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

/// Arguments passed to `gh` for a host Action
pub fn gh_argv(action: &Action) -> Option<Vec<String>> {
    let args = match action {
        Action::HostCreateRepo { name, private } => {
            let visibility = if *private { "--private" } else { "--public" };
            vec!["repo".into(), "create".into(), name.clone(), visibility.into()]
        }
        Action::HostCreateIssue { title, body } => vec![
            "issue".into(),
            "create".into(),
            "--title".into(),
            title.clone(),
            "--body".into(),
            body.clone().unwrap_or_default(),
        ],
        Action::HostCreatePr { title, body, head, base } => {
            let mut v: Vec<String> = vec![
                "pr".into(),
                "create".into(),
                "--title".into(),
                title.clone(),
                "--body".into(),
                body.clone().unwrap_or_default(),
            ];
            if let Some(head) = head {
                v.extend(["--head".to_string(), head.clone()]);
            }
            if let Some(base) = base {
                v.extend(["--base".to_string(), base.clone()]);
            }
            v
        }
        _ => return None,
    };
    Some(args)
}

impl HostClient for GhCli {
    fn run(
        &self,
        action: &Action,
    ) -> Result<ExecOutcome> {
        let args =
            gh_argv(action).ok_or_else(|| anyhow::anyhow!("{} is not a host action", action.kind()))?;
        run_program(&self.program, &args, self.repo_root.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_visibility() {
        assert_eq!(
            gh_argv(&Action::HostCreateRepo { name: "demo".into(), private: true }).unwrap(),
            vec!["repo", "create", "demo", "--private"]
        );
    }

    #[test]
    fn test_pr_head_and_base() {
        let argv = gh_argv(&Action::HostCreatePr {
            title: "Add login".into(),
            body: None,
            head: Some("feature".into()),
            base: Some("main".into()),
        })
        .unwrap();
        assert_eq!(
            argv,
            vec!["pr", "create", "--title", "Add login", "--body", "", "--head", "feature", "--base", "main"]
        );
    }

    #[test]
    fn test_issue_body_defaults_empty() {
        let argv = gh_argv(&Action::HostCreateIssue { title: "Crash".into(), body: None }).unwrap();
        assert_eq!(argv[5], "");
        assert_eq!(gh_argv(&Action::GitInit), None);
    }
}
