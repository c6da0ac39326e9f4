//! Git collaborators: traits the caches are built on, plus a client that
//! shells out to a local `git`.

use crate::{CodenavError, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Repository a request is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repo {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryCommit {
    pub repository_id: i32,
    pub commit: String,
}

impl RepositoryCommit {
    pub fn new(repository_id: i32, commit: impl Into<String>) -> Self {
        Self {
            repository_id,
            commit: commit.into(),
        }
    }
}

/// Source of diffs for position translation.
pub trait GitClient: Send + Sync {
    /// Unified diff of `path` from `source` to `target` with no context lines.
    fn diff_path(&self, repo: &Repo, source: &str, target: &str, path: &str) -> Result<String>;
}

/// Source of commit existence and ancestry answers.
pub trait CommitClient: Send + Sync {
    /// One answer per input commit, in input order.
    fn commits_exist(&self, commits: &[RepositoryCommit]) -> Result<Vec<bool>>;

    fn is_ancestor(&self, repository_id: i32, ancestor: &str, descendant: &str) -> Result<bool>;
}

/// Runs `git` against registered local clones.
#[derive(Default)]
pub struct GitCommandClient {
    roots: RwLock<HashMap<i32, PathBuf>>,
}

impl GitCommandClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a repository id to the working tree holding its clone.
    pub fn register(&self, repo: &Repo, root: impl Into<PathBuf>) {
        self.roots.write().insert(repo.id, root.into());
    }

    fn root(&self, repository_id: i32) -> Result<PathBuf> {
        self.roots
            .read()
            .get(&repository_id)
            .cloned()
            .ok_or(CodenavError::UnknownRepository(repository_id))
    }

    fn commit_exists(root: &Path, commit: &str) -> Result<bool> {
        let spec = format!("{commit}^{{commit}}");
        let output = run_git(root, &["cat-file", "-e", &spec])?;
        Ok(output.status.success())
    }
}

fn run_git(root: &Path, args: &[&str]) -> Result<Output> {
    tracing::debug!(root = %root.display(), ?args, "running git");
    Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| CodenavError::Git {
            command: args.join(" "),
            message: e.to_string(),
        })
}

fn git_failure(args: &[&str], output: &Output) -> CodenavError {
    CodenavError::Git {
        command: args.join(" "),
        message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl GitClient for GitCommandClient {
    fn diff_path(&self, repo: &Repo, source: &str, target: &str, path: &str) -> Result<String> {
        let root = self.root(repo.id)?;
        let args = [
            "diff",
            "--no-color",
            "--no-ext-diff",
            "-U0",
            source,
            target,
            "--",
            path,
        ];
        let output = run_git(&root, &args)?;
        if !output.status.success() {
            return Err(git_failure(&args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CommitClient for GitCommandClient {
    fn commits_exist(&self, commits: &[RepositoryCommit]) -> Result<Vec<bool>> {
        let roots = commits
            .iter()
            .map(|rc| self.root(rc.repository_id))
            .collect::<Result<Vec<_>>>()?;

        commits
            .par_iter()
            .zip(roots.par_iter())
            .map(|(rc, root)| Self::commit_exists(root, &rc.commit))
            .collect()
    }

    fn is_ancestor(&self, repository_id: i32, ancestor: &str, descendant: &str) -> Result<bool> {
        let root = self.root(repository_id)?;
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        let output = run_git(&root, &args)?;
        // exit 1 means "not an ancestor"; anything else is a real failure
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(git_failure(&args, &output)),
        }
    }
}

/// Get the HEAD commit SHA for a repo, or None if not a git repo / git unavailable.
pub fn head_commit_sha(repo_root: &Path) -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_root)
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                Some(String::from_utf8_lossy(&o.stdout).trim().to_string())
            } else {
                None
            }
        })
}
