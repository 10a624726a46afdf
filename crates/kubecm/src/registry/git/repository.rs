//! Git repository operations.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::parse::{first_line, format_git_error};
use crate::registry::error::{classify_git_error, RegistryError, Result};

/// A local clone of a registry repository.
pub struct GitRepository {
    /// Path to the working tree.
    repo_path: PathBuf,
}

impl GitRepository {
    /// Creates a handle for the given working tree. Nothing is touched on disk.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Returns the repository path.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Checks if the directory is a git repository.
    pub fn is_git_repo(&self) -> bool {
        self.repo_path.join(".git").exists()
    }

    /// Clones `url` into `dest`. The parent of `dest` is created if needed.
    pub fn clone_from(url: &str, dest: &Path) -> Result<Self> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| RegistryError::WriteFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        log::debug!("Cloning {} into {}", url, dest.display());

        let output = Command::new("git")
            .arg("clone")
            .arg("--quiet")
            .arg("--")
            .arg(url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| RegistryError::GitOperation(e.to_string()))?;

        if !output.status.success() {
            return Err(classify_git_error(&format_git_error(&output)));
        }

        Ok(Self::new(dest))
    }

    /// Points `origin` at `url`.
    pub fn set_remote(&self, url: &str) -> Result<()> {
        self.git_checked(&["remote", "set-url", "origin", url])
            .map(|_| ())
    }

    /// Fetches branches and tags from `origin`, pruning deleted branches.
    pub fn fetch(&self) -> Result<()> {
        if !self.is_git_repo() {
            return Err(RegistryError::GitNotInitialized);
        }
        self.git_checked(&["fetch", "--quiet", "--prune", "--tags", "origin"])
            .map(|_| ())
    }

    /// Checks out `git_ref`.
    ///
    /// A branch that exists on `origin` is checked out as a local branch reset
    /// to the remote tip. Anything else (tag, commit) is checked out detached.
    pub fn checkout(&self, git_ref: &str) -> Result<()> {
        if !self.is_git_repo() {
            return Err(RegistryError::GitNotInitialized);
        }

        let output = if self.has_remote_branch(git_ref)? {
            let remote_ref = format!("origin/{}", git_ref);
            self.run_git(&["checkout", "--quiet", "-B", git_ref, &remote_ref])?
        } else {
            let commit = self
                .resolve_commit(git_ref)?
                .ok_or_else(|| RegistryError::GitRefNotFound(git_ref.to_string()))?;
            self.run_git(&["checkout", "--quiet", "--detach", &commit])?
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(classify_git_error(&format_git_error(&output)))
        }
    }

    /// Returns the commit hash `HEAD` points at.
    pub fn head_commit(&self) -> Result<String> {
        let output = self.git_checked(&["rev-parse", "HEAD"])?;
        Ok(first_line(&output))
    }

    /// Resolves a tag, branch or hash to a commit, `None` when unknown.
    fn resolve_commit(&self, git_ref: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", git_ref);
        let output = self.run_git(&["rev-parse", "--verify", "--quiet", &spec])?;
        if output.status.success() {
            Ok(Some(first_line(&output)))
        } else {
            Ok(None)
        }
    }

    fn has_remote_branch(&self, branch: &str) -> Result<bool> {
        let full = format!("refs/remotes/origin/{}", branch);
        let output = self.run_git(&["rev-parse", "--verify", "--quiet", &full])?;
        Ok(output.status.success())
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    /// Runs a git command and classifies a non-zero exit.
    fn git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run_git(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(classify_git_error(&format_git_error(&output)))
        }
    }

    /// Runs a git command in the repository directory.
    fn run_git(&self, args: &[&str]) -> Result<Output> {
        let output = Command::new("git")
            .current_dir(&self.repo_path)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| RegistryError::GitOperation(e.to_string()))?;

        Ok(output)
    }
}
