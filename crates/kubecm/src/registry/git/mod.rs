//! Git-backed fetching of registry repositories.

pub mod parse;
pub mod repository;

use std::path::Path;

pub use repository::GitRepository;

use super::error::Result;

/// Brings a registry repository to a given ref on local disk.
pub trait RepositoryFetcher {
    /// Clones `url` into `dest`, or updates an existing clone, then checks out
    /// `git_ref`. Returns the checked-out commit.
    fn fetch(&self, url: &str, git_ref: &str, dest: &Path) -> Result<String>;
}

/// Default fetcher shelling out to the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitFetcher;

impl RepositoryFetcher for GitFetcher {
    fn fetch(&self, url: &str, git_ref: &str, dest: &Path) -> Result<String> {
        let repo = GitRepository::new(dest);
        if repo.is_git_repo() {
            repo.set_remote(url)?;
            repo.fetch()?;
            repo.checkout(git_ref)?;
        } else {
            GitRepository::clone_from(url, dest)?.checkout(git_ref)?;
        }

        let commit = repo.head_commit()?;
        log::info!(
            "Registry at {} is at {} ({})",
            dest.display(),
            parse::short_commit(&commit),
            git_ref
        );
        Ok(commit)
    }
}
