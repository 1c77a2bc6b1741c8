//! Error types for repository operations.
//!
//! Every failure is reported as a [`GitRepoError`], which names the
//! repository it happened in. The [`ErrorKind`] carries the branch(es), the
//! operation attempted and what a human should do about it.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GitRepoError>;

/// An error raised while operating on a specific repository.
#[derive(Debug, Error)]
#[error("Error in Git repository {}: {kind}", .repo.display())]
pub struct GitRepoError {
    repo: PathBuf,
    kind: ErrorKind,
}

impl GitRepoError {
    pub fn new(repo: &Path, kind: ErrorKind) -> Self {
        Self {
            repo: repo.to_path_buf(),
            kind,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("not a usable working copy: {0}")]
    InvalidRepository(String),

    #[error("repo has no branch '{branch}', cannot {operation}")]
    UnknownBranch { branch: String, operation: String },

    #[error("repo has no remote '{0}'")]
    UnknownRemote(String),

    #[error(
        "repo contains uncommitted changes, cannot {operation} on branch '{branch}'. \
         Please commit or stash your changes and try again"
    )]
    DirtyWorkingTree { branch: String, operation: String },

    #[error(
        "cannot pull branch '{branch}' from '{source_ref}': the update is not a fast-forward \
         because the histories have diverged. Please resolve manually"
    )]
    NonFastForward { branch: String, source_ref: String },

    #[error("remote '{remote}' rejected the push of branch '{branch}': {detail}")]
    RejectedPush {
        branch: String,
        remote: String,
        detail: String,
    },

    #[error("git command failed: {command} {remote} {branch}")]
    PushFailed {
        command: String,
        remote: String,
        branch: String,
    },

    #[error(
        "unable to merge '{from}' into '{into}' because of merge conflicts. Please merge manually"
    )]
    MergeConflict { into: String, from: String },

    #[error(
        "unable to automatically rebase '{branch}' on '{onto}' because of merge conflicts. \
         Please rebase manually"
    )]
    RebaseConflict { branch: String, onto: String },

    #[error(
        "branch '{branch}' cannot be pushed to remote '{remote}' because its history has diverged \
         from the upstream branch. Please resolve manually or allow for '--force' push"
    )]
    DivergedPush { branch: String, remote: String },

    #[error(
        "cannot pull branch '{branch}' because it has no upstream on remote '{remote}'. \
         Please resolve manually"
    )]
    MissingUpstream { branch: String, remote: String },

    #[error("{0}")]
    InvariantViolation(String),

    #[error("{operation} failed: {source}")]
    Git {
        operation: String,
        #[source]
        source: git2::Error,
    },
}

/// Attaches the repository and the attempted operation to a raw `git2` error.
pub(crate) trait GitResultExt<T> {
    fn during(self, repo: &Path, operation: impl Into<String>) -> Result<T>;
}

impl<T> GitResultExt<T> for std::result::Result<T, git2::Error> {
    fn during(self, repo: &Path, operation: impl Into<String>) -> Result<T> {
        self.map_err(|source| {
            GitRepoError::new(
                repo,
                ErrorKind::Git {
                    operation: operation.into(),
                    source,
                },
            )
        })
    }
}
