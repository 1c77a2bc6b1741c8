use std::path::{Path, PathBuf};

use git2::{Repository, StatusOptions};
use tracing::debug;

use crate::git::error::{ErrorKind, GitRepoError, GitResultExt, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteInfo {
    pub name: String,
    pub url: String,
}

/// A local working copy together with its declared main branch and default
/// remote.
pub struct GitRepo {
    path: PathBuf,
    repo: Repository,
    main_branch: String,
    default_remote: String,
}

impl GitRepo {
    /// Open the working copy at `path`.
    ///
    /// Fails unless the repository is non-bare and contains both the local
    /// branch `main_branch` and the remote `default_remote`.
    pub fn open<P: AsRef<Path>>(path: P, main_branch: &str, default_remote: &str) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| {
            GitRepoError::new(
                path,
                ErrorKind::InvalidRepository(format!("not a valid Git repository ({e})")),
            )
        })?;

        if repo.is_bare() {
            return Err(GitRepoError::new(
                path,
                ErrorKind::InvalidRepository("repo is a bare repo".to_string()),
            ));
        }

        let git_repo = Self {
            path: path.to_path_buf(),
            repo,
            main_branch: main_branch.to_string(),
            default_remote: default_remote.to_string(),
        };

        if !git_repo.has_branch(main_branch)? {
            return Err(git_repo.error(ErrorKind::UnknownBranch {
                branch: main_branch.to_string(),
                operation: "use it as main branch".to_string(),
            }));
        }
        if !git_repo.has_remote(default_remote)? {
            return Err(git_repo.error(ErrorKind::UnknownRemote(default_remote.to_string())));
        }

        debug!(path = %path.display(), main_branch, default_remote, "opened repository");
        Ok(git_repo)
    }

    /// Initialize a new git repository whose HEAD points at an unborn
    /// `master` branch.
    #[cfg(test)]
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if Repository::open(path_ref).is_ok() {
            return Err(GitRepoError::new(
                path_ref,
                ErrorKind::InvalidRepository("directory is already a git repository".to_string()),
            ));
        }

        let repo = Repository::init(path_ref).during(path_ref, "init repository")?;
        repo.set_head("refs/heads/master")
            .during(path_ref, "set HEAD to master")?;

        Ok(Self::from_parts(path_ref, repo))
    }

    /// Initialize a new bare git repository, used as a shared remote in tests.
    #[cfg(test)]
    pub fn init_bare<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if Repository::open(path_ref).is_ok() {
            return Err(GitRepoError::new(
                path_ref,
                ErrorKind::InvalidRepository("directory is already a git repository".to_string()),
            ));
        }

        let repo = Repository::init_bare(path_ref).during(path_ref, "init bare repository")?;
        repo.set_head("refs/heads/master")
            .during(path_ref, "set HEAD to master")?;

        Ok(Self::from_parts(path_ref, repo))
    }

    #[cfg(test)]
    fn from_parts(path: &Path, repo: Repository) -> Self {
        Self {
            path: path.to_path_buf(),
            repo,
            main_branch: "master".to_string(),
            default_remote: "origin".to_string(),
        }
    }

    /// Root directory of the working tree
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn main_branch_name(&self) -> &str {
        &self.main_branch
    }

    pub fn default_remote(&self) -> &str {
        &self.default_remote
    }

    /// True if tracked files have uncommitted changes. Untracked files are
    /// not considered.
    pub fn is_dirty(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .during(&self.path, "read working tree status")?;

        Ok(statuses
            .iter()
            .any(|entry| entry.status() != git2::Status::CURRENT))
    }

    /// Get access to the internal git2 Repository
    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> GitRepoError {
        GitRepoError::new(&self.path, kind)
    }
}
