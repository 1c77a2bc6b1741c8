use git2::{BranchType, ErrorCode};
use tracing::debug;

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

impl GitRepo {
    /// Remote tracking branch of a local branch, as `remote/branch`.
    ///
    /// Returns `None` when no upstream is configured or the configured
    /// upstream ref no longer exists (e.g. pruned after a fetch).
    pub fn tracking_branch(&self, branch_name: &str) -> Result<Option<String>> {
        let branch = self
            .repo()
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| {
                self.error(ErrorKind::UnknownBranch {
                    branch: branch_name.to_string(),
                    operation: "look up its tracking branch".to_string(),
                })
            })?;

        let upstream = match branch.upstream() {
            Ok(upstream) => upstream,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).during(self.path(), format!("read upstream of '{branch_name}'"))
            }
        };

        Ok(upstream
            .name()
            .during(self.path(), "read upstream name")?
            .map(str::to_string))
    }

    /// Make `branch_name` track `remote/branch_name`.
    pub fn set_upstream(&self, branch_name: &str, remote_name: &str) -> Result<()> {
        let mut branch = self
            .repo()
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| {
                self.error(ErrorKind::UnknownBranch {
                    branch: branch_name.to_string(),
                    operation: "set its upstream".to_string(),
                })
            })?;

        let upstream = format!("{remote_name}/{branch_name}");
        branch
            .set_upstream(Some(&upstream))
            .during(self.path(), format!("set upstream of '{branch_name}' to '{upstream}'"))?;

        debug!(branch = branch_name, upstream = %upstream, "set upstream");
        Ok(())
    }
}
