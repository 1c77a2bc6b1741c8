use git2::ResetType;
use tracing::{info, instrument};

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

impl GitRepo {
    /// Point `branch_name` at `target`, discarding commits that only exist on
    /// the branch.
    ///
    /// When the branch is checked out the index and working tree follow
    /// (hard reset), and uncommitted changes make the reset fail up front.
    /// Otherwise only the branch ref moves.
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn reset_branch_to(&self, branch_name: &str, target: &str) -> Result<()> {
        if !self.has_branch(branch_name)? {
            return Err(self.error(ErrorKind::UnknownBranch {
                branch: branch_name.to_string(),
                operation: format!("reset it to '{target}'"),
            }));
        }
        let old_tip = self.branch_tip(branch_name)?;
        let target_oid = self.branch_tip(target)?;

        if self.is_checked_out(branch_name)? {
            if self.is_dirty()? {
                return Err(self.error(ErrorKind::DirtyWorkingTree {
                    branch: branch_name.to_string(),
                    operation: "reset".to_string(),
                }));
            }
            let object = self
                .repo()
                .find_object(target_oid, None)
                .during(self.path(), format!("find '{target}'"))?;
            self.repo()
                .reset(&object, ResetType::Hard, None)
                .during(self.path(), format!("hard reset '{branch_name}' to '{target}'"))?;
        } else {
            self.repo()
                .reference(
                    &format!("refs/heads/{branch_name}"),
                    target_oid,
                    true,
                    &format!("nodesync: reset to {target}"),
                )
                .during(self.path(), format!("reset '{branch_name}' to '{target}'"))?;
        }

        info!(from = %old_tip, to = %target_oid, "reset branch");
        Ok(())
    }
}
