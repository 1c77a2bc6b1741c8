use git2::Oid;
use tracing::{debug, warn};

use crate::git::error::{GitResultExt, Result};
use crate::git::repository::core::GitRepo;

enum HeadState {
    Branch(String),
    Detached(Oid),
}

/// Scoped checkout. Restores whatever was checked out before when dropped,
/// or when [`BranchGuard::finish`] is called to observe restore errors.
pub struct BranchGuard<'a> {
    repo: &'a GitRepo,
    initial: Option<HeadState>,
}

impl GitRepo {
    /// Check out `branch_or_ref` (a local branch, or any ref in detached mode)
    /// until the returned guard goes out of scope.
    pub fn switch_to_branch(&self, branch_or_ref: &str) -> Result<BranchGuard<'_>> {
        let initial = match self.current_branch()? {
            Some(branch) if !self.head_detached()? => HeadState::Branch(branch),
            _ => {
                let head = self.repo().head().during(self.path(), "read HEAD")?;
                let oid = head
                    .peel_to_commit()
                    .during(self.path(), "resolve HEAD")?
                    .id();
                HeadState::Detached(oid)
            }
        };

        if self.has_branch(branch_or_ref)? {
            self.switch(branch_or_ref)?;
        } else {
            self.checkout_detached(branch_or_ref)?;
        }

        Ok(BranchGuard {
            repo: self,
            initial: Some(initial),
        })
    }
}

impl BranchGuard<'_> {
    /// Restore the initial checkout now and report any failure.
    pub fn finish(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        match self.initial.take() {
            Some(HeadState::Branch(branch)) => {
                // The branch may have been deleted while the guard was held.
                if self.repo.has_branch(&branch)? {
                    self.repo.switch(&branch)?;
                    debug!(branch, "restored branch");
                } else {
                    warn!(branch, "initial branch no longer exists, leaving HEAD where it is");
                }
            }
            Some(HeadState::Detached(oid)) => {
                self.repo.checkout_detached(&oid.to_string())?;
                debug!(%oid, "restored detached HEAD");
            }
            None => {}
        }
        Ok(())
    }
}

impl Drop for BranchGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "failed to restore the initially checked-out branch");
        }
    }
}
