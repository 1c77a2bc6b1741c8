use git2::{ErrorCode, Oid, RebaseOptions, Signature};
use tracing::{debug, info, instrument, warn};

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

impl GitRepo {
    /// Replay the commits of `branch_name` that are not on `onto` on top of
    /// `onto`, returning the new tip.
    ///
    /// Commits already present upstream are skipped. On conflicts the rebase
    /// is aborted, the branch keeps its old tip and `RebaseConflict` is
    /// returned.
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn rebase(&self, branch_name: &str, onto: &str) -> Result<Oid> {
        if !self.has_branch(branch_name)? {
            return Err(self.error(ErrorKind::UnknownBranch {
                branch: branch_name.to_string(),
                operation: format!("rebase it onto '{onto}'"),
            }));
        }
        let onto_oid = self.branch_tip(onto)?;

        if self.is_dirty()? {
            return Err(self.error(ErrorKind::DirtyWorkingTree {
                branch: branch_name.to_string(),
                operation: "rebase".to_string(),
            }));
        }

        // Before any rebase state is written.
        let signature = self.create_signature()?;

        let guard = self.switch_to_branch(branch_name)?;
        self.replay_commits(branch_name, onto, onto_oid, &signature)?;
        guard.finish()?;

        let new_tip = self.branch_tip(branch_name)?;
        info!(%new_tip, "rebase completed");
        Ok(new_tip)
    }

    fn replay_commits(
        &self,
        branch_name: &str,
        onto: &str,
        onto_oid: Oid,
        signature: &Signature<'_>,
    ) -> Result<()> {
        let conflict = || {
            self.error(ErrorKind::RebaseConflict {
                branch: branch_name.to_string(),
                onto: onto.to_string(),
            })
        };

        let branch_ref = self
            .repo()
            .find_reference(&format!("refs/heads/{branch_name}"))
            .during(self.path(), format!("find branch '{branch_name}'"))?;
        let branch_commit = self
            .repo()
            .reference_to_annotated_commit(&branch_ref)
            .during(self.path(), format!("look up '{branch_name}' for rebase"))?;
        let onto_commit = self
            .repo()
            .find_annotated_commit(onto_oid)
            .during(self.path(), format!("look up '{onto}' for rebase"))?;

        let mut options = RebaseOptions::new();
        let mut rebase = self
            .repo()
            .rebase(
                Some(&branch_commit),
                Some(&onto_commit),
                None,
                Some(&mut options),
            )
            .during(self.path(), format!("start rebase of '{branch_name}' onto '{onto}'"))?;

        while let Some(operation) = rebase.next() {
            let step = operation.and_then(|_| {
                if self.repo().index()?.has_conflicts() {
                    return Err(git2::Error::new(
                        ErrorCode::Conflict,
                        git2::ErrorClass::Rebase,
                        "conflicts in index",
                    ));
                }
                skip_applied(rebase.commit(None, signature, None))
            });

            if let Err(e) = step {
                warn!(error = %e, "rebase step failed, aborting");
                rebase
                    .abort()
                    .during(self.path(), format!("abort rebase of '{branch_name}'"))?;
                return match e.code() {
                    ErrorCode::Conflict | ErrorCode::MergeConflict | ErrorCode::Unmerged => {
                        Err(conflict())
                    }
                    _ => Err(e).during(self.path(), format!("rebase '{branch_name}' onto '{onto}'")),
                };
            }
        }

        rebase
            .finish(Some(signature))
            .during(self.path(), format!("finish rebase of '{branch_name}'"))
    }
}

/// A commit that became empty because its change is already upstream is
/// skipped rather than treated as a failure.
fn skip_applied(
    result: std::result::Result<Oid, git2::Error>,
) -> std::result::Result<(), git2::Error> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.code() == ErrorCode::Applied => {
            debug!("skipping commit already applied upstream");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
