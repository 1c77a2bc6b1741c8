use git2::{build::CheckoutBuilder, ObjectType, Oid, ResetType};
use tracing::{debug, info, instrument, warn};

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

/// How a merge was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// `from` was already contained in `into`.
    UpToDate,
    /// `into` was moved forward to `from`.
    FastForward,
    /// A merge commit was created.
    Merged(Oid),
}

impl GitRepo {
    /// Merge `from` into the local branch `into`.
    ///
    /// Fast-forwards when possible and otherwise creates a merge commit. On
    /// conflicts the merge is aborted, the working tree is reset to the tip
    /// of `into`, and `MergeConflict` is returned. The previously checked-out
    /// branch is restored in every case.
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn merge(&self, into: &str, from: &str) -> Result<MergeOutcome> {
        if !self.has_branch(into)? {
            return Err(self.error(ErrorKind::UnknownBranch {
                branch: into.to_string(),
                operation: format!("merge '{from}' into it"),
            }));
        }
        let from_oid = self.branch_tip(from)?;

        if self.is_dirty()? {
            return Err(self.error(ErrorKind::DirtyWorkingTree {
                branch: into.to_string(),
                operation: "merge".to_string(),
            }));
        }

        let guard = self.switch_to_branch(into)?;
        let outcome = self.merge_into_head(into, from, from_oid)?;
        guard.finish()?;

        info!(?outcome, "merge completed");
        Ok(outcome)
    }

    fn merge_into_head(&self, into: &str, from: &str, from_oid: Oid) -> Result<MergeOutcome> {
        let annotated = self
            .repo()
            .find_annotated_commit(from_oid)
            .during(self.path(), format!("look up '{from}' for merge"))?;
        let (analysis, _) = self
            .repo()
            .merge_analysis(&[&annotated])
            .during(self.path(), format!("analyze merge of '{from}' into '{into}'"))?;

        if analysis.is_up_to_date() {
            debug!("nothing to merge");
            return Ok(MergeOutcome::UpToDate);
        }

        if analysis.is_fast_forward() {
            let target = self
                .repo()
                .find_object(from_oid, None)
                .during(self.path(), format!("find '{from}'"))?;
            self.checkout_tree_safely(&target, into, "merge")?;
            self.repo()
                .reference(
                    &format!("refs/heads/{into}"),
                    from_oid,
                    true,
                    &format!("nodesync: fast-forward merge of {from}"),
                )
                .during(self.path(), format!("fast-forward '{into}'"))?;
            return Ok(MergeOutcome::FastForward);
        }

        // Before any merge state is written.
        let signature = self.create_signature()?;
        let mut checkout = CheckoutBuilder::new();
        checkout.safe().conflict_style_merge(true);
        self.repo()
            .merge(&[&annotated], None, Some(&mut checkout))
            .during(self.path(), format!("merge '{from}' into '{into}'"))?;

        let mut index = self
            .repo()
            .index()
            .during(self.path(), "read index after merge")?;
        if index.has_conflicts() {
            self.abort_merge()?;
            return Err(self.error(ErrorKind::MergeConflict {
                into: into.to_string(),
                from: from.to_string(),
            }));
        }

        let tree_id = index
            .write_tree()
            .during(self.path(), "write merge tree")?;
        let tree = self
            .repo()
            .find_tree(tree_id)
            .during(self.path(), "find merge tree")?;
        let head_commit = self
            .repo()
            .head()
            .and_then(|head| head.peel_to_commit())
            .during(self.path(), "resolve HEAD")?;
        let from_commit = self
            .repo()
            .find_commit(from_oid)
            .during(self.path(), format!("find '{from}'"))?;

        let merge_commit = self
            .repo()
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &format!("Merge branch '{from}' into {into}"),
                &tree,
                &[&head_commit, &from_commit],
            )
            .during(self.path(), "create merge commit")?;

        self.repo()
            .cleanup_state()
            .during(self.path(), "clean up merge state")?;

        Ok(MergeOutcome::Merged(merge_commit))
    }

    /// Drop an in-progress merge and put the working tree back at HEAD.
    fn abort_merge(&self) -> Result<()> {
        warn!("merge conflict, aborting merge");
        let head = self
            .repo()
            .head()
            .and_then(|head| head.peel(ObjectType::Commit))
            .during(self.path(), "resolve HEAD")?;
        self.repo()
            .reset(&head, ResetType::Hard, None)
            .during(self.path(), "reset after aborted merge")?;
        self.repo()
            .cleanup_state()
            .during(self.path(), "clean up merge state")
    }
}
