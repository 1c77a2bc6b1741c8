use git2::{FetchOptions, FetchPrune};
use tracing::{debug, info, instrument};

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

impl GitRepo {
    /// Fetch every remote, pruning remote-tracking refs whose branch is gone.
    ///
    /// Only remote-tracking refs are updated; local branches and the working
    /// tree are left alone.
    pub fn fetch_updates(&self) -> Result<()> {
        for remote_name in self.remote_names()? {
            self.fetch_remote(&remote_name)?;
        }
        Ok(())
    }

    /// Fetch a single remote using its configured refspecs
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn fetch_remote(&self, remote_name: &str) -> Result<()> {
        let mut remote = self.repo().find_remote(remote_name).map_err(|_| {
            self.error(ErrorKind::UnknownRemote(remote_name.to_string()))
        })?;

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.prune(FetchPrune::On);

        remote
            .fetch(&[] as &[&str], Some(&mut fetch_opts), None)
            .during(self.path(), format!("fetch from remote '{remote_name}'"))?;

        let stats = remote.stats();
        debug!(
            received = stats.received_objects(),
            total = stats.total_objects(),
            "fetch completed"
        );
        Ok(())
    }

    /// Fast-forward `branch_name` to `source` (typically its tracking branch).
    ///
    /// Fails with `NonFastForward` when `source` does not contain the branch
    /// tip, leaving the branch untouched. A checked-out branch takes the
    /// working tree along; any other branch only has its ref moved.
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn pull(&self, branch_name: &str, source: &str) -> Result<()> {
        let local_tip = self.branch_tip(branch_name)?;
        let source_tip = self.branch_tip(source)?;

        if local_tip == source_tip {
            return Ok(());
        }

        let fast_forward = self
            .repo()
            .graph_descendant_of(source_tip, local_tip)
            .during(self.path(), format!("compare '{branch_name}' with '{source}'"))?;
        if !fast_forward {
            return Err(self.error(ErrorKind::NonFastForward {
                branch: branch_name.to_string(),
                source_ref: source.to_string(),
            }));
        }

        if self.is_checked_out(branch_name)? {
            let target = self
                .repo()
                .find_object(source_tip, None)
                .during(self.path(), format!("find '{source}'"))?;
            self.checkout_tree_safely(&target, branch_name, "fast-forward")?;
        }

        self.repo()
            .reference(
                &format!("refs/heads/{branch_name}"),
                source_tip,
                true,
                &format!("nodesync: fast-forward to {source}"),
            )
            .during(self.path(), format!("fast-forward '{branch_name}'"))?;

        info!(from = %local_tip, to = %source_tip, "fast-forwarded branch");
        Ok(())
    }
}
