use git2::{BranchType, ErrorCode, Oid};
use tracing::{debug, info, instrument};

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

impl GitRepo {
    /// Names of all local branches
    pub fn branch_names(&self) -> Result<Vec<String>> {
        self.list_branches(BranchType::Local)
    }

    /// Names of all remote branches, in the form `remote/branch`
    pub fn remote_branch_names(&self) -> Result<Vec<String>> {
        let mut names = self.list_branches(BranchType::Remote)?;
        // Symbolic `origin/HEAD` refs are not branches.
        names.retain(|name| !name.ends_with("/HEAD"));
        Ok(names)
    }

    fn list_branches(&self, branch_type: BranchType) -> Result<Vec<String>> {
        let mut branches = Vec::new();

        let branch_iter = self
            .repo()
            .branches(Some(branch_type))
            .during(self.path(), "list branches")?;

        for branch in branch_iter {
            let (branch, _) = branch.during(self.path(), "list branches")?;
            if let Some(name) = branch.name().during(self.path(), "read branch name")? {
                branches.push(name.to_string());
            }
        }

        Ok(branches)
    }

    pub fn has_branch(&self, name: &str) -> Result<bool> {
        self.branch_exists(name, BranchType::Local)
    }

    /// `name` is given as `remote/branch`.
    pub fn has_remote_branch(&self, name: &str) -> Result<bool> {
        self.branch_exists(name, BranchType::Remote)
    }

    fn branch_exists(&self, name: &str, branch_type: BranchType) -> Result<bool> {
        match self.repo().find_branch(name, branch_type) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e).during(self.path(), format!("look up branch '{name}'")),
        }
    }

    /// Commit id at the tip of a local or remote branch, or of any revision
    /// git can parse.
    pub fn branch_tip(&self, refname: &str) -> Result<Oid> {
        let candidates = [
            format!("refs/heads/{refname}"),
            format!("refs/remotes/{refname}"),
        ];
        for candidate in &candidates {
            if let Ok(reference) = self.repo().find_reference(candidate) {
                let commit = reference
                    .peel_to_commit()
                    .during(self.path(), format!("resolve '{refname}'"))?;
                return Ok(commit.id());
            }
        }

        let object = self.repo().revparse_single(refname).map_err(|_| {
            self.error(ErrorKind::UnknownBranch {
                branch: refname.to_string(),
                operation: "resolve it to a commit".to_string(),
            })
        })?;
        let commit = object
            .peel_to_commit()
            .during(self.path(), format!("resolve '{refname}'"))?;
        Ok(commit.id())
    }

    /// Create a local branch.
    ///
    /// When the default remote already carries a branch of that name, the new
    /// branch starts at the remote branch and tracks it. Otherwise it starts
    /// at `root`. Existing branches are left alone unless `raise_if_exists`.
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn create_branch(&self, name: &str, root: &str, raise_if_exists: bool) -> Result<()> {
        if self.has_branch(name)? {
            if raise_if_exists {
                return Err(self.error(ErrorKind::InvalidRepository(format!(
                    "cannot create new branch named '{name}' as it already exists"
                ))));
            }
            return Ok(());
        }

        let remote_counterpart = format!("{}/{name}", self.default_remote());
        let has_counterpart = self.has_remote_branch(&remote_counterpart)?;
        let start = if has_counterpart {
            remote_counterpart.as_str()
        } else {
            root
        };

        let oid = self.branch_tip(start)?;
        let commit = self
            .repo()
            .find_commit(oid)
            .during(self.path(), format!("find commit for '{start}'"))?;
        let mut branch = self
            .repo()
            .branch(name, &commit, false)
            .during(self.path(), format!("create branch '{name}'"))?;

        if has_counterpart {
            branch
                .set_upstream(Some(&remote_counterpart))
                .during(self.path(), format!("track '{remote_counterpart}'"))?;
        }

        info!(start, tracking = has_counterpart, "created branch");
        Ok(())
    }

    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo()
            .find_branch(name, BranchType::Local)
            .map_err(|_| {
                self.error(ErrorKind::UnknownBranch {
                    branch: name.to_string(),
                    operation: "delete it".to_string(),
                })
            })?;
        branch
            .delete()
            .during(self.path(), format!("delete branch '{name}'"))?;
        info!("deleted branch");
        Ok(())
    }

    /// Name of the checked-out branch, or `None` when HEAD is detached or
    /// unborn.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo().find_reference("HEAD") {
            Ok(head) => head,
            Err(e) => return Err(e).during(self.path(), "find HEAD"),
        };

        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string))
    }

    pub fn is_checked_out(&self, branch_name: &str) -> Result<bool> {
        Ok(self.current_branch()?.as_deref() == Some(branch_name) && !self.head_detached()?)
    }

    pub(crate) fn head_detached(&self) -> Result<bool> {
        self.repo().head_detached().during(self.path(), "read HEAD")
    }

    /// Switch to a local branch. Nothing happens if it is already checked out.
    pub fn switch(&self, branch_name: &str) -> Result<()> {
        if self.is_checked_out(branch_name)? {
            return Ok(());
        }

        let branch_ref = format!("refs/heads/{branch_name}");
        let obj = self.repo().revparse_single(&branch_ref).map_err(|_| {
            self.error(ErrorKind::UnknownBranch {
                branch: branch_name.to_string(),
                operation: format!("switch to branch '{branch_name}'"),
            })
        })?;

        self.checkout_tree_safely(&obj, branch_name, "switch branches")?;
        self.repo()
            .set_head(&branch_ref)
            .during(self.path(), format!("set HEAD to '{branch_name}'"))?;

        debug!(branch = branch_name, "switched branch");
        Ok(())
    }

    /// Check out a commit or remote branch (e.g. `origin/develop`) in
    /// detached-HEAD mode. Local branch names are switched to instead.
    pub fn checkout_detached(&self, refspec: &str) -> Result<()> {
        if self.has_branch(refspec)? {
            return self.switch(refspec);
        }

        let oid = self.branch_tip(refspec)?;
        let obj = self
            .repo()
            .find_object(oid, None)
            .during(self.path(), format!("find '{refspec}'"))?;

        self.checkout_tree_safely(&obj, refspec, "check out")?;
        self.repo()
            .set_head_detached(oid)
            .during(self.path(), format!("detach HEAD at '{refspec}'"))?;

        debug!(refspec, "checked out detached HEAD");
        Ok(())
    }

    /// Update the working tree to `obj`, refusing to overwrite local changes.
    pub(crate) fn checkout_tree_safely(
        &self,
        obj: &git2::Object<'_>,
        target: &str,
        operation: &str,
    ) -> Result<()> {
        let mut checkout_opts = git2::build::CheckoutBuilder::new();
        checkout_opts.safe();

        match self.repo().checkout_tree(obj, Some(&mut checkout_opts)) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ErrorCode::Conflict => {
                Err(self.error(ErrorKind::DirtyWorkingTree {
                    branch: target.to_string(),
                    operation: operation.to_string(),
                }))
            }
            Err(e) => Err(e).during(self.path(), format!("{operation} to '{target}'")),
        }
    }

    /// Commit summaries on `branch_name` that are not on the main branch,
    /// newest first. With `pattern`, only commits whose message contains it.
    pub fn history_between(&self, branch_name: &str, pattern: Option<&str>) -> Result<Vec<String>> {
        let tip = self.branch_tip(branch_name)?;
        let main_tip = self.branch_tip(self.main_branch_name())?;

        let mut revwalk = self.repo().revwalk().during(self.path(), "walk history")?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .during(self.path(), "walk history")?;
        revwalk.push(tip).during(self.path(), "walk history")?;
        revwalk.hide(main_tip).during(self.path(), "walk history")?;

        let mut lines = Vec::new();
        for oid in revwalk {
            let oid = oid.during(self.path(), "walk history")?;
            let commit = self
                .repo()
                .find_commit(oid)
                .during(self.path(), "find commit")?;
            let message = commit.message().unwrap_or("");
            if pattern.map_or(true, |p| message.contains(p)) {
                let short = &oid.to_string()[..7];
                lines.push(format!("{short} {}", commit.summary().unwrap_or("")));
            }
        }

        Ok(lines)
    }
}
