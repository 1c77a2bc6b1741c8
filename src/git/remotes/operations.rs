use std::cell::RefCell;

use git2::{ErrorCode, Oid, PushOptions, RemoteCallbacks};
use tracing::{info, instrument, warn};

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::{GitRepo, RemoteInfo};

/// What the remote did with a pushed reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote had no such branch; it was created.
    NewBranch,
    /// The remote branch moved forward along its own history.
    FastForward,
    /// The remote branch was rewritten.
    ForcedUpdate,
    /// The remote branch already pointed at the pushed commit.
    UpToDate,
}

impl GitRepo {
    /// Add a remote repository
    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.repo()
            .remote(name, url)
            .during(self.path(), format!("add remote '{name}' with URL '{url}'"))?;

        Ok(())
    }

    /// Register `name` with `url` unless a remote of that name already exists.
    /// Returns true if the remote was created.
    pub fn ensure_remote(&self, name: &str, url: &str) -> Result<bool> {
        if self.has_remote(name)? {
            return Ok(false);
        }
        self.add_remote(name, url)?;
        info!(remote = name, url, "registered remote");
        Ok(true)
    }

    /// List all remotes with their URLs
    pub fn get_remotes(&self) -> Result<Vec<RemoteInfo>> {
        let mut remote_infos = Vec::new();
        for name in self.remote_names()? {
            let remote = self
                .repo()
                .find_remote(&name)
                .during(self.path(), format!("find remote '{name}'"))?;

            let url = remote.url().unwrap_or("<no url>").to_string();
            remote_infos.push(RemoteInfo { name, url });
        }

        Ok(remote_infos)
    }

    pub fn remote_names(&self) -> Result<Vec<String>> {
        let remotes = self
            .repo()
            .remotes()
            .during(self.path(), "list remotes")?;

        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    pub fn has_remote(&self, name: &str) -> Result<bool> {
        Ok(self.remote_names()?.iter().any(|remote| remote == name))
    }

    /// Push `branch_name` to the branch of the same name on `remote_name`.
    pub fn push(&self, branch_name: &str, remote_name: &str, force: bool) -> Result<PushOutcome> {
        self.push_to(branch_name, remote_name, branch_name, force)
    }

    /// Push local `branch_name` to `remote_branch` on `remote_name`.
    ///
    /// The outcome is derived from the remote's tip before and after the
    /// push. A refused non-forced update fails with `RejectedPush`. On
    /// success the matching remote-tracking ref is updated.
    #[instrument(skip(self), fields(repo = %self.path().display()))]
    pub fn push_to(
        &self,
        branch_name: &str,
        remote_name: &str,
        remote_branch: &str,
        force: bool,
    ) -> Result<PushOutcome> {
        let mut remote = self.repo().find_remote(remote_name).map_err(|_| {
            self.error(ErrorKind::UnknownRemote(remote_name.to_string()))
        })?;

        let refspec = format!(
            "{}refs/heads/{branch_name}:refs/heads/{remote_branch}",
            if force { "+" } else { "" }
        );

        let updates: RefCell<Vec<(Oid, Oid)>> = RefCell::new(Vec::new());
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        let mut callbacks = RemoteCallbacks::new();
        callbacks.push_negotiation(|negotiated| {
            updates
                .borrow_mut()
                .extend(negotiated.iter().map(|update| (update.src(), update.dst())));
            Ok(())
        });
        callbacks.push_update_reference(|refname, status| {
            if let Some(msg) = status {
                warn!(refname, msg, "push rejected");
                *rejection.borrow_mut() = Some(msg.to_string());
            }
            Ok(())
        });

        let mut push_opts = PushOptions::new();
        push_opts.remote_callbacks(callbacks);

        let rejected = |detail: String| {
            self.error(ErrorKind::RejectedPush {
                branch: branch_name.to_string(),
                remote: remote_name.to_string(),
                detail,
            })
        };

        match remote.push(&[&refspec], Some(&mut push_opts)) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFastForward => {
                return Err(rejected(e.message().to_string()))
            }
            Err(e) => {
                return Err(e).during(
                    self.path(),
                    format!("push '{branch_name}' to '{remote_name}/{remote_branch}'"),
                )
            }
        }

        if let Some(detail) = rejection.borrow_mut().take() {
            return Err(rejected(detail));
        }

        let local_tip = self.branch_tip(branch_name)?;
        let outcome = match updates.borrow().first() {
            None => PushOutcome::UpToDate,
            Some((old, _)) if old.is_zero() => PushOutcome::NewBranch,
            Some((old, new)) if old == new => PushOutcome::UpToDate,
            Some((old, new)) => {
                // An unknown old tip cannot be an ancestor of the pushed commit.
                let fast_forward = self.repo().graph_descendant_of(*new, *old).unwrap_or(false);
                if fast_forward {
                    PushOutcome::FastForward
                } else {
                    PushOutcome::ForcedUpdate
                }
            }
        };

        self.repo()
            .reference(
                &format!("refs/remotes/{remote_name}/{remote_branch}"),
                local_tip,
                true,
                "nodesync: update remote-tracking ref after push",
            )
            .during(self.path(), "update remote-tracking ref")?;

        info!(?outcome, "push completed");
        Ok(outcome)
    }
}
