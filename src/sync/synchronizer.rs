//! Pull, push and integration policies for a single branch.
//!
//! Every decision is taken from the [`BranchStatus`] of the branch, never
//! from file contents.

use tracing::{debug, info, instrument, warn};

use super::policy::{ConfirmPrompt, SyncPolicy};
use crate::git::error::Result;
use crate::git::{BranchStatus, ErrorKind, GitRepo, PushOutcome};

/// What [`reconcile`] did to a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Unchanged,
    FastForwarded,
    /// Local-only commits were discarded.
    Reset,
    /// A reset was proposed and refused at the prompt.
    Declined,
}

/// What [`integrate`] did to the node branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrateOutcome {
    Unchanged,
    FastForwarded,
    Rebased,
}

/// Bring `branch_name` in line with its tracking branch.
///
/// A branch that is behind is fast-forwarded. A diverged branch is reset to
/// its tracking branch if `policy` allows it, after asking when the policy
/// is [`SyncPolicy::Ask`]. With [`SyncPolicy::Deny`] the fast-forward is
/// attempted anyway so that the branch is left untouched and the caller gets
/// a `NonFastForward` error.
#[instrument(skip(repo, prompt), fields(repo = %repo.path().display()))]
pub fn reconcile(
    repo: &GitRepo,
    branch_name: &str,
    policy: SyncPolicy,
    require_upstream: bool,
    prompt: &dyn ConfirmPrompt,
) -> Result<ReconcileOutcome> {
    let status = repo.branch_status(branch_name, None)?;
    debug!(%status, "reconciling branch with its upstream");

    let upstream = match status {
        BranchStatus::UpToDate | BranchStatus::Ahead => return Ok(ReconcileOutcome::Unchanged),
        BranchStatus::NoUpstream if require_upstream => {
            return Err(repo.error(ErrorKind::MissingUpstream {
                branch: branch_name.to_string(),
                remote: repo.default_remote().to_string(),
            }))
        }
        BranchStatus::NoUpstream => return Ok(ReconcileOutcome::Unchanged),
        BranchStatus::Behind | BranchStatus::Diverged => upstream_of(repo, branch_name)?,
    };

    if status == BranchStatus::Behind {
        repo.pull(branch_name, &upstream)?;
        return Ok(ReconcileOutcome::FastForwarded);
    }

    let reset_allowed = match policy {
        SyncPolicy::Allow => true,
        SyncPolicy::Deny => {
            // Fails with NonFastForward and leaves the branch as it is.
            repo.pull(branch_name, &upstream)?;
            return Ok(ReconcileOutcome::Unchanged);
        }
        SyncPolicy::Ask => prompt.confirm(&format!(
            "Branch '{branch_name}' in {} has diverged from '{upstream}'. \
             Reset it to '{upstream}'? Commits that only exist locally will be lost.",
            repo.path().display()
        )),
    };

    if !reset_allowed {
        warn!(branch = branch_name, %upstream, "reset declined, branch left diverged");
        return Ok(ReconcileOutcome::Declined);
    }

    repo.reset_branch_to(branch_name, &upstream)?;
    Ok(ReconcileOutcome::Reset)
}

/// Push `branch_name` to the default remote according to its status.
///
/// Returns the push report, or `None` when there was nothing to push. A
/// diverged branch is only pushed with `allow_force`.
#[instrument(skip(repo), fields(repo = %repo.path().display()))]
pub fn publish(repo: &GitRepo, branch_name: &str, allow_force: bool) -> Result<Option<PushOutcome>> {
    let remote = repo.default_remote();
    let status = repo.branch_status(branch_name, None)?;

    let (command, force, expected) = match status {
        BranchStatus::UpToDate | BranchStatus::Behind => return Ok(None),
        BranchStatus::Ahead => ("git push", false, PushOutcome::FastForward),
        BranchStatus::Diverged if allow_force => ("git push --force", true, PushOutcome::ForcedUpdate),
        BranchStatus::Diverged => {
            return Err(repo.error(ErrorKind::DivergedPush {
                branch: branch_name.to_string(),
                remote: remote.to_string(),
            }))
        }
        BranchStatus::NoUpstream => ("git push --set-upstream", false, PushOutcome::NewBranch),
    };

    let outcome = repo.push(branch_name, remote, force)?;
    if outcome != expected {
        return Err(repo.error(ErrorKind::PushFailed {
            command: command.to_string(),
            remote: remote.to_string(),
            branch: branch_name.to_string(),
        }));
    }

    if status == BranchStatus::NoUpstream {
        repo.set_upstream(branch_name, remote)?;
    }

    info!(branch = branch_name, ?outcome, "published branch");
    Ok(Some(outcome))
}

/// Bring the main line into `node_branch`.
///
/// A node branch without local-only commits is fast-forwarded. A diverged
/// one is rebased onto `main_branch`, and a conflict aborts the rebase with
/// `RebaseConflict`.
#[instrument(skip(repo), fields(repo = %repo.path().display()))]
pub fn integrate(repo: &GitRepo, node_branch: &str, main_branch: &str) -> Result<IntegrateOutcome> {
    match repo.branch_status(node_branch, Some(main_branch))? {
        BranchStatus::Behind => {
            repo.pull(node_branch, main_branch)?;
            Ok(IntegrateOutcome::FastForwarded)
        }
        BranchStatus::Diverged => {
            repo.rebase(node_branch, main_branch)?;
            Ok(IntegrateOutcome::Rebased)
        }
        BranchStatus::UpToDate | BranchStatus::Ahead | BranchStatus::NoUpstream => {
            Ok(IntegrateOutcome::Unchanged)
        }
    }
}

fn upstream_of(repo: &GitRepo, branch_name: &str) -> Result<String> {
    repo.tracking_branch(branch_name)?.ok_or_else(|| {
        repo.error(ErrorKind::MissingUpstream {
            branch: branch_name.to_string(),
            remote: repo.default_remote().to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::{integrate, publish, reconcile, IntegrateOutcome, ReconcileOutcome};
    use crate::{
        git::{ErrorKind, PushOutcome},
        sync::policy::SyncPolicy,
        test_utils::{
            clone_test_repo, create_node_clone, RepoAssertions, RepoTestOperations,
            ScriptedPrompt,
        },
    };

    /// Local `master` and `origin/master` each get one commit the other lacks.
    fn diverge_master(
        local: &crate::git::GitRepo,
        remote: &crate::git::GitRepo,
    ) -> (assert_fs::TempDir, crate::git::GitRepo) {
        let (other_dir, other) = clone_test_repo(remote);
        other
            .add_file_and_commit("other.txt", "other", "Other node commit")
            .unwrap();
        other.push("master", "origin", false).unwrap();
        local
            .add_file_and_commit("local.txt", "local", "Local commit")
            .unwrap();
        local.fetch_updates().unwrap();
        (other_dir, other)
    }

    #[test]
    fn reconcile_up_to_date_branch_twice_changes_nothing() {
        let (_remote_dir, _remote, _local_dir, local) = create_node_clone();
        let prompt = ScriptedPrompt::new(&[]);
        let tip = local.branch_tip("master").unwrap();

        for _ in 0..2 {
            assert_eq!(
                reconcile(&local, "master", SyncPolicy::Deny, true, &prompt).unwrap(),
                ReconcileOutcome::Unchanged
            );
            assert_eq!(local.branch_tip("master").unwrap(), tip);
        }
        assert!(prompt.questions().is_empty());
    }

    #[test]
    fn reconcile_fast_forwards_behind_branch() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        let (_other_dir, other) = clone_test_repo(&remote);
        other
            .add_file_and_commit("new.txt", "new", "New commit")
            .unwrap();
        other.push("master", "origin", false).unwrap();
        local.fetch_updates().unwrap();

        let outcome =
            reconcile(&local, "master", SyncPolicy::Deny, true, &ScriptedPrompt::new(&[])).unwrap();

        assert_eq!(outcome, ReconcileOutcome::FastForwarded);
        assert_eq!(
            local.branch_tip("master").unwrap(),
            other.branch_tip("master").unwrap()
        );
        local.assert_file_exists("new.txt");
    }

    #[test]
    fn reconcile_deny_on_diverged_branch_fails_and_keeps_tip() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        let (_other_dir, _other) = diverge_master(&local, &remote);
        let tip = local.branch_tip("master").unwrap();

        let err = reconcile(&local, "master", SyncPolicy::Deny, true, &ScriptedPrompt::new(&[]))
            .unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::NonFastForward { .. }));
        assert_eq!(local.branch_tip("master").unwrap(), tip);
    }

    #[test]
    fn reconcile_allow_resets_diverged_branch() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        let (_other_dir, other) = diverge_master(&local, &remote);

        let outcome =
            reconcile(&local, "master", SyncPolicy::Allow, false, &ScriptedPrompt::new(&[]))
                .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Reset);
        assert_eq!(
            local.branch_tip("master").unwrap(),
            other.branch_tip("master").unwrap()
        );
        local.assert_file_not_exists("local.txt");
    }

    #[test]
    fn reconcile_ask_resets_only_on_yes() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        let (_other_dir, other) = diverge_master(&local, &remote);
        let tip = local.branch_tip("master").unwrap();

        let declining = ScriptedPrompt::new(&[false]);
        assert_eq!(
            reconcile(&local, "master", SyncPolicy::Ask, false, &declining).unwrap(),
            ReconcileOutcome::Declined
        );
        assert_eq!(local.branch_tip("master").unwrap(), tip);
        assert_eq!(declining.questions().len(), 1);
        assert!(declining.questions()[0].contains("'origin/master'"));

        let accepting = ScriptedPrompt::new(&[true]);
        assert_eq!(
            reconcile(&local, "master", SyncPolicy::Ask, false, &accepting).unwrap(),
            ReconcileOutcome::Reset
        );
        assert_eq!(
            local.branch_tip("master").unwrap(),
            other.branch_tip("master").unwrap()
        );
    }

    #[test]
    fn reconcile_without_upstream() {
        let (_remote_dir, _remote, _local_dir, local) = create_node_clone();
        local.create_branch("hug", "master", false).unwrap();
        let prompt = ScriptedPrompt::new(&[]);

        assert_eq!(
            reconcile(&local, "hug", SyncPolicy::Allow, false, &prompt).unwrap(),
            ReconcileOutcome::Unchanged
        );
        let err = reconcile(&local, "hug", SyncPolicy::Allow, true, &prompt).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingUpstream { .. }));
    }

    #[test]
    fn publish_new_branch_sets_upstream() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        local.create_branch("scicore", "master", false).unwrap();

        assert_eq!(
            publish(&local, "scicore", false).unwrap(),
            Some(PushOutcome::NewBranch)
        );
        assert_eq!(
            local.tracking_branch("scicore").unwrap().as_deref(),
            Some("origin/scicore")
        );
        assert!(remote.has_branch("scicore").unwrap());

        // Nothing left to push.
        assert_eq!(publish(&local, "scicore", false).unwrap(), None);
    }

    #[test]
    fn publish_ahead_branch_fast_forwards() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        local
            .add_file_and_commit("local.txt", "local", "Local commit")
            .unwrap();

        assert_eq!(
            publish(&local, "master", false).unwrap(),
            Some(PushOutcome::FastForward)
        );
        assert_eq!(
            remote.branch_tip("master").unwrap(),
            local.branch_tip("master").unwrap()
        );
    }

    #[test]
    fn publish_diverged_branch_needs_force() {
        let (_remote_dir, remote, _local_dir, local) = create_node_clone();
        let (_other_dir, other) = diverge_master(&local, &remote);

        let err = publish(&local, "master", false).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DivergedPush { .. }));
        assert_eq!(
            remote.branch_tip("master").unwrap(),
            other.branch_tip("master").unwrap()
        );

        assert_eq!(
            publish(&local, "master", true).unwrap(),
            Some(PushOutcome::ForcedUpdate)
        );
        assert_eq!(
            remote.branch_tip("master").unwrap(),
            local.branch_tip("master").unwrap()
        );
    }

    #[test]
    fn integrate_fast_forwards_node_branch_behind_main() {
        let (_remote_dir, _remote, _local_dir, local) = create_node_clone();
        local.create_branch("scicore", "master", false).unwrap();
        local
            .add_file_and_commit("one.txt", "1", "First main commit")
            .unwrap()
            .add_file_and_commit("two.txt", "2", "Second main commit")
            .unwrap();
        assert_eq!(local.ahead_behind("scicore", "master").unwrap(), (0, 2));

        assert_eq!(
            integrate(&local, "scicore", "master").unwrap(),
            IntegrateOutcome::FastForwarded
        );
        assert_eq!(
            local.branch_tip("scicore").unwrap(),
            local.branch_tip("master").unwrap()
        );

        assert_eq!(
            integrate(&local, "scicore", "master").unwrap(),
            IntegrateOutcome::Unchanged
        );
    }

    #[test]
    fn integrate_rebases_diverged_node_branch() {
        let (_remote_dir, _remote, _local_dir, local) = create_node_clone();
        local.create_branch("scicore", "master", false).unwrap();
        local
            .switch_fluent("scicore")
            .unwrap()
            .add_file_and_commit("node.txt", "node", "Node commit")
            .unwrap()
            .switch_fluent("master")
            .unwrap()
            .add_file_and_commit("main.txt", "main", "Main commit")
            .unwrap();

        assert_eq!(
            integrate(&local, "scicore", "master").unwrap(),
            IntegrateOutcome::Rebased
        );
        assert_eq!(local.ahead_behind("scicore", "master").unwrap(), (1, 0));
    }

    #[test]
    fn integrate_conflict_reports_rebase_conflict() {
        let (_remote_dir, _remote, _local_dir, local) = create_node_clone();
        local.create_branch("scicore", "master", false).unwrap();
        local
            .switch_fluent("scicore")
            .unwrap()
            .add_file_and_commit("README.md", "node version", "Node edit")
            .unwrap()
            .switch_fluent("master")
            .unwrap()
            .add_file_and_commit("README.md", "main version", "Main edit")
            .unwrap();
        let node_tip = local.branch_tip("scicore").unwrap();

        let err = integrate(&local, "scicore", "master").unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::RebaseConflict { .. }));
        assert_eq!(local.branch_tip("scicore").unwrap(), node_tip);
        local.assert_current_branch("master");
    }
}
