//! Node reconciliation for one repository.
//!
//! Order matters: main is settled before the node branch is integrated so
//! that the node is never rebased on a stale main, and peers come last so
//! their divergence cannot block the node's own publication.

use tracing::{info, instrument};

use super::policy::{ConfirmPrompt, SyncPolicy};
use super::synchronizer::{integrate, publish, reconcile, IntegrateOutcome, ReconcileOutcome};
use crate::git::error::Result;
use crate::git::{BranchStatus, ErrorKind, GitRepo, PushOutcome};

/// Reset policies for the node's own branch and for the peer branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicies {
    pub node: SyncPolicy,
    pub peers: SyncPolicy,
}

impl Default for UpdatePolicies {
    fn default() -> Self {
        Self {
            node: SyncPolicy::Ask,
            peers: SyncPolicy::Allow,
        }
    }
}

/// What happened to each branch during [`update_node_repo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub node_branch: String,
    pub created_node_branch: bool,
    pub main: ReconcileOutcome,
    pub node: ReconcileOutcome,
    pub integration: IntegrateOutcome,
    /// Push report for the node branch, if it was pushed.
    pub published: Option<PushOutcome>,
    /// Peer branches that exist locally, in the order they were handled.
    pub peers: Vec<(String, ReconcileOutcome)>,
}

#[instrument(skip(repo, peer_branches, prompt), fields(repo = %repo.path().display()))]
pub fn update_node_repo(
    repo: &GitRepo,
    node_branch: &str,
    peer_branches: &[&str],
    policies: UpdatePolicies,
    prompt: &dyn ConfirmPrompt,
) -> Result<UpdateReport> {
    let main_branch = repo.main_branch_name();

    if repo.is_dirty()? {
        let current = repo
            .current_branch()?
            .unwrap_or_else(|| "HEAD".to_string());
        return Err(repo.error(ErrorKind::DirtyWorkingTree {
            branch: current,
            operation: "update the repository".to_string(),
        }));
    }

    repo.fetch_updates()?;

    let mut published = None;
    let created_node_branch = !repo.has_branch(node_branch)?;
    if created_node_branch {
        repo.create_branch(node_branch, main_branch, false)?;
        if repo.tracking_branch(node_branch)?.is_none() {
            published = publish(repo, node_branch, false)?;
        }
    }

    let main = reconcile(repo, main_branch, SyncPolicy::Deny, true, prompt)?;
    let node = reconcile(repo, node_branch, policies.node, false, prompt)?;
    // A rebased node branch may only overwrite the remote when it already
    // contained everything the remote had.
    let contains_upstream = matches!(
        repo.branch_status(node_branch, None)?,
        BranchStatus::UpToDate | BranchStatus::Ahead
    );

    let integration = integrate(repo, node_branch, main_branch)?;
    if integration != IntegrateOutcome::Unchanged {
        let allow_force = integration == IntegrateOutcome::Rebased && contains_upstream;
        published = publish(repo, node_branch, allow_force)?.or(published);
    }

    let mut peers = Vec::new();
    for peer in peer_branches {
        if !repo.has_branch(peer)? {
            continue;
        }
        let outcome = reconcile(repo, peer, policies.peers, false, prompt)?;
        peers.push((peer.to_string(), outcome));
    }

    info!(node_branch, ?main, ?node, ?integration, "repository updated");
    Ok(UpdateReport {
        node_branch: node_branch.to_string(),
        created_node_branch,
        main,
        node,
        integration,
        published,
        peers,
    })
}
