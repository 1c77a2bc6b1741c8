//! Mirroring of branches from an external upstream remote onto the shared
//! remote, run before node reconciliation.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::git::error::Result;
use crate::git::{BranchStatus, ErrorKind, GitRepo, MergeOutcome, PushOutcome};

/// An external remote whose branches are mirrored onto the default remote.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpstreamSource {
    /// Name of the remote in the local clone, e.g. `eb-source`.
    pub remote: String,
    pub url: String,
    pub branches: Vec<MirroredBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MirroredBranch {
    /// Branch name on the default remote.
    pub name: String,
    /// Branch name on the upstream remote, when it differs from `name`.
    #[serde(default)]
    pub official: Option<String>,
}

impl MirroredBranch {
    pub fn official_name(&self) -> &str {
        self.official.as_deref().unwrap_or(&self.name)
    }
}

/// Relation of a mirrored branch to its official counterpart, as found
/// before any update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    pub branch: String,
    pub status: BranchStatus,
}

#[instrument(skip(repo, upstream), fields(repo = %repo.path().display(), upstream = %upstream.remote))]
pub fn update_from_upstream(repo: &GitRepo, upstream: &UpstreamSource) -> Result<Vec<MirrorReport>> {
    repo.ensure_remote(&upstream.remote, &upstream.url)?;
    repo.fetch_remote(&upstream.remote)?;
    repo.fetch_remote(repo.default_remote())?;

    let mut reports = Vec::with_capacity(upstream.branches.len());
    for branch in &upstream.branches {
        let mirror_ref = format!("{}/{}", repo.default_remote(), branch.name);
        let official_ref = format!("{}/{}", upstream.remote, branch.official_name());

        let status = repo.branch_status(&mirror_ref, Some(&official_ref))?;
        debug!(mirror = %mirror_ref, official = %official_ref, %status, "compared mirrored branch");

        match status {
            BranchStatus::UpToDate => {}
            BranchStatus::Behind => mirror_branch(repo, &branch.name, &mirror_ref, &official_ref)?,
            BranchStatus::Ahead | BranchStatus::Diverged => {
                return Err(repo.error(ErrorKind::InvariantViolation(format!(
                    "mirrored branch '{mirror_ref}' is {status} compared to '{official_ref}', \
                     but it may only ever lag behind it. Please resolve manually"
                ))))
            }
            BranchStatus::NoUpstream => {
                return Err(repo.error(ErrorKind::UnknownBranch {
                    branch: official_ref,
                    operation: format!("mirror it into '{mirror_ref}'"),
                }))
            }
        }

        reports.push(MirrorReport {
            branch: branch.name.clone(),
            status,
        });
    }

    Ok(reports)
}

/// Merge `official_ref` into the mirrored branch and push the result.
fn mirror_branch(repo: &GitRepo, name: &str, mirror_ref: &str, official_ref: &str) -> Result<()> {
    let local_is_current =
        repo.has_branch(name)? && repo.branch_status(name, Some(mirror_ref))? == BranchStatus::UpToDate;

    let scratch = if local_is_current {
        None
    } else {
        Some(ScratchBranch::create(repo, &format!("nodesync-mirror-{name}"), mirror_ref)?)
    };
    let work_branch = scratch.as_ref().map_or(name, |scratch| scratch.name.as_str());

    if let MergeOutcome::Merged(commit) = repo.merge(work_branch, official_ref)? {
        debug!(%commit, "created merge commit");
    }

    let remote = repo.default_remote();
    let outcome = repo.push_to(work_branch, remote, name, false)?;
    if outcome != PushOutcome::FastForward {
        return Err(repo.error(ErrorKind::PushFailed {
            command: "git push".to_string(),
            remote: remote.to_string(),
            branch: name.to_string(),
        }));
    }

    info!(branch = name, official = official_ref, "mirrored upstream changes");
    Ok(())
}

/// A temporary local branch, deleted when dropped.
struct ScratchBranch<'a> {
    repo: &'a GitRepo,
    name: String,
}

impl<'a> ScratchBranch<'a> {
    fn create(repo: &'a GitRepo, name: &str, root: &str) -> Result<Self> {
        if repo.has_branch(name)? {
            repo.delete_branch(name)?;
        }
        repo.create_branch(name, root, true)?;
        Ok(Self {
            repo,
            name: name.to_string(),
        })
    }
}

impl Drop for ScratchBranch<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.repo.delete_branch(&self.name) {
            warn!(branch = %self.name, error = %e, "failed to delete scratch branch");
        }
    }
}
