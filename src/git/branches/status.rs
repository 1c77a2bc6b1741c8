//! Branch relation classifier.
//!
//! The relation between two branches is derived only from commit
//! reachability: how many commits each side has that the other lacks. No
//! content is compared, and nothing in the repository is modified.

use std::fmt;

use tracing::debug;

use crate::git::error::{ErrorKind, GitResultExt, Result};
use crate::git::repository::core::GitRepo;

/// Status of a branch compared to another branch (by default its upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchStatus {
    UpToDate,
    Ahead,
    Behind,
    Diverged,
    NoUpstream,
}

impl BranchStatus {
    /// Map `ahead`/`behind` commit counts to a relation.
    pub fn from_counts(ahead: usize, behind: usize) -> Self {
        match (ahead, behind) {
            (0, 0) => BranchStatus::UpToDate,
            (_, 0) => BranchStatus::Ahead,
            (0, _) => BranchStatus::Behind,
            (_, _) => BranchStatus::Diverged,
        }
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BranchStatus::UpToDate => "up to date",
            BranchStatus::Ahead => "ahead",
            BranchStatus::Behind => "behind",
            BranchStatus::Diverged => "diverged",
            BranchStatus::NoUpstream => "no upstream",
        };
        f.write_str(label)
    }
}

impl GitRepo {
    /// Relation of `branch_name` to `compare_to`, or to its own tracking
    /// branch when `compare_to` is `None`.
    ///
    /// Both names may be local (`develop`) or remote (`origin/develop`).
    pub fn branch_status(&self, branch_name: &str, compare_to: Option<&str>) -> Result<BranchStatus> {
        let compare_to = match compare_to {
            Some(name) => name.to_string(),
            None => match self.tracking_branch(branch_name)? {
                Some(upstream) => upstream,
                None => return Ok(BranchStatus::NoUpstream),
            },
        };

        let (ahead, behind) = self.ahead_behind(branch_name, &compare_to)?;
        let status = BranchStatus::from_counts(ahead, behind);
        debug!(branch = branch_name, compare_to = %compare_to, ahead, behind, %status, "branch status");
        Ok(status)
    }

    /// Number of commits on `left` missing from `right`, and vice versa.
    pub fn ahead_behind(&self, left: &str, right: &str) -> Result<(usize, usize)> {
        let left_oid = self.resolve_branch_for_status(left, left, right)?;
        let right_oid = self.resolve_branch_for_status(right, left, right)?;

        self.repo()
            .graph_ahead_behind(left_oid, right_oid)
            .during(self.path(), format!("count commits {left}...{right}"))
    }

    fn resolve_branch_for_status(&self, name: &str, left: &str, right: &str) -> Result<git2::Oid> {
        if !self.has_branch(name)? && !self.has_remote_branch(name)? {
            return Err(self.error(ErrorKind::UnknownBranch {
                branch: name.to_string(),
                operation: format!("perform branch status comparison: {left}...{right}"),
            }));
        }
        self.branch_tip(name)
    }

    /// True when `branch_name` has commits that none of `others` contain,
    /// i.e. it is neither behind nor equal to any of them.
    pub fn is_ahead_of_all(&self, branch_name: &str, others: &[&str]) -> Result<bool> {
        for other in others {
            let status = self.branch_status(branch_name, Some(other))?;
            if matches!(status, BranchStatus::Behind | BranchStatus::UpToDate) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
