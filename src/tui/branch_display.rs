use std::path::Path;

use console::{style, StyledObject};

use crate::git::{BranchStatus, PushOutcome, RemoteInfo};
use crate::sync::orchestrator::UpdateReport;
use crate::sync::synchronizer::{IntegrateOutcome, ReconcileOutcome};
use crate::sync::upstream::MirrorReport;

/// Which part a branch plays in the node layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRole {
    Main,
    Node,
    Peer,
}

/// Information about a single branch
#[derive(Debug)]
pub struct BranchInfo {
    pub name: String,
    pub role: BranchRole,
    pub is_current: bool,
    pub upstream: BranchStatus,
    /// Relation to the main branch; `None` for main itself.
    pub vs_main: Option<BranchStatus>,
    /// Commits on the branch that are not on main, newest first.
    pub local_commits: Vec<String>,
    /// Peer branch holding commits no other branch has.
    pub ahead_of_all: bool,
}

/// Display the branch layout of one repository
pub fn display_repository_status(
    path: &Path,
    remotes: &[RemoteInfo],
    branches: &[BranchInfo],
    remote_only: &[String],
) {
    println!("{} {}", style("📁").cyan(), style(path.display()).bold());
    for remote in remotes {
        println!(
            "  {} {} {}",
            style("📡").blue(),
            style(&remote.name).cyan(),
            style(&remote.url).dim()
        );
    }
    println!();

    if branches.is_empty() {
        println!("{} No branches found", style("⚠").yellow());
        return;
    }

    for branch in branches {
        display_single_branch(branch);
    }

    for name in remote_only {
        println!(
            "  {} {}",
            style(name).cyan(),
            style("(on remote only)").dim()
        );
    }
}

fn display_single_branch(branch: &BranchInfo) {
    let branch_marker = if branch.is_current {
        style("● ").green().bold()
    } else {
        style("  ").dim()
    };
    let role = match branch.role {
        BranchRole::Main => "main",
        BranchRole::Node => "node",
        BranchRole::Peer => "peer",
    };

    println!(
        "{}{} {}",
        branch_marker,
        style(&branch.name).cyan().bold(),
        style(format!("({role})")).dim()
    );
    println!("  {} upstream: {}", style("🔗").blue(), styled_status(branch.upstream));

    if let Some(vs_main) = branch.vs_main {
        println!("  {} main: {}", style("🔀").blue(), styled_status(vs_main));
    }

    if !branch.local_commits.is_empty() {
        println!(
            "  {} {} commit(s) not on main, latest: {}",
            style("📝").blue(),
            branch.local_commits.len(),
            style(&branch.local_commits[0]).dim()
        );
    }

    if branch.ahead_of_all {
        println!(
            "  {} {}",
            style("⚠").yellow(),
            style("holds commits that no other branch has").yellow()
        );
    }

    println!();
}

fn styled_status(status: BranchStatus) -> StyledObject<String> {
    let label = status.to_string();
    match status {
        BranchStatus::UpToDate => style(label).green(),
        BranchStatus::Ahead | BranchStatus::Behind => style(label).yellow(),
        BranchStatus::Diverged => style(label).red().bold(),
        BranchStatus::NoUpstream => style(label).dim(),
    }
}

/// Display the upstream mirror results of one repository
pub fn display_mirror_reports(reports: &[MirrorReport]) {
    for report in reports {
        let action = match report.status {
            BranchStatus::Behind => style("merged upstream changes").green(),
            _ => style("nothing to do").dim(),
        };
        println!(
            "  {} {}: {}",
            style("⬇").blue(),
            style(&report.branch).cyan(),
            action
        );
    }
}

/// Display what an update did to one repository
pub fn display_update_report(path: &Path, report: &UpdateReport) {
    println!(
        "{} {}",
        style("✓").green().bold(),
        style(path.display()).bold()
    );

    if report.created_node_branch {
        println!(
            "  {} created branch {}",
            style("+").green(),
            style(&report.node_branch).cyan()
        );
    }

    println!("  main: {}", reconcile_label(report.main));
    println!(
        "  {}: {}",
        report.node_branch,
        reconcile_label(report.node)
    );

    let integration = match report.integration {
        IntegrateOutcome::Unchanged => style("already contains main").dim(),
        IntegrateOutcome::FastForwarded => style("fast-forwarded to main").green(),
        IntegrateOutcome::Rebased => style("rebased on main").green(),
    };
    println!("  {} {}", style("🔀").blue(), integration);

    if let Some(outcome) = report.published {
        let pushed = match outcome {
            PushOutcome::NewBranch => "pushed as new branch",
            PushOutcome::FastForward => "pushed",
            PushOutcome::ForcedUpdate => "force-pushed",
            PushOutcome::UpToDate => "remote already up to date",
        };
        println!("  {} {}", style("⬆").blue(), style(pushed).green());
    }

    for (peer, outcome) in &report.peers {
        println!("  {}: {}", peer, reconcile_label(*outcome));
    }
}

fn reconcile_label(outcome: ReconcileOutcome) -> StyledObject<&'static str> {
    match outcome {
        ReconcileOutcome::Unchanged => style("unchanged").dim(),
        ReconcileOutcome::FastForwarded => style("fast-forwarded").green(),
        ReconcileOutcome::Reset => style("reset to upstream").yellow(),
        ReconcileOutcome::Declined => style("reset declined, left diverged").red(),
    }
}
