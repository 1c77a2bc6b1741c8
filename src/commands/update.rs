use anyhow::{bail, Context, Result};
use console::style;
use tracing::{debug, info};

use super::status::open_repo;
use crate::{
    config::{Config, RepositoryConfig},
    sync::{orchestrator::update_node_repo, policy::ConfirmPrompt, upstream::update_from_upstream},
    tui::{branch_display, prompt::TerminalPrompt},
};

/// Update every configured repository. A failing repository is reported and
/// the next one is still updated.
pub fn handle_update(config: &Config, from_upstream: bool) -> Result<()> {
    let prompt = TerminalPrompt;
    let mut failed = 0;

    for repo_config in &config.repositories {
        if let Err(e) = update_repository(config, repo_config, from_upstream, &prompt) {
            failed += 1;
            debug!(repo = %repo_config.path.display(), error = %e, "update failed");
            eprintln!("{} {:#}", style("✗").red().bold(), e);
        }
    }

    if failed > 0 {
        bail!(
            "{failed} of {} repositories could not be updated",
            config.repositories.len()
        );
    }
    Ok(())
}

fn update_repository(
    config: &Config,
    repo_config: &RepositoryConfig,
    from_upstream: bool,
    prompt: &dyn ConfirmPrompt,
) -> Result<()> {
    let repo = open_repo(repo_config)?;

    if from_upstream {
        match &repo_config.upstream {
            Some(upstream) => {
                let reports = update_from_upstream(&repo, upstream)
                    .context("failed to update mirrored branches from upstream")?;
                branch_display::display_mirror_reports(&reports);
            }
            None => info!(repo = %repo.path().display(), "no upstream configured, skipping"),
        }
    }

    let report = update_node_repo(
        &repo,
        config.node.branch_name(),
        &config.peer_branches(),
        config.policies,
        prompt,
    )?;
    branch_display::display_update_report(repo.path(), &report);
    Ok(())
}
