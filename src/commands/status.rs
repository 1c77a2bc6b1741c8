use anyhow::{Context, Result};

use crate::{
    config::{Config, RepositoryConfig},
    git::GitRepo,
    tui::branch_display::{self, BranchInfo, BranchRole},
};

/// Show how main, node and peer branches relate, for every repository.
///
/// With `grep`, only commits whose message contains the pattern are listed
/// for each branch.
pub fn handle_status(config: &Config, grep: Option<&str>) -> Result<()> {
    for repo_config in &config.repositories {
        let repo = open_repo(repo_config)?;
        repo.fetch_updates()
            .with_context(|| format!("failed to fetch '{}'", repo.path().display()))?;

        let branches = gather_branch_data(&repo, config, grep)?;
        let remote_only = remote_only_branches(&repo, config)?;
        branch_display::display_repository_status(
            repo.path(),
            &repo.get_remotes()?,
            &branches,
            &remote_only,
        );
    }
    Ok(())
}

pub fn open_repo(repo_config: &RepositoryConfig) -> Result<GitRepo> {
    GitRepo::open(
        &repo_config.path,
        &repo_config.main_branch,
        &repo_config.remote,
    )
    .with_context(|| format!("failed to open repository '{}'", repo_config.path.display()))
}

fn gather_branch_data(
    repo: &GitRepo,
    config: &Config,
    grep: Option<&str>,
) -> Result<Vec<BranchInfo>> {
    let main = repo.main_branch_name();
    let node = config.node.branch_name();
    let current = repo.current_branch()?;

    let mut layout = vec![(main, BranchRole::Main), (node, BranchRole::Node)];
    layout.extend(config.peer_branches().into_iter().map(|peer| (peer, BranchRole::Peer)));

    let branch_names = repo.branch_names()?;
    let local: Vec<&str> = layout
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| branch_names.iter().any(|branch| branch == name))
        .collect();

    let mut branch_infos = Vec::new();
    for (name, role) in layout {
        if !local.contains(&name) {
            continue;
        }

        let (vs_main, local_commits) = if role == BranchRole::Main {
            (None, Vec::new())
        } else {
            (
                Some(repo.branch_status(name, Some(main))?),
                repo.history_between(name, grep)?,
            )
        };

        let ahead_of_all = if role == BranchRole::Peer {
            let others: Vec<&str> = local.iter().copied().filter(|other| *other != name).collect();
            repo.is_ahead_of_all(name, &others)?
        } else {
            false
        };

        branch_infos.push(BranchInfo {
            name: name.to_string(),
            role,
            is_current: current.as_deref() == Some(name),
            upstream: repo.branch_status(name, None)?,
            vs_main,
            local_commits,
            ahead_of_all,
        });
    }

    Ok(branch_infos)
}

/// Node and peer branches that exist on the default remote but have no
/// local branch yet, as `remote/branch`.
fn remote_only_branches(repo: &GitRepo, config: &Config) -> Result<Vec<String>> {
    let local = repo.branch_names()?;
    let remote = repo.remote_branch_names()?;

    let mut wanted = vec![config.node.branch_name()];
    wanted.extend(config.peer_branches());

    Ok(wanted
        .into_iter()
        .filter(|name| !local.iter().any(|branch| branch == name))
        .map(|name| format!("{}/{name}", repo.default_remote()))
        .filter(|remote_name| remote.contains(remote_name))
        .collect())
}
