//! User configuration, read from a TOML file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::node::Node;
use crate::sync::orchestrator::UpdatePolicies;
use crate::sync::upstream::UpstreamSource;

pub const CONFIG_ENV_VAR: &str = "NODESYNC_CONFIG";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    node: String,
    #[serde(default)]
    peer_nodes: Option<Vec<String>>,
    #[serde(default = "default_node_policy")]
    allow_reset_node_branch: String,
    #[serde(default = "default_peer_policy")]
    allow_reset_peer_branches: String,
    #[serde(default)]
    repositories: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    path: String,
    main_branch: String,
    #[serde(default = "default_remote")]
    remote: String,
    #[serde(default)]
    upstream: Option<UpstreamSource>,
}

fn default_node_policy() -> String {
    "interactive".to_string()
}

fn default_peer_policy() -> String {
    "yes".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// A repository to keep in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub path: PathBuf,
    pub main_branch: String,
    pub remote: String,
    pub upstream: Option<UpstreamSource>,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub node: Node,
    /// Other nodes whose branches are kept up to date locally.
    pub peers: Vec<Node>,
    pub policies: UpdatePolicies,
    pub repositories: Vec<RepositoryConfig>,
}

impl Config {
    /// Config file location: `explicit` if given, else `$NODESYNC_CONFIG`,
    /// else `~/.config/nodesync/config.toml`.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(expand_tilde(&path.to_string_lossy()));
        }

        if let Ok(value) = std::env::var(CONFIG_ENV_VAR) {
            let path = expand_tilde(&value);
            if !path.is_file() {
                bail!(
                    "{CONFIG_ENV_VAR} points to '{}', which is not an existing file",
                    path.display()
                );
            }
            return Ok(path);
        }

        let home = dirs::home_dir().context("could not determine the home directory")?;
        Ok(home.join(".config").join("nodesync").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
        debug!(path = %path.display(), node = %config.node, "loaded configuration");
        Ok(config)
    }

    fn from_toml(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("failed to parse TOML")?;

        let node: Node = raw.node.parse()?;
        let peers = match raw.peer_nodes {
            Some(names) => {
                let mut peers = Vec::new();
                for name in &names {
                    let peer: Node = name.parse()?;
                    if peer != node && !peers.contains(&peer) {
                        peers.push(peer);
                    }
                }
                peers
            }
            None => node.peers(),
        };

        let policies = UpdatePolicies {
            node: raw
                .allow_reset_node_branch
                .parse()
                .context("invalid value for 'allow_reset_node_branch'")?,
            peers: raw
                .allow_reset_peer_branches
                .parse()
                .context("invalid value for 'allow_reset_peer_branches'")?,
        };

        let repositories = raw
            .repositories
            .into_iter()
            .map(RepositoryConfig::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            node,
            peers,
            policies,
            repositories,
        })
    }

    pub fn peer_branches(&self) -> Vec<&'static str> {
        self.peers.iter().map(|peer| peer.branch_name()).collect()
    }
}

impl TryFrom<RawRepository> for RepositoryConfig {
    type Error = anyhow::Error;

    fn try_from(raw: RawRepository) -> Result<Self> {
        let path = expand_tilde(&raw.path);
        if !path.is_dir() {
            bail!("repository directory '{}' does not exist", path.display());
        }
        Ok(Self {
            path,
            main_branch: raw.main_branch,
            remote: raw.remote,
            upstream: raw.upstream,
        })
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use assert_fs::prelude::*;

    use super::{expand_tilde, Config};
    use crate::node::Node;
    use crate::sync::orchestrator::UpdatePolicies;
    use crate::sync::policy::SyncPolicy;

    fn repo_section(dir: &assert_fs::TempDir) -> String {
        format!(
            "[[repositories]]\npath = '{}'\nmain_branch = \"develop\"\n",
            dir.path().display()
        )
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let dir = assert_fs::TempDir::new().unwrap();
        let contents = format!("node = \"sci\"\n{}", repo_section(&dir));

        let config = Config::from_toml(&contents).unwrap();

        assert_eq!(config.node, Node::Scicore);
        assert_eq!(config.peers, Node::Scicore.peers());
        assert_eq!(config.policies, UpdatePolicies::default());
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].remote, "origin");
        assert_eq!(config.repositories[0].main_branch, "develop");
        assert_eq!(config.repositories[0].upstream, None);
    }

    #[test]
    fn full_config_is_parsed() {
        let dir = assert_fs::TempDir::new().unwrap();
        let contents = format!(
            r#"
node = "ubelix"
peer_nodes = ["HUG", "ube", "vital-it"]
allow_reset_node_branch = "no"
allow_reset_peer_branches = "interactive"

{}remote = "shared"

[repositories.upstream]
remote = "eb-source"
url = "https://example.org/easyconfigs.git"
branches = [{{ name = "develop" }}, {{ name = "main", official = "master" }}]
"#,
            repo_section(&dir)
        );

        let config = Config::from_toml(&contents).unwrap();

        assert_eq!(config.peers, vec![Node::Hug, Node::Vitalit]);
        assert_eq!(config.peer_branches(), vec!["hug", "vitalit"]);
        assert_eq!(config.policies.node, SyncPolicy::Deny);
        assert_eq!(config.policies.peers, SyncPolicy::Ask);
        let repository = &config.repositories[0];
        assert_eq!(repository.remote, "shared");
        let upstream = repository.upstream.as_ref().unwrap();
        assert_eq!(upstream.remote, "eb-source");
        assert_eq!(upstream.branches[0].official_name(), "develop");
        assert_eq!(upstream.branches[1].official_name(), "master");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();

        let err = Config::from_toml(&format!("node = \"geneva\"\n{}", repo_section(&dir)))
            .unwrap_err();
        assert!(err.to_string().contains("unknown node 'geneva'"));

        let err = Config::from_toml(&format!(
            "node = \"hug\"\nallow_reset_node_branch = \"sometimes\"\n{}",
            repo_section(&dir)
        ))
        .unwrap_err();
        assert!(format!("{err:#}").contains("allow_reset_node_branch"));
    }

    #[test]
    fn missing_repository_directory_is_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();
        let missing = dir.child("missing");
        let contents = format!(
            "node = \"hug\"\n[[repositories]]\npath = '{}'\nmain_branch = \"develop\"\n",
            missing.path().display()
        );

        let err = Config::from_toml(&contents).unwrap_err();

        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn load_reads_file_and_locate_prefers_explicit_path() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("config.toml");
        file.write_str(&format!("node = \"ibu\"\n{}", repo_section(&dir)))
            .unwrap();

        let path = Config::locate(Some(file.path())).unwrap();
        assert_eq!(path, file.path());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.node, Node::Ibu);
    }

    #[test]
    fn expand_tilde_uses_home_directory() {
        let home = dirs::home_dir().unwrap();

        assert_eq!(expand_tilde("~/repos"), home.join("repos"));
        assert_eq!(expand_tilde("/srv/repos"), std::path::PathBuf::from("/srv/repos"));
    }
}
