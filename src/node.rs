use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// A site operating its own clone of the shared repositories. Each node owns
/// the branch of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Hug,
    Ibu,
    Scicore,
    Ubelix,
    Vitalit,
    TestNode,
}

impl Node {
    pub const ALL: [Node; 6] = [
        Node::Hug,
        Node::Ibu,
        Node::Scicore,
        Node::Ubelix,
        Node::Vitalit,
        Node::TestNode,
    ];

    /// Name of the branch owned by this node.
    pub fn branch_name(self) -> &'static str {
        self.synonyms()[0]
    }

    /// Accepted spellings, the branch name first.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Node::Hug => &["hug", "HUG"],
            Node::Ibu => &["ibu", "IBU"],
            Node::Scicore => &["scicore", "sci", "SCI"],
            Node::Ubelix => &["ubelix", "ube", "UBE"],
            Node::Vitalit => &["vitalit", "vital-it", "vit", "VIT"],
            Node::TestNode => &["test_node", "TEST"],
        }
    }

    /// Every node except `self`.
    pub fn peers(self) -> Vec<Node> {
        Self::ALL.into_iter().filter(|node| *node != self).collect()
    }
}

impl FromStr for Node {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if let Some(node) = Self::ALL
            .into_iter()
            .find(|node| node.synonyms().contains(&name))
        {
            return Ok(node);
        }

        let accepted = Self::ALL
            .iter()
            .map(|node| format!("{}: {}", node.branch_name(), node.synonyms().join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        bail!("unknown node '{name}'. Accepted node names and synonyms are: {accepted}")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.branch_name())
    }
}
