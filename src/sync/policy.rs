use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Whether a reset that discards local-only commits may happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Reset without asking.
    Allow,
    /// Never reset; the diverged branch is reported as an error.
    Deny,
    /// Ask through a [`ConfirmPrompt`] and reset only on "yes".
    Ask,
}

impl SyncPolicy {
    const ALL: [SyncPolicy; 3] = [SyncPolicy::Allow, SyncPolicy::Deny, SyncPolicy::Ask];

    /// Accepted spellings in configuration files, canonical first.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            SyncPolicy::Allow => &["yes", "y", "True", "true", "allow"],
            SyncPolicy::Deny => &["no", "n", "False", "false", "deny"],
            SyncPolicy::Ask => &["interactive", "ask"],
        }
    }
}

impl FromStr for SyncPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(policy) = Self::ALL
            .into_iter()
            .find(|policy| policy.synonyms().contains(&value))
        {
            return Ok(policy);
        }

        let accepted = Self::ALL
            .iter()
            .map(|policy| policy.synonyms().join(", "))
            .collect::<Vec<_>>()
            .join(" | ");
        bail!("invalid reset policy '{value}', accepted values are: {accepted}")
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.synonyms()[0])
    }
}

/// Asks a human to confirm a destructive action.
pub trait ConfirmPrompt {
    /// Returns true only on an explicit "yes".
    fn confirm(&self, message: &str) -> bool;
}
