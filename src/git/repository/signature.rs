use git2::Signature;

use super::core::GitRepo;
use crate::git::error::{GitResultExt, Result};

impl GitRepo {
    /// Committer identity for merge and rebase commits, read from the git
    /// config (`user.name`, `user.email`).
    pub(crate) fn create_signature(&self) -> Result<Signature<'static>> {
        let config = self
            .repo()
            .config()
            .during(self.path(), "read repository config")?;

        let author_name = config.get_string("user.name").during(
            self.path(),
            "read user.name from git config (run: git config user.name \"Your Name\")",
        )?;

        let author_email = config.get_string("user.email").during(
            self.path(),
            "read user.email from git config (run: git config user.email \"your@email.com\")",
        )?;

        Signature::now(&author_name, &author_email).during(self.path(), "create signature")
    }
}
