use anyhow::{Context, Error};
use git2::{IndexAddOption, Repository, Signature};

use crate::git::GitRepo;

const TEST_USER: &str = "Test User";
const TEST_EMAIL: &str = "test@example.com";

/// Create a new temporary repository for testing with user config set up.
/// HEAD points at an unborn `master`.
pub fn create_test_repo() -> (assert_fs::TempDir, GitRepo) {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let repo = GitRepo::init(temp_dir.path()).unwrap();
    set_user_config(repo.repo());
    (temp_dir, repo)
}

/// Create a new temporary bare repository, playing the shared remote
pub fn create_test_bare_repo() -> (assert_fs::TempDir, GitRepo) {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let repo = GitRepo::init_bare(temp_dir.path()).unwrap();
    set_user_config(repo.repo());
    (temp_dir, repo)
}

/// Clone `remote` into a fresh temporary directory, as another node would.
pub fn clone_test_repo(remote: &GitRepo) -> (assert_fs::TempDir, GitRepo) {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let url = remote.path().to_str().unwrap();
    let cloned = Repository::clone(url, temp_dir.path()).unwrap();
    set_user_config(&cloned);
    drop(cloned);

    let repo = GitRepo::open(temp_dir.path(), "master", "origin").unwrap();
    (temp_dir, repo)
}

/// A bare remote plus a working copy with one commit on `master`, pushed to
/// `origin` and tracking `origin/master`.
pub fn create_node_clone() -> (assert_fs::TempDir, GitRepo, assert_fs::TempDir, GitRepo) {
    let (remote_dir, remote) = create_test_bare_repo();
    let (local_dir, local) = create_test_repo();

    local
        .add_file_and_commit("README.md", "initial", "Initial commit")
        .unwrap();
    local.add_local_remote("origin", &remote).unwrap();
    local.push("master", "origin", false).unwrap();
    local.set_upstream("master", "origin").unwrap();

    (remote_dir, remote, local_dir, local)
}

fn set_user_config(repo: &Repository) {
    let mut config = repo.config().unwrap();
    config.set_str("user.name", TEST_USER).unwrap();
    config.set_str("user.email", TEST_EMAIL).unwrap();
}

/// Test-only trait that adds assertion methods to GitRepo
pub trait RepoAssertions {
    /// Assert that HEAD is attached to the given branch
    fn assert_current_branch(&self, branch_name: &str) -> &Self;

    /// Assert that a file exists in the working tree
    fn assert_file_exists(&self, filename: &str) -> &Self;

    /// Assert that a file does not exist in the working tree
    fn assert_file_not_exists(&self, filename: &str) -> &Self;
}

/// Test-only trait that adds test helper operations to GitRepo
pub trait RepoTestOperations {
    /// Write a file into the working tree (fluent)
    fn add_file(&self, filename: &str, content: &str) -> Result<&Self, Error>;

    /// Write a file and commit it on the checked-out branch (fluent)
    fn add_file_and_commit(
        &self,
        filename: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<&Self, Error>;

    /// Add a remote pointing to another local GitRepo
    fn add_local_remote(&self, name: &str, other_repo: &GitRepo) -> Result<(), Error>;

    /// Check out a local branch (fluent)
    fn switch_fluent(&self, branch_name: &str) -> Result<&Self, Error>;
}

impl RepoAssertions for GitRepo {
    fn assert_current_branch(&self, branch_name: &str) -> &Self {
        // Read HEAD itself so that unborn branches can be asserted too.
        let head = self
            .repo()
            .find_reference("HEAD")
            .expect("Failed to read HEAD");
        let expected_target = format!("refs/heads/{branch_name}");
        let actual_target = head.symbolic_target().unwrap_or("<detached>");

        if actual_target != expected_target {
            panic!("HEAD mismatch. Expected: '{expected_target}', Found: '{actual_target}'");
        }
        self
    }

    fn assert_file_exists(&self, filename: &str) -> &Self {
        let file_path = self.path().join(filename);
        if !file_path.exists() {
            panic!("Expected file '{filename}' to exist at path: {file_path:?}");
        }
        self
    }

    fn assert_file_not_exists(&self, filename: &str) -> &Self {
        let file_path = self.path().join(filename);
        if file_path.exists() {
            panic!("Expected file '{filename}' to not exist at path: {file_path:?}");
        }
        self
    }
}

impl RepoTestOperations for GitRepo {
    fn add_file(&self, filename: &str, content: &str) -> Result<&Self, Error> {
        let file_path = self.path().join(filename);
        std::fs::write(&file_path, content)
            .context(format!("Failed to write file '{filename}'"))?;
        Ok(self)
    }

    fn add_file_and_commit(
        &self,
        filename: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<&Self, Error> {
        self.add_file(filename, content)?;

        let repo = self.repo();
        let mut index = repo.index().context("Failed to get repository index")?;
        index
            .add_all([filename], IndexAddOption::DEFAULT, None)
            .context("Failed to add file to index")?;
        index.write().context("Failed to write index")?;

        let tree_id = index.write_tree().context("Failed to write tree")?;
        let tree = repo.find_tree(tree_id).context("Failed to find tree")?;
        let signature = Signature::now(TEST_USER, TEST_EMAIL)?;

        // No parent for the first commit on an unborn branch.
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit().context("Failed to resolve HEAD")?),
            Err(_) => None,
        };
        let parents: Vec<_> = parent.iter().collect();

        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            commit_message,
            &tree,
            &parents,
        )
        .context("Failed to create commit")?;

        Ok(self)
    }

    fn add_local_remote(&self, name: &str, other_repo: &GitRepo) -> Result<(), Error> {
        let remote_path = other_repo
            .path()
            .to_str()
            .context("Failed to convert remote repository path to string")?;

        self.add_remote(name, remote_path)?;
        Ok(())
    }

    fn switch_fluent(&self, branch_name: &str) -> Result<&Self, Error> {
        self.switch(branch_name)?;
        Ok(self)
    }
}
