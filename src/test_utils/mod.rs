pub mod repo_extensions;
pub mod scripted_prompt;

pub use repo_extensions::{
    clone_test_repo, create_node_clone, create_test_bare_repo, create_test_repo, RepoAssertions,
    RepoTestOperations,
};
pub use scripted_prompt::ScriptedPrompt;
