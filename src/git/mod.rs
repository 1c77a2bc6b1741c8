//! Git operations module
//!
//! This module provides a domain-driven structure for Git operations:
//!
//! - `repository`: Core repository operations (open, dirty check, signatures)
//! - `branches`: Branch operations (create, checkout, tracking, status)
//! - `remotes`: Remote operations (add, fetch, pull, push)
//! - `merge`, `rebase`, `reset`: History-rewriting primitives
//! - `error`: The error type shared by all of the above

pub mod branches;
pub mod error;
pub mod merge;
pub mod rebase;
pub mod remotes;
pub mod repository;
pub mod reset;

// Re-export the main types
pub use branches::status::BranchStatus;
pub use error::ErrorKind;
pub use merge::operations::MergeOutcome;
pub use remotes::operations::PushOutcome;
pub use repository::core::{GitRepo, RemoteInfo};
