//! Branch reconciliation: policies, the per-repository orchestrator and the
//! upstream mirror.

pub mod orchestrator;
pub mod policy;
pub mod synchronizer;
pub mod upstream;
