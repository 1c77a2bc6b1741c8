pub mod guard;
pub mod operations;
pub mod status;
pub mod tracking;
