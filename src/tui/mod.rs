pub mod branch_display;
pub mod prompt;
