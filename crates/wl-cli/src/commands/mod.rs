//! CLI subcommand implementations.

pub mod aggregate;
pub mod history;
pub mod mark;
pub mod send;
pub mod status;
