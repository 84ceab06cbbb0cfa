//! Worklog CLI library.
//!
//! This crate provides the CLI interface for the worklog tool.

mod cli;
pub mod commands;
mod config;
pub mod logfile;
pub mod remote;

pub use cli::{Cli, Commands, MarkEntry};
pub use config::Config;
