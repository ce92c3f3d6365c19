//! Recording mover CLI library.
//!
//! This crate provides the CLI interface for the recording mover.

mod cli;
pub mod commands;
mod config;
pub mod connections;

pub use cli::{Cli, Commands};
pub use config::{Config, Overrides, default_config_file};
