//! `panel_core_cli`: diagnostic commands for form schemas, value trees and
//! rate matrices stored as JSON files.

pub mod commands;
mod context;
pub mod fill;
pub mod help;
pub mod output;
mod shell;
pub mod table;

pub use context::{CliContext, CliError, CliMode, CommandError, CommandResult};
pub use shell::run_cli;
