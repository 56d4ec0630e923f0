//! Shell state shared by every command handler.

use std::{fs, io, path::Path};

use serde_json::Value;
use strsim::levenshtein;
use thiserror::Error;

use panel_config::{Config, ConfigError, ConfigManager};

use super::commands::{self, CommandDefinition, CommandRegistry};
use super::output::{self, OutputPreferences};
use crate::context::ViewContext;
use crate::errors::PanelError;
use crate::validation::CompileOptions;

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("Unknown command `{0}`. Type `help` to see available commands.")]
    UnknownCommand(String),
    #[error("{0} field(s) failed validation")]
    ValidationFailed(usize),
    #[error("`{0}` needs an interactive terminal")]
    NotInteractive(&'static str),
    #[error("{path}: {source}")]
    Read { path: String, source: io::Error },
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] PanelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    /// One command taken from the process arguments.
    Direct,
    /// Commands read line by line from stdin.
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub struct CliContext {
    pub(crate) mode: CliMode,
    pub(crate) registry: CommandRegistry,
    pub(crate) config: Config,
    config_manager: ConfigManager,
}

impl CliContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::from_env()?;
        let config = config_manager.load()?;
        Ok(Self::with_config(mode, config, config_manager))
    }

    pub fn with_config(mode: CliMode, config: Config, config_manager: ConfigManager) -> Self {
        output::set_preferences(OutputPreferences::from_theme(config.theme));
        Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            config,
            config_manager,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.registry.get(name)
    }

    pub(crate) fn view_context(&self) -> Result<ViewContext, CommandError> {
        Ok(ViewContext::from_config(&self.config)?)
    }

    pub(crate) fn compile_options(&self) -> CompileOptions {
        CompileOptions::from(&self.config)
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        output::set_preferences(OutputPreferences::from_theme(self.config.theme));
        tracing::debug!(path = %self.config_manager.config_path().display(), "configuration saved");
        Ok(())
    }

    pub(crate) fn config_path(&self) -> &Path {
        self.config_manager.config_path()
    }

    pub(crate) fn dispatch(&mut self, raw: &str, args: &[&str]) -> Result<LoopControl, CommandError> {
        let name = raw.to_lowercase();
        let Some(handler) = self.command(&name).map(|entry| entry.handler) else {
            return Err(CommandError::UnknownCommand(raw.to_string()));
        };
        tracing::debug!(command = %name, args = args.len(), "dispatching command");
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    /// Closest registered command within an edit distance of 3.
    pub(crate) fn suggestion(&self, input: &str) -> Option<&'static str> {
        let input = input.to_lowercase();
        self.registry
            .names()
            .map(|name| (levenshtein(name, &input), name))
            .min_by_key(|(distance, _)| *distance)
            .filter(|(distance, _)| *distance <= 3)
            .map(|(_, name)| name)
    }

    pub(crate) fn report_error(&self, err: &CommandError) {
        output::error(err);
        if let CommandError::UnknownCommand(raw) = err {
            if let Some(best) = self.suggestion(raw) {
                output::info(format!("Suggestion: `{}`?", best));
            }
        }
    }
}

/// Reads and parses a JSON document from disk.
pub(crate) fn read_json(path: &str) -> Result<Value, CommandError> {
    let data = fs::read_to_string(path).map_err(|source| CommandError::Read {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
pub(crate) fn test_context() -> (CliContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
    let context = CliContext::with_config(CliMode::Script, Config::default(), manager);
    (context, dir)
}
