use std::collections::HashMap;

pub mod config;
pub mod form;
pub mod matrix;
pub mod system;

use crate::cli::context::{CliContext, CommandError, CommandResult};

pub(crate) fn all_definitions() -> Vec<CommandDefinition> {
    let mut commands = Vec::new();
    commands.extend(form::definitions());
    commands.extend(matrix::definitions());
    commands.extend(config::definitions());
    commands.extend(system::definitions());
    commands
}

pub type CommandHandler = fn(&mut CliContext, &[&str]) -> CommandResult;

#[derive(Clone)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

impl CommandDefinition {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
        }
    }
}

pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDefinition>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        let mut commands = HashMap::new();
        let mut order = Vec::new();
        for definition in definitions {
            order.push(definition.name);
            commands.insert(definition.name, definition);
        }
        Self { commands, order }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.order
            .iter()
            .filter_map(move |name| self.commands.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

/// Splits `--flag` switches from positional arguments.
pub(crate) fn split_flags<'a>(args: &[&'a str]) -> (Vec<&'a str>, Vec<&'a str>) {
    args.iter().copied().partition(|arg| !arg.starts_with("--"))
}

pub(crate) fn require_positional<'a>(
    args: &[&'a str],
    count: usize,
    usage: &str,
) -> Result<Vec<&'a str>, CommandError> {
    let (positional, flags) = split_flags(args);
    if positional.len() != count {
        return Err(CommandError::InvalidArguments(format!("Usage: {usage}")));
    }
    if let Some(flag) = flags.first() {
        return Err(CommandError::InvalidArguments(format!(
            "Unknown option `{flag}`. Usage: {usage}"
        )));
    }
    Ok(positional)
}
