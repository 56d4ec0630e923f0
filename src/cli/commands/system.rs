use super::CommandDefinition;
use crate::cli::context::{CliContext, CommandError, CommandResult};
use crate::cli::help;
use crate::cli::output;
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("version", "Show build metadata", "version", cmd_version),
        CommandDefinition::new("help", "Show available commands", "help [command]", cmd_help),
        CommandDefinition::new("exit", "Stop reading a command script", "exit", cmd_exit),
    ]
}

fn cmd_version(_context: &mut CliContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("Panel Core {}", meta.version));
    for line in meta.lines().iter().skip(1) {
        output::raw(format!("  {line}"));
    }
    Ok(())
}

fn cmd_help(context: &mut CliContext, args: &[&str]) -> CommandResult {
    match args.first() {
        Some(name) => match context.command(&name.to_lowercase()) {
            Some(entry) => {
                help::print_command(entry);
                Ok(())
            }
            None => Err(CommandError::UnknownCommand(name.to_string())),
        },
        None => {
            help::print_overview(&context.registry);
            Ok(())
        }
    }
}

fn cmd_exit(_context: &mut CliContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
