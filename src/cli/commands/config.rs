use super::CommandDefinition;
use crate::cli::context::{CliContext, CommandError, CommandResult};
use crate::cli::output;

const CONFIG_USAGE: &str = "config [show | set <key> <value>]";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "config",
        "Show or change saved preferences",
        CONFIG_USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut CliContext, args: &[&str]) -> CommandResult {
    match args {
        [] | ["show"] => {
            show(context);
            Ok(())
        }
        ["set", key, value @ ..] if !value.is_empty() => {
            let value = value.join(" ");
            context.config.set(key, &value)?;
            context.persist_config()?;
            output::success(format!("`{key}` set to `{value}`."));
            Ok(())
        }
        _ => Err(CommandError::InvalidArguments(format!("Usage: {CONFIG_USAGE}"))),
    }
}

fn show(context: &CliContext) {
    let config = context.config();
    output::section("Configuration");
    output::raw(format!("  {:<18} {}", "locale", config.locale));
    output::raw(format!("  {:<18} {}", "is_admin", config.is_admin));
    output::raw(format!("  {:<18} {}", "skip_empty", config.skip_empty));
    output::raw(format!("  {:<18} {:?}", "unknown_kinds", config.unknown_kinds));
    output::raw(format!("  {:<18} {}", "matrix_save_scope", config.matrix_save_scope));
    output::raw(format!("  {:<18} {}", "theme", config.theme));
    output::raw(format!(
        "  {:<18} {}",
        "translations",
        config
            .translations
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "-".into())
    ));
    output::info(format!("Stored at {}", context.config_path().display()));
}
