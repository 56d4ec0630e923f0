use std::env;
use std::io::{self, BufRead};

use shell_words::split;

use crate::cli::context::{CliContext, CliError, CliMode, CommandError, LoopControl};
use crate::cli::help;
use crate::cli::output;

const SCRIPT_ENV: &str = "PANEL_CORE_CLI_SCRIPT";

/// Runs one command from the process arguments, or a command script from
/// stdin when `PANEL_CORE_CLI_SCRIPT` is set.
pub fn run_cli() -> Result<(), CliError> {
    let mode = if env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Direct
    };
    let mut context = CliContext::new(mode)?;

    match mode {
        CliMode::Direct => {
            let args: Vec<String> = env::args().skip(1).collect();
            run_direct(&mut context, &args)
        }
        CliMode::Script => run_script(&mut context, io::stdin().lock()),
    }
}

fn run_direct(context: &mut CliContext, args: &[String]) -> Result<(), CliError> {
    let Some((command, rest)) = args.split_first() else {
        help::print_overview(&context.registry);
        return Ok(());
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    match context.dispatch(command, &rest) {
        Ok(_) => Ok(()),
        Err(err) => {
            context.report_error(&err);
            Err(err.into())
        }
    }
}

/// Executes one command per line. Failures are reported and the script
/// continues; the first failure is returned once input ends.
pub(crate) fn run_script(context: &mut CliContext, input: impl BufRead) -> Result<(), CliError> {
    let mut first_failure = None;
    for line in input.lines() {
        let line = line?;
        let tokens = match split(&line) {
            Ok(tokens) => tokens,
            Err(err) => {
                output::warning(format!("Could not parse `{}`: {}", line.trim(), err));
                continue;
            }
        };
        let Some((command, rest)) = tokens.split_first() else {
            continue;
        };
        if command.starts_with('#') {
            continue;
        }
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        match context.dispatch(command, &rest) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => {
                context.report_error(&err);
                first_failure.get_or_insert(err);
            }
        }
    }
    match first_failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

impl CliError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Command(CommandError::InvalidArguments(_))
            | CliError::Command(CommandError::UnknownCommand(_)) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::test_context;

    #[test]
    fn script_reports_the_first_failure() {
        let (mut context, _dir) = test_context();
        let script = "version\n\n# comment\nrendr x.json\nversion\n";
        let err = run_script(&mut context, script.as_bytes()).unwrap_err();
        assert!(matches!(err, CliError::Command(CommandError::UnknownCommand(_))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn exit_ends_the_script() {
        let (mut context, _dir) = test_context();
        run_script(&mut context, "exit\nbogus\n".as_bytes()).unwrap();
    }
}
