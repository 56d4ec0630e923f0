use panel_core::cli::{output, run_cli};

fn main() {
    panel_core::init();
    if let Err(err) = run_cli() {
        tracing::debug!(error = %err, "command failed");
        if matches!(err, panel_core::cli::CliError::Io(_) | panel_core::cli::CliError::Config(_)) {
            output::error(&err);
        }
        std::process::exit(err.exit_code());
    }
}
