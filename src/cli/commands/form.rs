use std::sync::Arc;

use serde_json::Value;

use panel_schema::format_number;

use super::{require_positional, split_flags, CommandDefinition};
use crate::cli::context::{read_json, CliContext, CliMode, CommandError, CommandResult};
use crate::cli::fill::{fill_form, DialoguerInteraction, FillOutcome};
use crate::cli::output;
use crate::form::{Control, FormState, Widget};
use crate::schema::decode_form_schema;
use crate::submission::flatten;
use crate::validation::ValidationReport;

const RENDER_USAGE: &str = "render <schema.json> [--json]";
const VALIDATE_USAGE: &str = "validate <schema.json> <values.json>";
const FLATTEN_USAGE: &str = "flatten <values.json> [--skip-empty]";
const FILL_USAGE: &str = "fill <schema.json>";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "render",
            "Print the control tree of a form schema",
            RENDER_USAGE,
            cmd_render,
        ),
        CommandDefinition::new(
            "validate",
            "Validate a value tree against a form schema",
            VALIDATE_USAGE,
            cmd_validate,
        ),
        CommandDefinition::new(
            "flatten",
            "Flatten a nested value tree into a submission body",
            FLATTEN_USAGE,
            cmd_flatten,
        ),
        CommandDefinition::new(
            "fill",
            "Fill a form interactively and print the payload",
            FILL_USAGE,
            cmd_fill,
        ),
    ]
}

fn load_form(context: &CliContext, path: &str) -> Result<FormState, CommandError> {
    let schema = decode_form_schema(&read_json(path)?)?;
    Ok(FormState::new(Arc::new(schema), &context.compile_options())?)
}

fn cmd_render(context: &mut CliContext, args: &[&str]) -> CommandResult {
    let (positional, flags) = split_flags(args);
    let as_json = flags.contains(&"--json");
    let [schema_path] = positional.as_slice() else {
        return Err(CommandError::InvalidArguments(format!("Usage: {RENDER_USAGE}")));
    };

    let state = load_form(context, schema_path)?;
    let rendered = state.render(&context.view_context()?);
    if as_json {
        output::raw(serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    for section in &rendered.sections {
        output::section(&section.title);
        if let Some(description) = &section.description {
            output::info(description);
        }
        for control in &section.controls {
            print_control(control, 1);
        }
    }
    Ok(())
}

fn print_control(control: &Control, depth: usize) {
    let indent = "  ".repeat(depth);
    let marker = if control.required { "*" } else { "" };
    output::raw(format!(
        "{indent}{:<28} {}{} [{}]",
        control.path,
        control.label,
        marker,
        describe_widget(&control.widget)
    ));
    if let Some(error) = &control.error {
        output::raw(format!("{indent}  ! {error}"));
    }
    if let Widget::Repeater { items } = &control.widget {
        for item in items {
            output::raw(format!("{indent}  item {} ({})", item.index, item.key));
            for child in &item.controls {
                print_control(child, depth + 2);
            }
        }
    }
}

pub(crate) fn describe_widget(widget: &Widget) -> String {
    match widget {
        Widget::TextInput { value } => format!("text = {value:?}"),
        Widget::TextArea { value } => format!("textarea = {value:?}"),
        Widget::NumberInput { value } => format!(
            "number = {}",
            value.map(format_number).unwrap_or_else(|| "-".into())
        ),
        Widget::Toggle { checked } => format!("checkbox = {}", if *checked { "yes" } else { "no" }),
        Widget::Select { options, selected } => format!(
            "select of {} = {}",
            options.len(),
            selected.as_deref().unwrap_or("-")
        ),
        Widget::Repeater { items } => format!("array, {} item(s)", items.len()),
    }
}

fn cmd_validate(context: &mut CliContext, args: &[&str]) -> CommandResult {
    let positional = require_positional(args, 2, VALIDATE_USAGE)?;
    let mut state = load_form(context, positional[0])?;
    state.load(&read_json(positional[1])?);
    let report = state.validate_all();
    report_validation(&report, context.config.skip_empty)
}

fn report_validation(report: &ValidationReport, skip_empty: bool) -> CommandResult {
    if !report.is_valid() {
        output::section("Validation errors");
        for (path, message) in &report.errors {
            output::raw(format!("  {:<28} {}", path, message));
        }
        return Err(CommandError::ValidationFailed(report.errors.len()));
    }
    output::success("Values are valid.");
    let body = Value::Object(flatten(&report.values, skip_empty));
    output::raw(serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn cmd_flatten(context: &mut CliContext, args: &[&str]) -> CommandResult {
    let (positional, flags) = split_flags(args);
    let [values_path] = positional.as_slice() else {
        return Err(CommandError::InvalidArguments(format!("Usage: {FLATTEN_USAGE}")));
    };
    let skip_empty = match flags.as_slice() {
        [] => context.config.skip_empty,
        ["--skip-empty"] => true,
        ["--keep-empty"] => false,
        _ => {
            return Err(CommandError::InvalidArguments(format!(
                "Usage: {FLATTEN_USAGE}"
            )))
        }
    };

    let tree = read_json(values_path)?;
    if !tree.is_object() {
        output::warning("The value tree is not an object; nothing to flatten.");
    }
    let body = Value::Object(flatten(&tree, skip_empty));
    output::raw(serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn cmd_fill(context: &mut CliContext, args: &[&str]) -> CommandResult {
    if context.mode == CliMode::Script {
        return Err(CommandError::NotInteractive("fill"));
    }
    let positional = require_positional(args, 1, FILL_USAGE)?;
    let mut state = load_form(context, positional[0])?;
    let ctx = context.view_context()?;
    let mut interaction = DialoguerInteraction::new();

    match fill_form(&mut state, &ctx, &mut interaction)? {
        FillOutcome::Cancelled => {
            output::warning("Form filling cancelled.");
            Ok(())
        }
        FillOutcome::Completed(report) => report_validation(&report, context.config.skip_empty),
    }
}
