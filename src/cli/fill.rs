//! Prompt-driven form filling for the `fill` command.
//!
//! [`fill_form`] walks the schema in declaration order and writes each answer
//! through [`FormState::set_value`], so prompts see the same coercion and
//! validation messages a rendered form would show.

use std::sync::Arc;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use panel_schema::{FieldKind, FieldSchema, SelectOption};

use crate::cli::context::CommandError;
use crate::cli::output;
use crate::context::ViewContext;
use crate::errors::PanelError;
use crate::form::FormState;
use crate::validation::ValidationReport;

pub struct FieldPrompt<'a> {
    pub path: &'a str,
    pub label: String,
    pub kind: FieldKind,
    pub options: &'a [SelectOption],
    pub required: bool,
    /// Message from the previous attempt, if it was refused.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Value(String),
    Skip,
    Cancel,
}

pub trait FillInteraction {
    fn prompt_field(&mut self, prompt: &FieldPrompt<'_>) -> Result<PromptResponse, CommandError>;

    /// Asked before each new item of an array field; `count` items exist so far.
    fn add_item(&mut self, label: &str, count: usize) -> Result<bool, CommandError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Completed(ValidationReport),
    Cancelled,
}

pub fn fill_form(
    state: &mut FormState,
    ctx: &ViewContext,
    interaction: &mut dyn FillInteraction,
) -> Result<FillOutcome, CommandError> {
    let schema = Arc::clone(state.schema());
    for (section, entry) in schema.entries() {
        let Some(field) = entry.spec.known() else {
            continue;
        };
        let path = format!("{}.{}", section, entry.key);
        let label = ctx.t(&field.label);

        if field.kind != FieldKind::Array {
            if !ask(state, ctx, interaction, &path, field)? {
                return Ok(FillOutcome::Cancelled);
            }
            continue;
        }

        let mut count = state.item_keys(&path)?.len();
        while interaction.add_item(&label, count)? {
            state.add_item(&path)?;
            for child in &field.children {
                let Some(child_field) = child.spec.known() else {
                    continue;
                };
                let child_path = format!("{}.{}.{}", path, count, child.key);
                if !ask(state, ctx, interaction, &child_path, child_field)? {
                    return Ok(FillOutcome::Cancelled);
                }
            }
            count += 1;
        }
    }
    Ok(FillOutcome::Completed(state.validate_all()))
}

/// Prompts until the answer is stored without error or skipped. Returns
/// `false` when the user cancels.
fn ask(
    state: &mut FormState,
    ctx: &ViewContext,
    interaction: &mut dyn FillInteraction,
    path: &str,
    field: &FieldSchema,
) -> Result<bool, CommandError> {
    let mut error = None;
    loop {
        let prompt = FieldPrompt {
            path,
            label: ctx.t(&field.label),
            kind: field.kind,
            options: &field.options,
            required: field.is_required(),
            error: error.take(),
        };
        let text = match interaction.prompt_field(&prompt)? {
            PromptResponse::Value(text) => text,
            PromptResponse::Skip => return Ok(true),
            PromptResponse::Cancel => return Ok(false),
        };
        match state.set_value(path, text.into()) {
            Ok(()) => match state.error(path) {
                Some(message) => error = Some(message.to_string()),
                None => return Ok(true),
            },
            Err(PanelError::InvalidInput { reason, .. }) => error = Some(reason),
            Err(other) => return Err(other.into()),
        }
    }
}

/// Terminal prompts backed by `dialoguer`.
pub struct DialoguerInteraction {
    theme: ColorfulTheme,
}

impl DialoguerInteraction {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for DialoguerInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl FillInteraction for DialoguerInteraction {
    fn prompt_field(&mut self, prompt: &FieldPrompt<'_>) -> Result<PromptResponse, CommandError> {
        if let Some(error) = &prompt.error {
            output::warning(error);
        }
        let marker = if prompt.required { " *" } else { "" };
        let title = format!("{}{} ({})", prompt.label, marker, prompt.path);

        let response = match prompt.kind {
            FieldKind::Checkbox => {
                let checked = Confirm::with_theme(&self.theme)
                    .with_prompt(title)
                    .default(false)
                    .interact()?;
                PromptResponse::Value(checked.to_string())
            }
            FieldKind::Select => {
                let mut labels: Vec<&str> = prompt.options.iter().map(|o| o.label.as_str()).collect();
                labels.push("(leave empty)");
                let picked = Select::with_theme(&self.theme)
                    .with_prompt(title)
                    .items(&labels)
                    .default(0)
                    .interact_opt()?;
                match picked {
                    None => PromptResponse::Cancel,
                    Some(idx) => match prompt.options.get(idx) {
                        Some(option) => PromptResponse::Value(option.value.clone()),
                        None => PromptResponse::Skip,
                    },
                }
            }
            _ => {
                let text: String = Input::with_theme(&self.theme)
                    .with_prompt(title)
                    .allow_empty(true)
                    .interact_text()?;
                PromptResponse::Value(text)
            }
        };
        Ok(response)
    }

    fn add_item(&mut self, label: &str, count: usize) -> Result<bool, CommandError> {
        let question = if count == 0 {
            format!("Add an item to {label}?")
        } else {
            format!("Add another item to {label}? ({count} so far)")
        };
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(false)
            .interact()?)
    }
}
