//! Turns a [`FormState`] into a control tree a host UI can draw.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use panel_schema::{FieldEntry, FieldKind, FieldSchema, FieldSpec, SelectOption};

use super::values::{ArrayItem, FieldValue, ItemKey};
use super::FormState;
use crate::context::ViewContext;
use crate::schema::{humanize_key, scalar_text};
use crate::validation::{coerce_bool, coerce_number};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedForm {
    pub sections: Vec<RenderedSection>,
    /// Server errors that could not be tied to a rendered control.
    pub form_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSection {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub path: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub tooltip: Option<String>,
    pub required: bool,
    pub error: Option<String>,
    pub widget: Widget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    TextInput { value: String },
    TextArea { value: String },
    NumberInput { value: Option<f64> },
    Toggle { checked: bool },
    Select {
        options: Vec<SelectOption>,
        selected: Option<String>,
    },
    Repeater { items: Vec<RepeaterItem> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeaterItem {
    pub key: ItemKey,
    pub index: usize,
    pub controls: Vec<Control>,
}

impl RenderedForm {
    /// Every control, depth first, including repeater children.
    pub fn controls(&self) -> Vec<&Control> {
        fn walk<'a>(controls: &'a [Control], out: &mut Vec<&'a Control>) {
            for control in controls {
                out.push(control);
                if let Widget::Repeater { items } = &control.widget {
                    for item in items {
                        walk(&item.controls, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        for section in &self.sections {
            walk(&section.controls, &mut out);
        }
        out
    }

    pub fn control(&self, path: &str) -> Option<&Control> {
        self.controls().into_iter().find(|control| control.path == path)
    }
}

/// Sections and fields come out in declaration order. Fields whose kind this
/// build does not support produce no control.
pub fn render(state: &FormState, ctx: &ViewContext) -> RenderedForm {
    let errors = state.errors();
    let mut shown = BTreeSet::new();
    let mut sections = Vec::with_capacity(state.schema().sections.len());

    for section in &state.schema().sections {
        let mut controls = Vec::with_capacity(section.fields.len());
        for entry in &section.fields {
            let field = match &entry.spec {
                FieldSpec::Known(field) => field,
                FieldSpec::Unsupported { kind } => {
                    tracing::debug!(section = %section.key, field = %entry.key, kind = %kind, "no control for unsupported kind");
                    continue;
                }
            };
            let path = format!("{}.{}", section.key, entry.key);
            let Some(bound) = state.bound(&path) else {
                continue;
            };
            let widget = match bound {
                FieldValue::Items(items) => Widget::Repeater {
                    items: items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| repeater_item(&path, index, item, &field.children, ctx))
                        .collect(),
                },
                FieldValue::Scalar(value) => scalar_widget(field, value, ctx),
            };
            controls.push(control(path, field, widget, ctx));
        }
        sections.push(RenderedSection {
            key: section.key.clone(),
            title: ctx.t(&humanize_key(&section.key)),
            description: ctx.t_opt(section.description.as_deref()),
            controls,
        });
    }

    let mut form = RenderedForm {
        sections,
        form_errors: Vec::new(),
    };
    for control in form.controls() {
        shown.insert(control.path.clone());
    }
    form.form_errors = errors
        .into_iter()
        .filter(|(path, _)| !shown.contains(path))
        .map(|(_, message)| message)
        .collect();
    attach_errors(&mut form.sections, state);
    form
}

fn repeater_item(
    path: &str,
    index: usize,
    item: &ArrayItem,
    children: &[FieldEntry],
    ctx: &ViewContext,
) -> RepeaterItem {
    let controls = children
        .iter()
        .filter_map(|entry| {
            let FieldSpec::Known(child) = &entry.spec else {
                return None;
            };
            let value = item.values.get(&entry.key).unwrap_or(&Value::Null);
            let widget = scalar_widget(child, value, ctx);
            Some(control(format!("{path}.{index}.{}", entry.key), child, widget, ctx))
        })
        .collect();
    RepeaterItem {
        key: item.key,
        index,
        controls,
    }
}

fn scalar_widget(field: &FieldSchema, value: &Value, ctx: &ViewContext) -> Widget {
    match field.kind {
        FieldKind::Text => Widget::TextInput {
            value: scalar_text(value).unwrap_or_default(),
        },
        FieldKind::Textarea => Widget::TextArea {
            value: scalar_text(value).unwrap_or_default(),
        },
        FieldKind::Number => Widget::NumberInput {
            value: coerce_number(value).and_then(|number| number.as_f64()),
        },
        FieldKind::Checkbox => Widget::Toggle {
            checked: coerce_bool(value).unwrap_or(false),
        },
        FieldKind::Select => Widget::Select {
            options: field
                .options
                .iter()
                .map(|option| SelectOption::new(option.value.clone(), ctx.t(&option.label)))
                .collect(),
            selected: scalar_text(value),
        },
        FieldKind::Array => Widget::Repeater { items: Vec::new() },
    }
}

fn control(path: String, field: &FieldSchema, widget: Widget, ctx: &ViewContext) -> Control {
    Control {
        path,
        label: ctx.t(&field.label),
        placeholder: ctx.t_opt(field.placeholder.as_deref()),
        tooltip: ctx.t_opt(field.tooltip.as_deref()),
        required: field.is_required(),
        error: None,
        widget,
    }
}

fn attach_errors(sections: &mut [RenderedSection], state: &FormState) {
    fn walk(controls: &mut [Control], state: &FormState) {
        for control in controls {
            control.error = state.error(&control.path).map(str::to_string);
            if let Widget::Repeater { items } = &mut control.widget {
                for item in items {
                    walk(&mut item.controls, state);
                }
            }
        }
    }
    for section in sections {
        walk(&mut section.controls, state);
    }
}
