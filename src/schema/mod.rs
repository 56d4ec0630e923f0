//! Trust-boundary decoding of backend payloads into the typed schema model.
//!
//! Everything past this module works with [`panel_schema`] types only; raw
//! `serde_json::Value` payloads never travel further into the core.

mod form;
mod matrix;

pub use form::{decode_form_schema, parse_form_schema};
pub use matrix::{decode_matrix_data, decode_matrix_headers};

use serde::Deserialize;
use serde_json::Value;

use panel_schema::SelectOption;

use crate::errors::PanelError;

/// Turns a field key such as `min_deposit` into `Min deposit`.
pub fn humanize_key(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Renders a scalar JSON value as the string used for option matching.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOption {
    value: Value,
    #[serde(default)]
    label: Option<String>,
}

pub(crate) fn decode_options(raw: Vec<RawOption>, path: &str) -> Result<Vec<SelectOption>, PanelError> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, option)| {
            let value = scalar_text(&option.value).ok_or_else(|| {
                PanelError::schema(
                    format!("{path}.options.{idx}"),
                    "option value must be a string, number or boolean",
                )
            })?;
            let label = option.label.unwrap_or_else(|| value.clone());
            Ok(SelectOption { value, label })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn humanize_replaces_separators_and_capitalizes() {
        assert_eq!(humanize_key("min_deposit"), "Min deposit");
        assert_eq!(humanize_key("age"), "Age");
        assert_eq!(humanize_key(""), "");
    }

    #[test]
    fn option_values_accept_numbers() {
        let raw: Vec<RawOption> =
            serde_json::from_value(json!([{"value": 1, "label": "One"}, {"value": "eur"}])).unwrap();
        let options = decode_options(raw, "general.currency").unwrap();
        assert_eq!(options[0], SelectOption::new("1", "One"));
        assert_eq!(options[1], SelectOption::new("eur", "eur"));
    }

    #[test]
    fn option_objects_are_rejected() {
        let raw: Vec<RawOption> = serde_json::from_value(json!([{"value": {"x": 1}}])).unwrap();
        let err = decode_options(raw, "s.f").unwrap_err();
        assert!(matches!(err, PanelError::SchemaConfiguration { path, .. } if path == "s.f.options.0"));
    }
}
