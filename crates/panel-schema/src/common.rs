//! Shared option and scalar types used by both forms and matrices.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of an enumerated choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Returns `true` when `value` is one of the option values.
pub fn options_contain(options: &[SelectOption], value: &str) -> bool {
    options.iter().any(|option| option.value == value)
}

/// A single entered value inside a matrix cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CellScalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellScalar {
    /// Textual form used for option matching and display.
    pub fn as_text(&self) -> String {
        match self {
            CellScalar::Text(text) => text.clone(),
            CellScalar::Number(number) => format_number(*number),
            CellScalar::Bool(flag) => flag.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellScalar::Number(number) => Some(*number),
            CellScalar::Text(text) => text.trim().parse().ok(),
            CellScalar::Bool(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellScalar::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for CellScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellScalar {
    fn from(value: &str) -> Self {
        CellScalar::Text(value.to_string())
    }
}

impl From<String> for CellScalar {
    fn from(value: String) -> Self {
        CellScalar::Text(value)
    }
}

impl From<f64> for CellScalar {
    fn from(value: f64) -> Self {
        CellScalar::Number(value)
    }
}

impl From<bool> for CellScalar {
    fn from(value: bool) -> Self {
        CellScalar::Bool(value)
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
