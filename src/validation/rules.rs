//! Compiled per-field checks and their default messages.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

use panel_schema::format_number;

use crate::schema::scalar_text;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Base type check derived from the field kind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BaseCheck {
    Text,
    Number,
    Checkbox,
    Select { allowed: Vec<String> },
    Array { children: Vec<(String, FieldValidator)> },
}

/// A constraint layered on top of the base check, with its resolved message.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Check {
    MinLength(usize, String),
    MaxLength(usize, String),
    MinItems(usize, String),
    MaxItems(usize, String),
    Min(f64, String),
    Max(f64, String),
    Gt(f64, String),
    Lt(f64, String),
    Gte(f64, String),
    Lte(f64, String),
    Email(String),
    Positive(String),
    Negative(String),
}

/// Value after type coercion, ready for constraint checks.
enum Coerced {
    Text(String),
    Number(Number),
    Bool(bool),
    Items(Vec<Value>),
    Choice(Value),
}

impl Coerced {
    fn into_value(self) -> Value {
        match self {
            Coerced::Text(text) => Value::String(text),
            Coerced::Number(number) => Value::Number(number),
            Coerced::Bool(flag) => Value::Bool(flag),
            Coerced::Items(items) => Value::Array(items),
            Coerced::Choice(value) => value,
        }
    }
}

impl Check {
    /// Returns the failure message when the coerced value violates the check.
    fn violation(&self, value: &Coerced) -> Option<&str> {
        let number = match value {
            Coerced::Number(number) => number.as_f64(),
            _ => None,
        };
        let failed = match (self, value) {
            (Check::MinLength(limit, _), Coerced::Text(text)) => text.chars().count() < *limit,
            (Check::MaxLength(limit, _), Coerced::Text(text)) => text.chars().count() > *limit,
            (Check::MinItems(limit, _), Coerced::Items(items)) => items.len() < *limit,
            (Check::MaxItems(limit, _), Coerced::Items(items)) => items.len() > *limit,
            (Check::Min(limit, _) | Check::Gte(limit, _), _) => number.is_some_and(|n| n < *limit),
            (Check::Max(limit, _) | Check::Lte(limit, _), _) => number.is_some_and(|n| n > *limit),
            (Check::Gt(limit, _), _) => number.is_some_and(|n| n <= *limit),
            (Check::Lt(limit, _), _) => number.is_some_and(|n| n >= *limit),
            (Check::Positive(_), _) => number.is_some_and(|n| n <= 0.0),
            (Check::Negative(_), _) => number.is_some_and(|n| n >= 0.0),
            (Check::Email(_), Coerced::Text(text)) => !EMAIL.is_match(text.trim()),
            _ => false,
        };
        failed.then(|| self.message())
    }

    fn message(&self) -> &str {
        match self {
            Check::MinLength(_, message)
            | Check::MaxLength(_, message)
            | Check::MinItems(_, message)
            | Check::MaxItems(_, message)
            | Check::Min(_, message)
            | Check::Max(_, message)
            | Check::Gt(_, message)
            | Check::Lt(_, message)
            | Check::Gte(_, message)
            | Check::Lte(_, message)
            | Check::Email(message)
            | Check::Positive(message)
            | Check::Negative(message) => message,
        }
    }
}

/// Validator for one field (or one child of an array item).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldValidator {
    pub(crate) label: String,
    /// Message used when a required value is missing; `None` when optional.
    pub(crate) required: Option<String>,
    pub(crate) base: BaseCheck,
    pub(crate) type_message: String,
    pub(crate) checks: Vec<Check>,
}

impl FieldValidator {
    /// Validates `raw` at `path`, recording at most one error for the path itself
    /// (plus item paths for arrays). Returns the coerced value.
    pub(crate) fn check(
        &self,
        raw: Option<&Value>,
        path: &str,
        errors: &mut BTreeMap<String, String>,
    ) -> Value {
        if is_empty(raw) {
            if let Some(message) = &self.required {
                errors.insert(path.to_string(), message.clone());
            }
            return match self.base {
                BaseCheck::Array { .. } => Value::Array(Vec::new()),
                _ => Value::Null,
            };
        }
        let Some(raw) = raw else {
            return Value::Null;
        };

        let Some(coerced) = self.coerce(raw) else {
            errors.insert(path.to_string(), self.type_message.clone());
            return raw.clone();
        };

        if let Some(message) = self.checks.iter().find_map(|check| check.violation(&coerced)) {
            errors.insert(path.to_string(), message.to_string());
        }

        match (&self.base, coerced) {
            (BaseCheck::Array { children }, Coerced::Items(items)) => {
                Value::Array(check_items(children, items, path, &self.label, errors))
            }
            (_, coerced) => coerced.into_value(),
        }
    }

    fn coerce(&self, raw: &Value) -> Option<Coerced> {
        match &self.base {
            BaseCheck::Text => match raw {
                Value::String(text) => Some(Coerced::Text(text.clone())),
                Value::Number(number) => Some(Coerced::Text(number.to_string())),
                Value::Bool(flag) => Some(Coerced::Text(flag.to_string())),
                _ => None,
            },
            BaseCheck::Number => coerce_number(raw).map(Coerced::Number),
            BaseCheck::Checkbox => coerce_bool(raw).map(Coerced::Bool),
            BaseCheck::Select { allowed } => scalar_text(raw)
                .filter(|text| allowed.iter().any(|value| value == text))
                .map(|_| Coerced::Choice(raw.clone())),
            BaseCheck::Array { .. } => match raw {
                Value::Array(items) => Some(Coerced::Items(items.clone())),
                _ => None,
            },
        }
    }
}

fn check_items(
    children: &[(String, FieldValidator)],
    items: Vec<Value>,
    path: &str,
    label: &str,
    errors: &mut BTreeMap<String, String>,
) -> Vec<Value> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let item_path = format!("{path}.{idx}");
            let Value::Object(fields) = item else {
                errors.insert(item_path, format!("{label} entries must be objects"));
                return item;
            };
            let mut coerced = Map::new();
            for (key, child) in children {
                let child_path = format!("{item_path}.{key}");
                let value = child.check(fields.get(key), &child_path, errors);
                coerced.insert(key.clone(), value);
            }
            Value::Object(coerced)
        })
        .collect()
}

/// Null, missing, blank strings and empty lists all count as "not provided".
pub(crate) fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Numbers pass through unchanged; numeric strings keep an integer
/// representation when they have one.
pub(crate) fn coerce_number(raw: &Value) -> Option<Number> {
    match raw {
        Value::Number(number) => Some(number.clone()),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(int) = text.parse::<i64>() {
                return Some(Number::from(int));
            }
            text.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}

pub(crate) fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 1.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Default message builders: "<label> must be <constraint>".
pub(crate) mod defaults {
    use super::format_number;

    pub fn required(label: &str) -> String {
        format!("{label} is required")
    }

    pub fn bound(label: &str, symbol: &str, limit: f64) -> String {
        format!("{label} must be {symbol} {}", format_number(limit))
    }

    pub fn min_length(label: &str, limit: usize) -> String {
        format!("{label} must be at least {limit} characters")
    }

    pub fn max_length(label: &str, limit: usize) -> String {
        format!("{label} must be at most {limit} characters")
    }

    pub fn min_items(label: &str, limit: usize) -> String {
        format!("{label} must have at least {limit} items")
    }

    pub fn max_items(label: &str, limit: usize) -> String {
        format!("{label} must have at most {limit} items")
    }

    pub fn email(label: &str) -> String {
        format!("{label} must be a valid email")
    }

    pub fn positive(label: &str) -> String {
        format!("{label} must be a positive number")
    }

    pub fn negative(label: &str) -> String {
        format!("{label} must be a negative number")
    }

    pub fn one_of(label: &str, allowed: &[String]) -> String {
        format!("{label} must be one of: {}", allowed.join(", "))
    }
}
