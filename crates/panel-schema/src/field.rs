//! Field declarations received from the backend.

use std::fmt;

use serde::Serialize;

use crate::common::SelectOption;

/// Supported input kinds for form fields.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Checkbox,
    Select,
    Array,
}

impl FieldKind {
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Text,
        FieldKind::Textarea,
        FieldKind::Number,
        FieldKind::Checkbox,
        FieldKind::Select,
        FieldKind::Array,
    ];

    /// Parses the wire name of a kind. Returns `None` for kinds this build does not know.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => Some(FieldKind::Text),
            "textarea" => Some(FieldKind::Textarea),
            "number" => Some(FieldKind::Number),
            "checkbox" => Some(FieldKind::Checkbox),
            "select" => Some(FieldKind::Select),
            "array" => Some(FieldKind::Array),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select => "select",
            FieldKind::Array => "array",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A constraint value with an optional custom failure message.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rule<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Rule<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Constraint set layered on top of a field's base kind check.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationRules {
    pub required: Option<Rule<bool>>,
    pub min: Option<Rule<f64>>,
    pub max: Option<Rule<f64>>,
    pub gt: Option<Rule<f64>>,
    pub lt: Option<Rule<f64>>,
    pub gte: Option<Rule<f64>>,
    pub lte: Option<Rule<f64>>,
    pub positive: Option<Rule<bool>>,
    pub negative: Option<Rule<bool>>,
    pub email: Option<Rule<bool>>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        self == &ValidationRules::default()
    }
}

/// One form field declaration.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub label: String,
    pub placeholder: Option<String>,
    pub tooltip: Option<String>,
    pub required: bool,
    pub options: Vec<SelectOption>,
    pub validation: Option<ValidationRules>,
    /// Shape of each repeated item. Only populated for [`FieldKind::Array`].
    pub children: Vec<FieldEntry>,
}

impl FieldSchema {
    pub fn new(kind: FieldKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            placeholder: None,
            tooltip: None,
            required: false,
            options: Vec::new(),
            validation: None,
            children: Vec::new(),
        }
    }

    pub fn with_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.validation = Some(rules);
        self
    }

    pub fn with_children(mut self, children: Vec<FieldEntry>) -> Self {
        self.children = children;
        self
    }

    /// Required either through the top-level flag or the `validation.required` rule.
    pub fn is_required(&self) -> bool {
        self.required
            || self
                .validation
                .as_ref()
                .and_then(|rules| rules.required.as_ref())
                .map(|rule| rule.value)
                .unwrap_or(false)
    }

    /// Looks up a child field of an array field.
    pub fn child(&self, key: &str) -> Option<&FieldSpec> {
        self.children
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.spec)
    }
}

/// A field as delivered by the server: either a kind this build understands or
/// an explicitly unsupported one kept for forward compatibility.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FieldSpec {
    Known(FieldSchema),
    Unsupported { kind: String },
}

impl FieldSpec {
    pub fn known(&self) -> Option<&FieldSchema> {
        match self {
            FieldSpec::Known(schema) => Some(schema),
            FieldSpec::Unsupported { .. } => None,
        }
    }
}

/// A keyed field inside a section or an array item.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldEntry {
    pub key: String,
    pub spec: FieldSpec,
}

impl FieldEntry {
    pub fn new(key: impl Into<String>, schema: FieldSchema) -> Self {
        Self {
            key: key.into(),
            spec: FieldSpec::Known(schema),
        }
    }

    pub fn unsupported(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            spec: FieldSpec::Unsupported { kind: kind.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_for_every_kind() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(FieldKind::from_wire("Select"), Some(FieldKind::Select));
        assert_eq!(FieldKind::from_wire("date"), None);
    }

    #[test]
    fn required_comes_from_flag_or_rule() {
        let plain = FieldSchema::new(FieldKind::Text, "Name");
        assert!(!plain.is_required());
        assert!(plain.clone().with_required().is_required());

        let via_rule = plain.with_validation(ValidationRules {
            required: Some(Rule::new(true)),
            ..ValidationRules::default()
        });
        assert!(via_rule.is_required());
    }
}
