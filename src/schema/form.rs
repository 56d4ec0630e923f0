use serde::Deserialize;
use serde_json::{Map, Value};

use panel_schema::{
    FieldEntry, FieldKind, FieldSchema, FormSchema, Rule, SectionSchema, ValidationRules,
};

use super::{decode_options, humanize_key, RawOption};
use crate::errors::PanelError;

#[derive(Debug, Deserialize)]
struct RawFormSchema {
    sections: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(alias = "type")]
    kind: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    placeholder: Option<String>,
    #[serde(default)]
    tooltip: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    validation: Option<RawRules>,
    #[serde(default)]
    children: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRules {
    required: Option<RawRule>,
    min: Option<RawRule>,
    max: Option<RawRule>,
    gt: Option<RawRule>,
    lt: Option<RawRule>,
    gte: Option<RawRule>,
    lte: Option<RawRule>,
    positive: Option<RawRule>,
    negative: Option<RawRule>,
    email: Option<RawRule>,
}

/// A constraint is either a bare value (`"gte": 18`) or `{ value, message }`.
/// A bare string on a flag rule is read as "enabled, with this message".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Detailed {
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(Value),
}

/// Parses a schema payload from JSON text.
pub fn parse_form_schema(data: &str) -> Result<FormSchema, PanelError> {
    let value: Value = serde_json::from_str(data)?;
    decode_form_schema(&value)
}

/// Decodes `{ sections: { key: { description?, fields: { key: FieldSchema } } } }`.
///
/// Unknown field kinds decode to an explicit unsupported entry; structural
/// problems are reported as [`PanelError::SchemaConfiguration`].
pub fn decode_form_schema(payload: &Value) -> Result<FormSchema, PanelError> {
    let raw: RawFormSchema = serde_json::from_value(payload.clone())
        .map_err(|err| PanelError::schema("sections", err.to_string()))?;

    let mut sections = Vec::with_capacity(raw.sections.len());
    for (section_key, section_value) in raw.sections {
        check_key(&section_key, &section_key)?;
        let section: RawSection = serde_json::from_value(section_value)
            .map_err(|err| PanelError::schema(section_key.as_str(), err.to_string()))?;
        let fields = decode_fields(section.fields, &section_key)?;
        sections.push(SectionSchema {
            key: section_key,
            description: section.description,
            fields,
        });
    }

    Ok(FormSchema::new(sections))
}

fn decode_fields(raw: Map<String, Value>, prefix: &str) -> Result<Vec<FieldEntry>, PanelError> {
    let mut entries = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let path = format!("{prefix}.{key}");
        check_key(&key, &path)?;
        entries.push(decode_field(key, value, &path)?);
    }
    Ok(entries)
}

fn decode_field(key: String, value: Value, path: &str) -> Result<FieldEntry, PanelError> {
    let raw: RawField =
        serde_json::from_value(value).map_err(|err| PanelError::schema(path, err.to_string()))?;

    let Some(kind) = FieldKind::from_wire(&raw.kind) else {
        tracing::warn!(path, kind = %raw.kind, "unsupported field kind in schema payload");
        return Ok(FieldEntry::unsupported(key, raw.kind));
    };

    let children = match (kind, raw.children) {
        (FieldKind::Array, Some(children)) if !children.is_empty() => {
            decode_fields(children, path)?
        }
        (FieldKind::Array, _) => {
            return Err(PanelError::schema(path, "array field declares no children"));
        }
        (_, Some(children)) if !children.is_empty() => {
            return Err(PanelError::schema(
                path,
                format!("{kind} field must not declare children"),
            ));
        }
        _ => Vec::new(),
    };

    let options = decode_options(raw.options, path)?;
    if kind == FieldKind::Select && options.is_empty() {
        tracing::warn!(path, "select field declares no options");
    }

    let validation = match raw.validation {
        Some(rules) => Some(decode_rules(rules, path)?),
        None => None,
    };

    let label = raw
        .label
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| humanize_key(&key));

    Ok(FieldEntry::new(
        key,
        FieldSchema {
            kind,
            label,
            placeholder: raw.placeholder,
            tooltip: raw.tooltip,
            required: raw.required,
            options,
            validation,
            children,
        },
    ))
}

fn decode_rules(raw: RawRules, path: &str) -> Result<ValidationRules, PanelError> {
    let rule_path = |name: &str| format!("{path}.validation.{name}");
    Ok(ValidationRules {
        required: flag_rule(raw.required, &rule_path("required"))?,
        min: number_rule(raw.min, &rule_path("min"))?,
        max: number_rule(raw.max, &rule_path("max"))?,
        gt: number_rule(raw.gt, &rule_path("gt"))?,
        lt: number_rule(raw.lt, &rule_path("lt"))?,
        gte: number_rule(raw.gte, &rule_path("gte"))?,
        lte: number_rule(raw.lte, &rule_path("lte"))?,
        positive: flag_rule(raw.positive, &rule_path("positive"))?,
        negative: flag_rule(raw.negative, &rule_path("negative"))?,
        email: flag_rule(raw.email, &rule_path("email"))?,
    })
}

fn number_rule(raw: Option<RawRule>, path: &str) -> Result<Option<Rule<f64>>, PanelError> {
    let (value, message) = match raw {
        None => return Ok(None),
        Some(RawRule::Bare(value)) => (Some(value), None),
        Some(RawRule::Detailed { value, message }) => (value, message),
    };
    let number = value
        .as_ref()
        .and_then(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .ok_or_else(|| PanelError::schema(path, "constraint needs a numeric value"))?;
    Ok(Some(Rule {
        value: number,
        message,
    }))
}

fn flag_rule(raw: Option<RawRule>, path: &str) -> Result<Option<Rule<bool>>, PanelError> {
    let rule = match raw {
        None => return Ok(None),
        Some(RawRule::Bare(Value::Bool(flag))) => Rule::new(flag),
        Some(RawRule::Bare(Value::String(message))) => Rule::new(true).with_message(message),
        Some(RawRule::Detailed { value: None, message }) => Rule {
            value: true,
            message,
        },
        Some(RawRule::Detailed {
            value: Some(Value::Bool(flag)),
            message,
        }) => Rule {
            value: flag,
            message,
        },
        Some(_) => return Err(PanelError::schema(path, "constraint needs a boolean value")),
    };
    Ok(Some(rule))
}

fn check_key(key: &str, path: &str) -> Result<(), PanelError> {
    if key.trim().is_empty() {
        return Err(PanelError::schema(path, "keys must not be empty"));
    }
    if key.contains('.') {
        return Err(PanelError::schema(path, "keys must not contain `.`"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_schema::FieldSpec;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "sections": {
                "general": {
                    "description": "Basics",
                    "fields": {
                        "name": {"kind": "text", "required": true},
                        "age": {"kind": "number", "label": "Age", "validation": {"gte": 18}},
                        "email": {"kind": "text", "validation": {"email": "Bad email"}}
                    }
                },
                "fees": {
                    "fields": {
                        "tiers": {
                            "kind": "array",
                            "children": {
                                "from": {"kind": "number", "validation": {"min": {"value": 0, "message": "no"}}},
                                "currency": {"kind": "select", "options": [{"value": "EUR", "label": "Euro"}]}
                            }
                        },
                        "opened": {"kind": "date"}
                    }
                }
            }
        })
    }

    #[test]
    fn decodes_sections_and_fields_in_declaration_order() {
        let schema = decode_form_schema(&sample()).unwrap();
        let keys: Vec<_> = schema
            .entries()
            .map(|(section, entry)| format!("{section}.{}", entry.key))
            .collect();
        assert_eq!(
            keys,
            ["general.name", "general.age", "general.email", "fees.tiers", "fees.opened"]
        );

        let general = schema.section("general").unwrap();
        assert_eq!(general.description.as_deref(), Some("Basics"));
        let name = schema.field("general", "name").unwrap();
        assert_eq!(name.label, "Name");
        assert!(name.is_required());
    }

    #[test]
    fn decodes_rules_with_and_without_messages() {
        let schema = decode_form_schema(&sample()).unwrap();
        let age = schema.field("general", "age").unwrap();
        let rules = age.validation.as_ref().unwrap();
        assert_eq!(rules.gte, Some(Rule::new(18.0)));

        let email = schema.field("general", "email").unwrap();
        let rule = email.validation.as_ref().unwrap().email.clone().unwrap();
        assert!(rule.value);
        assert_eq!(rule.message.as_deref(), Some("Bad email"));

        let tiers = schema.field("fees", "tiers").unwrap();
        let Some(FieldSpec::Known(from)) = tiers.child("from") else {
            panic!("missing child");
        };
        let min = from.validation.as_ref().unwrap().min.clone().unwrap();
        assert_eq!(min.value, 0.0);
        assert_eq!(min.message.as_deref(), Some("no"));
    }

    #[test]
    fn unknown_kind_is_kept_as_unsupported() {
        let schema = decode_form_schema(&sample()).unwrap();
        let spec = schema.section("fees").unwrap().field("opened").unwrap();
        assert_eq!(
            spec,
            &FieldSpec::Unsupported {
                kind: "date".into()
            }
        );
    }

    #[test]
    fn array_without_children_is_a_configuration_error() {
        let payload = json!({"sections": {"s": {"fields": {"items": {"kind": "array"}}}}});
        let err = decode_form_schema(&payload).unwrap_err();
        assert!(matches!(err, PanelError::SchemaConfiguration { path, .. } if path == "s.items"));
    }

    #[test]
    fn children_on_scalar_fields_are_rejected() {
        let payload = json!({"sections": {"s": {"fields": {"name": {
            "kind": "text",
            "children": {"x": {"kind": "text"}}
        }}}}});
        assert!(decode_form_schema(&payload).is_err());
    }

    #[test]
    fn dotted_keys_are_rejected() {
        let payload = json!({"sections": {"s": {"fields": {"a.b": {"kind": "text"}}}}});
        let err = decode_form_schema(&payload).unwrap_err();
        assert!(err.to_string().contains("s.a.b"));
    }

    #[test]
    fn non_numeric_bounds_are_rejected() {
        let payload = json!({"sections": {"s": {"fields": {"n": {
            "kind": "number",
            "validation": {"max": "lots"}
        }}}}});
        let err = decode_form_schema(&payload).unwrap_err();
        assert!(
            matches!(err, PanelError::SchemaConfiguration { path, .. } if path == "s.n.validation.max")
        );
    }
}
