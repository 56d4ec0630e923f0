//! Schema-to-validator compiler.
//!
//! [`compile`] turns a [`FormSchema`] into a [`FormValidator`]: a pure value
//! that checks a value tree keyed by `section.field` (and
//! `section.field.index.child` for array items). Each field runs a fixed
//! sequence: required, type coercion, bounds (min, max, gt, lt, gte, lte),
//! then domain checks (email, positive, negative). The first failure wins for
//! that path; sibling fields are always checked.

mod rules;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use panel_config::{Config, UnknownKindPolicy};
use panel_schema::{FieldEntry, FieldKind, FieldSchema, FieldSpec, FormSchema, ValidationRules};

use crate::errors::PanelError;
use rules::{defaults, BaseCheck, Check, FieldValidator};

pub(crate) use rules::{coerce_bool, coerce_number};

/// Compiler settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub unknown_kinds: UnknownKindPolicy,
}

impl From<&Config> for CompileOptions {
    fn from(config: &Config) -> Self {
        Self {
            unknown_kinds: config.unknown_kinds,
        }
    }
}

/// Outcome of validating a value tree. Validation failures are data, not errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Dotted path → message, one entry per failing path.
    pub errors: BTreeMap<String, String>,
    /// The value tree after type coercion, restricted to declared fields.
    pub values: Value,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CompiledField {
    section: String,
    key: String,
    validator: FieldValidator,
}

/// Compiled validator for one form schema. Holds no mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct FormValidator {
    fields: Vec<CompiledField>,
}

/// Compiles with the default options (unsupported kinds are rejected).
pub fn compile(schema: &FormSchema) -> Result<FormValidator, PanelError> {
    compile_with(schema, &CompileOptions::default())
}

pub fn compile_with(
    schema: &FormSchema,
    options: &CompileOptions,
) -> Result<FormValidator, PanelError> {
    let mut fields = Vec::new();
    for (section, entry) in schema.entries() {
        let path = format!("{section}.{}", entry.key);
        if let Some(validator) = compile_entry(entry, &path, options)? {
            fields.push(CompiledField {
                section: section.to_string(),
                key: entry.key.clone(),
                validator,
            });
        }
    }
    tracing::debug!(fields = fields.len(), "form validator compiled");
    Ok(FormValidator { fields })
}

fn compile_entry(
    entry: &FieldEntry,
    path: &str,
    options: &CompileOptions,
) -> Result<Option<FieldValidator>, PanelError> {
    match &entry.spec {
        FieldSpec::Known(schema) => compile_field(schema, path, options).map(Some),
        FieldSpec::Unsupported { kind } => match options.unknown_kinds {
            UnknownKindPolicy::Reject => Err(PanelError::schema(
                path,
                format!("unsupported field kind `{kind}`"),
            )),
            UnknownKindPolicy::Skip => {
                tracing::warn!(path, kind = %kind, "skipping field with unsupported kind");
                Ok(None)
            }
        },
    }
}

fn compile_field(
    schema: &FieldSchema,
    path: &str,
    options: &CompileOptions,
) -> Result<FieldValidator, PanelError> {
    let label = schema.label.as_str();
    let rules = schema.validation.clone().unwrap_or_default();

    let base = match schema.kind {
        FieldKind::Text | FieldKind::Textarea => BaseCheck::Text,
        FieldKind::Number => BaseCheck::Number,
        FieldKind::Checkbox => BaseCheck::Checkbox,
        FieldKind::Select => BaseCheck::Select {
            allowed: schema.options.iter().map(|o| o.value.clone()).collect(),
        },
        FieldKind::Array => {
            if schema.children.is_empty() {
                return Err(PanelError::schema(path, "array field declares no children"));
            }
            let mut children = Vec::with_capacity(schema.children.len());
            for child in &schema.children {
                let child_path = format!("{path}.{}", child.key);
                if let Some(validator) = compile_entry(child, &child_path, options)? {
                    children.push((child.key.clone(), validator));
                }
            }
            BaseCheck::Array { children }
        }
    };
    if schema.kind != FieldKind::Array && !schema.children.is_empty() {
        return Err(PanelError::schema(
            path,
            format!("{} field must not declare children", schema.kind),
        ));
    }

    let type_message = match &base {
        BaseCheck::Text => format!("{label} must be text"),
        BaseCheck::Number => format!("{label} must be a number"),
        BaseCheck::Checkbox => format!("{label} must be true or false"),
        BaseCheck::Select { allowed } => defaults::one_of(label, allowed),
        BaseCheck::Array { .. } => format!("{label} must be a list"),
    };

    let required = schema.is_required().then(|| {
        rules
            .required
            .as_ref()
            .and_then(|rule| rule.message.clone())
            .unwrap_or_else(|| defaults::required(label))
    });

    Ok(FieldValidator {
        label: label.to_string(),
        required,
        checks: compile_checks(schema.kind, &rules, label, path),
        base,
        type_message,
    })
}

fn compile_checks(kind: FieldKind, rules: &ValidationRules, label: &str, path: &str) -> Vec<Check> {
    let mut checks = Vec::new();
    let pick = |message: &Option<String>, fallback: String| message.clone().unwrap_or(fallback);
    let skip = |name: &str| {
        tracing::warn!(path, constraint = name, kind = %kind, "constraint does not apply to field kind");
    };
    let ceil = |limit: f64| limit.max(0.0).ceil() as usize;
    let floor = |limit: f64| limit.max(0.0).floor() as usize;

    if let Some(rule) = &rules.min {
        match kind {
            FieldKind::Number => checks.push(Check::Min(
                rule.value,
                pick(&rule.message, defaults::bound(label, "≥", rule.value)),
            )),
            FieldKind::Text | FieldKind::Textarea => checks.push(Check::MinLength(
                ceil(rule.value),
                pick(&rule.message, defaults::min_length(label, ceil(rule.value))),
            )),
            FieldKind::Array => checks.push(Check::MinItems(
                ceil(rule.value),
                pick(&rule.message, defaults::min_items(label, ceil(rule.value))),
            )),
            _ => skip("min"),
        }
    }
    if let Some(rule) = &rules.max {
        match kind {
            FieldKind::Number => checks.push(Check::Max(
                rule.value,
                pick(&rule.message, defaults::bound(label, "≤", rule.value)),
            )),
            FieldKind::Text | FieldKind::Textarea => checks.push(Check::MaxLength(
                floor(rule.value),
                pick(&rule.message, defaults::max_length(label, floor(rule.value))),
            )),
            FieldKind::Array => checks.push(Check::MaxItems(
                floor(rule.value),
                pick(&rule.message, defaults::max_items(label, floor(rule.value))),
            )),
            _ => skip("max"),
        }
    }

    let numeric: [(&str, &Option<panel_schema::Rule<f64>>, &str, fn(f64, String) -> Check); 4] = [
        ("gt", &rules.gt, ">", Check::Gt),
        ("lt", &rules.lt, "<", Check::Lt),
        ("gte", &rules.gte, "≥", Check::Gte),
        ("lte", &rules.lte, "≤", Check::Lte),
    ];
    for (name, rule, symbol, build) in numeric {
        let Some(rule) = rule else { continue };
        if kind == FieldKind::Number {
            checks.push(build(
                rule.value,
                pick(&rule.message, defaults::bound(label, symbol, rule.value)),
            ));
        } else {
            skip(name);
        }
    }

    if let Some(rule) = rules.email.as_ref().filter(|rule| rule.value) {
        match kind {
            FieldKind::Text | FieldKind::Textarea => {
                checks.push(Check::Email(pick(&rule.message, defaults::email(label))))
            }
            _ => skip("email"),
        }
    }
    if let Some(rule) = rules.positive.as_ref().filter(|rule| rule.value) {
        match kind {
            FieldKind::Number => {
                checks.push(Check::Positive(pick(&rule.message, defaults::positive(label))))
            }
            _ => skip("positive"),
        }
    }
    if let Some(rule) = rules.negative.as_ref().filter(|rule| rule.value) {
        match kind {
            FieldKind::Number => {
                checks.push(Check::Negative(pick(&rule.message, defaults::negative(label))))
            }
            _ => skip("negative"),
        }
    }
    checks
}

impl FormValidator {
    /// Validates a full value tree shaped `{ section: { field: value } }`.
    pub fn validate(&self, values: &Value) -> ValidationReport {
        let mut errors = BTreeMap::new();
        let mut coerced = Map::new();
        for field in &self.fields {
            let path = format!("{}.{}", field.section, field.key);
            let raw = lookup(values, &field.section, &field.key);
            let value = field.validator.check(raw, &path, &mut errors);
            let section = coerced
                .entry(field.section.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(section) = section {
                section.insert(field.key.clone(), value);
            }
        }
        ValidationReport {
            errors,
            values: Value::Object(coerced),
        }
    }

    /// Recomputes the errors of one field, including every item path of an
    /// array field. Returns `None` when the field is not part of this validator.
    pub fn validate_field(
        &self,
        values: &Value,
        section: &str,
        key: &str,
    ) -> Option<BTreeMap<String, String>> {
        let field = self
            .fields
            .iter()
            .find(|field| field.section == section && field.key == key)?;
        let mut errors = BTreeMap::new();
        let path = format!("{section}.{key}");
        field
            .validator
            .check(lookup(values, section, key), &path, &mut errors);
        Some(errors)
    }

    /// Whether `section.key` is validated (unsupported kinds skipped at compile time are not).
    pub fn covers(&self, section: &str, key: &str) -> bool {
        self.fields
            .iter()
            .any(|field| field.section == section && field.key == key)
    }

    /// Top-level field paths in declaration order.
    pub fn paths(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| format!("{}.{}", field.section, field.key))
            .collect()
    }
}

fn lookup<'a>(values: &'a Value, section: &str, key: &str) -> Option<&'a Value> {
    values.get(section)?.get(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_schema::{FieldEntry, Rule, SectionSchema, SelectOption};
    use serde_json::json;

    fn rules() -> ValidationRules {
        ValidationRules::default()
    }

    fn schema() -> FormSchema {
        FormSchema::new(vec![SectionSchema::new(
            "general",
            vec![
                FieldEntry::new("name", FieldSchema::new(FieldKind::Text, "Name").with_required()),
                FieldEntry::new(
                    "age",
                    FieldSchema::new(FieldKind::Number, "Age").with_validation(ValidationRules {
                        gte: Some(Rule::new(18.0)),
                        ..rules()
                    }),
                ),
                FieldEntry::new(
                    "email",
                    FieldSchema::new(FieldKind::Text, "Email").with_validation(ValidationRules {
                        min: Some(Rule::new(6.0)),
                        email: Some(Rule::new(true)),
                        ..rules()
                    }),
                ),
                FieldEntry::new(
                    "tier",
                    FieldSchema::new(FieldKind::Select, "Tier").with_options(vec![
                        SelectOption::new("gold", "Gold"),
                        SelectOption::new("silver", "Silver"),
                    ]),
                ),
                FieldEntry::new("active", FieldSchema::new(FieldKind::Checkbox, "Active")),
            ],
        )])
    }

    #[test]
    fn reports_each_failing_field_once() {
        let validator = compile(&schema()).unwrap();
        let report = validator.validate(&json!({
            "general": {"name": "", "age": 16, "email": "a@b", "tier": "bronze", "active": "nope"}
        }));

        assert_eq!(report.error("general.name"), Some("Name is required"));
        assert_eq!(report.error("general.age"), Some("Age must be ≥ 18"));
        // Length bound comes before the email domain check.
        assert_eq!(
            report.error("general.email"),
            Some("Email must be at least 6 characters")
        );
        assert_eq!(report.error("general.tier"), Some("Tier must be one of: gold, silver"));
        assert_eq!(report.error("general.active"), Some("Active must be true or false"));
        assert_eq!(report.errors.len(), 5);
    }

    #[test]
    fn optional_empty_fields_skip_all_checks() {
        let validator = compile(&schema()).unwrap();
        let report = validator.validate(&json!({"general": {"name": "Ann", "age": ""}}));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.values["general"]["age"], Value::Null);
    }

    #[test]
    fn coercion_normalizes_values() {
        let validator = compile(&schema()).unwrap();
        let report = validator.validate(&json!({
            "general": {"name": 42, "age": "20", "active": "yes", "tier": "gold"}
        }));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.values["general"]["name"], json!("42"));
        assert_eq!(report.values["general"]["age"], json!(20));
        assert_eq!(report.values["general"]["active"], json!(true));
    }

    #[test]
    fn custom_messages_replace_defaults() {
        let schema = FormSchema::new(vec![SectionSchema::new(
            "s",
            vec![FieldEntry::new(
                "spread",
                FieldSchema::new(FieldKind::Number, "Spread").with_validation(ValidationRules {
                    required: Some(Rule::new(true).with_message("Spread needed")),
                    positive: Some(Rule::new(true).with_message("No negatives")),
                    ..rules()
                }),
            )],
        )]);
        let validator = compile(&schema).unwrap();
        assert_eq!(
            validator.validate(&json!({})).error("s.spread"),
            Some("Spread needed")
        );
        assert_eq!(
            validator.validate(&json!({"s": {"spread": -1}})).error("s.spread"),
            Some("No negatives")
        );
    }

    #[test]
    fn array_items_are_validated_per_path() {
        let schema = FormSchema::new(vec![SectionSchema::new(
            "fees",
            vec![FieldEntry::new(
                "tiers",
                FieldSchema::new(FieldKind::Array, "Tiers")
                    .with_validation(ValidationRules {
                        max: Some(Rule::new(2.0)),
                        ..rules()
                    })
                    .with_children(vec![
                        FieldEntry::new(
                            "from",
                            FieldSchema::new(FieldKind::Number, "From").with_required(),
                        ),
                        FieldEntry::new("note", FieldSchema::new(FieldKind::Text, "Note")),
                    ]),
            )],
        )]);
        let validator = compile(&schema).unwrap();
        let report = validator.validate(&json!({"fees": {"tiers": [
            {"from": 1}, {"from": null, "note": "x"}, "oops"
        ]}}));

        assert_eq!(report.error("fees.tiers"), Some("Tiers must have at most 2 items"));
        assert_eq!(report.error("fees.tiers.1.from"), Some("From is required"));
        assert_eq!(report.error("fees.tiers.2"), Some("Tiers entries must be objects"));
        assert!(report.error("fees.tiers.0.from").is_none());
        assert_eq!(report.values["fees"]["tiers"][0], json!({"from": 1, "note": null}));
    }

    #[test]
    fn unsupported_kinds_follow_policy() {
        let schema = FormSchema::new(vec![SectionSchema::new(
            "s",
            vec![
                FieldEntry::new("name", FieldSchema::new(FieldKind::Text, "Name")),
                FieldEntry::unsupported("birthday", "date"),
            ],
        )]);

        let lenient = compile(&schema).unwrap();
        assert_eq!(lenient.paths(), ["s.name"]);
        assert!(!lenient.covers("s", "birthday"));

        let err = compile_with(
            &schema,
            &CompileOptions {
                unknown_kinds: UnknownKindPolicy::Reject,
            },
        )
        .unwrap_err();
        assert!(matches!(err, PanelError::SchemaConfiguration { path, .. } if path == "s.birthday"));
    }

    #[test]
    fn array_without_children_fails_to_compile() {
        let schema = FormSchema::new(vec![SectionSchema::new(
            "s",
            vec![FieldEntry::new("items", FieldSchema::new(FieldKind::Array, "Items"))],
        )]);
        assert!(matches!(
            compile(&schema),
            Err(PanelError::SchemaConfiguration { .. })
        ));
    }

    #[test]
    fn inapplicable_constraints_are_dropped() {
        let schema = FormSchema::new(vec![SectionSchema::new(
            "s",
            vec![FieldEntry::new(
                "flag",
                FieldSchema::new(FieldKind::Checkbox, "Flag").with_validation(ValidationRules {
                    gt: Some(Rule::new(1.0)),
                    email: Some(Rule::new(true)),
                    ..rules()
                }),
            )],
        )]);
        let validator = compile(&schema).unwrap();
        assert!(validator.validate(&json!({"s": {"flag": false}})).is_valid());
    }

    #[test]
    fn compiling_twice_yields_equal_validators() {
        let first = compile(&schema()).unwrap();
        let second = compile(&schema()).unwrap();
        assert_eq!(first, second);

        let input = json!({"general": {"name": "x", "age": "17"}});
        assert_eq!(first.validate(&input), second.validate(&input));
    }

    #[test]
    fn validate_field_only_reports_that_field() {
        let validator = compile(&schema()).unwrap();
        let values = json!({"general": {"name": "", "age": 3}});
        let errors = validator.validate_field(&values, "general", "age").unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("general.age"));
        assert!(validator.validate_field(&values, "general", "missing").is_none());
    }
}
