//! Editable state behind a dynamic form.
//!
//! A [`FormState`] binds one value per declared field (a list of keyed items
//! for array fields), tracks which fields the user touched, and keeps client
//! and server errors side by side on the same dotted paths. It never talks to
//! the network; [`crate::submission`] drives saves.

mod path;
mod render;
mod values;

pub use path::FieldPath;
pub use render::{render, Control, RenderedForm, RenderedSection, RepeaterItem, Widget};
pub use values::{ArrayItem, FieldValue, ItemKey};

use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::sync::Arc;

use serde_json::{Map, Value};

use panel_schema::{options_contain, FieldKind, FieldSchema, FieldSpec, FormSchema};

use crate::context::ViewContext;
use crate::errors::PanelError;
use crate::schema::scalar_text;
use crate::validation::{
    coerce_bool, coerce_number, compile_with, CompileOptions, FormValidator, ValidationReport,
};
use path::is_under;

/// Values, touched flags and errors for one rendered form.
#[derive(Debug, Clone)]
pub struct FormState {
    schema: Arc<FormSchema>,
    options: CompileOptions,
    validator: FormValidator,
    values: BTreeMap<String, FieldValue>,
    touched: BTreeSet<String>,
    /// Items added since the last submit attempt that nobody has edited yet.
    fresh_items: BTreeSet<ItemKey>,
    client_errors: BTreeMap<String, String>,
    server_errors: BTreeMap<String, String>,
}

impl FormState {
    /// Compiles the schema and seeds every supported field with its empty value.
    pub fn new(schema: Arc<FormSchema>, options: &CompileOptions) -> Result<Self, PanelError> {
        let validator = compile_with(&schema, options)?;
        check_nesting(&schema)?;
        let mut state = Self {
            schema,
            options: *options,
            validator,
            values: BTreeMap::new(),
            touched: BTreeSet::new(),
            fresh_items: BTreeSet::new(),
            client_errors: BTreeMap::new(),
            server_errors: BTreeMap::new(),
        };
        state.values = state
            .bound_fields()
            .map(|(path, field)| (path, FieldValue::initial(field)))
            .collect();
        Ok(state)
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    pub fn validator(&self) -> &FormValidator {
        &self.validator
    }

    /// Seeds values from an existing record for an edit screen.
    ///
    /// The record may be nested by section or flat (field keys at the top
    /// level, as list endpoints return them). Touched flags and errors reset.
    pub fn load(&mut self, record: &Value) {
        let values = self
            .bound_fields()
            .map(|(path, field)| {
                let (section, key) = split_field_path(&path);
                let raw = record
                    .get(section)
                    .and_then(|section| section.get(key))
                    .or_else(|| record.get(key));
                let value = match raw {
                    Some(raw) => FieldValue::from_json(field, raw),
                    None => FieldValue::initial(field),
                };
                (path, value)
            })
            .collect();
        self.values = values;
        self.touched.clear();
        self.fresh_items.clear();
        self.client_errors.clear();
        self.server_errors.clear();
        tracing::debug!(fields = self.values.len(), "form record loaded");
    }

    /// Current value at `section.field` or `section.field.index.child`.
    pub fn value(&self, path: &str) -> Option<Value> {
        let parsed: FieldPath = path.parse().ok()?;
        let bound = self.values.get(&parsed.field_path())?;
        match &parsed.item {
            None => Some(bound.to_json()),
            Some((index, child)) => bound.items()?.get(*index)?.values.get(child).cloned(),
        }
    }

    /// Writes user input. Number and select controls refuse values they cannot
    /// hold; on refusal the stored value is unchanged.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<(), PanelError> {
        let parsed: FieldPath = path.parse()?;
        let schema = Arc::clone(&self.schema);
        let field = resolve(&schema, &self.validator, &parsed)?;
        let field_path = parsed.field_path();

        match &parsed.item {
            None => {
                let accepted = accept_input(field, value, path)?;
                let bound = match field.kind {
                    FieldKind::Array => FieldValue::from_json(field, &accepted),
                    _ => FieldValue::Scalar(accepted),
                };
                self.values.insert(field_path.clone(), bound);
            }
            Some((index, child)) => {
                let child_schema = field
                    .child(child)
                    .and_then(FieldSpec::known)
                    .ok_or_else(|| PanelError::UnknownField(path.to_string()))?;
                let accepted = accept_input(child_schema, value, path)?;
                let item = self
                    .values
                    .get_mut(&field_path)
                    .and_then(FieldValue::items_mut)
                    .and_then(|items| items.get_mut(*index))
                    .ok_or_else(|| PanelError::UnknownField(path.to_string()))?;
                item.values.insert(child.clone(), accepted);
                let key = item.key;
                self.fresh_items.remove(&key);
            }
        }

        tracing::debug!(path, "form value updated");
        self.server_errors.retain(|error_path, _| !is_under(error_path, path));
        self.touched.insert(field_path);
        self.revalidate(&parsed.section, &parsed.field);
        Ok(())
    }

    /// Appends an empty item to an array field and returns its key.
    pub fn add_item(&mut self, path: &str) -> Result<ItemKey, PanelError> {
        let (parsed, field) = self.array_field(path)?;
        let item = ArrayItem::empty(&field.children);
        let key = item.key;
        self.items_mut(&parsed)?.push(item);
        self.fresh_items.insert(key);

        self.touched.insert(parsed.field_path());
        self.revalidate(&parsed.section, &parsed.field);
        tracing::debug!(path, item = %key, "array item added");
        Ok(key)
    }

    /// Removes exactly the item at `index`; later items shift down by one.
    pub fn remove_item(&mut self, path: &str, index: usize) -> Result<ItemKey, PanelError> {
        let (parsed, _) = self.array_field(path)?;
        let items = self.items_mut(&parsed)?;
        if index >= items.len() {
            return Err(PanelError::invalid_input(
                path,
                format!("no item at index {index}"),
            ));
        }
        let removed = items.remove(index);
        self.fresh_items.remove(&removed.key);

        let field_path = parsed.field_path();
        shift_after_removal(&mut self.server_errors, &field_path, index);
        self.touched.insert(field_path);
        self.revalidate(&parsed.section, &parsed.field);
        tracing::debug!(path, index, item = %removed.key, "array item removed");
        Ok(removed.key)
    }

    /// Removes the item carrying `key`, wherever it currently sits.
    pub fn remove_item_by_key(&mut self, path: &str, key: ItemKey) -> Result<usize, PanelError> {
        let index = self
            .item_keys(path)?
            .iter()
            .position(|candidate| *candidate == key)
            .ok_or_else(|| PanelError::invalid_input(path, format!("no item with key {key}")))?;
        self.remove_item(path, index)?;
        Ok(index)
    }

    /// Item keys of an array field in display order.
    pub fn item_keys(&self, path: &str) -> Result<Vec<ItemKey>, PanelError> {
        let parsed: FieldPath = path.parse()?;
        self.values
            .get(&parsed.field_path())
            .and_then(FieldValue::items)
            .map(|items| items.iter().map(|item| item.key).collect())
            .ok_or_else(|| PanelError::UnknownField(path.to_string()))
    }

    /// Full validation, as run on a submit attempt. Every field counts as touched afterwards.
    pub fn validate_all(&mut self) -> ValidationReport {
        let report = self.validator.validate(&self.snapshot());
        self.client_errors = report.errors.clone();
        self.touched = self.values.keys().cloned().collect();
        self.fresh_items.clear();
        report
    }

    /// Client and server errors merged by path. A client error wins when both exist.
    pub fn errors(&self) -> BTreeMap<String, String> {
        let mut merged = self.server_errors.clone();
        merged.extend(
            self.client_errors
                .iter()
                .map(|(path, message)| (path.clone(), message.clone())),
        );
        merged
    }

    pub fn error(&self, path: &str) -> Option<&str> {
        self.client_errors
            .get(path)
            .or_else(|| self.server_errors.get(path))
            .map(String::as_str)
    }

    pub fn has_errors(&self) -> bool {
        !self.client_errors.is_empty() || !self.server_errors.is_empty()
    }

    pub fn is_touched(&self, path: &str) -> bool {
        path.parse::<FieldPath>()
            .map(|parsed| self.touched.contains(&parsed.field_path()))
            .unwrap_or(false)
    }

    /// Stores server-side field errors. Keys may be dotted paths or bare
    /// field keys as the backend reports them; see [`FormState::resolve_error_key`].
    pub fn apply_server_errors(&mut self, errors: BTreeMap<String, String>) {
        for (key, message) in errors {
            let path = self.resolve_error_key(&key).unwrap_or_else(|| {
                tracing::warn!(key = %key, "server error does not match a form field");
                key
            });
            self.server_errors.insert(path, message);
        }
    }

    pub fn clear_server_errors(&mut self) {
        self.server_errors.clear();
    }

    /// Maps a server error key back to a dotted path.
    ///
    /// Full paths are kept as they are. Otherwise the first segment is looked
    /// up as a field key; a key declared in more than one section is ambiguous.
    pub fn resolve_error_key(&self, key: &str) -> Option<String> {
        if let Ok(parsed) = key.parse::<FieldPath>() {
            if resolve(&self.schema, &self.validator, &parsed).is_ok() {
                return Some(key.to_string());
            }
        }
        let (head, rest) = match key.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (key, None),
        };
        let mut matches = self
            .schema
            .entries()
            .filter(|(section, entry)| entry.key == head && self.validator.covers(section, head));
        let (section, _) = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(match rest {
            Some(rest) => format!("{section}.{head}.{rest}"),
            None => format!("{section}.{head}"),
        })
    }

    /// Applies the canonical record a save returned (for example a generated
    /// slug). Keys are flat field keys; values the field cannot hold are skipped.
    /// Returns how many fields changed.
    pub fn apply_record(&mut self, record: &Map<String, Value>) -> usize {
        let schema = Arc::clone(&self.schema);
        let mut changed = 0;
        for (key, value) in record {
            let Some(path) = self
                .resolve_error_key(key)
                .filter(|path| path.matches('.').count() == 1)
            else {
                continue;
            };
            let Ok(parsed) = path.parse::<FieldPath>() else {
                continue;
            };
            let Ok(field) = resolve(&schema, &self.validator, &parsed) else {
                continue;
            };
            match accept_input(field, value.clone(), &path) {
                Ok(accepted) => {
                    let bound = match field.kind {
                        FieldKind::Array => FieldValue::from_json(field, &accepted),
                        _ => FieldValue::Scalar(accepted),
                    };
                    if self.values.get(&path) != Some(&bound) {
                        self.values.insert(path.clone(), bound);
                        changed += 1;
                    }
                    self.client_errors.retain(|error_path, _| !is_under(error_path, &path));
                    self.server_errors.retain(|error_path, _| !is_under(error_path, &path));
                }
                Err(err) => tracing::warn!(error = %err, "ignoring canonical value"),
            }
        }
        changed
    }

    /// Swaps in a new schema. Values survive where the path and kind still
    /// match (select values only while still offered); errors reset.
    pub fn replace_schema(&mut self, schema: Arc<FormSchema>) -> Result<(), PanelError> {
        let validator = compile_with(&schema, &self.options)?;
        check_nesting(&schema)?;

        let mut previous = mem::take(&mut self.values);
        let old_schema = mem::replace(&mut self.schema, schema);
        self.validator = validator;

        let mut kept = 0;
        let values: BTreeMap<String, FieldValue> = self
            .bound_fields()
            .map(|(path, field)| {
                let (section, key) = split_field_path(&path);
                let old_kind = old_schema.field(section, key).map(|old| old.kind);
                let value = match previous.remove(&path) {
                    Some(value) if old_kind == Some(field.kind) => {
                        kept += 1;
                        carry_over(field, value)
                    }
                    _ => FieldValue::initial(field),
                };
                (path, value)
            })
            .collect();
        self.values = values;
        self.touched.retain(|path| self.values.contains_key(path));
        self.client_errors.clear();
        self.server_errors.clear();
        tracing::info!(kept, dropped = previous.len(), "form schema replaced");
        Ok(())
    }

    /// Current values as `{ section: { field: value } }`, in declaration order.
    pub fn snapshot(&self) -> Value {
        let mut root = Map::new();
        for (section, entry) in self.schema.entries() {
            let path = format!("{section}.{}", entry.key);
            let Some(value) = self.values.get(&path) else {
                continue;
            };
            let slot = root
                .entry(section.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(fields) = slot {
                fields.insert(entry.key.clone(), value.to_json());
            }
        }
        Value::Object(root)
    }

    pub fn render(&self, ctx: &ViewContext) -> RenderedForm {
        render(self, ctx)
    }

    pub(crate) fn bound(&self, path: &str) -> Option<&FieldValue> {
        self.values.get(path)
    }

    /// Supported, validated fields as `(section.field, schema)` in declaration order.
    fn bound_fields(&self) -> impl Iterator<Item = (String, &FieldSchema)> {
        self.schema.entries().filter_map(|(section, entry)| {
            let field = entry.spec.known()?;
            self.validator
                .covers(section, &entry.key)
                .then(|| (format!("{section}.{}", entry.key), field))
        })
    }

    fn array_field(&self, path: &str) -> Result<(FieldPath, FieldSchema), PanelError> {
        let parsed: FieldPath = path.parse()?;
        if parsed.item.is_some() {
            return Err(PanelError::invalid_input(path, "expected an array field path"));
        }
        let field = resolve(&self.schema, &self.validator, &parsed)?;
        if field.kind != FieldKind::Array {
            return Err(PanelError::invalid_input(path, "field is not repeatable"));
        }
        Ok((parsed, field.clone()))
    }

    fn items_mut(&mut self, parsed: &FieldPath) -> Result<&mut Vec<ArrayItem>, PanelError> {
        self.values
            .get_mut(&parsed.field_path())
            .and_then(FieldValue::items_mut)
            .ok_or_else(|| PanelError::UnknownField(parsed.to_string()))
    }

    /// Recomputes one field's client errors. Items nobody has edited since
    /// they were added stay quiet until the next submit attempt.
    fn revalidate(&mut self, section: &str, key: &str) {
        let field_path = format!("{section}.{key}");
        self.client_errors
            .retain(|error_path, _| !is_under(error_path, &field_path));
        let Some(errors) = self.validator.validate_field(&self.snapshot(), section, key) else {
            return;
        };
        let quiet: Vec<String> = self
            .values
            .get(&field_path)
            .and_then(FieldValue::items)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| self.fresh_items.contains(&item.key))
                    .map(|(index, _)| format!("{field_path}.{index}"))
                    .collect()
            })
            .unwrap_or_default();
        self.client_errors.extend(
            errors
                .into_iter()
                .filter(|(path, _)| !quiet.iter().any(|item| is_under(path, item))),
        );
    }
}

fn resolve<'a>(
    schema: &'a FormSchema,
    validator: &FormValidator,
    path: &FieldPath,
) -> Result<&'a FieldSchema, PanelError> {
    let field = schema
        .field(&path.section, &path.field)
        .filter(|_| validator.covers(&path.section, &path.field))
        .ok_or_else(|| PanelError::UnknownField(path.to_string()))?;
    if let Some((_, child)) = &path.item {
        if field.kind != FieldKind::Array || field.child(child).and_then(FieldSpec::known).is_none() {
            return Err(PanelError::UnknownField(path.to_string()));
        }
    }
    Ok(field)
}

fn split_field_path(path: &str) -> (&str, &str) {
    path.split_once('.').unwrap_or((path, ""))
}

/// Normalises raw control input for the field kind, refusing what the control cannot hold.
fn accept_input(field: &FieldSchema, value: Value, path: &str) -> Result<Value, PanelError> {
    let blank = match &value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    };
    match field.kind {
        FieldKind::Text | FieldKind::Textarea => match value {
            Value::Array(_) | Value::Object(_) => {
                Err(PanelError::invalid_input(path, "expects text"))
            }
            value => Ok(value),
        },
        FieldKind::Number if blank => Ok(Value::Null),
        FieldKind::Number => coerce_number(&value)
            .map(Value::Number)
            .ok_or_else(|| PanelError::invalid_input(path, "expects a number")),
        FieldKind::Checkbox if value.is_null() => Ok(Value::Bool(false)),
        FieldKind::Checkbox => coerce_bool(&value)
            .map(Value::Bool)
            .ok_or_else(|| PanelError::invalid_input(path, "expects true or false")),
        FieldKind::Select if blank => Ok(Value::Null),
        FieldKind::Select => match scalar_text(&value) {
            Some(text) if options_contain(&field.options, &text) => Ok(Value::String(text)),
            _ => Err(PanelError::invalid_input(
                path,
                "is not one of the available options",
            )),
        },
        FieldKind::Array => match value {
            Value::Array(items) if items.iter().all(Value::is_object) => Ok(Value::Array(items)),
            Value::Null => Ok(Value::Array(Vec::new())),
            _ => Err(PanelError::invalid_input(path, "expects a list of items")),
        },
    }
}

fn carry_over(field: &FieldSchema, value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Items(items) => FieldValue::Items(
            items
                .into_iter()
                .map(|item| ArrayItem {
                    key: item.key,
                    values: ArrayItem::from_object(&field.children, &item.values).values,
                })
                .collect(),
        ),
        FieldValue::Scalar(value) if field.kind == FieldKind::Select => match scalar_text(&value) {
            Some(text) if options_contain(&field.options, &text) => FieldValue::Scalar(value),
            _ => FieldValue::initial(field),
        },
        other => other,
    }
}

/// Editable forms address one level of repetition; an array inside an array item is refused.
fn check_nesting(schema: &FormSchema) -> Result<(), PanelError> {
    for (section, entry) in schema.entries() {
        let Some(field) = entry.spec.known() else {
            continue;
        };
        for child in &field.children {
            if child.spec.known().is_some_and(|c| c.kind == FieldKind::Array) {
                return Err(PanelError::schema(
                    format!("{section}.{}.{}", entry.key, child.key),
                    "array items cannot contain arrays",
                ));
            }
        }
    }
    Ok(())
}

/// Re-indexes `field_path.N...` errors after item `removed` was taken out.
fn shift_after_removal(errors: &mut BTreeMap<String, String>, field_path: &str, removed: usize) {
    let prefix = format!("{field_path}.");
    *errors = mem::take(errors)
        .into_iter()
        .filter_map(|(path, message)| {
            let Some(rest) = path.strip_prefix(&prefix) else {
                return Some((path, message));
            };
            let (index, tail) = rest.split_once('.').unwrap_or((rest, ""));
            match index.parse::<usize>() {
                Ok(index) if index == removed => None,
                Ok(index) if index > removed => {
                    let shifted = if tail.is_empty() {
                        format!("{prefix}{}", index - 1)
                    } else {
                        format!("{prefix}{}.{tail}", index - 1)
                    };
                    Some((shifted, message))
                }
                _ => Some((path, message)),
            }
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_config::UnknownKindPolicy;
    use panel_schema::{FieldEntry, Rule, SectionSchema, SelectOption, ValidationRules};
    use serde_json::json;

    fn schema() -> Arc<FormSchema> {
        Arc::new(FormSchema::new(vec![
            SectionSchema::new(
                "general",
                vec![
                    FieldEntry::new("name", FieldSchema::new(FieldKind::Text, "Name").with_required()),
                    FieldEntry::new(
                        "age",
                        FieldSchema::new(FieldKind::Number, "Age").with_validation(ValidationRules {
                            gte: Some(Rule::new(18.0)),
                            ..ValidationRules::default()
                        }),
                    ),
                    FieldEntry::new(
                        "tier",
                        FieldSchema::new(FieldKind::Select, "Tier")
                            .with_options(vec![SelectOption::new("gold", "Gold")]),
                    ),
                ],
            ),
            SectionSchema::new(
                "fees",
                vec![FieldEntry::new(
                    "tiers",
                    FieldSchema::new(FieldKind::Array, "Tiers").with_children(vec![FieldEntry::new(
                        "from",
                        FieldSchema::new(FieldKind::Number, "From").with_required(),
                    )]),
                )],
            ),
        ]))
    }

    fn state() -> FormState {
        FormState::new(schema(), &CompileOptions::default()).unwrap()
    }

    #[test]
    fn new_state_seeds_empty_values() {
        let state = state();
        assert_eq!(
            state.snapshot(),
            json!({"general": {"name": null, "age": null, "tier": null}, "fees": {"tiers": []}})
        );
        assert!(!state.has_errors());
    }

    #[test]
    fn number_controls_reject_text_and_keep_old_value() {
        let mut state = state();
        state.set_value("general.age", json!(30)).unwrap();
        let err = state.set_value("general.age", json!("abc")).unwrap_err();
        assert!(matches!(err, PanelError::InvalidInput { .. }));
        assert_eq!(state.value("general.age"), Some(json!(30)));
    }

    #[test]
    fn edits_revalidate_only_the_touched_field() {
        let mut state = state();
        state.set_value("general.age", json!("16")).unwrap();
        assert_eq!(state.error("general.age"), Some("Age must be ≥ 18"));
        assert_eq!(state.error("general.name"), None);
        assert!(state.is_touched("general.age"));

        state.set_value("general.age", json!(21)).unwrap();
        assert_eq!(state.error("general.age"), None);
    }

    #[test]
    fn unknown_paths_are_reported() {
        let mut state = state();
        assert!(matches!(
            state.set_value("general.nickname", json!("x")),
            Err(PanelError::UnknownField(_))
        ));
        assert!(matches!(
            state.set_value("fees.tiers.0.from", json!(1)),
            Err(PanelError::UnknownField(_))
        ));
    }

    #[test]
    fn select_rejects_values_outside_options() {
        let mut state = state();
        assert!(state.set_value("general.tier", json!("bronze")).is_err());
        state.set_value("general.tier", json!("gold")).unwrap();
        assert_eq!(state.value("general.tier"), Some(json!("gold")));
    }

    #[test]
    fn removing_middle_item_keeps_neighbours() {
        let mut state = state();
        let keys: Vec<_> = (0..3).map(|_| state.add_item("fees.tiers").unwrap()).collect();
        for (idx, from) in [10, 20, 30].into_iter().enumerate() {
            state
                .set_value(&format!("fees.tiers.{idx}.from"), json!(from))
                .unwrap();
        }

        let removed = state.remove_item("fees.tiers", 1).unwrap();
        assert_eq!(removed, keys[1]);
        assert_eq!(state.item_keys("fees.tiers").unwrap(), vec![keys[0], keys[2]]);
        assert_eq!(state.value("fees.tiers"), Some(json!([{"from": 10}, {"from": 30}])));
    }

    #[test]
    fn removal_shifts_server_errors() {
        let mut state = state();
        for idx in 0..3 {
            state.add_item("fees.tiers").unwrap();
            state
                .set_value(&format!("fees.tiers.{idx}.from"), json!(idx))
                .unwrap();
        }
        state.apply_server_errors(BTreeMap::from([
            ("fees.tiers.0.from".to_string(), "first".to_string()),
            ("fees.tiers.2.from".to_string(), "third".to_string()),
        ]));
        let keys = state.item_keys("fees.tiers").unwrap();
        assert_eq!(state.remove_item_by_key("fees.tiers", keys[0]).unwrap(), 0);

        assert_eq!(state.item_keys("fees.tiers").unwrap()[1], keys[2]);
        assert_eq!(state.errors().get("fees.tiers.1.from").map(String::as_str), Some("third"));
        assert!(!state.errors().values().any(|message| message == "first"));
    }

    #[test]
    fn new_items_do_not_show_required_errors_until_validated() {
        let mut state = state();
        state.add_item("fees.tiers").unwrap();
        assert!(state.error("fees.tiers.0.from").is_none());

        let report = state.validate_all();
        assert_eq!(report.error("fees.tiers.0.from"), Some("From is required"));
        assert_eq!(state.error("general.name"), Some("Name is required"));
    }

    #[test]
    fn untouched_items_stay_quiet_while_siblings_are_edited() {
        let mut state = state();
        state.add_item("fees.tiers").unwrap();
        state.add_item("fees.tiers").unwrap();

        state.set_value("fees.tiers.1.from", json!("")).unwrap();
        assert!(state.error("fees.tiers.0.from").is_none());
        assert_eq!(state.error("fees.tiers.1.from"), Some("From is required"));

        state.remove_item("fees.tiers", 1).unwrap();
        assert!(state.error("fees.tiers.0.from").is_none());

        state.validate_all();
        state.set_value("general.name", json!("Ann")).unwrap();
        state.add_item("fees.tiers").unwrap();
        assert_eq!(state.error("fees.tiers.0.from"), Some("From is required"));
        assert!(state.error("fees.tiers.1.from").is_none());
    }

    #[test]
    fn server_errors_clear_on_edit() {
        let mut state = state();
        state.apply_server_errors(BTreeMap::from([("name".to_string(), "taken".to_string())]));
        assert_eq!(state.error("general.name"), Some("taken"));

        state.set_value("general.name", json!("Bob")).unwrap();
        assert_eq!(state.error("general.name"), None);
    }

    #[test]
    fn load_accepts_nested_and_flat_records() {
        let mut state = state();
        state.load(&json!({"general": {"name": "Ann"}, "age": 40, "tiers": [{"from": 1}]}));
        assert_eq!(state.value("general.name"), Some(json!("Ann")));
        assert_eq!(state.value("general.age"), Some(json!(40)));
        assert_eq!(state.item_keys("fees.tiers").unwrap().len(), 1);
    }

    #[test]
    fn replace_schema_keeps_matching_fields() {
        let mut state = state();
        state.set_value("general.name", json!("Ann")).unwrap();
        state.set_value("general.age", json!(30)).unwrap();

        let next = Arc::new(FormSchema::new(vec![SectionSchema::new(
            "general",
            vec![
                FieldEntry::new("name", FieldSchema::new(FieldKind::Text, "Name")),
                FieldEntry::new("age", FieldSchema::new(FieldKind::Text, "Age")),
            ],
        )]));
        state.replace_schema(next).unwrap();

        assert_eq!(state.value("general.name"), Some(json!("Ann")));
        assert_eq!(state.value("general.age"), Some(Value::Null));
        assert_eq!(state.value("fees.tiers"), None);
    }

    #[test]
    fn skipped_kinds_are_not_addressable() {
        let schema = Arc::new(FormSchema::new(vec![SectionSchema::new(
            "general",
            vec![
                FieldEntry::new("name", FieldSchema::new(FieldKind::Text, "Name")),
                FieldEntry::unsupported("born", "date"),
            ],
        )]));
        let strict = CompileOptions {
            unknown_kinds: UnknownKindPolicy::Reject,
        };
        assert!(FormState::new(Arc::clone(&schema), &strict).is_err());

        let mut state = FormState::new(schema, &CompileOptions::default()).unwrap();
        assert!(state.set_value("general.born", json!("2000-01-01")).is_err());
        assert_eq!(state.snapshot(), json!({"general": {"name": null}}));
    }

    #[test]
    fn canonical_record_updates_matching_fields() {
        let mut state = state();
        state.set_value("general.name", json!("Ann")).unwrap();
        let record = json!({"name": "Ann B.", "id": 7, "age": "x"});
        let changed = state.apply_record(record.as_object().unwrap());
        assert_eq!(changed, 1);
        assert_eq!(state.value("general.name"), Some(json!("Ann B.")));
        assert_eq!(state.value("general.age"), Some(Value::Null));
    }

    #[test]
    fn nested_arrays_are_refused() {
        let schema = Arc::new(FormSchema::new(vec![SectionSchema::new(
            "s",
            vec![FieldEntry::new(
                "outer",
                FieldSchema::new(FieldKind::Array, "Outer").with_children(vec![FieldEntry::new(
                    "inner",
                    FieldSchema::new(FieldKind::Array, "Inner").with_children(vec![
                        FieldEntry::new("x", FieldSchema::new(FieldKind::Text, "X")),
                    ]),
                )]),
            )],
        )]));
        let err = FormState::new(schema, &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("s.outer.inner"));
    }
}
