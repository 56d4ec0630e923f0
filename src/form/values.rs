use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use panel_schema::{FieldEntry, FieldKind, FieldSchema, FieldSpec};

/// Stable identity of one repeated item, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemKey(Uuid);

impl ItemKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut short = self.0.simple().to_string();
        short.truncate(8);
        f.write_str(&short)
    }
}

/// One instance of an array field's child shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: ItemKey,
    pub values: Map<String, Value>,
}

impl ArrayItem {
    /// An empty instance with every child key present.
    pub fn empty(children: &[FieldEntry]) -> Self {
        let values = children
            .iter()
            .filter_map(|entry| match &entry.spec {
                FieldSpec::Known(schema) => Some((entry.key.clone(), initial_value(schema))),
                FieldSpec::Unsupported { .. } => None,
            })
            .collect();
        Self {
            key: ItemKey::new(),
            values,
        }
    }

    /// Adopts a loaded object, keeping only declared children.
    pub fn from_object(children: &[FieldEntry], object: &Map<String, Value>) -> Self {
        let mut item = Self::empty(children);
        for (key, slot) in item.values.iter_mut() {
            if let Some(value) = object.get(key) {
                *slot = value.clone();
            }
        }
        item
    }
}

/// Bound value of one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Items(Vec<ArrayItem>),
}

impl FieldValue {
    pub fn initial(schema: &FieldSchema) -> Self {
        match schema.kind {
            FieldKind::Array => FieldValue::Items(Vec::new()),
            _ => FieldValue::Scalar(initial_value(schema)),
        }
    }

    /// Builds the bound value from a loaded record value.
    pub fn from_json(schema: &FieldSchema, value: &Value) -> Self {
        match (schema.kind, value) {
            (FieldKind::Array, Value::Array(items)) => FieldValue::Items(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|object| ArrayItem::from_object(&schema.children, object))
                    .collect(),
            ),
            (FieldKind::Array, _) => FieldValue::Items(Vec::new()),
            (_, value) => FieldValue::Scalar(value.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::Items(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Value::Object(item.values.clone()))
                    .collect(),
            ),
        }
    }

    pub fn items(&self) -> Option<&[ArrayItem]> {
        match self {
            FieldValue::Items(items) => Some(items),
            FieldValue::Scalar(_) => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<ArrayItem>> {
        match self {
            FieldValue::Items(items) => Some(items),
            FieldValue::Scalar(_) => None,
        }
    }
}

fn initial_value(schema: &FieldSchema) -> Value {
    match schema.kind {
        FieldKind::Checkbox => Value::Bool(false),
        FieldKind::Array => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}
