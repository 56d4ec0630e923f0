//! Row/column headers and cells of the rate matrix.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{CellScalar, SelectOption};

/// Values entered in one cell, keyed by form type item name.
pub type ValueMap = BTreeMap<String, CellScalar>;

/// Fetched matrix rows keyed by row index. Rows may be sparse or ragged.
pub type MatrixRows = BTreeMap<usize, Vec<MatrixCell>>;

/// Control type of one sub-item of a cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Text,
    Number,
    Select,
    Checkbox,
}

impl ItemType {
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(ItemType::Text),
            "number" => Some(ItemType::Number),
            "select" => Some(ItemType::Select),
            "checkbox" | "boolean" => Some(ItemType::Checkbox),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemType::Text => "text",
            ItemType::Number => "number",
            ItemType::Select => "select",
            ItemType::Checkbox => "checkbox",
        };
        f.write_str(label)
    }
}

/// One independently-typed sub-control composing a cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormTypeItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FormTypeItem {
    pub fn new(name: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            name: name.into(),
            item_type,
            placeholder: None,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

/// Declares the editable shape of every cell in a column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormType {
    pub name: String,
    pub items: Vec<FormTypeItem>,
}

impl FormType {
    pub fn item(&self, name: &str) -> Option<&FormTypeItem> {
        self.items.iter().find(|item| item.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnHeader {
    pub slug: String,
    pub name: String,
    #[serde(rename = "formType")]
    pub form_type: FormType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowHeader {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

/// Both axes of the grid, in backend order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatrixHeaders {
    #[serde(rename = "columnHeaders")]
    pub column_headers: Vec<ColumnHeader>,
    #[serde(rename = "rowHeaders")]
    pub row_headers: Vec<RowHeader>,
}

/// The editable unit at (row header, column header).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixCell {
    #[serde(rename = "rowHeader")]
    pub row_header: String,
    #[serde(rename = "colHeader")]
    pub col_header: String,
    #[serde(rename = "type")]
    pub form_type: String,
    #[serde(default)]
    pub value: ValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<ValueMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_value: Option<ValueMap>,
    #[serde(
        rename = "selectedRowHeaderSubOptions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_row_header_sub_options: Option<Vec<SelectOption>>,
}

impl MatrixCell {
    /// An unset cell for the given row and column.
    pub fn empty(row: &RowHeader, column: &ColumnHeader) -> Self {
        Self {
            row_header: row.slug.clone(),
            col_header: column.slug.clone(),
            form_type: column.form_type.name.clone(),
            value: ValueMap::new(),
            previous_value: None,
            public_value: None,
            selected_row_header_sub_options: None,
        }
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}
