use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use panel_schema::{
    CellScalar, ColumnHeader, FormType, FormTypeItem, ItemType, MatrixCell, MatrixHeaders,
    MatrixRows, RowHeader, ValueMap,
};

use super::{decode_options, RawOption};
use crate::errors::PanelError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeaders {
    #[serde(default)]
    column_headers: Vec<RawColumnHeader>,
    #[serde(default)]
    row_headers: Vec<RawRowHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawColumnHeader {
    slug: String,
    #[serde(default)]
    name: Option<String>,
    form_type: RawFormType,
}

#[derive(Debug, Deserialize)]
struct RawFormType {
    name: String,
    #[serde(default)]
    items: Vec<RawFormTypeItem>,
}

#[derive(Debug, Deserialize)]
struct RawFormTypeItem {
    name: String,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    placeholder: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawRowHeader {
    slug: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
}

/// Header references arrive either as a bare slug or as the header object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlugRef {
    Slug(String),
    Header { slug: String },
}

impl SlugRef {
    fn into_slug(self) -> String {
        match self {
            SlugRef::Slug(slug) | SlugRef::Header { slug } => slug,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(rename = "rowHeader")]
    row_header: SlugRef,
    #[serde(rename = "colHeader")]
    col_header: SlugRef,
    #[serde(rename = "type", default)]
    form_type: Option<String>,
    #[serde(default)]
    value: Option<Map<String, Value>>,
    #[serde(default, alias = "previousValue")]
    previous_value: Option<Map<String, Value>>,
    #[serde(default, alias = "publicValue")]
    public_value: Option<Map<String, Value>>,
    #[serde(rename = "selectedRowHeaderSubOptions", default)]
    selected_row_header_sub_options: Option<Vec<RawOption>>,
}

/// Decodes `{ columnHeaders: [...], rowHeaders: [...] }`.
pub fn decode_matrix_headers(payload: &Value) -> Result<MatrixHeaders, PanelError> {
    let raw: RawHeaders = serde_json::from_value(payload.clone())
        .map_err(|err| PanelError::schema("headers", err.to_string()))?;

    let mut seen = HashSet::new();
    let mut column_headers = Vec::with_capacity(raw.column_headers.len());
    for (idx, column) in raw.column_headers.into_iter().enumerate() {
        let path = format!("columnHeaders.{idx}");
        if !seen.insert(column.slug.clone()) {
            return Err(PanelError::schema(
                path,
                format!("duplicate column slug `{}`", column.slug),
            ));
        }
        let mut items = Vec::with_capacity(column.form_type.items.len());
        let mut item_names = HashSet::new();
        for (item_idx, item) in column.form_type.items.into_iter().enumerate() {
            let item_path = format!("{path}.formType.items.{item_idx}");
            if !item_names.insert(item.name.clone()) {
                return Err(PanelError::schema(
                    item_path,
                    format!("duplicate item name `{}`", item.name),
                ));
            }
            let item_type = ItemType::from_wire(&item.item_type).ok_or_else(|| {
                PanelError::schema(
                    item_path.as_str(),
                    format!("unsupported item type `{}`", item.item_type),
                )
            })?;
            items.push(FormTypeItem {
                name: item.name,
                item_type,
                placeholder: item.placeholder,
                options: decode_options(item.options, &item_path)?,
            });
        }
        if items.is_empty() {
            return Err(PanelError::schema(path, "form type declares no items"));
        }
        column_headers.push(ColumnHeader {
            name: column.name.unwrap_or_else(|| column.slug.clone()),
            slug: column.slug,
            form_type: FormType {
                name: column.form_type.name,
                items,
            },
        });
    }

    let mut seen = HashSet::new();
    let mut row_headers = Vec::with_capacity(raw.row_headers.len());
    for (idx, row) in raw.row_headers.into_iter().enumerate() {
        let path = format!("rowHeaders.{idx}");
        if !seen.insert(row.slug.clone()) {
            return Err(PanelError::schema(
                path,
                format!("duplicate row slug `{}`", row.slug),
            ));
        }
        row_headers.push(RowHeader {
            name: row.name.unwrap_or_else(|| row.slug.clone()),
            options: decode_options(row.options, &path)?,
            slug: row.slug,
        });
    }

    Ok(MatrixHeaders {
        column_headers,
        row_headers,
    })
}

/// Decodes matrix rows given either as `{ "0": [cells], ... }` or `[[cells], ...]`.
///
/// Only the outer shape is fatal. A cell that cannot be read is kept as an
/// orphan (no column slug) so the grid can report it and show a placeholder.
pub fn decode_matrix_data(payload: &Value) -> Result<MatrixRows, PanelError> {
    let mut rows = MatrixRows::new();
    match payload {
        Value::Object(map) => {
            for (key, row) in map {
                let index: usize = key.trim().parse().map_err(|_| {
                    PanelError::schema(key.as_str(), "row keys must be numeric indices")
                })?;
                rows.insert(index, decode_row(row, index)?);
            }
        }
        Value::Array(list) => {
            for (index, row) in list.iter().enumerate() {
                rows.insert(index, decode_row(row, index)?);
            }
        }
        Value::Null => {}
        _ => {
            return Err(PanelError::schema(
                "data",
                "matrix data must be an object keyed by row index or an array of rows",
            ))
        }
    }
    Ok(rows)
}

fn decode_row(row: &Value, index: usize) -> Result<Vec<MatrixCell>, PanelError> {
    let Value::Array(cells) = row else {
        return Err(PanelError::schema(
            index.to_string(),
            "matrix row must be an array of cells",
        ));
    };
    Ok(cells
        .iter()
        .enumerate()
        .map(|(col, cell)| decode_cell(cell, index, col))
        .collect())
}

fn decode_cell(cell: &Value, row: usize, col: usize) -> MatrixCell {
    match serde_json::from_value::<RawCell>(cell.clone()) {
        Ok(raw) => {
            let path = format!("{row}.{col}");
            let selected = raw
                .selected_row_header_sub_options
                .map(|options| decode_options(options, &path))
                .transpose()
                .unwrap_or_else(|err| {
                    tracing::warn!(row, col, error = %err, "ignoring unreadable sub-option selection");
                    None
                });
            MatrixCell {
                row_header: raw.row_header.into_slug(),
                col_header: raw.col_header.into_slug(),
                form_type: raw.form_type.unwrap_or_default(),
                value: raw
                    .value
                    .map(|map| decode_value_map(map, row, col))
                    .unwrap_or_default(),
                previous_value: raw.previous_value.map(|map| decode_value_map(map, row, col)),
                public_value: raw.public_value.map(|map| decode_value_map(map, row, col)),
                selected_row_header_sub_options: selected,
            }
        }
        Err(err) => {
            tracing::error!(row, col, error = %err, "unreadable matrix cell");
            MatrixCell {
                row_header: String::new(),
                col_header: String::new(),
                form_type: String::new(),
                value: ValueMap::new(),
                previous_value: None,
                public_value: None,
                selected_row_header_sub_options: None,
            }
        }
    }
}

fn decode_value_map(map: Map<String, Value>, row: usize, col: usize) -> ValueMap {
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::Bool(flag) => Some((key, CellScalar::Bool(flag))),
            Value::Number(number) => number.as_f64().map(|n| (key, CellScalar::Number(n))),
            Value::String(text) => Some((key, CellScalar::Text(text))),
            Value::Null => None,
            other => {
                tracing::warn!(row, col, key = %key, value = %other, "dropping non-scalar cell value");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers() -> Value {
        json!({
            "columnHeaders": [
                {"slug": "spread", "name": "Spread", "formType": {"name": "rate", "items": [
                    {"name": "amount", "type": "number", "placeholder": "0.0"},
                    {"name": "unit", "type": "select", "options": [{"value": "pips"}, {"value": "pct", "label": "%"}]}
                ]}},
                {"slug": "rebate", "formType": {"name": "flag", "items": [{"name": "enabled", "type": "checkbox"}]}}
            ],
            "rowHeaders": [
                {"slug": "eurusd", "name": "EUR/USD", "options": [{"value": "std"}, {"value": "raw"}]},
                {"slug": "gbpusd"}
            ]
        })
    }

    #[test]
    fn decodes_headers_in_backend_order() {
        let headers = decode_matrix_headers(&headers()).unwrap();
        let slugs: Vec<_> = headers.column_headers.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, ["spread", "rebate"]);
        assert_eq!(headers.column_headers[1].name, "rebate");
        assert_eq!(headers.column_headers[0].form_type.items[1].options[1].label, "%");
        assert_eq!(headers.row_headers[0].options.len(), 2);
        assert_eq!(headers.row_headers[1].name, "gbpusd");
    }

    #[test]
    fn duplicate_column_slugs_are_rejected() {
        let payload = json!({"columnHeaders": [
            {"slug": "a", "formType": {"name": "t", "items": [{"name": "x", "type": "text"}]}},
            {"slug": "a", "formType": {"name": "t", "items": [{"name": "x", "type": "text"}]}}
        ]});
        let err = decode_matrix_headers(&payload).unwrap_err();
        assert!(err.to_string().contains("duplicate column slug"));
    }

    #[test]
    fn unknown_item_types_are_rejected() {
        let payload = json!({"columnHeaders": [
            {"slug": "a", "formType": {"name": "t", "items": [{"name": "x", "type": "slider"}]}}
        ]});
        assert!(decode_matrix_headers(&payload).is_err());
    }

    #[test]
    fn decodes_object_keyed_rows_with_slug_objects() {
        let payload = json!({
            "1": [
                {"rowHeader": {"slug": "gbpusd"}, "colHeader": "spread", "type": "rate",
                 "value": {"amount": 0.4, "unit": "pips", "note": null},
                 "previousValue": {"amount": 0.5},
                 "public_value": {"amount": 0.5}}
            ],
            "0": []
        });
        let rows = decode_matrix_data(&payload).unwrap();
        assert_eq!(rows.keys().copied().collect::<Vec<_>>(), [0, 1]);
        let cell = &rows[&1][0];
        assert_eq!(cell.row_header, "gbpusd");
        assert_eq!(cell.value.len(), 2);
        assert_eq!(
            cell.previous_value.as_ref().unwrap().get("amount"),
            Some(&CellScalar::Number(0.5))
        );
        assert!(cell.public_value.is_some());
    }

    #[test]
    fn unreadable_cells_become_orphans() {
        let payload = json!([[{"colHeader": "spread"}]]);
        let rows = decode_matrix_data(&payload).unwrap();
        assert_eq!(rows[&0][0].col_header, "");
    }

    #[test]
    fn non_numeric_row_keys_are_rejected() {
        let payload = json!({"first": []});
        assert!(decode_matrix_data(&payload).is_err());
    }
}
