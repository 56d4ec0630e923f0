//! Dense, positional grid assembled from headers and fetched rows.

use std::collections::HashSet;

use panel_schema::{
    CellScalar, ColumnHeader, ItemType, MatrixCell, MatrixHeaders, MatrixRows, RowHeader, ValueMap,
};

use crate::errors::PanelError;

/// A data-integrity problem found while assembling the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIssue {
    pub row: usize,
    pub column: usize,
    pub reason: String,
}

impl From<&GridIssue> for PanelError {
    fn from(issue: &GridIssue) -> Self {
        PanelError::DataIntegrity {
            row: issue.row,
            column: issue.column,
            reason: issue.reason.clone(),
        }
    }
}

/// One grid position. Placeholders stand in for cells that could not be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub cell: MatrixCell,
    pub placeholder: bool,
}

/// Exactly `row_headers.len()` rows of exactly `column_headers.len()` cells,
/// aligned by position in backend order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixGrid {
    headers: MatrixHeaders,
    rows: Vec<Vec<GridCell>>,
    issues: Vec<GridIssue>,
}

impl MatrixGrid {
    pub fn assemble(headers: MatrixHeaders, mut data: MatrixRows) -> Self {
        let mut issues = Vec::new();
        let rows = {
            let slugs: HashSet<&str> = headers
                .column_headers
                .iter()
                .map(|column| column.slug.as_str())
                .collect();
            headers
                .row_headers
                .iter()
                .enumerate()
                .map(|(index, row)| {
                    let cells = data.remove(&index).unwrap_or_default();
                    normalize_row(&headers.column_headers, &slugs, row, index, cells, &mut issues)
                })
                .collect()
        };

        if !data.is_empty() {
            tracing::warn!(
                rows = ?data.keys().collect::<Vec<_>>(),
                "dropping matrix rows without a row header"
            );
        }

        Self {
            headers,
            rows,
            issues,
        }
    }

    pub fn headers(&self) -> &MatrixHeaders {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<GridCell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&GridCell> {
        self.rows.get(row)?.get(column)
    }

    pub fn issues(&self) -> &[GridIssue] {
        &self.issues
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.column_headers.len()
    }

    pub(crate) fn into_parts(self) -> (MatrixHeaders, Vec<Vec<GridCell>>, Vec<GridIssue>) {
        (self.headers, self.rows, self.issues)
    }
}

fn normalize_row(
    columns: &[ColumnHeader],
    slugs: &HashSet<&str>,
    row: &RowHeader,
    row_index: usize,
    cells: Vec<MatrixCell>,
    issues: &mut Vec<GridIssue>,
) -> Vec<GridCell> {
    if cells.len() > columns.len() {
        tracing::warn!(
            row = row_index,
            extra = cells.len() - columns.len(),
            "dropping cells beyond the last column"
        );
    }
    let mut cells = cells.into_iter();
    columns
        .iter()
        .enumerate()
        .map(|(col_index, column)| match cells.next() {
            None => GridCell {
                cell: MatrixCell::empty(row, column),
                placeholder: false,
            },
            Some(cell) if !slugs.contains(cell.col_header.as_str()) => {
                let reason = if cell.col_header.is_empty() {
                    "cell could not be read".to_string()
                } else {
                    format!("unknown column `{}`", cell.col_header)
                };
                tracing::error!(row = row_index, column = col_index, reason = %reason, "matrix data integrity error");
                issues.push(GridIssue {
                    row: row_index,
                    column: col_index,
                    reason,
                });
                GridCell {
                    cell: MatrixCell::empty(row, column),
                    placeholder: true,
                }
            }
            Some(cell) => GridCell {
                cell: align_cell(cell, row, column, row_index, col_index),
                placeholder: false,
            },
        })
        .collect()
}

fn align_cell(
    mut cell: MatrixCell,
    row: &RowHeader,
    column: &ColumnHeader,
    row_index: usize,
    col_index: usize,
) -> MatrixCell {
    if cell.col_header != column.slug || cell.row_header != row.slug {
        tracing::debug!(
            row = row_index,
            column = col_index,
            found = %format!("{}/{}", cell.row_header, cell.col_header),
            expected = %format!("{}/{}", row.slug, column.slug),
            "cell slugs do not match its position"
        );
    }
    cell.row_header = row.slug.clone();
    cell.col_header = column.slug.clone();
    if cell.form_type.is_empty() {
        cell.form_type = column.form_type.name.clone();
    }

    let keep = |map: &mut ValueMap| {
        map.retain(|key, value| {
            let Some(item) = column.form_type.item(key) else {
                tracing::warn!(row = row_index, column = col_index, key = %key, "dropping value key not in form type");
                return false;
            };
            match coerce_scalar(item.item_type, value) {
                Some(coerced) => *value = coerced,
                None => tracing::warn!(
                    row = row_index,
                    column = col_index,
                    key = %key,
                    value = %value,
                    "cell value does not match its item type"
                ),
            }
            true
        });
    };
    keep(&mut cell.value);
    if let Some(previous) = cell.previous_value.as_mut() {
        keep(previous);
    }
    if let Some(public) = cell.public_value.as_mut() {
        keep(public);
    }
    cell
}

/// Reads a server value as the item type expects. `None` when it cannot be read;
/// the raw value is kept in that case.
fn coerce_scalar(item_type: ItemType, value: &CellScalar) -> Option<CellScalar> {
    match (item_type, value) {
        (ItemType::Number, _) => value.as_number().map(CellScalar::Number),
        (ItemType::Checkbox, CellScalar::Bool(flag)) => Some(CellScalar::Bool(*flag)),
        (ItemType::Checkbox, CellScalar::Number(number)) if *number == 0.0 || *number == 1.0 => {
            Some(CellScalar::Bool(*number == 1.0))
        }
        (ItemType::Checkbox, CellScalar::Text(text)) => {
            match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(CellScalar::Bool(true)),
                "false" | "0" => Some(CellScalar::Bool(false)),
                _ => None,
            }
        }
        (ItemType::Checkbox, CellScalar::Number(_)) => None,
        (ItemType::Text | ItemType::Select, _) => Some(CellScalar::Text(value.as_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_schema::{CellScalar, FormType, FormTypeItem};

    fn headers() -> MatrixHeaders {
        let rate = FormType {
            name: "rate".into(),
            items: vec![FormTypeItem::new("amount", ItemType::Number)],
        };
        MatrixHeaders {
            column_headers: ["spread", "swap", "rebate"]
                .into_iter()
                .map(|slug| ColumnHeader {
                    slug: slug.into(),
                    name: slug.into(),
                    form_type: rate.clone(),
                })
                .collect(),
            row_headers: ["eurusd", "gbpusd"]
                .into_iter()
                .map(|slug| RowHeader {
                    slug: slug.into(),
                    name: slug.into(),
                    options: Vec::new(),
                })
                .collect(),
        }
    }

    fn cell(row: &str, col: &str, amount: f64) -> MatrixCell {
        MatrixCell {
            row_header: row.into(),
            col_header: col.into(),
            form_type: "rate".into(),
            value: ValueMap::from([("amount".to_string(), CellScalar::Number(amount))]),
            previous_value: None,
            public_value: None,
            selected_row_header_sub_options: None,
        }
    }

    #[test]
    fn every_row_has_exactly_one_cell_per_column() {
        let data = MatrixRows::from([
            (0, vec![cell("eurusd", "spread", 1.0)]),
            (
                1,
                vec![
                    cell("gbpusd", "spread", 1.0),
                    cell("gbpusd", "swap", 2.0),
                    cell("gbpusd", "rebate", 3.0),
                    cell("gbpusd", "extra", 4.0),
                ],
            ),
            (7, vec![cell("x", "spread", 1.0)]),
        ]);
        let grid = MatrixGrid::assemble(headers(), data);

        assert_eq!(grid.row_count(), 2);
        assert!(grid.rows().iter().all(|row| row.len() == 3));
        assert!(!grid.cell(0, 1).unwrap().cell.has_value());
        assert!(grid.issues().is_empty());
    }

    #[test]
    fn unknown_column_slug_becomes_placeholder() {
        let data = MatrixRows::from([(0, vec![cell("eurusd", "commission", 1.0)])]);
        let grid = MatrixGrid::assemble(headers(), data);

        let slot = grid.cell(0, 0).unwrap();
        assert!(slot.placeholder);
        assert!(!slot.cell.has_value());
        assert_eq!(grid.issues().len(), 1);
        let err = PanelError::from(&grid.issues()[0]);
        assert!(err.to_string().contains("unknown column `commission`"));
    }

    #[test]
    fn alignment_is_positional_not_by_slug() {
        let data = MatrixRows::from([(
            0,
            vec![cell("eurusd", "swap", 2.0), cell("eurusd", "spread", 1.0)],
        )]);
        let grid = MatrixGrid::assemble(headers(), data);

        let first = &grid.cell(0, 0).unwrap().cell;
        assert_eq!(first.col_header, "spread");
        assert_eq!(first.value.get("amount"), Some(&CellScalar::Number(2.0)));
    }

    #[test]
    fn undeclared_value_keys_are_dropped() {
        let mut raw = cell("eurusd", "spread", 1.0);
        raw.value.insert("note".into(), CellScalar::from("x"));
        let grid = MatrixGrid::assemble(headers(), MatrixRows::from([(0, vec![raw])]));
        assert_eq!(grid.cell(0, 0).unwrap().cell.value.len(), 1);
    }

    #[test]
    fn server_values_are_read_as_their_item_type() {
        let mut columns = headers();
        columns.column_headers[1].form_type = FormType {
            name: "flag".into(),
            items: vec![
                FormTypeItem::new("enabled", ItemType::Checkbox),
                FormTypeItem::new("note", ItemType::Text),
            ],
        };
        let mut spread = cell("eurusd", "spread", 0.0);
        spread.value.insert("amount".into(), CellScalar::from("1.25"));
        let mut swap = cell("eurusd", "swap", 0.0);
        swap.value = ValueMap::from([
            ("enabled".to_string(), CellScalar::from("true")),
            ("note".to_string(), CellScalar::from(3.0)),
        ]);
        swap.public_value = Some(ValueMap::from([("enabled".to_string(), CellScalar::from(0.0))]));

        let grid = MatrixGrid::assemble(columns, MatrixRows::from([(0, vec![spread, swap])]));

        let amount = &grid.cell(0, 0).unwrap().cell.value["amount"];
        assert_eq!(amount, &CellScalar::Number(1.25));
        let flag = &grid.cell(0, 1).unwrap().cell;
        assert_eq!(flag.value["enabled"], CellScalar::Bool(true));
        assert_eq!(flag.value["note"], CellScalar::Text("3".into()));
        assert_eq!(flag.public_value.as_ref().unwrap()["enabled"], CellScalar::Bool(false));
    }

    #[test]
    fn unreadable_typed_values_are_kept_raw() {
        let mut spread = cell("eurusd", "spread", 0.0);
        spread.value.insert("amount".into(), CellScalar::from("wide"));
        let grid = MatrixGrid::assemble(headers(), MatrixRows::from([(0, vec![spread])]));
        assert_eq!(grid.cell(0, 0).unwrap().cell.value["amount"], CellScalar::from("wide"));
    }
}
