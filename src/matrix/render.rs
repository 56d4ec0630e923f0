use serde::Serialize;

use panel_schema::{CellScalar, ItemType, SelectOption, ValueMap};

use super::editor::{CellState, MatrixEditor};
use crate::context::ViewContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedGrid {
    pub columns: Vec<String>,
    pub rows: Vec<RenderedRow>,
    /// Human readable data-integrity problems, one per placeholder cell.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub slug: String,
    pub label: String,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    pub row: usize,
    pub column: usize,
    pub state: CellState,
    pub placeholder: bool,
    pub controls: Vec<CellControl>,
    pub previous: Option<ValueMap>,
    pub public: Option<ValueMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellControl {
    pub item: String,
    pub placeholder: Option<String>,
    pub widget: CellWidget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum CellWidget {
    Text { value: String },
    Number { value: Option<f64> },
    Toggle { checked: bool },
    Select {
        options: Vec<SelectOption>,
        selected: Option<String>,
    },
}

impl RenderedGrid {
    pub fn cell(&self, row: usize, column: usize) -> Option<&RenderedCell> {
        self.rows.get(row)?.cells.get(column)
    }
}

/// Row-major, in the header order the backend returned. One control per
/// form type item of the owning column.
pub fn render(editor: &MatrixEditor, ctx: &ViewContext) -> RenderedGrid {
    let headers = editor.headers();
    let rows = headers
        .row_headers
        .iter()
        .enumerate()
        .map(|(row, header)| RenderedRow {
            slug: header.slug.clone(),
            label: ctx.t(&header.name),
            cells: headers
                .column_headers
                .iter()
                .enumerate()
                .filter_map(|(column, _)| render_cell(editor, row, column, ctx))
                .collect(),
        })
        .collect();

    RenderedGrid {
        columns: headers
            .column_headers
            .iter()
            .map(|column| ctx.t(&column.name))
            .collect(),
        rows,
        issues: editor
            .issues()
            .iter()
            .map(|issue| format!("row {} column {}: {}", issue.row, issue.column, issue.reason))
            .collect(),
    }
}

fn render_cell(
    editor: &MatrixEditor,
    row: usize,
    column: usize,
    ctx: &ViewContext,
) -> Option<RenderedCell> {
    let cell = editor.cell(row, column)?;
    let state = editor.state(row, column)?;
    let placeholder = editor.is_placeholder(row, column);
    let controls = if placeholder {
        Vec::new()
    } else {
        editor.headers().column_headers[column]
            .form_type
            .items
            .iter()
            .map(|item| {
                let current = cell.value.get(&item.name);
                let widget = match item.item_type {
                    ItemType::Text => CellWidget::Text {
                        value: current.map(CellScalar::as_text).unwrap_or_default(),
                    },
                    ItemType::Number => CellWidget::Number {
                        value: current.and_then(CellScalar::as_number),
                    },
                    ItemType::Checkbox => CellWidget::Toggle {
                        checked: matches!(current, Some(CellScalar::Bool(true))),
                    },
                    ItemType::Select => CellWidget::Select {
                        options: editor
                            .effective_options(row, column, &item.name)
                            .map(|options| {
                                options
                                    .iter()
                                    .map(|option| {
                                        SelectOption::new(option.value.clone(), ctx.t(&option.label))
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                        selected: current.map(CellScalar::as_text),
                    },
                };
                CellControl {
                    item: item.name.clone(),
                    placeholder: ctx.t_opt(item.placeholder.as_deref()),
                    widget,
                }
            })
            .collect()
    };
    Some(RenderedCell {
        row,
        column,
        state,
        placeholder,
        controls,
        previous: cell.previous_value.clone(),
        public: cell.public_value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixGrid;
    use crate::schema::{decode_matrix_data, decode_matrix_headers};
    use serde_json::json;

    fn editor() -> MatrixEditor {
        let headers = decode_matrix_headers(&json!({
            "columnHeaders": [
                {"slug": "spread", "name": "Spread", "formType": {"name": "rate", "items": [
                    {"name": "amount", "type": "number", "placeholder": "0.0"},
                    {"name": "unit", "type": "select", "options": [{"value": "pips", "label": "Pips"}]}
                ]}},
                {"slug": "rebate", "name": "Rebate", "formType": {"name": "flag", "items": [
                    {"name": "enabled", "type": "checkbox"}
                ]}}
            ],
            "rowHeaders": [{"slug": "eurusd", "name": "EUR/USD"}, {"slug": "gbpusd", "name": "GBP/USD"}]
        }))
        .unwrap();
        let data = decode_matrix_data(&json!({
            "0": [
                {"rowHeader": "eurusd", "colHeader": "spread", "type": "rate",
                 "value": {"amount": 0.4, "unit": "pips"}, "public_value": {"amount": 0.5}},
                {"rowHeader": "eurusd", "colHeader": "bogus", "type": "flag", "value": {"enabled": true}}
            ]
        }))
        .unwrap();
        MatrixEditor::new(MatrixGrid::assemble(headers, data), false)
    }

    #[test]
    fn renders_row_major_with_one_control_per_item() {
        let grid = render(&editor(), &ViewContext::default());

        assert_eq!(grid.columns, ["Spread", "Rebate"]);
        assert_eq!(grid.rows.len(), 2);
        assert!(grid.rows.iter().all(|row| row.cells.len() == 2));

        let cell = grid.cell(0, 0).unwrap();
        assert_eq!(cell.state, CellState::Saved);
        assert_eq!(cell.controls.len(), 2);
        assert_eq!(cell.controls[0].widget, CellWidget::Number { value: Some(0.4) });
        assert_eq!(cell.controls[0].placeholder.as_deref(), Some("0.0"));
        assert!(cell.public.is_some());
    }

    #[test]
    fn placeholders_render_without_controls() {
        let grid = render(&editor(), &ViewContext::default());
        let cell = grid.cell(0, 1).unwrap();
        assert!(cell.placeholder);
        assert!(cell.controls.is_empty());
        assert_eq!(grid.issues, ["row 0 column 1: unknown column `bogus`"]);
    }
}
