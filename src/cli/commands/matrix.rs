use panel_schema::format_number;

use super::{split_flags, CommandDefinition};
use crate::cli::context::{read_json, CliContext, CommandError, CommandResult};
use crate::cli::output;
use crate::cli::table::{Table, TableColumn};
use crate::matrix::{CellState, CellWidget, MatrixEditor, MatrixGrid, RenderedCell};
use crate::schema::{decode_matrix_data, decode_matrix_headers};

const MATRIX_USAGE: &str = "matrix <headers.json> <data.json> [--admin] [--json]";
const CELL_WIDTH: usize = 32;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "matrix",
        "Assemble a rate matrix and print its cells",
        MATRIX_USAGE,
        cmd_matrix,
    )]
}

fn cmd_matrix(context: &mut CliContext, args: &[&str]) -> CommandResult {
    let (positional, flags) = split_flags(args);
    let [headers_path, data_path] = positional.as_slice() else {
        return Err(CommandError::InvalidArguments(format!("Usage: {MATRIX_USAGE}")));
    };
    let mut is_admin = context.config.is_admin;
    let mut as_json = false;
    for flag in flags {
        match flag {
            "--admin" => is_admin = true,
            "--json" => as_json = true,
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "Unknown option `{other}`. Usage: {MATRIX_USAGE}"
                )))
            }
        }
    }

    let headers = decode_matrix_headers(&read_json(headers_path)?)?;
    let data = decode_matrix_data(&read_json(data_path)?)?;
    let editor = MatrixEditor::new(MatrixGrid::assemble(headers, data), is_admin);
    let mut ctx = context.view_context()?;
    ctx.is_admin = is_admin;
    let rendered = editor.render(&ctx);

    if as_json {
        output::raw(serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    let mut columns = vec![TableColumn::new("")];
    columns.extend(
        rendered
            .columns
            .iter()
            .map(|name| TableColumn::new(name.clone()).max_width(CELL_WIDTH)),
    );
    let mut table = Table::new(columns);
    for row in &rendered.rows {
        let mut line = vec![row.label.clone()];
        line.extend(row.cells.iter().map(cell_text));
        table.push_row(line);
    }
    output::raw(table.render());

    output::separator();
    output::info(format!(
        "{} row(s) x {} column(s): {} saved, {} editing, {} empty, {} conflict",
        editor.row_count(),
        editor.column_count(),
        editor.count(CellState::Saved),
        editor.count(CellState::Editing),
        editor.count(CellState::Empty),
        editor.count(CellState::Conflict),
    ));
    if is_admin {
        let divergent = editor.divergent_cells().len();
        if divergent > 0 {
            output::info(format!("{divergent} cell(s) differ from the published value"));
        }
    }
    for issue in &rendered.issues {
        output::warning(issue);
    }
    Ok(())
}

fn cell_text(cell: &RenderedCell) -> String {
    if cell.placeholder {
        return "!".into();
    }
    if cell.state == CellState::Empty {
        return "·".into();
    }
    cell.controls
        .iter()
        .filter_map(|control| {
            let value = match &control.widget {
                CellWidget::Text { value } if value.is_empty() => return None,
                CellWidget::Text { value } => value.clone(),
                CellWidget::Number { value } => format_number((*value)?),
                CellWidget::Toggle { checked } => if *checked { "yes" } else { "no" }.to_string(),
                CellWidget::Select { selected, .. } => selected.clone()?,
            };
            Some(format!("{}={}", control.item, value))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::test_context;
    use crate::context::ViewContext;
    use serde_json::json;

    fn editor() -> MatrixEditor {
        let headers = decode_matrix_headers(&json!({
            "columnHeaders": [
                {"slug": "spread", "name": "Spread", "formType": {"name": "rate", "items": [
                    {"name": "amount", "type": "number"},
                    {"name": "fixed", "type": "checkbox"}
                ]}}
            ],
            "rowHeaders": [{"slug": "eurusd", "name": "EUR/USD"}, {"slug": "gbpusd", "name": "GBP/USD"}]
        }))
        .unwrap();
        let data = decode_matrix_data(&json!({"0": [
            {"rowHeader": "eurusd", "colHeader": "spread", "type": "rate",
             "value": {"amount": 0.4, "fixed": true}}
        ]}))
        .unwrap();
        MatrixEditor::new(MatrixGrid::assemble(headers, data), false)
    }

    #[test]
    fn cells_summarise_their_items() {
        let rendered = editor().render(&ViewContext::default());
        assert_eq!(cell_text(rendered.cell(0, 0).unwrap()), "amount=0.4 fixed=yes");
        assert_eq!(cell_text(rendered.cell(1, 0).unwrap()), "·");
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let (mut context, _dir) = test_context();
        let err = cmd_matrix(&mut context, &["h.json", "d.json", "--verbose"]).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArguments(_)));
    }
}
