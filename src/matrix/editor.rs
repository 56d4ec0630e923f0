//! Local editing of a [`MatrixGrid`], saves, and reconciliation with later fetches.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use panel_config::SaveScope;
use panel_schema::{
    options_contain, CellScalar, FormTypeItem, ItemType, MatrixCell, MatrixHeaders, MatrixRows,
    SelectOption, ValueMap,
};

use super::grid::{GridCell, GridIssue, MatrixGrid};
use crate::errors::{PanelError, TransportError};
use crate::submission::{Notice, SubmissionTracker, Ticket, ViewHandle};

/// Lifecycle of one cell. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// No value keys locally and none acknowledged.
    Empty,
    /// Local value differs from the last acknowledged value.
    Editing,
    /// Local value equals the last acknowledged value.
    Saved,
    /// A later fetch changed the server copy under a local edit.
    Conflict,
}

#[derive(Debug, Clone, PartialEq)]
struct EditorCell {
    cell: MatrixCell,
    /// Last value the server acknowledged for this cell.
    baseline: ValueMap,
    /// Server copy that arrived while the cell had local edits.
    incoming: Option<MatrixCell>,
    placeholder: bool,
}

impl EditorCell {
    fn from_grid(slot: GridCell) -> Self {
        Self {
            baseline: slot.cell.value.clone(),
            cell: slot.cell,
            incoming: None,
            placeholder: slot.placeholder,
        }
    }

    fn state(&self) -> CellState {
        if self.incoming.is_some() {
            CellState::Conflict
        } else if self.cell.value.is_empty() && self.baseline.is_empty() {
            CellState::Empty
        } else if self.cell.value != self.baseline {
            CellState::Editing
        } else {
            CellState::Saved
        }
    }

    fn is_dirty(&self) -> bool {
        self.cell.value != self.baseline
    }

    /// Takes the server copy wholesale.
    fn adopt(&mut self, server: MatrixCell) {
        self.baseline = server.value.clone();
        self.cell = server;
        self.incoming = None;
    }
}

/// Outbound body of a matrix save.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSaveRequest {
    pub ticket: Ticket,
    pub is_admin: bool,
    pub scope: SaveScope,
    /// Cells to write, keyed by row index like the inbound data.
    pub rows: MatrixRows,
}

impl MatrixSaveRequest {
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Wire body: `{ "is_admin": bool, "data": { "0": [cells], ... } }`.
    ///
    /// Rows may be shorter than the column count: placeholder cells are never
    /// sent, and `ChangedCells` sends only edited ones. Each cell names its
    /// `rowHeader` and `colHeader`, which is what the backend keys writes by.
    pub fn to_json(&self) -> Value {
        let data: serde_json::Map<String, Value> = self
            .rows
            .iter()
            .map(|(row, cells)| {
                let cells = cells
                    .iter()
                    .map(|cell| serde_json::to_value(cell).unwrap_or(Value::Null))
                    .collect();
                (row.to_string(), Value::Array(cells))
            })
            .collect();
        json!({ "is_admin": self.is_admin, "data": data })
    }
}

/// What the backend answered to a successful save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixSaveReply {
    /// Canonical cells as stored, when the endpoint returns them.
    pub canonical: Option<MatrixRows>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatrixSaveOutcome {
    Saved { cells: usize },
    Failed(Notice),
    Stale,
}

type Snapshot = Vec<(usize, usize, ValueMap)>;

/// Editable grid owned by one matrix view.
#[derive(Debug)]
pub struct MatrixEditor {
    headers: MatrixHeaders,
    cells: Vec<Vec<EditorCell>>,
    issues: Vec<GridIssue>,
    is_admin: bool,
    tracker: SubmissionTracker,
    pending: BTreeMap<Ticket, Snapshot>,
}

impl MatrixEditor {
    pub fn new(grid: MatrixGrid, is_admin: bool) -> Self {
        let (headers, rows, issues) = grid.into_parts();
        let cells = rows
            .into_iter()
            .map(|row| row.into_iter().map(EditorCell::from_grid).collect())
            .collect();
        Self {
            headers,
            cells,
            issues,
            is_admin,
            tracker: SubmissionTracker::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn headers(&self) -> &MatrixHeaders {
        &self.headers
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn issues(&self) -> &[GridIssue] {
        &self.issues
    }

    pub fn view(&self) -> ViewHandle {
        self.tracker.view()
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.column_headers.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&MatrixCell> {
        self.slot(row, col).ok().map(|slot| &slot.cell)
    }

    pub fn state(&self, row: usize, col: usize) -> Option<CellState> {
        self.slot(row, col).ok().map(EditorCell::state)
    }

    pub fn is_placeholder(&self, row: usize, col: usize) -> bool {
        self.slot(row, col).map(|slot| slot.placeholder).unwrap_or(false)
    }

    /// Positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| (0..cells.len()).map(move |col| (row, col)))
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|slot| slot.state() == state)
            .count()
    }

    /// Writes one sub-value of a cell's local `value`. Blank input clears the
    /// sub-value. Published and previous values are never touched here.
    pub fn set_cell_value(
        &mut self,
        row: usize,
        col: usize,
        item: &str,
        input: CellScalar,
    ) -> Result<(), PanelError> {
        let item_schema = self.item(row, col, item)?.clone();
        let options = self.effective_options(row, col, item)?.to_vec();
        let path = format!("{row}.{col}.{item}");

        let accepted = if input.is_blank() {
            None
        } else {
            Some(accept_cell_input(&item_schema, &options, input, &path)?)
        };

        let slot = self.editable_slot(row, col)?;
        match accepted {
            Some(value) => slot.cell.value.insert(item.to_string(), value),
            None => slot.cell.value.remove(item),
        };
        tracing::debug!(row, col, item, state = ?slot.state(), "matrix cell edited");
        Ok(())
    }

    /// Empties the local value of a cell.
    pub fn clear_cell(&mut self, row: usize, col: usize) -> Result<(), PanelError> {
        let slot = self.editable_slot(row, col)?;
        slot.cell.value.clear();
        tracing::debug!(row, col, "matrix cell cleared");
        Ok(())
    }

    /// Options offered to a select item: the cell's row-specific selection when
    /// its row header defines options, otherwise the column item's options.
    pub fn effective_options(
        &self,
        row: usize,
        col: usize,
        item: &str,
    ) -> Result<&[SelectOption], PanelError> {
        let item_schema = self.item(row, col, item)?;
        let slot = self.slot(row, col)?;
        let row_has_options = self
            .headers
            .row_headers
            .get(row)
            .is_some_and(|header| !header.options.is_empty());
        match &slot.cell.selected_row_header_sub_options {
            Some(selected) if row_has_options && item_schema.item_type == ItemType::Select => {
                Ok(selected.as_slice())
            }
            _ => Ok(item_schema.options.as_slice()),
        }
    }

    /// Snapshots cells for a save. `WholeGrid` sends every trusted cell;
    /// `ChangedCells` sends only cells in [`CellState::Editing`]. Placeholders
    /// are left out so unreadable server data is never overwritten.
    pub fn begin_save(&mut self, scope: SaveScope) -> MatrixSaveRequest {
        let ticket = self.tracker.issue();
        let mut rows = MatrixRows::new();
        let mut snapshot = Snapshot::new();
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, slot) in cells.iter().enumerate() {
                let include = !slot.placeholder
                    && match scope {
                        SaveScope::WholeGrid => true,
                        SaveScope::ChangedCells => slot.state() == CellState::Editing,
                    };
                if include {
                    rows.entry(row).or_default().push(slot.cell.clone());
                    snapshot.push((row, col, slot.cell.value.clone()));
                }
            }
        }
        tracing::debug!(
            ticket = ticket.sequence(),
            cells = snapshot.len(),
            ?scope,
            is_admin = self.is_admin,
            "matrix save started"
        );
        self.pending.insert(ticket, snapshot);
        MatrixSaveRequest {
            ticket,
            is_admin: self.is_admin,
            scope,
            rows,
        }
    }

    /// Applies the result of a save started with [`MatrixEditor::begin_save`].
    ///
    /// On success each snapshot value becomes the new baseline and
    /// `previous_value`; for administrators it is also the new `public_value`.
    /// Edits made after the snapshot stay local. A failure changes nothing.
    pub fn complete_save(
        &mut self,
        ticket: Ticket,
        result: Result<MatrixSaveReply, TransportError>,
    ) -> MatrixSaveOutcome {
        let Some(snapshot) = self.pending.remove(&ticket) else {
            return MatrixSaveOutcome::Stale;
        };
        if !self.tracker.accept(&ticket) {
            return MatrixSaveOutcome::Stale;
        }
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(ticket = ticket.sequence(), error = %err, "matrix save failed");
                return MatrixSaveOutcome::Failed(Notice::error(format!(
                    "Saving the matrix failed: {err}. Your changes are still here."
                )));
            }
        };

        let saved = snapshot.len();
        for (row, col, value) in snapshot {
            let Some(slot) = self.cells.get_mut(row).and_then(|cells| cells.get_mut(col)) else {
                continue;
            };
            slot.baseline = value.clone();
            slot.cell.previous_value = Some(value.clone());
            if self.is_admin {
                slot.cell.public_value = Some(value);
            }
            slot.incoming = None;
        }
        if let Some(canonical) = reply.canonical {
            self.apply_canonical(canonical);
        }
        tracing::info!(ticket = ticket.sequence(), cells = saved, "matrix saved");
        MatrixSaveOutcome::Saved { cells: saved }
    }

    /// Merges a later fetch. Clean cells take the server copy; a cell with
    /// local edits whose server copy changed keeps the edits and enters
    /// [`CellState::Conflict`]. Local edits also survive a server copy that
    /// could not be trusted; the issue is still recorded.
    pub fn refresh(&mut self, data: MatrixRows) {
        let grid = MatrixGrid::assemble(self.headers.clone(), data);
        let (_, rows, issues) = grid.into_parts();
        let mut conflicts = 0;
        for (row, (local_row, fresh_row)) in self.cells.iter_mut().zip(rows).enumerate() {
            for (col, (local, fresh)) in local_row.iter_mut().zip(fresh_row).enumerate() {
                if local.placeholder || !local.is_dirty() {
                    *local = EditorCell::from_grid(fresh);
                    continue;
                }
                if fresh.placeholder {
                    tracing::warn!(row, col, "keeping local edits over an unreadable server cell");
                    continue;
                }
                let known = local.incoming.as_ref().unwrap_or(&local.cell);
                let changed = fresh.cell.value != local.baseline
                    || fresh.cell.public_value != known.public_value;
                if changed {
                    conflicts += 1;
                    local.incoming = Some(fresh.cell);
                }
            }
        }
        self.issues = issues;
        if conflicts > 0 {
            tracing::warn!(conflicts, "server changed cells with local edits");
        }
    }

    /// Resolves a conflict by discarding the local edit.
    pub fn accept_server(&mut self, row: usize, col: usize) -> Result<(), PanelError> {
        let slot = self.conflicting_slot(row, col)?;
        if let Some(server) = slot.incoming.take() {
            slot.adopt(server);
        }
        Ok(())
    }

    /// Resolves a conflict by keeping the local edit on top of the new server copy.
    pub fn keep_local(&mut self, row: usize, col: usize) -> Result<(), PanelError> {
        let slot = self.conflicting_slot(row, col)?;
        if let Some(server) = slot.incoming.take() {
            slot.baseline = server.value;
            slot.cell.previous_value = server.previous_value;
            slot.cell.public_value = server.public_value;
        }
        Ok(())
    }

    /// Cells whose draft value differs from the published one.
    pub fn divergent_cells(&self) -> Vec<(usize, usize)> {
        self.positions()
            .filter(|&(row, col)| {
                self.slot(row, col).is_ok_and(|slot| {
                    !slot.placeholder
                        && match &slot.cell.public_value {
                            Some(public) => public != &slot.cell.value,
                            None => !slot.cell.value.is_empty(),
                        }
                })
            })
            .collect()
    }

    /// Current local cells keyed by row index.
    pub fn rows(&self) -> MatrixRows {
        self.cells
            .iter()
            .enumerate()
            .map(|(row, cells)| (row, cells.iter().map(|slot| slot.cell.clone()).collect()))
            .collect()
    }

    fn apply_canonical(&mut self, canonical: MatrixRows) {
        let grid = MatrixGrid::assemble(self.headers.clone(), canonical.clone());
        let (_, rows, _) = grid.into_parts();
        for (row_index, fresh_row) in rows.into_iter().enumerate() {
            if !canonical.contains_key(&row_index) {
                continue;
            }
            for (col, fresh) in fresh_row.into_iter().enumerate() {
                if fresh.placeholder {
                    continue;
                }
                let Some(slot) = self
                    .cells
                    .get_mut(row_index)
                    .and_then(|cells| cells.get_mut(col))
                else {
                    continue;
                };
                let untouched = !slot.is_dirty();
                slot.cell.previous_value = fresh.cell.previous_value.clone();
                slot.cell.public_value = fresh.cell.public_value.clone();
                slot.cell.selected_row_header_sub_options =
                    fresh.cell.selected_row_header_sub_options.clone();
                slot.baseline = fresh.cell.value.clone();
                if untouched {
                    slot.cell.value = fresh.cell.value;
                }
            }
        }
    }

    fn slot(&self, row: usize, col: usize) -> Result<&EditorCell, PanelError> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .ok_or_else(|| out_of_range(row, col))
    }

    fn editable_slot(&mut self, row: usize, col: usize) -> Result<&mut EditorCell, PanelError> {
        let slot = self
            .cells
            .get_mut(row)
            .and_then(|cells| cells.get_mut(col))
            .ok_or_else(|| out_of_range(row, col))?;
        if slot.placeholder {
            return Err(PanelError::DataIntegrity {
                row,
                column: col,
                reason: "placeholder cells cannot be edited".into(),
            });
        }
        Ok(slot)
    }

    fn conflicting_slot(&mut self, row: usize, col: usize) -> Result<&mut EditorCell, PanelError> {
        let slot = self.editable_slot(row, col)?;
        if slot.incoming.is_none() {
            return Err(PanelError::invalid_input(
                format!("{row}.{col}"),
                "cell is not in conflict",
            ));
        }
        Ok(slot)
    }

    fn item(&self, row: usize, col: usize, item: &str) -> Result<&FormTypeItem, PanelError> {
        self.slot(row, col)?;
        self.headers
            .column_headers
            .get(col)
            .and_then(|column| column.form_type.item(item))
            .ok_or_else(|| PanelError::UnknownField(format!("{row}.{col}.{item}")))
    }
}

fn out_of_range(row: usize, col: usize) -> PanelError {
    PanelError::invalid_input(format!("{row}.{col}"), "no cell at this position")
}

fn accept_cell_input(
    item: &FormTypeItem,
    options: &[SelectOption],
    input: CellScalar,
    path: &str,
) -> Result<CellScalar, PanelError> {
    match item.item_type {
        ItemType::Text => Ok(CellScalar::Text(input.as_text())),
        ItemType::Number => input
            .as_number()
            .map(CellScalar::Number)
            .ok_or_else(|| PanelError::invalid_input(path, "expects a number")),
        ItemType::Checkbox => match input {
            CellScalar::Bool(flag) => Ok(CellScalar::Bool(flag)),
            CellScalar::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(CellScalar::Bool(true)),
                "false" => Ok(CellScalar::Bool(false)),
                _ => Err(PanelError::invalid_input(path, "expects true or false")),
            },
            CellScalar::Number(_) => Err(PanelError::invalid_input(path, "expects true or false")),
        },
        ItemType::Select => {
            let text = input.as_text();
            if options_contain(options, &text) {
                Ok(CellScalar::Text(text))
            } else {
                Err(PanelError::invalid_input(
                    path,
                    "is not one of the available options",
                ))
            }
        }
    }
}
