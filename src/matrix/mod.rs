//! Rate matrix: a dense grid of cells whose controls come from the column's form type.
//!
//! [`MatrixGrid::assemble`] turns decoded headers and rows into a positional
//! grid and records integrity problems instead of failing. [`MatrixEditor`]
//! owns the grid for one view, tracks per-cell [`CellState`], and reconciles
//! saves and later fetches.

mod editor;
mod grid;
mod render;

pub use editor::{
    CellState, MatrixEditor, MatrixSaveOutcome, MatrixSaveReply, MatrixSaveRequest,
};
pub use grid::{GridCell, GridIssue, MatrixGrid};
pub use render::{render, CellControl, CellWidget, RenderedCell, RenderedGrid, RenderedRow};

use crate::context::ViewContext;

impl MatrixEditor {
    pub fn render(&self, ctx: &ViewContext) -> RenderedGrid {
        render(self, ctx)
    }
}
