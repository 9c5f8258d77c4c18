//! Tabular store collaborator.
//!
//! Rows and columns are 1-based, as in a spreadsheet. `last_row` and
//! `last_column` describe the extent of cells that hold content.

use anyhow::{bail, Result};
use shared_types::CellValue;

pub trait Workbook {
    /// Look up a sheet by its exact name
    fn sheet(&mut self, name: &str) -> Result<Option<&mut dyn Sheet>>;
}

pub trait Sheet {
    fn last_row(&self) -> usize;

    fn last_column(&self) -> usize;

    /// Cell values of a rectangular range. Cells past the content come back
    /// empty; a zero-sized range or a zero row/column index is an error.
    fn values(
        &self,
        row: usize,
        column: usize,
        num_rows: usize,
        num_columns: usize,
    ) -> Result<Vec<Vec<CellValue>>>;

    /// Add a row after the last row with content
    fn append_row(&mut self, cells: Vec<CellValue>) -> Result<()>;
}

/// Content extent `(last_row, last_column)` of a grid of cells
pub(crate) fn content_extent(rows: &[Vec<CellValue>]) -> (usize, usize) {
    let mut last_row = 0;
    let mut last_column = 0;

    for (index, row) in rows.iter().enumerate() {
        if let Some(pos) = row.iter().rposition(|cell| *cell != CellValue::Empty) {
            last_row = index + 1;
            last_column = last_column.max(pos + 1);
        }
    }

    (last_row, last_column)
}

/// Read a range out of a grid of cells
pub(crate) fn read_range(
    rows: &[Vec<CellValue>],
    row: usize,
    column: usize,
    num_rows: usize,
    num_columns: usize,
) -> Result<Vec<Vec<CellValue>>> {
    if row == 0 || column == 0 {
        bail!("range starts at row {}, column {}; both are 1-based", row, column);
    }
    if num_rows == 0 || num_columns == 0 {
        bail!(
            "range of {} rows by {} columns is empty",
            num_rows,
            num_columns
        );
    }

    let values = (row - 1..row - 1 + num_rows)
        .map(|r| {
            (column - 1..column - 1 + num_columns)
                .map(|c| {
                    rows.get(r)
                        .and_then(|cells| cells.get(c))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    Ok(values)
}

/// Rows are appended directly after the last row with content, dropping any
/// trailing rows that are entirely empty.
pub(crate) fn append_after_content(rows: &mut Vec<Vec<CellValue>>, cells: Vec<CellValue>) {
    let (last_row, _) = content_extent(rows);
    rows.truncate(last_row);
    rows.push(cells);
}
