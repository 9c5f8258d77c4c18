use crate::config::ColumnTitles;
use crate::error::SyncError;
use shared_types::{CellValue, TaskField, TaskRecord};

/// Zero-based position of every logical field in the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    positions: [usize; 5],
}

impl ColumnMap {
    /// Match configured titles against the header row. The first header
    /// whose text equals the title wins; every field must be present.
    pub fn resolve(
        headers: &[CellValue],
        titles: &ColumnTitles,
        header_row: usize,
    ) -> Result<Self, SyncError> {
        let mut positions = [0; 5];

        for field in TaskField::ALL {
            let title = titles.title_for(field);
            positions[field as usize] = headers
                .iter()
                .position(|header| header.to_string() == title)
                .ok_or_else(|| SyncError::MissingColumn {
                    title: title.to_string(),
                    row: header_row,
                })?;
        }

        Ok(Self { positions })
    }

    pub fn index_of(&self, field: TaskField) -> usize {
        self.positions[field as usize]
    }

    /// Columns a row must span to hold every mapped field
    pub fn min_width(&self) -> usize {
        self.positions.iter().max().map(|p| p + 1).unwrap_or(0)
    }

    /// Lay a record out as a full sheet row, mapped fields at their columns
    /// and every other cell empty.
    pub fn assemble_row(&self, record: &TaskRecord, sheet_width: usize) -> Vec<CellValue> {
        let mut cells = vec![CellValue::Empty; sheet_width.max(self.min_width())];
        for field in TaskField::ALL {
            cells[self.index_of(field)] = record.cell(field);
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn headers(titles: &[&str]) -> Vec<CellValue> {
        titles.iter().map(|t| CellValue::from(*t)).collect()
    }

    fn record() -> TaskRecord {
        TaskRecord {
            task_id: "WO456".to_string(),
            received_at: Some(Utc.with_ymd_and_hms(2025, 5, 2, 8, 0, 0).unwrap()),
            title: "Fix pump".to_string(),
            comment: "Pump leaking".to_string(),
            priority: "BACKLOG".to_string(),
            message_id: "m1".to_string(),
            thread_id: "t1".to_string(),
        }
    }

    #[test]
    fn test_resolve_stock_headers() {
        let row = headers(&["TAREA", "START", "TITULO", "Comentario", "PRIORITY"]);
        let map = ColumnMap::resolve(&row, &ColumnTitles::default(), 1).unwrap();
        assert_eq!(map.index_of(TaskField::TaskId), 0);
        assert_eq!(map.index_of(TaskField::Priority), 4);
        assert_eq!(map.min_width(), 5);
    }

    #[test]
    fn test_resolve_shuffled_with_extra_columns() {
        let row = headers(&["Owner", "PRIORITY", "", "TAREA", "Comentario", "TITULO", "START"]);
        let map = ColumnMap::resolve(&row, &ColumnTitles::default(), 2).unwrap();
        assert_eq!(map.index_of(TaskField::TaskId), 3);
        assert_eq!(map.index_of(TaskField::StartDate), 6);
        assert_eq!(map.index_of(TaskField::Priority), 1);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let row = headers(&["TAREA", "START", "TITULO", "PRIORITY"]);
        let err = ColumnMap::resolve(&row, &ColumnTitles::default(), 3).unwrap_err();
        match err {
            SyncError::MissingColumn { title, row } => {
                assert_eq!(title, "Comentario");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_match_is_exact() {
        let row = headers(&["tarea", "START", "TITULO", "Comentario", "PRIORITY"]);
        assert!(ColumnMap::resolve(&row, &ColumnTitles::default(), 1).is_err());
    }

    #[test]
    fn test_assemble_row_fills_gaps() {
        let row = headers(&["Owner", "TAREA", "START", "TITULO", "Comentario", "PRIORITY", "Notes"]);
        let map = ColumnMap::resolve(&row, &ColumnTitles::default(), 1).unwrap();
        let cells = map.assemble_row(&record(), 7);

        assert_eq!(cells.len(), 7);
        assert_eq!(cells[0], CellValue::Empty);
        assert_eq!(cells[1], CellValue::from("WO456"));
        assert!(matches!(cells[2], CellValue::Timestamp(_)));
        assert_eq!(cells[3], CellValue::from("Fix pump"));
        assert_eq!(cells[4], CellValue::from("Pump leaking"));
        assert_eq!(cells[5], CellValue::from("BACKLOG"));
        assert_eq!(cells[6], CellValue::Empty);
    }

    #[test]
    fn test_assemble_row_never_narrower_than_mapping() {
        let row = headers(&["TAREA", "START", "TITULO", "Comentario", "PRIORITY"]);
        let map = ColumnMap::resolve(&row, &ColumnTitles::default(), 1).unwrap();
        assert_eq!(map.assemble_row(&record(), 2).len(), 5);
    }
}
