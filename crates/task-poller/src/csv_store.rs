//! Workbook kept as a directory of CSV files, one file per sheet.

use crate::store::{self, Sheet, Workbook};
use anyhow::{Context, Result};
use shared_types::CellValue;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvWorkbook {
    dir: PathBuf,
    sheets: HashMap<String, CsvSheet>,
}

impl CsvWorkbook {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!("Workbook directory {} does not exist", dir.display());
        }

        Ok(Self {
            dir,
            sheets: HashMap::new(),
        })
    }

    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }
}

impl Workbook for CsvWorkbook {
    fn sheet(&mut self, name: &str) -> Result<Option<&mut dyn Sheet>> {
        if !self.sheets.contains_key(name) {
            let path = self.sheet_path(name);
            if !path.is_file() {
                return Ok(None);
            }

            let sheet = CsvSheet::load(path)?;
            tracing::debug!("Loaded sheet \"{}\" ({} rows)", name, sheet.rows.len());
            self.sheets.insert(name.to_string(), sheet);
        }

        Ok(self.sheets.get_mut(name).map(|s| s as &mut dyn Sheet))
    }
}

/// One sheet held in memory and written back on every append
pub struct CsvSheet {
    path: PathBuf,
    rows: Vec<Vec<CellValue>>,
}

impl CsvSheet {
    pub fn load(path: PathBuf) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to parse {}", path.display()))?;
            rows.push(record.iter().map(CellValue::from).collect());
        }

        Ok(Self { path, rows })
    }

    fn save(&self) -> Result<()> {
        let tmp = temp_path(&self.path);

        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;

            for row in &self.rows {
                writer.write_record(row.iter().map(|cell| cell.to_string()))?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Sheet for CsvSheet {
    fn last_row(&self) -> usize {
        store::content_extent(&self.rows).0
    }

    fn last_column(&self) -> usize {
        store::content_extent(&self.rows).1
    }

    fn values(
        &self,
        row: usize,
        column: usize,
        num_rows: usize,
        num_columns: usize,
    ) -> Result<Vec<Vec<CellValue>>> {
        store::read_range(&self.rows, row, column, num_rows, num_columns)
    }

    fn append_row(&mut self, cells: Vec<CellValue>) -> Result<()> {
        store::append_after_content(&mut self.rows, cells);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn write_sheet(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(format!("{}.csv", name)), content).unwrap();
    }

    #[test]
    fn test_missing_sheet_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = CsvWorkbook::open(dir.path()).unwrap();
        assert!(workbook.sheet("Remedy").unwrap().is_none());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvWorkbook::open(dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_reads_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(
            dir.path(),
            "Remedy",
            "TAREA,START,TITULO,Comentario,PRIORITY,Notes\nINC100,2025-05-01,Old,,High\n",
        );

        let mut workbook = CsvWorkbook::open(dir.path()).unwrap();
        let sheet = workbook.sheet("Remedy").unwrap().unwrap();

        assert_eq!(sheet.last_row(), 2);
        assert_eq!(sheet.last_column(), 6);
        let ids = sheet.values(2, 1, 1, 1).unwrap();
        assert_eq!(ids, vec![vec![CellValue::from("INC100")]]);
    }

    #[test]
    fn test_append_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "Remedy", "TAREA,START\nINC100,\n");
        let at = Utc.with_ymd_and_hms(2025, 5, 2, 10, 15, 0).unwrap();

        {
            let mut workbook = CsvWorkbook::open(dir.path()).unwrap();
            let sheet = workbook.sheet("Remedy").unwrap().unwrap();
            sheet
                .append_row(vec![CellValue::from("WO456"), CellValue::Timestamp(at)])
                .unwrap();
        }

        let content = fs::read_to_string(dir.path().join("Remedy.csv")).unwrap();
        assert_eq!(content, "TAREA,START\nINC100,\nWO456,2025-05-02 10:15:00\n");
        assert!(!dir.path().join("Remedy.csv.tmp").exists());

        let mut reopened = CsvWorkbook::open(dir.path()).unwrap();
        let sheet = reopened.sheet("Remedy").unwrap().unwrap();
        assert_eq!(sheet.last_row(), 3);
        assert_eq!(
            sheet.values(3, 1, 1, 1).unwrap(),
            vec![vec![CellValue::from("WO456")]]
        );
    }

    #[test]
    fn test_quoted_cells_survive() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(dir.path(), "Remedy", "TAREA,Comentario\n");

        let mut workbook = CsvWorkbook::open(dir.path()).unwrap();
        let sheet = workbook.sheet("Remedy").unwrap().unwrap();
        sheet
            .append_row(vec![CellValue::from("INC1"), CellValue::from("a, \"b\"\nc")])
            .unwrap();

        let mut reopened = CsvWorkbook::open(dir.path()).unwrap();
        let sheet = reopened.sheet("Remedy").unwrap().unwrap();
        assert_eq!(
            sheet.values(2, 2, 1, 1).unwrap(),
            vec![vec![CellValue::from("a, \"b\"\nc")]]
        );
    }
}
