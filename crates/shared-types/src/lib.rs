use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Task Sheet Types
// ============================================================================

/// Logical fields every task row carries.
///
/// The order of `TaskField::ALL` is the order used when resolving headers and
/// when reporting a missing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    TaskId,
    StartDate,
    Title,
    Comment,
    Priority,
}

impl TaskField {
    pub const ALL: [TaskField; 5] = [
        TaskField::TaskId,
        TaskField::StartDate,
        TaskField::Title,
        TaskField::Comment,
        TaskField::Priority,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TaskField::TaskId => "task_id",
            TaskField::StartDate => "start_date",
            TaskField::Title => "title",
            TaskField::Comment => "comment",
            TaskField::Priority => "priority",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    /// Build a cell from stored text; the empty string is an empty cell.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(text)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Timestamp(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Timestamp(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::from_text(text)
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::from_text(text)
    }
}

/// A task extracted from one assignment email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String, // uppercased and trimmed
    pub received_at: Option<DateTime<Utc>>,
    pub title: String,
    pub comment: String,
    pub priority: String,
    pub message_id: String,
    pub thread_id: String,
}

impl TaskRecord {
    /// Cell value for one logical field
    pub fn cell(&self, field: TaskField) -> CellValue {
        match field {
            TaskField::TaskId => CellValue::from_text(self.task_id.clone()),
            TaskField::StartDate => self
                .received_at
                .map(CellValue::Timestamp)
                .unwrap_or(CellValue::Empty),
            TaskField::Title => CellValue::from_text(self.title.clone()),
            TaskField::Comment => CellValue::from_text(self.comment.clone()),
            TaskField::Priority => CellValue::from_text(self.priority.clone()),
        }
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// Summary of one synchronization run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub query: String,
    pub threads_found: usize,
    pub messages_scanned: usize,
    pub existing_ids: usize,
    pub appended: Vec<TaskRecord>,
    pub duplicates: usize,
    pub without_id: usize,
    pub marked_read: usize,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn appended_ids(&self) -> Vec<&str> {
        self.appended.iter().map(|r| r.task_id.as_str()).collect()
    }
}
