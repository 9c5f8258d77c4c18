//! Errors that abort a synchronization run.
//!
//! Per-message extraction misses are not errors; they only show up as counts
//! in the run report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Target sheet does not exist in the workbook
    #[error("Sheet \"{0}\" not found")]
    SheetNotFound(String),

    /// Header row could not be read
    #[error("Could not read headers from row {row}: {source}")]
    HeaderUnreadable {
        row: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A required logical column has no matching header
    #[error("Required column \"{title}\" not found in row {row}")]
    MissingColumn { title: String, row: usize },

    /// Identifier or label pattern failed to compile
    #[error("Invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Mailbox search failed
    #[error("Error searching mailbox: {0}")]
    MailboxSearch(#[source] anyhow::Error),

    /// Reading or writing the tabular store failed
    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),

    /// Marking messages as read failed
    #[error("Failed to mark messages as read: {0}")]
    MarkRead(#[source] anyhow::Error),
}

impl SyncError {
    /// True for errors raised before anything was written
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            SyncError::SheetNotFound(_)
                | SyncError::HeaderUnreadable { .. }
                | SyncError::MissingColumn { .. }
                | SyncError::InvalidPattern(_)
        )
    }
}

/// Result type alias for synchronization runs
pub type SyncResult<T> = Result<T, SyncError>;
