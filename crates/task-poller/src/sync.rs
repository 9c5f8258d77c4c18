//! One synchronization run: search the mailbox, extract task ids and fields,
//! append unseen tasks to the sheet, then mark the inspected mail as read.
//!
//! Setup problems (missing sheet, unreadable headers, missing columns) and a
//! failed search abort the run before anything is written. Once the search
//! succeeds every message is handled on a best-effort basis; a message
//! without an id is skipped, never an error.

use crate::columns::ColumnMap;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::extract::{FieldExtractor, IdMatcher};
use crate::mailbox::{MailMessage, Mailbox};
use crate::query::build_search_query;
use crate::store::{Sheet, Workbook};
use shared_types::{CellValue, SyncReport, TaskField, TaskRecord};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute and report everything, but append nothing and mark nothing
    pub dry_run: bool,
}

/// Run a full synchronization.
///
/// Rows are appended in discovery order: threads as the mailbox returned
/// them, messages in thread order. In a dry run `SyncReport::appended` lists
/// the records that would have been written.
pub fn run_sync<M, W>(
    config: &SyncConfig,
    mailbox: &mut M,
    workbook: &mut W,
    options: RunOptions,
) -> SyncResult<SyncReport>
where
    M: Mailbox + ?Sized,
    W: Workbook + ?Sized,
{
    let query = build_search_query(&config.search);
    let ids = IdMatcher::new(&config.extract.id_prefixes).map_err(|e| abort(e.into()))?;
    let fields = FieldExtractor::new(&config.extract, &config.sheet.default_priority)
        .map_err(|e| abort(e.into()))?;

    let sheet_name = &config.sheet.name;
    let header_row = config.sheet.header_row;

    let sheet = workbook
        .sheet(sheet_name)
        .map_err(|e| abort(SyncError::Store(e)))?
        .ok_or_else(|| abort(SyncError::SheetNotFound(sheet_name.clone())))?;

    let headers = read_headers(&*sheet, header_row).map_err(abort)?;
    let columns =
        ColumnMap::resolve(&headers, &config.sheet.columns, header_row).map_err(abort)?;

    let existing = existing_task_ids(&*sheet, header_row, columns.index_of(TaskField::TaskId))
        .map_err(abort)?;
    tracing::info!("Found {} existing task ids in the sheet", existing.len());

    let threads = mailbox
        .search(&query)
        .map_err(|e| abort(SyncError::MailboxSearch(e)))?;
    tracing::info!(
        "Searching mailbox with query \"{}\". Found {} threads.",
        query,
        threads.len()
    );

    let mut report = SyncReport {
        query,
        threads_found: threads.len(),
        existing_ids: existing.len(),
        dry_run: options.dry_run,
        ..Default::default()
    };

    let mut gate = DedupGate::new(existing);
    let mut read_marks = ReadMarks::default();

    for thread in &threads {
        tracing::debug!(
            "Thread {} holds {} message(s)",
            thread.id,
            thread.messages.len()
        );

        for message in &thread.messages {
            report.messages_scanned += 1;

            if config.search.only_unread && message.unread {
                read_marks.add(&message.id);
            }

            let Some(task_id) = ids.find(&message.subject) else {
                tracing::debug!(
                    "No task id in subject \"{}\". Skipping.",
                    message.subject
                );
                report.without_id += 1;
                continue;
            };

            if !gate.accept(&task_id) {
                tracing::info!(
                    "Task id \"{}\" already exists or was processed. Skipping.",
                    task_id
                );
                report.duplicates += 1;
                continue;
            }

            let record = build_record(task_id, message, &fields);
            tracing::info!(
                "New task id \"{}\" found. Priority: {}. Will be added.",
                record.task_id,
                record.priority
            );
            report.appended.push(record);
        }
    }

    if options.dry_run {
        tracing::info!(
            "Dry run: {} row(s) would be added, {} message(s) would be marked as read",
            report.appended.len(),
            read_marks.ids.len()
        );
        return Ok(report);
    }

    if report.appended.is_empty() {
        tracing::info!("No new unique task ids found to add");
    } else {
        let width = sheet.last_column();
        for record in &report.appended {
            sheet
                .append_row(columns.assemble_row(record, width))
                .map_err(|e| abort(SyncError::Store(e)))?;
        }
        tracing::info!(
            "Added {} new unique task id(s) to the sheet \"{}\"",
            report.appended.len(),
            sheet_name
        );
    }

    if !read_marks.ids.is_empty() {
        mailbox
            .mark_read(&read_marks.ids)
            .map_err(|e| abort(SyncError::MarkRead(e)))?;
        report.marked_read = read_marks.ids.len();
        tracing::info!("Marked {} message(s) as read", report.marked_read);
    }

    Ok(report)
}

fn abort(err: SyncError) -> SyncError {
    tracing::error!("{}. Run aborted.", err);
    err
}

fn read_headers(sheet: &dyn Sheet, header_row: usize) -> SyncResult<Vec<CellValue>> {
    sheet
        .values(header_row, 1, 1, sheet.last_column())
        .map(|mut rows| rows.pop().unwrap_or_default())
        .map_err(|source| SyncError::HeaderUnreadable {
            row: header_row,
            source,
        })
}

/// Ids already in the sheet, trimmed and uppercased, blanks skipped
fn existing_task_ids(
    sheet: &dyn Sheet,
    header_row: usize,
    id_column: usize,
) -> SyncResult<HashSet<String>> {
    let last_row = sheet.last_row();
    if last_row <= header_row {
        return Ok(HashSet::new());
    }

    let values = sheet
        .values(header_row + 1, id_column + 1, last_row - header_row, 1)
        .map_err(SyncError::Store)?;

    Ok(values
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter(|cell| !cell.is_blank())
        .map(|cell| normalize_id(&cell.to_string()))
        .collect())
}

fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}

fn build_record(task_id: String, message: &MailMessage, fields: &FieldExtractor) -> TaskRecord {
    let extracted = fields.extract(&message.body);
    TaskRecord {
        task_id,
        received_at: message.received_at,
        title: extracted.title,
        comment: extracted.comment,
        priority: extracted.priority,
        message_id: message.id.clone(),
        thread_id: message.thread_id.clone(),
    }
}

/// Admits an id only if it is neither in the sheet nor already admitted
/// during this run.
struct DedupGate {
    existing: HashSet<String>,
    seen: HashSet<String>,
}

impl DedupGate {
    fn new(existing: HashSet<String>) -> Self {
        Self {
            existing,
            seen: HashSet::new(),
        }
    }

    fn accept(&mut self, task_id: &str) -> bool {
        let key = normalize_id(task_id);
        if self.existing.contains(&key) {
            return false;
        }
        self.seen.insert(key)
    }
}

/// Message ids to mark read, unique, in first-seen order
#[derive(Default)]
struct ReadMarks {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl ReadMarks {
    fn add(&mut self, message_id: &str) {
        if self.seen.insert(message_id.to_string()) {
            self.ids.push(message_id.to_string());
        }
    }
}
