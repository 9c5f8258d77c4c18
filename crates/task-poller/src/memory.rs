//! In-process mailbox and workbook.

use crate::mailbox::{MailThread, Mailbox};
use crate::store::{self, Sheet, Workbook};
use anyhow::{bail, Result};
use shared_types::CellValue;
use std::collections::{HashMap, HashSet};

/// Mailbox serving a fixed list of threads.
///
/// Every query returns all threads; the queries and mark-read calls are
/// recorded so callers can inspect them afterwards. A rejected mark-read
/// call is recorded too but leaves the unread flags alone.
#[derive(Debug, Default)]
pub struct InMemoryMailbox {
    pub threads: Vec<MailThread>,
    pub queries: Vec<String>,
    pub mark_read_calls: Vec<Vec<String>>,
    pub fail_search: bool,
    pub fail_mark_read: bool,
}

impl InMemoryMailbox {
    pub fn new(threads: Vec<MailThread>) -> Self {
        Self {
            threads,
            ..Default::default()
        }
    }

    pub fn is_unread(&self, message_id: &str) -> bool {
        self.threads
            .iter()
            .flat_map(|t| &t.messages)
            .any(|m| m.id == message_id && m.unread)
    }
}

impl Mailbox for InMemoryMailbox {
    fn search(&mut self, query: &str) -> Result<Vec<MailThread>> {
        self.queries.push(query.to_string());
        if self.fail_search {
            bail!("search rejected: {}", query);
        }
        Ok(self.threads.clone())
    }

    fn mark_read(&mut self, message_ids: &[String]) -> Result<()> {
        if self.fail_mark_read {
            self.mark_read_calls.push(message_ids.to_vec());
            bail!("mark-read rejected for {} message(s)", message_ids.len());
        }

        let ids: HashSet<&str> = message_ids.iter().map(String::as_str).collect();
        for message in self.threads.iter_mut().flat_map(|t| t.messages.iter_mut()) {
            if ids.contains(message.id.as_str()) {
                message.unread = false;
            }
        }
        self.mark_read_calls.push(message_ids.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemorySheet {
    pub rows: Vec<Vec<CellValue>>,
    /// Reject every append once this many have succeeded
    pub fail_after_appends: Option<usize>,
    appends: usize,
}

impl InMemorySheet {
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| CellValue::from(*c)).collect())
                .collect(),
            ..Default::default()
        }
    }
}

impl Sheet for InMemorySheet {
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
        if self.fail_after_appends.is_some_and(|limit| self.appends >= limit) {
            bail!("append rejected after {} row(s)", self.appends);
        }

        store::append_after_content(&mut self.rows, cells);
        self.appends += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkbook {
    pub sheets: HashMap<String, InMemorySheet>,
}

impl InMemoryWorkbook {
    pub fn with_sheet(name: &str, sheet: InMemorySheet) -> Self {
        let mut sheets = HashMap::new();
        sheets.insert(name.to_string(), sheet);
        Self { sheets }
    }
}

impl Workbook for InMemoryWorkbook {
    fn sheet(&mut self, name: &str) -> Result<Option<&mut dyn Sheet>> {
        Ok(self.sheets.get_mut(name).map(|s| s as &mut dyn Sheet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::MailMessage;

    fn message(id: &str, unread: bool) -> MailMessage {
        MailMessage {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            subject: "INC1".to_string(),
            received_at: None,
            body: String::new(),
            unread,
        }
    }

    #[test]
    fn test_mark_read_clears_flag() {
        let mut mailbox = InMemoryMailbox::new(vec![MailThread {
            id: "t1".to_string(),
            messages: vec![message("a", true), message("b", true)],
        }]);

        mailbox.mark_read(&["a".to_string()]).unwrap();

        assert!(!mailbox.is_unread("a"));
        assert!(mailbox.is_unread("b"));
        assert_eq!(mailbox.mark_read_calls, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn test_failing_search_records_query() {
        let mut mailbox = InMemoryMailbox {
            fail_search: true,
            ..Default::default()
        };
        assert!(mailbox.search("is:unread").is_err());
        assert_eq!(mailbox.queries, vec!["is:unread"]);
    }

    #[test]
    fn test_failing_mark_read_keeps_flags() {
        let mut mailbox = InMemoryMailbox::new(vec![MailThread {
            id: "t1".to_string(),
            messages: vec![message("a", true)],
        }]);
        mailbox.fail_mark_read = true;

        assert!(mailbox.mark_read(&["a".to_string()]).is_err());
        assert!(mailbox.is_unread("a"));
        assert_eq!(mailbox.mark_read_calls.len(), 1);
    }

    #[test]
    fn test_append_limit() {
        let mut sheet = InMemorySheet {
            fail_after_appends: Some(1),
            ..InMemorySheet::from_text_rows(&[&["TAREA"]])
        };

        sheet.append_row(vec![CellValue::from("INC1")]).unwrap();
        assert!(sheet.append_row(vec![CellValue::from("INC2")]).is_err());
        assert_eq!(sheet.last_row(), 2);
    }

    #[test]
    fn test_sheet_lookup() {
        let mut workbook =
            InMemoryWorkbook::with_sheet("Remedy", InMemorySheet::from_text_rows(&[&["TAREA"]]));
        assert!(workbook.sheet("Remedy").unwrap().is_some());
        assert!(workbook.sheet("remedy").unwrap().is_none());

        let sheet = workbook.sheet("Remedy").unwrap().unwrap();
        sheet.append_row(vec![CellValue::from("INC1")]).unwrap();
        assert_eq!(sheet.last_row(), 2);
        assert_eq!(sheet.last_column(), 1);
    }
}
