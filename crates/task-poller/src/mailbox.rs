//! Mailbox collaborator.
//!
//! Threads come back in the order the provider returns them and messages in
//! thread order; the synchronizer appends rows in exactly that order.

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Email message as seen by the synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub received_at: Option<DateTime<Utc>>,
    pub body: String, // plain text
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailThread {
    pub id: String,
    pub messages: Vec<MailMessage>,
}

pub trait Mailbox {
    /// Run a provider search query and return every matching thread
    fn search(&mut self, query: &str) -> Result<Vec<MailThread>>;

    /// Clear the unread flag on the given messages
    fn mark_read(&mut self, message_ids: &[String]) -> Result<()>;
}
