//! Mailbox-to-sheet task synchronization.
//!
//! Scans a mailbox for task-assignment emails, extracts the task id, title,
//! comment and priority, and appends tasks not yet present to a sheet.

pub mod columns;
pub mod config;
pub mod csv_store;
pub mod error;
pub mod extract;
pub mod gmail_client;
pub mod google_auth;
pub mod mailbox;
pub mod memory;
pub mod query;
pub mod sheets_store;
pub mod store;
pub mod sync;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use sync::{run_sync, RunOptions};
