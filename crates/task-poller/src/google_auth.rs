//! OAuth credentials shared by the Google API clients.

use anyhow::{Context, Result};

/// OAuth client and refresh token of the account owning the mailbox and the
/// spreadsheet. The token must carry the Gmail modify scope, plus the
/// spreadsheets scope when a Google Sheet is the task store.
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl GoogleCredentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: std::env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID environment variable must be set")?,
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET environment variable must be set")?,
            refresh_token: std::env::var("GOOGLE_REFRESH_TOKEN")
                .context("GOOGLE_REFRESH_TOKEN environment variable must be set")?,
        })
    }
}

/// Current-thread runtime the blocking API adapters drive their calls on
pub fn io_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start I/O runtime")
}
