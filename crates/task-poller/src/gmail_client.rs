//! Gmail API mailbox.
//!
//! The API client is async; each trait call blocks on a private
//! current-thread runtime so the synchronizer stays strictly sequential.

use crate::google_auth::{io_runtime, GoogleCredentials};
use crate::mailbox::{MailMessage, MailThread, Mailbox};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use google_gmail1::api::{BatchModifyMessagesRequest, Message, MessagePart, Scope};
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::runtime::Runtime;

type GmailHub = Gmail<HttpsConnector<HttpConnector>>;

/// Label Gmail uses for the unread state
const UNREAD_LABEL: &str = "UNREAD";

/// Maximum ids accepted by one `messages.batchModify` request
const BATCH_MODIFY_LIMIT: usize = 1000;

pub struct GmailMailbox {
    runtime: Runtime,
    hub: GmailHub,
}

impl GmailMailbox {
    pub fn connect(credentials: GoogleCredentials) -> Result<Self> {
        let runtime = io_runtime()?;
        let hub = runtime.block_on(build_hub(credentials))?;

        Ok(Self { runtime, hub })
    }
}

impl Mailbox for GmailMailbox {
    fn search(&mut self, query: &str) -> Result<Vec<MailThread>> {
        self.runtime.block_on(search_threads(&self.hub, query))
    }

    fn mark_read(&mut self, message_ids: &[String]) -> Result<()> {
        self.runtime.block_on(remove_unread(&self.hub, message_ids))
    }
}

async fn build_hub(credentials: GoogleCredentials) -> Result<GmailHub> {
    // Use the yup_oauth2 re-exported by google_gmail1 to avoid version mismatch
    let secret = google_gmail1::yup_oauth2::authorized_user::AuthorizedUserSecret {
        client_id: credentials.client_id,
        client_secret: credentials.client_secret,
        refresh_token: credentials.refresh_token,
        key_type: "authorized_user".to_string(),
    };

    let auth = google_gmail1::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
        .context("Failed to build authenticator from refresh token")?;

    let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native TLS roots")?
        .https_or_http()
        .enable_http1()
        .build();

    let client = Client::builder(TokioExecutor::new()).build(connector);
    Ok(Gmail::new(client, auth))
}

async fn search_threads(hub: &GmailHub, query: &str) -> Result<Vec<MailThread>> {
    let mut thread_ids = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut call = hub
            .users()
            .threads_list("me")
            .q(query)
            .add_scope(Scope::Modify);
        if let Some(token) = &page_token {
            call = call.page_token(token);
        }

        let (_, response) = call.doit().await.context("Failed to list threads")?;

        thread_ids.extend(
            response
                .threads
                .unwrap_or_default()
                .into_iter()
                .filter_map(|t| t.id),
        );

        match response.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    tracing::debug!("Query matched {} threads", thread_ids.len());

    let mut threads = Vec::with_capacity(thread_ids.len());
    for id in thread_ids {
        let (_, thread) = hub
            .users()
            .threads_get("me", &id)
            .format("full")
            .add_scope(Scope::Modify)
            .doit()
            .await
            .with_context(|| format!("Failed to get thread {}", id))?;

        let messages = thread
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(parse_message)
            .collect();

        threads.push(MailThread { id, messages });
    }

    Ok(threads)
}

async fn remove_unread(hub: &GmailHub, message_ids: &[String]) -> Result<()> {
    for chunk in message_ids.chunks(BATCH_MODIFY_LIMIT) {
        let request = BatchModifyMessagesRequest {
            ids: Some(chunk.to_vec()),
            add_label_ids: None,
            remove_label_ids: Some(vec![UNREAD_LABEL.to_string()]),
        };

        hub.users()
            .messages_batch_modify(request, "me")
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Failed to modify message labels")?;
    }

    Ok(())
}

fn parse_message(message: Message) -> MailMessage {
    let id = message.id.clone().unwrap_or_default();
    let thread_id = message.thread_id.clone().unwrap_or_default();
    let unread = message
        .label_ids
        .as_ref()
        .is_some_and(|labels| labels.iter().any(|l| l == UNREAD_LABEL));

    let mut subject = String::new();
    let mut date_header = None;

    if let Some(headers) = message.payload.as_ref().and_then(|p| p.headers.as_ref()) {
        for header in headers {
            let name = header.name.as_deref().unwrap_or_default();
            if name.eq_ignore_ascii_case("Subject") {
                subject = header.value.clone().unwrap_or_default();
            } else if name.eq_ignore_ascii_case("Date") {
                date_header = header.value.as_deref().and_then(parse_date);
            }
        }
    }

    let received_at = message
        .internal_date
        .and_then(DateTime::from_timestamp_millis)
        .or(date_header);

    let body = message
        .payload
        .as_ref()
        .and_then(plain_body)
        .unwrap_or_default();

    MailMessage {
        id,
        thread_id,
        subject,
        received_at,
        body,
        unread,
    }
}

fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Plain-text body: the first `text/plain` part, else the first HTML part
/// rendered to text.
fn plain_body(payload: &MessagePart) -> Option<String> {
    find_part_text(payload, "text/plain")
        .or_else(|| find_part_text(payload, "text/html").map(|html| html_to_text(&html)))
}

fn find_part_text(part: &MessagePart, mime: &str) -> Option<String> {
    if part.mime_type.as_deref() == Some(mime) {
        if let Some(text) = part
            .body
            .as_ref()
            .and_then(|b| b.data.as_ref())
            .and_then(|data| bytes_to_string(data))
        {
            return Some(text);
        }
    }

    part.parts
        .as_ref()?
        .iter()
        .find_map(|nested| find_part_text(nested, mime))
}

fn bytes_to_string(data: &[u8]) -> Option<String> {
    String::from_utf8(data.to_vec()).ok()
}

/// Wide enough that no label line is ever wrapped
const HTML_TEXT_WIDTH: usize = 1000;

/// Render HTML without emphasis markers so labels and values read as typed.
/// Entities are decoded; on a render failure the markup is kept as is.
fn html_to_text(html: &str) -> String {
    html2text::config::plain_no_decorate()
        .string_from_read(html.as_bytes(), HTML_TEXT_WIDTH)
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to render HTML body: {}", e);
            html.to_string()
        })
}
