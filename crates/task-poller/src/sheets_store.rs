//! Workbook backed by a Google Sheets spreadsheet.
//!
//! A sheet is read once, on first lookup, and kept in memory; every append
//! writes the new row right below the last row with content and updates the
//! cached copy. Values go in as `USER_ENTERED`, so timestamps become date
//! cells.

use crate::google_auth::{io_runtime, GoogleCredentials};
use crate::store::{self, Sheet, Workbook};
use anyhow::{Context, Result};
use google_sheets4::api::{Scope, ValueRange};
use google_sheets4::hyper_rustls::HttpsConnector;
use google_sheets4::Sheets;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use shared_types::CellValue;
use std::collections::HashMap;
use std::rc::Rc;
use tokio::runtime::Runtime;

type SheetsHub = Sheets<HttpsConnector<HttpConnector>>;

struct SheetsClient {
    runtime: Runtime,
    hub: SheetsHub,
    spreadsheet_id: String,
}

pub struct SheetsWorkbook {
    client: Rc<SheetsClient>,
    sheets: HashMap<String, SheetsSheet>,
}

impl SheetsWorkbook {
    pub fn connect(credentials: GoogleCredentials, spreadsheet_id: &str) -> Result<Self> {
        let runtime = io_runtime()?;
        let hub = runtime.block_on(build_hub(credentials))?;

        Ok(Self {
            client: Rc::new(SheetsClient {
                runtime,
                hub,
                spreadsheet_id: spreadsheet_id.to_string(),
            }),
            sheets: HashMap::new(),
        })
    }
}

impl Workbook for SheetsWorkbook {
    fn sheet(&mut self, name: &str) -> Result<Option<&mut dyn Sheet>> {
        if !self.sheets.contains_key(name) {
            let client = &self.client;
            let titles = client
                .runtime
                .block_on(sheet_titles(&client.hub, &client.spreadsheet_id))?;
            if !titles.iter().any(|t| t == name) {
                return Ok(None);
            }

            let rows = client
                .runtime
                .block_on(read_rows(&client.hub, &client.spreadsheet_id, name))?;
            tracing::debug!("Loaded sheet \"{}\" ({} rows)", name, rows.len());

            self.sheets.insert(
                name.to_string(),
                SheetsSheet {
                    client: Rc::clone(&self.client),
                    name: name.to_string(),
                    rows,
                },
            );
        }

        Ok(self.sheets.get_mut(name).map(|s| s as &mut dyn Sheet))
    }
}

pub struct SheetsSheet {
    client: Rc<SheetsClient>,
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet for SheetsSheet {
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
        let row_number = self.last_row() + 1;
        let client = &self.client;
        client.runtime.block_on(write_row(
            &client.hub,
            &client.spreadsheet_id,
            &row_range(&self.name, row_number),
            &cells,
        ))?;

        store::append_after_content(&mut self.rows, cells);
        Ok(())
    }
}

async fn build_hub(credentials: GoogleCredentials) -> Result<SheetsHub> {
    // Use the yup_oauth2 re-exported by google_sheets4 to avoid version mismatch
    let secret = google_sheets4::yup_oauth2::authorized_user::AuthorizedUserSecret {
        client_id: credentials.client_id,
        client_secret: credentials.client_secret,
        refresh_token: credentials.refresh_token,
        key_type: "authorized_user".to_string(),
    };

    let auth = google_sheets4::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
        .context("Failed to build authenticator from refresh token")?;

    let connector = google_sheets4::hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native TLS roots")?
        .https_or_http()
        .enable_http1()
        .build();

    let client = Client::builder(TokioExecutor::new()).build(connector);
    Ok(Sheets::new(client, auth))
}

async fn sheet_titles(hub: &SheetsHub, spreadsheet_id: &str) -> Result<Vec<String>> {
    let (_, spreadsheet) = hub
        .spreadsheets()
        .get(spreadsheet_id)
        .add_scope(Scope::Spreadsheet)
        .doit()
        .await
        .with_context(|| format!("Failed to read spreadsheet {}", spreadsheet_id))?;

    Ok(spreadsheet
        .sheets
        .unwrap_or_default()
        .into_iter()
        .filter_map(|sheet| sheet.properties.and_then(|p| p.title))
        .collect())
}

async fn read_rows(
    hub: &SheetsHub,
    spreadsheet_id: &str,
    name: &str,
) -> Result<Vec<Vec<CellValue>>> {
    let (_, range) = hub
        .spreadsheets()
        .values_get(spreadsheet_id, &sheet_range(name))
        .value_render_option("FORMATTED_VALUE")
        .add_scope(Scope::Spreadsheet)
        .doit()
        .await
        .with_context(|| format!("Failed to read sheet \"{}\"", name))?;

    Ok(rows_from_values(range.values.unwrap_or_default()))
}

async fn write_row(
    hub: &SheetsHub,
    spreadsheet_id: &str,
    range: &str,
    cells: &[CellValue],
) -> Result<()> {
    let request = ValueRange {
        major_dimension: Some("ROWS".to_string()),
        values: Some(vec![cells.iter().map(cell_to_json).collect()]),
        ..Default::default()
    };

    hub.spreadsheets()
        .values_update(request, spreadsheet_id, range)
        .value_input_option("USER_ENTERED")
        .add_scope(Scope::Spreadsheet)
        .doit()
        .await
        .with_context(|| format!("Failed to write {}", range))?;

    Ok(())
}

/// A1 range covering a whole sheet
fn sheet_range(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// A1 range starting at column A of a 1-based row
fn row_range(name: &str, row: usize) -> String {
    format!("{}!A{}", sheet_range(name), row)
}

fn rows_from_values(values: Vec<Vec<Value>>) -> Vec<Vec<CellValue>> {
    values
        .iter()
        .map(|row| row.iter().map(cell_from_json).collect())
        .collect()
}

fn cell_from_json(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(text) => CellValue::from_text(text.as_str()),
        other => CellValue::Text(other.to_string()),
    }
}

fn cell_to_json(cell: &CellValue) -> Value {
    Value::String(cell.to_string())
}
