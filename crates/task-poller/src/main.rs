use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use task_poller::csv_store::CsvWorkbook;
use task_poller::gmail_client::GmailMailbox;
use task_poller::google_auth::GoogleCredentials;
use task_poller::sheets_store::SheetsWorkbook;
use task_poller::store::Workbook;
use task_poller::{run_sync, RunOptions, SyncConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "task-poller")]
#[command(about = "Copy task assignments from Gmail into a task sheet")]
#[command(
    long_about = "Searches Gmail for task-assignment emails, extracts the task id, title,\n\
    description and priority, and appends tasks not yet listed to the sheet.\n\
    Processed unread messages are marked as read.\n\n\
    Google credentials are read from GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and\n\
    GOOGLE_REFRESH_TOKEN (a .env file is honoured)."
)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, value_name = "FILE", env = "TASK_POLLER_CONFIG")]
    config: Option<PathBuf>,

    /// Google spreadsheet id holding the task sheet.
    #[arg(
        short,
        long,
        value_name = "ID",
        env = "TASK_POLLER_SPREADSHEET",
        conflicts_with = "workbook"
    )]
    spreadsheet: Option<String>,

    /// Directory holding the workbook; each sheet is `<name>.csv`.
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = "./workbook",
        env = "TASK_POLLER_WORKBOOK"
    )]
    workbook: PathBuf,

    /// Extract and report, but write no rows and mark nothing as read.
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_poller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SyncConfig::default(),
    };

    let credentials = GoogleCredentials::from_env()?;

    let mut workbook: Box<dyn Workbook> = match &cli.spreadsheet {
        Some(id) => Box::new(
            SheetsWorkbook::connect(credentials.clone(), id)
                .context("Failed to create Sheets client")?,
        ),
        None => Box::new(CsvWorkbook::open(&cli.workbook)?),
    };

    let mut mailbox =
        GmailMailbox::connect(credentials).context("Failed to create Gmail client")?;

    tracing::info!("Starting task sync into sheet \"{}\"", config.sheet.name);

    let report = run_sync(
        &config,
        &mut mailbox,
        workbook.as_mut(),
        RunOptions {
            dry_run: cli.dry_run,
        },
    )?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} thread(s), {} message(s) scanned: {} added, {} duplicate(s), {} without id, {} marked read{}",
            report.threads_found,
            report.messages_scanned,
            report.appended.len(),
            report.duplicates,
            report.without_id,
            report.marked_read,
            if report.dry_run { " (dry run)" } else { "" }
        );
        for record in &report.appended {
            println!("  + {} [{}] {}", record.task_id, record.priority, record.title);
        }
    }

    Ok(())
}
