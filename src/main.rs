use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use expense_sync::config::Config;
use expense_sync::normalize::{normalize, NormalizeOptions, StampMode};
use expense_sync::reconcile::ReconcileMode;
use expense_sync::server::{start_server, AppState, ErrorResponse, UploadRequest, UploadResponse};
use expense_sync::store::InMemorySheetStore;
use expense_sync::upload_log::UploadLogEntry;
use expense_sync::{logging, workbook};

#[derive(Parser)]
#[command(name = "expense-sync")]
#[command(about = "Expense workbook uploader and sheet reconciliation service")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the service configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation HTTP service
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
        /// Keep rows in memory instead of the remote spreadsheet (local dev)
        #[arg(long)]
        memory_store: bool,
    },
    /// Normalize a workbook and send it to the service
    Upload {
        /// The .xlsx/.xls file to upload
        file: PathBuf,
        /// Name recorded in the Created By column and the upload log
        #[arg(long)]
        uploader: String,
        /// Service base URL
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// How the rows should interact with existing sheet contents
        #[arg(long, value_enum, default_value = "append-all")]
        mode: ReconcileMode,
        /// Stamp the upload timestamp client-side instead of leaving it blank
        #[arg(long)]
        stamp: bool,
    },
    /// Show the most recent upload-log entries
    Logs {
        /// Service base URL
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config))?;

    match cli.command {
        Commands::Serve { port, memory_store } => {
            let port = port.unwrap_or(config.server.port);
            let store = if memory_store {
                let store = Arc::new(InMemorySheetStore::new());
                // Seed the data tab with a header row so the data region
                // starts at the configured first data row, like the real
                // template does.
                store.seed(&config.spreadsheet.data_sheet, vec![Vec::new()]);
                println!("📝 Using in-memory sheet store (rows are not persisted)");
                Some(store)
            } else {
                None
            };
            let state = AppState::new(Arc::new(config), store);
            start_server(state, port).await?;
        }
        Commands::Upload {
            file,
            uploader,
            server,
            mode,
            stamp,
        } => {
            run_upload(&config, file, uploader, server, mode, stamp).await?;
        }
        Commands::Logs { server } => {
            run_logs(server).await?;
        }
    }

    Ok(())
}

async fn run_upload(
    config: &Config,
    file: PathBuf,
    uploader: String,
    server: String,
    mode: ReconcileMode,
    stamp: bool,
) -> anyhow::Result<()> {
    let grid = workbook::extract_grid(&file)?;

    let opts = NormalizeOptions {
        uploader,
        stamp: if stamp {
            StampMode::Client(Local::now().format("%d/%m/%Y, %H:%M:%S").to_string())
        } else {
            StampMode::Deferred
        },
        render: config.spreadsheet.date_render,
    };
    let rows = normalize(&grid, &opts)?;
    info!(rows = rows.len(), file = %file.display(), "workbook normalized");

    if rows.is_empty() && !mode.is_replace() {
        println!("No rows to upload.");
        return Ok(());
    }

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let request = UploadRequest {
        rows,
        uploader: Some(opts.uploader.clone()),
        file_name: Some(file_name),
        mode,
    };

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{server}/api/upload"))
        .json(&request)
        .send()
        .await
        .context("sending rows to the service")?;
    let status = response.status();
    if status.is_success() {
        let result: UploadResponse = response.json().await?;
        println!("✅ {} ({} rows written)", result.message, result.updated_rows);
    } else {
        let result: ErrorResponse = response.json().await.unwrap_or(ErrorResponse {
            message: format!("upload failed with status {status}"),
            error: String::new(),
        });
        anyhow::bail!("upload failed ({status}): {}", result.message);
    }

    Ok(())
}

async fn run_logs(server: String) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let entries: Vec<UploadLogEntry> = client
        .get(format!("{server}/api/logs"))
        .send()
        .await
        .context("fetching the upload log")?
        .error_for_status()?
        .json()
        .await?;

    if entries.is_empty() {
        println!("No uploads logged yet.");
        return Ok(());
    }
    for entry in entries {
        println!("{}  {}  {}", entry.timestamp, entry.uploader, entry.file_name);
    }
    Ok(())
}
