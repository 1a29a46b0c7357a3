//! muster - barcode check-in/check-out station
//!
//! Associates barcodes with people, records scans, prints and exports the
//! log and current status, and mirrors every change to the backend.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use muster_client::config::ClientConfig;
use muster_client::export::{log_csv, status_csv};
use muster_client::{LocalStorage, ScanStore, SyncClient, Variant};
use muster_common::config::{RootFolderInitializer, RootFolderResolver};
use muster_common::logging::init_tracing;
use muster_common::model::StatusFilter;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "muster", version, about = "Barcode check-in/check-out station")]
struct Cli {
    /// Config file (default: platform config dir/muster/muster.toml)
    #[arg(long, env = "MUSTER_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Local storage file
    #[arg(long)]
    storage: Option<PathBuf>,

    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "MUSTER_BACKEND_URL")]
    backend_url: Option<String>,

    /// Do not send snapshots to the backend
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or replace the association for a barcode
    Associate {
        barcode: String,
        name: String,
        #[arg(long)]
        phase: String,
        #[arg(long)]
        room: Option<String>,
    },
    /// Show who a barcode belongs to
    Lookup { barcode: String },
    /// Record a scan
    Scan {
        barcode: String,
        /// Explicit status (e.g. In, Out, "On Crew Rest")
        #[arg(long)]
        status: Option<String>,
    },
    /// Print the scan log, newest first
    Log {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print current status of one barcode, or of every associated barcode
    Status {
        barcode: Option<String>,
        #[arg(long, default_value_t = StatusFilter::All)]
        filter: StatusFilter,
    },
    /// Write a CSV export
    Export {
        #[arg(value_enum)]
        what: ExportKind,
        /// Output file (default: the variant's file name in the current directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete every log entry
    ClearLog {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Send the current data set to the backend now
    Sync,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportKind {
    Associations,
    Log,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, config_source) =
        ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(storage) = &cli.storage {
        config.storage_path = Some(storage.clone());
    }
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
    if cli.no_sync {
        config.sync_enabled = false;
    }

    init_tracing(&config.logging).context("Failed to initialise logging")?;
    config_source.log();

    let root_folder = RootFolderResolver::new("muster-client")
        .resolve(cli.root_folder.as_deref(), config.root_folder.as_deref());
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let storage_file = config.storage_file(initializer.root());
    let storage = LocalStorage::open(&storage_file)
        .with_context(|| format!("Failed to open {}", storage_file.display()))?;
    info!(variant = ?config.variant, "Using storage {}", storage_file.display());

    let sync = Arc::new(
        SyncClient::new(&config.backend_url)
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?,
    );
    let mut store = ScanStore::open(storage, config.variant);
    if config.sync_enabled {
        store = store.with_sink(sync.clone());
    }

    let result = run(cli.command, &mut store, &sync).await;

    let failed = sync.flush().await;
    if failed > 0 {
        eprintln!("Warning: {} backend update(s) failed; local data is saved.", failed);
    }
    result
}

async fn run(command: Command, store: &mut ScanStore, sync: &SyncClient) -> Result<()> {
    match command {
        Command::Associate {
            barcode,
            name,
            phase,
            room,
        } => {
            let outcome = store.upsert(&barcode, &name, room.as_deref(), &phase)?;
            println!("Saved association for {}.", barcode.trim());
            if let Some(outcome) = outcome {
                println!("{}", outcome.message);
            }
        }
        Command::Lookup { barcode } => {
            let association = store.lookup(barcode.trim());
            println!(
                "{}\tRoom: {}\tPhase: {}",
                association.name,
                association.room.as_deref().unwrap_or(""),
                association.phase
            );
        }
        Command::Scan { barcode, status } => {
            let outcome = store.record_scan(&barcode, status.as_deref())?;
            println!("{}", outcome.message);
        }
        Command::Log { limit } => {
            let entries = store.log_entries();
            let limit = limit.unwrap_or(entries.len());
            for entry in entries.into_iter().take(limit) {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.timestamp, entry.barcode, entry.name, entry.status
                );
            }
        }
        Command::Status { barcode, filter } => {
            let rows = match barcode {
                Some(barcode) => vec![store.current_status_of(barcode.trim())],
                None => store.list_statuses(filter),
            };
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    row.barcode, row.name, row.room, row.phase, row.status
                );
            }
        }
        Command::Export { what, output } => {
            let variant = store.variant();
            let (csv, default_name) = match what {
                ExportKind::Associations => (status_csv(store)?, variant.status_file_name()),
                ExportKind::Log => (log_csv(store)?, variant.log_file_name()),
            };
            let path = output.unwrap_or_else(|| PathBuf::from(default_name));
            std::fs::write(&path, csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {}.", path.display());
        }
        Command::ClearLog { yes } => {
            if !yes && !confirm("Are you sure you want to clear the scan log?")? {
                println!("Scan log kept.");
                return Ok(());
            }
            store.clear_log()?;
            println!("Scan log cleared.");
        }
        Command::Sync => {
            if let Err(e) = sync.send(&store.snapshot()).await {
                bail!("Failed to send data to backend: {}", e);
            }
            println!("Data successfully sent to backend.");
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
