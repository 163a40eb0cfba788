//! easync - drive an ActiveSync account from the command line
//!
//! # Commands
//!
//! - `check` - Verify server settings and credentials
//! - `folders` - Refresh and list the folder hierarchy
//! - `sync` - Sync one folder
//! - `download` - Fetch the full body of a partially downloaded message
//! - `more` - Widen a folder's sync window
//! - `send` - Send an RFC 822 file

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use eas::{
    Backend, BackendStorage, CancelToken, DefaultPolicyManager, DownloadOutcome, EasBackend, EasConfig,
    OutgoingMessage, SqliteBackendStorage, SyncedMessage, with_retry,
};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Database filename in the easync config directory
const DB_FILE: &str = "easync.db";

/// ActiveSync sync client
#[derive(Parser)]
#[command(name = "easync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite sync database
    #[arg(global = true, long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify server settings and credentials
    Check,

    /// Refresh and list the folder hierarchy
    Folders,

    /// Sync one folder
    Sync {
        /// Folder server id
        folder: String,
    },

    /// Fetch the full body of a partially downloaded message
    Download {
        /// Folder server id
        folder: String,
        /// Message server id
        message: String,
    },

    /// Widen a folder's sync window by one step
    More {
        /// Folder server id
        folder: String,
    },

    /// Send an RFC 822 message file
    Send {
        /// Path to the .eml file
        file: PathBuf,
    },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Bootstrap config directory
    config::init()?;

    let mut settings = EasConfig::load()?;
    if settings.ensure_device_id() {
        settings.save()?;
        info!("Generated device id for {}", settings.account.email);
    }

    let db_path = match cli.db {
        Some(path) => path,
        None => config::config_path(DB_FILE).context("Could not determine config directory")?,
    };
    let storage = Arc::new(SqliteBackendStorage::new(&db_path)?);
    let backend = EasBackend::from_config(&settings, storage.clone(), Arc::new(DefaultPolicyManager))?;
    let retry = &settings.retry;
    let cancel = CancelToken::new();

    match cli.command {
        Commands::Check => {
            with_retry(retry, || backend.check_incoming_server_settings())?;
            println!("Server settings OK");
        }
        Commands::Folders => {
            if !with_retry(retry, || backend.refresh_folder_list(&cancel))? {
                bail!("Folder sync failed; see log for details");
            }
            for folder in storage.get_folders()? {
                println!("{:<24} {:<8} {}", folder.server_id, folder.role.as_str(), folder.display_name);
            }
        }
        Commands::Sync { folder } => {
            let mut downloaded = 0usize;
            let mut listener = |_folder: &str, message: &SyncedMessage| {
                downloaded += 1;
                println!("{}  {}", message.server_id, message.subject.as_deref().unwrap_or("(no subject)"));
            };
            let stats = with_retry(retry, || backend.sync(&folder, &mut listener, &cancel))?;
            println!(
                "{} added, {} removed, {} flag changes, {} partial ({} reported)",
                stats.messages_added, stats.messages_removed, stats.flags_changed, stats.partial_messages, downloaded
            );
        }
        Commands::Download { folder, message } => {
            match with_retry(retry, || backend.download_message(&folder, &message, &cancel))? {
                DownloadOutcome::AlreadyComplete => println!("{} is already complete", message),
                DownloadOutcome::Downloaded(m) => {
                    println!("Downloaded {} ({} bytes)", m.server_id, m.mime.map_or(0, |b| b.len()))
                }
                DownloadOutcome::Discarded => println!("{} is gone from the server", message),
            }
        }
        Commands::More { folder } => {
            if backend.increase_sync_window(&folder)? {
                println!("Sync window for {} is now {:?}", folder, backend.get_sync_window(&folder)?);
            } else {
                println!("{} already syncs all messages", folder);
            }
        }
        Commands::Send { file } => {
            let mime = std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let message = OutgoingMessage::new(mime);
            with_retry(retry, || backend.send_message(&message))?;
            println!("Sent {}", file.display());
        }
    }
    Ok(())
}
