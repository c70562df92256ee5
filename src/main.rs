//! CLI entry point for the download provider.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use download_provider::documents::{DocumentConfig, DocumentProvider, StatusLabels};
use download_provider::network::{NetworkType, StaticConnectivity};
use download_provider::notify::TracingNotifier;
use download_provider::record::{Control, NotificationTarget, RecordFactory};
use download_provider::scheduler::{DownloadScheduler, SchedulerConfig, parse_retry_after};
use download_provider::store::{CompletedPayload, DownloadStore, NewDownload};
use download_provider::transfer::LocalFileEngine;
use download_provider::{Database, DatabaseOptions};
use serde::Serialize;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, VerbositySetting};
use cli::{AddArgs, Args, Command};

const DEFAULT_DB_FILE: &str = "downloads.db";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => app_config::load_file_config(path)?,
        None => app_config::load_default_file_config()?,
    };

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match (args.verbose, config.verbosity) {
            (0, Some(VerbositySetting::Quiet)) => "error",
            (0, Some(VerbositySetting::Verbose)) | (1, _) => "debug",
            (0, Some(VerbositySetting::Debug)) => "trace",
            (0, Some(VerbositySetting::Default) | None) => "info",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries JSON output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let db_path = args
        .db
        .clone()
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
    let options = database_options(&config);
    let db = Database::new_with_options(&db_path, &options)
        .await
        .with_context(|| format!("Failed to open database '{}'", db_path.display()))?;
    debug!(path = %db_path.display(), "database ready");

    let app = App::new(db.clone(), &args, &config);
    let result = app.run(args.command).await;
    db.close().await;
    result
}

fn database_options(config: &FileConfig) -> DatabaseOptions {
    let mut options = DatabaseOptions::default();
    if let Some(max_connections) = config.db_max_connections {
        options.max_connections = max_connections;
    }
    if let Some(busy_timeout_ms) = config.db_busy_timeout_ms {
        options.busy_timeout_ms = busy_timeout_ms;
    }
    options
}

fn connectivity(args: &Args, config: &FileConfig) -> StaticConnectivity {
    let available = !args.offline && config.network_available.unwrap_or(true);
    let roaming = args.roaming || config.network_roaming.unwrap_or(false);
    let network_type = if available {
        config.network_type.unwrap_or(NetworkType::Wifi)
    } else {
        NetworkType::None
    };
    StaticConnectivity {
        available,
        roaming,
        network_type,
    }
}

fn document_config(config: &FileConfig) -> DocumentConfig {
    let mut documents = DocumentConfig::default();
    if let Some(title) = &config.root_title {
        documents.root_title.clone_from(title);
    }
    let defaults = StatusLabels::default();
    documents.labels = StatusLabels {
        queued: config.label_queued.clone().unwrap_or(defaults.queued),
        running: config.label_running.clone().unwrap_or(defaults.running),
        error: config.label_error.clone().unwrap_or(defaults.error),
    };
    documents
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wired-up services for one CLI invocation.
struct App {
    store: DownloadStore,
    scheduler: DownloadScheduler,
    documents: DocumentProvider,
}

impl App {
    fn new(db: Database, args: &Args, config: &FileConfig) -> Self {
        let store = DownloadStore::new(db);
        let records = Arc::new(RecordFactory::new());
        let shared_store = Arc::new(store.clone());

        let scheduler_config = SchedulerConfig {
            base_delay: config
                .retry_base_delay_secs
                .map_or(SchedulerConfig::default().base_delay, i64::from),
        };
        let scheduler = DownloadScheduler::new(
            shared_store.clone(),
            Arc::new(connectivity(args, config)),
            Arc::new(TracingNotifier),
            records.clone(),
            scheduler_config,
        );

        let engine = Arc::new(LocalFileEngine::new(shared_store.clone(), records.clone()));
        let documents =
            DocumentProvider::new(shared_store, engine, records, document_config(config));

        Self {
            store,
            scheduler,
            documents,
        }
    }

    async fn run(&self, command: Command) -> Result<()> {
        let now = now_millis();
        match command {
            Command::Add(add) => {
                let id = self.store.insert(&new_download(add), now).await?;
                info!(id, "download added");
                print_json(&serde_json::json!({ "id": id }))
            }
            Command::Header { id, name, value } => {
                self.store.add_header(id, &name, &value).await?;
                print_json(&serde_json::json!({ "id": id, "header": name }))
            }
            Command::Pause { id } => {
                self.store.set_control(id, Control::Paused, now).await?;
                print_json(&serde_json::json!({ "id": id, "control": Control::Paused }))
            }
            Command::Resume { id } => {
                self.store.set_control(id, Control::Run, now).await?;
                print_json(&serde_json::json!({ "id": id, "control": Control::Run }))
            }
            Command::Start { id } => {
                self.store.mark_running(id, now).await?;
                print_json(&serde_json::json!({ "id": id, "status": "running" }))
            }
            Command::Fail {
                id,
                retry_after,
                code,
            } => {
                if let Some(code) = code {
                    self.store.mark_failed(id, code, now).await?;
                    print_json(&serde_json::json!({ "id": id, "status": code }))
                } else {
                    let retry_after = retry_after.as_deref().and_then(|value| {
                        let parsed = parse_retry_after(value, SystemTime::now());
                        if parsed.is_none() {
                            warn!(id, value, "Retry-After is negative or already past, ignoring");
                        }
                        parsed
                    });
                    self.store.mark_paused_for_retry(id, retry_after, now).await?;
                    print_json(&serde_json::json!({ "id": id, "retry_after": retry_after }))
                }
            }
            Command::Complete {
                id,
                path,
                total_bytes,
                mime_type,
            } => {
                let total_bytes = match total_bytes {
                    Some(bytes) => bytes,
                    None => {
                        let metadata = tokio::fs::metadata(&path).await.with_context(|| {
                            format!("Failed to read payload '{}'", path.display())
                        })?;
                        i64::try_from(metadata.len()).unwrap_or(-1)
                    }
                };
                let payload = CompletedPayload {
                    total_bytes,
                    file_path: path.to_string_lossy().into_owned(),
                    mime_type,
                };
                self.store.mark_success(id, &payload, now).await?;
                print_json(&serde_json::json!({ "id": id, "total_bytes": total_bytes }))
            }
            Command::Tick { now: at } => {
                let report = self.scheduler.tick(at.unwrap_or(now)).await?;
                print_json(&report)
            }
            Command::Check { id, restart } => {
                let ready = if restart {
                    self.scheduler.should_restart(id, now).await?
                } else {
                    self.scheduler.should_start(id, now).await?
                };
                print_json(&serde_json::json!({ "id": id, "ready": ready }))
            }
            Command::Query { path } => {
                let rows = self.documents.query(&path).await?;
                print_json(&rows)
            }
            Command::Cat { path } => {
                let handle = self.documents.open(&path, "r").await?;
                let mut file = handle.into_file();
                let mut stdout = tokio::io::stdout();
                tokio::io::copy(&mut file, &mut stdout).await?;
                tokio::io::AsyncWriteExt::flush(&mut stdout).await?;
                Ok(())
            }
            Command::Delete { path } => {
                self.documents.delete(&path).await?;
                print_json(&serde_json::json!({ "deleted": path }))
            }
        }
    }
}

fn new_download(add: AddArgs) -> NewDownload {
    let mut download = NewDownload::new(add.uri);
    download.destination = add.destination.into();
    download.visibility = add.visibility.into();
    if add.paused {
        download.control = Control::Paused;
    }
    download.visible_in_ui = !add.hidden;
    download.title = add.title;
    download.description = add.description;
    download.mime_type = add.mime_type;
    download.cookies = add.cookies;
    download.referer = add.referer;
    download.user_agent = add.user_agent;
    download.notification_target = add.notify_package.map(|package| NotificationTarget {
        package,
        class: None,
        extras: None,
    });
    download.headers = add.headers;
    download
}
