//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use download_provider::record::{Destination, Visibility};

/// Track background downloads and browse them as documents.
///
/// Records live in a SQLite database. The scheduler decides which downloads
/// may (re)start; completed downloads are exposed as a read-only tree.
#[derive(Parser, Debug)]
#[command(name = "download-provider")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Database file (defaults to `db_path` from config, then ./downloads.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    pub offline: bool,

    /// Treat the active network as roaming
    #[arg(long, global = true)]
    pub roaming: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new download
    Add(AddArgs),

    /// Attach a request header to a download
    Header {
        id: i64,
        name: String,
        value: String,
    },

    /// Pause a download
    Pause { id: i64 },

    /// Resume a paused download
    Resume { id: i64 },

    /// Record that the current attempt started
    Start { id: i64 },

    /// Record a failed attempt (retryable unless --code is given)
    Fail {
        id: i64,

        /// Server Retry-After value (seconds or HTTP-date)
        #[arg(long, value_parser = parse_retry_after_arg)]
        retry_after: Option<String>,

        /// Terminal failure code (400-599)
        #[arg(long, value_parser = clap::value_parser!(u16).range(400..=599))]
        code: Option<u16>,
    },

    /// Record a successful transfer
    Complete {
        id: i64,

        /// Local path of the downloaded payload
        #[arg(long)]
        path: PathBuf,

        /// Payload size in bytes (defaults to the file size)
        #[arg(long)]
        total_bytes: Option<i64>,

        #[arg(long)]
        mime_type: Option<String>,
    },

    /// Evaluate every download once and report what should start
    Tick {
        /// Evaluation time in milliseconds since the epoch (defaults to now)
        #[arg(long)]
        now: Option<i64>,
    },

    /// Check whether one download should start now
    Check {
        id: i64,

        /// Treat the download as possibly active (restart semantics)
        #[arg(long)]
        restart: bool,
    },

    /// List rows of the document tree
    Query {
        #[arg(default_value = "roots")]
        path: String,
    },

    /// Write a completed download's contents to stdout
    Cat { path: String },

    /// Delete a download through the document tree
    Delete { path: String },
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    pub uri: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub mime_type: Option<String>,

    #[arg(long, value_enum, default_value_t = DestinationArg::External)]
    pub destination: DestinationArg,

    #[arg(long, value_enum, default_value_t = VisibilityArg::Visible)]
    pub visibility: VisibilityArg,

    /// Leave the download out of document listings
    #[arg(long)]
    pub hidden: bool,

    /// Create the download paused
    #[arg(long)]
    pub paused: bool,

    #[arg(long)]
    pub cookies: Option<String>,

    #[arg(long)]
    pub referer: Option<String>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Component notified on completion
    #[arg(long)]
    pub notify_package: Option<String>,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DestinationArg {
    External,
    Cache,
    CachePurgeable,
    CacheNoRoaming,
    File,
}

impl From<DestinationArg> for Destination {
    fn from(value: DestinationArg) -> Self {
        match value {
            DestinationArg::External => Self::External,
            DestinationArg::Cache => Self::CachePartition,
            DestinationArg::CachePurgeable => Self::CachePartitionPurgeable,
            DestinationArg::CacheNoRoaming => Self::CacheNoRoaming,
            DestinationArg::File => Self::FileUri,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisibilityArg {
    Visible,
    Notify,
    Hidden,
}

impl From<VisibilityArg> for Visibility {
    fn from(value: VisibilityArg) -> Self {
        match value {
            VisibilityArg::Visible => Self::Visible,
            VisibilityArg::Notify => Self::VisibleNotifyCompleted,
            VisibilityArg::Hidden => Self::Hidden,
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err(format!("expected NAME:VALUE, got {raw:?}"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Accepts delta-seconds or an HTTP-date; range handling happens later.
fn parse_retry_after_arg(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.parse::<i64>().is_ok() || httpdate::parse_http_date(value).is_ok() {
        Ok(value.to_string())
    } else {
        Err(format!("expected seconds or an HTTP-date, got {raw:?}"))
    }
}
