use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ccl",
    about = "Carbon Credit Ledger: signed append-only ledger of carbon credits",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./ccl.toml when present)
    #[arg(short, long, global = true, env = "CCL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ledger data directory, overriding the configuration
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Append a raw JSON payload
    Add(AddArgs),
    /// Record a generation reading through the credit converter
    Record(RecordArgs),
    /// List ledger entries
    List(ListArgs),
    /// Show a single entry
    Show(ShowArgs),
    /// List entries and total credits for one device
    Device(DeviceArgs),
    /// Recheck every entry signature
    Verify,
    /// Show ledger and conversion statistics
    Stats,
    /// Export the full ledger as JSON
    Export(ExportArgs),
    /// Write a snapshot and reset the journal
    Checkpoint,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding the configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct AddArgs {
    /// JSON object to record, e.g. '{"deviceId":"sim-1","carbonCredits":5}'
    pub payload: String,
}

#[derive(Args)]
pub struct RecordArgs {
    pub device_id: String,
    pub kwh: f64,
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Show only the last N entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct DeviceArgs {
    pub device_id: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
