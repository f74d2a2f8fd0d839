use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Administrative CLI over a single-node Riptide storage engine.
#[derive(Debug, Parser)]
#[command(name = "riptide-cli", about = "Administrative CLI for the Riptide storage engine", version)]
pub struct Cli {
    /// Directory the node's WALs, region files, and manifest live under.
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// TOML config file, same shape as `config::RegionServerConfig`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Namespace the single region this CLI drives belongs to.
    #[arg(long, global = true, default_value = "default")]
    pub namespace: String,

    /// Table the single region this CLI drives belongs to.
    #[arg(long, global = true, default_value = "default")]
    pub table: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a row's value.
    Put { row: String, value: String },
    /// Read a row's current value.
    Get { row: String },
    /// Delete a row.
    Delete { row: String },
    /// Scan a row range (inclusive start, exclusive end); omit either bound for open-ended.
    Scan {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Force the memstore to disk.
    Flush,
    /// Run a compaction.
    Compact {
        #[arg(long)]
        major: bool,
    },
    /// Split the region at `key`.
    Split { key: String },
    /// Print region and cache status.
    Status,
    /// Enter interactive REPL mode (also the default with no subcommand).
    Repl,
}
