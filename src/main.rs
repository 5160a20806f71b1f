//! raftdump - offline dump of a raft member's log
//!
//! Prints the WAL entries of one member, optionally starting from a
//! snapshot, filtered by entry type and re-decoded by an external tool.

use clap::Parser;
use colored::Colorize;
use raftdump_core::{DumpContext, DumpOptions, DEFAULT_ENTRY_TYPES};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "raftdump")]
#[command(about = "Dump the raft log of one member, offline")]
#[command(version)]
struct Cli {
    /// Member data directory
    data_dir: PathBuf,

    /// The base name of the snapshot file to start dumping from
    #[arg(long = "start-snap")]
    start_snap: Option<String>,

    /// WAL directory (default: <data-dir>/member/wal)
    #[arg(long, env = "RAFTDUMP_WAL_DIR")]
    wal_dir: Option<PathBuf>,

    /// The index to start dumping from (inclusive)
    #[arg(long)]
    start_index: Option<u64>,

    /// The index to stop dumping at (exclusive)
    #[arg(long)]
    end_index: Option<u64>,

    /// Comma-separated entry types to print: ConfigChange, Normal, Request,
    /// InternalRaftRequest, IRRRange, IRRPut, IRRDeleteRange, IRRTxn,
    /// IRRCompaction, IRRLeaseGrant, IRRLeaseRevoke, IRRLeaseCheckpoint
    #[arg(long, env = "RAFTDUMP_ENTRY_TYPE", default_value = DEFAULT_ENTRY_TYPES)]
    entry_type: String,

    /// Executable that reads hex-encoded payload lines on stdin and answers
    /// each with one `<status>|<data>` line
    #[arg(long, env = "RAFTDUMP_STREAM_DECODER")]
    stream_decoder: Option<String>,

    /// List the raw WAL frames instead of classified entries
    #[arg(long)]
    raw: bool,
}

impl Cli {
    fn into_options(self) -> DumpOptions {
        let mut opts = DumpOptions::new(self.data_dir)
            .with_entry_types(self.entry_type)
            .with_raw(self.raw);
        if let Some(dir) = self.wal_dir {
            opts = opts.with_wal_dir(dir);
        }
        if let Some(name) = self.start_snap {
            opts = opts.with_start_snapshot(name);
        }
        if let Some(index) = self.start_index {
            opts = opts.with_start_index(index);
        }
        if let Some(index) = self.end_index {
            opts = opts.with_end_index(index);
        }
        if let Some(command) = self.stream_decoder {
            opts = opts.with_stream_decoder(command);
        }
        opts
    }
}

fn main() {
    // Logs go to stderr; stdout carries the dump
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Cli::parse().into_options();
    let stdout = std::io::stdout();

    let result = DumpContext::new(opts, stdout.lock()).and_then(|mut ctx| ctx.run());
    match result {
        Ok(summary) => tracing::debug!(
            "Dumped {} entries, {} matched",
            summary.entries,
            summary.matched
        ),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
