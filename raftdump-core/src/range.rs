//! Range selection.
//!
//! Picks the resume point (explicit start index or snapshot), reads the WAL
//! after it and drops entries at or past the end index.

use crate::error::DumpError;
use crate::options::DumpOptions;
use raftdump_protocol::{format_ids, Entry, Metadata, NodeId, Snapshot, WalSnapshot};
use raftdump_storage::{Snapshotter, StorageError};
use raftdump_wal::{PartialRead, WalContents, WalReader};
use std::io::Write;

/// Reads the entries selected by `opts`, printing the startup lines.
pub fn read_entries<W: Write>(opts: &DumpOptions, out: &mut W) -> Result<WalContents, DumpError> {
    let start = resume_point(opts, out)?;

    let wal_dir = opts.wal_dir();
    let reader = WalReader::open_for_read(&wal_dir, start).map_err(DumpError::OpenWal)?;
    let mut contents = match reader.read_all() {
        Ok(contents) => contents,
        Err(partial) => tolerate(opts, partial)?,
    };

    let metadata = contents.metadata.unwrap_or_default();
    write_wal_metadata(out, &metadata, &contents)?;

    if let Some(end) = opts.end_index {
        trim_end(&mut contents.entries, end);
    }

    Ok(contents)
}

/// Resolves the position after which entries are read.
fn resume_point<W: Write>(opts: &DumpOptions, out: &mut W) -> Result<WalSnapshot, DumpError> {
    if let Some(start) = opts.start_index {
        writeln!(out, "Start dumping log entries from index {}.", start)?;
        // Entries are read after the resume index
        return Ok(WalSnapshot::new(start.saturating_sub(1), 0));
    }

    let loaded = match &opts.start_snapshot {
        Some(name) => Snapshotter::read(&opts.snap_dir().join(name)),
        None => Snapshotter::new(opts.snap_dir()).load(),
    };

    let start = match loaded {
        Ok(snapshot) => {
            write_snapshot(out, &snapshot)?;
            WalSnapshot::new(snapshot.metadata.index, snapshot.metadata.term)
        }
        Err(StorageError::NoSnapshot) => {
            writeln!(out, "Snapshot:\nempty")?;
            WalSnapshot::default()
        }
        Err(e) => return Err(DumpError::Snapshot(e)),
    };

    writeln!(out, "Start dumping log entries from snapshot.")?;
    Ok(start)
}

fn write_snapshot<W: Write>(out: &mut W, snapshot: &Snapshot) -> Result<(), DumpError> {
    let meta = &snapshot.metadata;
    let conf_state = serde_json::to_string(&meta.conf_state)
        .unwrap_or_else(|e| format!("confstate err: {}", e));
    writeln!(
        out,
        "Snapshot:\nterm={} index={} nodes={} confstate={}",
        meta.term,
        meta.index,
        format_ids(&meta.conf_state.voters),
        conf_state
    )?;
    Ok(())
}

/// Decides whether a failed read still yields usable entries.
///
/// A missing snapshot marker is expected when starting from an index. A
/// truncated tail is acceptable when only a prefix was asked for.
fn tolerate(opts: &DumpOptions, partial: PartialRead) -> Result<WalContents, DumpError> {
    let PartialRead { contents, source } = partial;

    if opts.start_index.is_some() && source.is_snapshot_not_found() {
        return Ok(contents);
    }

    if opts.end_index.is_some() && source.is_slice_out_of_range() {
        tracing::warn!("Failed reading all WAL: {}", source);
        return Ok(contents);
    }

    Err(DumpError::ReadWal(source))
}

fn write_wal_metadata<W: Write>(
    out: &mut W,
    metadata: &Metadata,
    contents: &WalContents,
) -> Result<(), DumpError> {
    let state = &contents.state;
    writeln!(
        out,
        "WAL metadata:\nnodeID={} clusterID={} term={} commitIndex={} vote={}",
        metadata.node_id,
        metadata.cluster_id,
        state.term,
        state.commit,
        NodeId(state.vote)
    )?;
    Ok(())
}

/// Drops every entry with an index at or past `end`.
///
/// Indexes are not monotonic across a term change, so every entry is checked.
pub fn trim_end(entries: &mut Vec<Entry>, end: u64) {
    entries.retain(|e| e.index < end);
}
