//! Match counting and summaries.

use raftdump_protocol::Entry;
use std::io::{self, Write};

/// Counts matched entries for one dump run.
#[derive(Debug, Clone)]
pub struct Reporter {
    entry_types: String,
    matched: u64,
}

impl Reporter {
    pub fn new(entry_types: impl Into<String>) -> Self {
        Self {
            entry_types: entry_types.into(),
            matched: 0,
        }
    }

    pub fn record(&mut self) {
        self.matched += 1;
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }

    /// Prints the number of entries read and the index of the last one.
    pub fn write_totals<W: Write>(&self, out: &mut W, entries: &[Entry]) -> io::Result<()> {
        writeln!(out, "WAL entries: {}", entries.len())?;
        if let Some(last) = entries.last() {
            writeln!(out, "lastIndex={}", last.index)?;
        }
        Ok(())
    }

    /// Prints the final match count.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "\nEntry types ({}) count is : {}",
            self.entry_types, self.matched
        )
    }
}
