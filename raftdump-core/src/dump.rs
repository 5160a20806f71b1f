//! Dump driver.
//!
//! Threads one set of options and one output stream through range
//! selection, classification, rendering, decoding and reporting.

use crate::decoder::StreamDecoder;
use crate::error::DumpError;
use crate::filter::Classifier;
use crate::options::DumpOptions;
use crate::range::read_entries;
use crate::raw::dump_raw;
use crate::render::{header, render_entry};
use crate::report::Reporter;
use std::io::Write;

/// Outcome of a finished dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpSummary {
    /// Entries read from the WAL (records, in raw mode).
    pub entries: usize,
    /// Entries that matched a filter.
    pub matched: u64,
    pub last_index: Option<u64>,
}

/// State of one dump run.
pub struct DumpContext<W: Write> {
    options: DumpOptions,
    out: W,
}

impl<W: Write> DumpContext<W> {
    /// Validates the options before anything is read.
    pub fn new(options: DumpOptions, out: W) -> Result<Self, DumpError> {
        options.validate()?;
        Ok(Self { options, out })
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    /// Returns the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn run(&mut self) -> Result<DumpSummary, DumpError> {
        if self.options.raw {
            let records = dump_raw(&self.options.wal_dir(), self.options.start_index, &mut self.out)?;
            self.out.flush()?;
            return Ok(DumpSummary {
                entries: records,
                ..Default::default()
            });
        }

        let contents = read_entries(&self.options, &mut self.out)?;
        let mut reporter = Reporter::new(self.options.entry_types.clone());
        reporter.write_totals(&mut self.out, &contents.entries)?;

        let command = self.options.decoder_command().map(str::to_string);
        writeln!(self.out, "{}", header(command.is_some()))?;

        let classifier = Classifier::from_entry_types(&self.options.entry_types);
        let mut decoder = command.as_deref().map(StreamDecoder::spawn).transpose()?;

        for entry in &contents.entries {
            let Some(view) = classifier.classify(entry) else {
                continue;
            };
            reporter.record();

            let line = render_entry(entry, &view);
            match decoder.as_mut() {
                Some(decoder) => {
                    write!(self.out, "{}", line)?;
                    let decoded = decoder.decode(entry.index, &view.decoder_payload(entry))?;
                    writeln!(self.out, "\t{}\t{}", decoded.status, decoded.data)?;
                }
                None => writeln!(self.out, "{}", line)?,
            }
        }

        if let Some(decoder) = decoder.take() {
            if let Some(stderr) = decoder.finish()? {
                tracing::warn!("decoder stderr: {}", stderr);
            }
        }

        reporter.write_summary(&mut self.out)?;
        self.out.flush()?;

        Ok(DumpSummary {
            entries: contents.entries.len(),
            matched: reporter.matched(),
            last_index: contents.last_index(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raftdump_protocol::{ConfChange, ConfChangeType, Entry, HardState, Metadata};
    use raftdump_wal::WalWriter;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_wal(data_dir: &Path, entries: &[Entry]) {
        let mut writer =
            WalWriter::create(data_dir.join("member/wal"), &Metadata::new(1, 0x10)).unwrap();
        writer.save_entries(entries).unwrap();
        writer
            .save_state(&HardState {
                term: 1,
                vote: 1,
                commit: entries.len() as u64,
            })
            .unwrap();
        writer.sync().unwrap();
    }

    fn sample_entries() -> Vec<Entry> {
        let cc = ConfChange::new(ConfChangeType::ConfChangeAddNode, 1);
        vec![
            Entry::conf_change(1, 1, cc.encode().unwrap()),
            Entry::normal(1, 2, Vec::<u8>::new()),
            Entry::normal(1, 3, r#"{"put":{"key":"k","value":"v"}}"#),
            Entry::normal(1, 4, r#"{"delete_range":{"key":"k"}}"#),
            Entry::normal(1, 5, r#"{"method":"QGET","path":"/x"}"#),
            Entry::normal(1, 6, &b"\x01\x02"[..]),
        ]
    }

    fn run(opts: DumpOptions) -> (String, DumpSummary) {
        let mut ctx = DumpContext::new(opts, Vec::new()).unwrap();
        let summary = ctx.run().unwrap();
        (String::from_utf8(ctx.into_inner()).unwrap(), summary)
    }

    #[test]
    fn test_empty_log_without_snapshot() {
        let dir = TempDir::new().unwrap();
        write_wal(dir.path(), &[]);

        let (out, summary) = run(DumpOptions::new(dir.path()));

        assert!(out.starts_with("Snapshot:\nempty\n"));
        assert!(out.contains("WAL entries: 0\n"));
        assert!(!out.contains("lastIndex="));
        assert!(out.ends_with("\nEntry types (Normal,ConfigChange) count is : 0\n"));
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.last_index, None);
    }

    #[test]
    fn test_default_dump() {
        let dir = TempDir::new().unwrap();
        write_wal(dir.path(), &sample_entries());

        let (out, summary) = run(DumpOptions::new(dir.path()));

        let expected_rows = "\
term\t     index\ttype\tdata
   1\t         1\tconf\tmethod=ConfChangeAddNode id=1
   1\t         2\tnorm\t{}
   1\t         3\tnorm\t{\"put\":{\"key\":\"k\",\"value\":\"v\"}}
   1\t         4\tnorm\t{\"delete_range\":{\"key\":\"k\"}}
   1\t         5\tnorm\tmethod=QGET path=\"/x\"
   1\t         6\tnorm\t???

Entry types (Normal,ConfigChange) count is : 6
";
        assert!(out.contains("WAL entries: 6\nlastIndex=6\n"));
        assert!(out.ends_with(expected_rows), "unexpected output:\n{}", out);
        assert_eq!(summary.matched, 6);
        assert_eq!(summary.entries, 6);
    }

    #[test]
    fn test_irr_put_filter() {
        let dir = TempDir::new().unwrap();
        write_wal(dir.path(), &sample_entries());

        let (out, summary) = run(DumpOptions::new(dir.path()).with_entry_types("IRRPut"));

        assert_eq!(summary.matched, 1);
        assert!(out.contains("\tnorm\t{\"put\""));
        assert!(!out.contains("delete_range"));
        assert!(out.ends_with("Entry types (IRRPut) count is : 1\n"));
    }

    #[test]
    fn test_end_index() {
        let dir = TempDir::new().unwrap();
        write_wal(dir.path(), &sample_entries());

        let (out, summary) = run(DumpOptions::new(dir.path()).with_end_index(3));

        assert_eq!(summary.entries, 2);
        assert!(out.contains("lastIndex=2\n"));
        assert!(!out.contains("\t         3\t"));
    }

    #[test]
    fn test_invalid_options_fail_before_io() {
        let opts = DumpOptions::new("/nonexistent")
            .with_start_index(1)
            .with_start_snapshot("a.snap");
        assert!(DumpContext::new(opts, Vec::new()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_columns() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write_wal(dir.path(), &sample_entries());

        let script = dir.path().join("echo.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nwhile read -r line; do echo \"pass|$line\"; done\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let entries = sample_entries();
        let (out, summary) = run(
            DumpOptions::new(dir.path()).with_stream_decoder(script.to_str().unwrap()),
        );

        assert_eq!(summary.matched, 6);
        assert!(out.contains("type\tdata\tdecoder_status\tdecoded_data\n"));
        for entry in &entries {
            let suffix = format!("\tpass\t{}\n", hex::encode(&entry.data));
            assert!(out.contains(&suffix), "missing {:?} in\n{}", suffix, out);
        }
    }
}
