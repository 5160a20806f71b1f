//! External stream decoder.
//!
//! The decoder is a long-lived child process. For every entry it receives
//! one line on stdin, the hex-encoded payload, and must answer with exactly
//! one line `<status>|<data>` on stdout before the next entry is sent.

use crate::error::DumpError;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

/// Status used when a response line carries no delimiter.
pub const FORMAT_WARNING: &str = "decoder output format is not right, print output anyway";

/// Appended to the status when the data itself contained the delimiter.
pub const DELIMITER_WARNING: &str = "(*WARNING: data might contain the delimiter used by raftdump)";

const DELIMITER: char = '|';

/// One parsed decoder response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOutput {
    pub status: String,
    pub data: String,
}

/// Splits a response line into status and data.
pub fn parse_decoder_output(line: &str) -> DecoderOutput {
    let line = line.trim_end_matches(['\n', '\r']);

    match line.split_once(DELIMITER) {
        None => DecoderOutput {
            status: FORMAT_WARNING.to_string(),
            data: line.to_string(),
        },
        Some((status, data)) if data.contains(DELIMITER) => DecoderOutput {
            status: format!("{}{}", status, DELIMITER_WARNING),
            data: data.replace(DELIMITER, ""),
        },
        Some((status, data)) => DecoderOutput {
            status: status.to_string(),
            data: data.to_string(),
        },
    }
}

/// A running decoder process.
///
/// Dropping an unfinished decoder kills the child and reaps it.
#[derive(Debug)]
pub struct StreamDecoder {
    command: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<io::Result<String>>>,
    finished: bool,
}

impl StreamDecoder {
    /// Starts the decoder. The command line is split on whitespace.
    pub fn spawn(command: &str) -> Result<Self, DumpError> {
        let spawn_error = |source: io::Error| DumpError::DecoderSpawn {
            command: command.to_string(),
            source,
        };

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            spawn_error(io::Error::new(io::ErrorKind::InvalidInput, "empty command"))
        })?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let missing = |name: &str| {
            spawn_error(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} not captured", name),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        // stderr is drained on its own thread until the child closes it
        let stderr = std::thread::spawn(move || {
            let mut buf = String::new();
            BufReader::new(stderr).read_to_string(&mut buf)?;
            Ok(buf)
        });

        tracing::debug!("Started stream decoder '{}' (pid {})", command, child.id());

        Ok(Self {
            command: command.to_string(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            stderr: Some(stderr),
            finished: false,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Sends one payload and waits for its response line.
    pub fn decode(&mut self, index: u64, payload: &[u8]) -> Result<DecoderOutput, DumpError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DumpError::DecoderIo(io::Error::from(io::ErrorKind::BrokenPipe)))?;
        writeln!(stdin, "{}", hex::encode(payload)).map_err(DumpError::DecoderIo)?;
        stdin.flush().map_err(DumpError::DecoderIo)?;

        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .map_err(DumpError::DecoderIo)?;
        // a fragment without its newline means the decoder closed stdout mid-response
        if n == 0 || !line.ends_with('\n') {
            return Err(DumpError::DecoderEof { index });
        }

        Ok(parse_decoder_output(&line))
    }

    /// Closes the decoder's input and waits for it to exit.
    ///
    /// Returns whatever the decoder wrote to stderr, if anything.
    pub fn finish(mut self) -> Result<Option<String>, DumpError> {
        drop(self.stdin.take());
        let status = self.child.wait().map_err(DumpError::DecoderIo)?;
        self.finished = true;

        let stderr = match self.stderr.take().map(|handle| handle.join()) {
            Some(Ok(Ok(text))) => text,
            Some(Ok(Err(e))) => return Err(DumpError::DecoderIo(e)),
            Some(Err(_)) | None => String::new(),
        };

        tracing::debug!("Stream decoder '{}' exited with {}", self.command, status);

        if !status.success() {
            return Err(DumpError::DecoderExit(status));
        }

        let stderr = stderr.trim_end();
        Ok((!stderr.is_empty()).then(|| stderr.to_string()))
    }
}

impl Drop for StreamDecoder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        if let Err(e) = self.child.kill() {
            tracing::debug!("Failed to kill stream decoder: {}", e);
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_fields() {
        assert_eq!(
            parse_decoder_output("ok|ABCD\n"),
            DecoderOutput {
                status: "ok".to_string(),
                data: "ABCD".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_bare_line() {
        let out = parse_decoder_output("ABCD");
        assert_eq!(out.status, FORMAT_WARNING);
        assert_eq!(out.data, "ABCD");
    }

    #[test]
    fn test_parse_extra_delimiters() {
        let out = parse_decoder_output("ok|AB|CD\r\n");
        assert_eq!(out.status, format!("ok{}", DELIMITER_WARNING));
        assert!(out.status.starts_with("ok(*WARNING"));
        assert_eq!(out.data, "ABCD");
    }

    #[test]
    fn test_parse_empty_fields() {
        let out = parse_decoder_output("|");
        assert_eq!(out.status, "");
        assert_eq!(out.data, "");

        let out = parse_decoder_output("");
        assert_eq!(out.status, FORMAT_WARNING);
        assert_eq!(out.data, "");
    }

    #[test]
    fn test_spawn_missing_program() {
        assert!(matches!(
            StreamDecoder::spawn("/nonexistent/raftdump-decoder --x"),
            Err(DumpError::DecoderSpawn { .. })
        ));
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_echo_round_trip() {
            let dir = TempDir::new().unwrap();
            let path = script(
                &dir,
                "echo.sh",
                "while read -r line; do echo \"pass|$line\"; done",
            );

            let payloads: [&[u8]; 3] = [b"hello", b"", b"\x00\xff"];
            let mut decoder = StreamDecoder::spawn(path.to_str().unwrap()).unwrap();
            for (i, payload) in payloads.iter().enumerate() {
                let out = decoder.decode(i as u64, payload).unwrap();
                assert_eq!(out.status, "pass");
                assert_eq!(out.data, hex::encode(payload));
            }
            assert_eq!(decoder.finish().unwrap(), None);
        }

        #[test]
        fn test_stderr_is_returned() {
            let dir = TempDir::new().unwrap();
            let path = script(
                &dir,
                "noisy.sh",
                "while read -r line; do echo \"ok|x\"; done; echo 'decoder done' >&2",
            );

            let mut decoder = StreamDecoder::spawn(path.to_str().unwrap()).unwrap();
            decoder.decode(1, b"a").unwrap();
            assert_eq!(decoder.finish().unwrap().as_deref(), Some("decoder done"));
        }

        #[test]
        fn test_early_exit_is_eof() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "quit.sh", "read -r line; exit 0");

            let mut decoder = StreamDecoder::spawn(path.to_str().unwrap()).unwrap();
            let err = decoder.decode(7, b"a").unwrap_err();
            assert!(matches!(err, DumpError::DecoderEof { index: 7 }));
        }

        #[test]
        fn test_unterminated_response_is_eof() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "trunc.sh", "read -r line; printf 'ok|trunc'; exit 0");

            let mut decoder = StreamDecoder::spawn(path.to_str().unwrap()).unwrap();
            let err = decoder.decode(4, b"a").unwrap_err();
            assert!(matches!(err, DumpError::DecoderEof { index: 4 }));
        }

        #[test]
        fn test_nonzero_exit_is_fatal() {
            let dir = TempDir::new().unwrap();
            let path = script(
                &dir,
                "fail.sh",
                "while read -r line; do echo \"ok|x\"; done; exit 3",
            );

            let mut decoder = StreamDecoder::spawn(path.to_str().unwrap()).unwrap();
            decoder.decode(1, b"a").unwrap();
            assert!(matches!(decoder.finish(), Err(DumpError::DecoderExit(_))));
        }

        #[test]
        fn test_drop_kills_hung_decoder() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "hang.sh", "sleep 30");

            let decoder = StreamDecoder::spawn(path.to_str().unwrap()).unwrap();
            let start = std::time::Instant::now();
            drop(decoder);
            assert!(start.elapsed() < std::time::Duration::from_secs(10));
        }
    }
}
