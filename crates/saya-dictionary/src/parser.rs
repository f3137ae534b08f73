//! Streaming extraction of the elements of a top-level JSON array of arrays.
//!
//! Bank files can run to hundreds of megabytes, so the file is never loaded
//! whole and no document tree is built. A bracket-depth counter plus a
//! string-literal flag walk the bytes; each depth-2 element is buffered on
//! its own, parsed, and handed to the caller in batches.
//!
//! The scan works on raw UTF-8 bytes: `"`, `\`, `[` and `]` are ASCII and
//! never occur inside a multi-byte sequence.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::mem;
use std::ops::ControlFlow;
use std::path::Path;

use serde_json::Value;

use crate::error::ParseError;

const STREAM_BUFFER_BYTES: usize = 256 * 1024;
const FALLBACK_CHUNK_BYTES: usize = 64 * 1024;
const LARGE_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Position of the scan within the file, passed along with every batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProgress {
    pub bytes_read: u64,
    pub total_bytes: u64,
}

impl ParseProgress {
    /// Fraction of the file consumed, 0.0..=1.0
    pub fn fraction(&self) -> f32 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_read as f64 / self.total_bytes as f64).min(1.0) as f32
    }
}

pub struct StreamingArrayParser {
    batch_size: usize,
}

impl StreamingArrayParser {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Stream `path`, calling `handler` with at most `batch_size` parsed
    /// elements at a time. Returns the number of records delivered.
    ///
    /// Malformed elements are logged and skipped. If buffered streaming hits
    /// an I/O error the file is re-scanned in fixed-size chunks with a
    /// smaller batch size, resuming after the last delivered batch.
    pub fn process_array_file<F>(&self, path: &Path, mut handler: F) -> Result<usize, ParseError>
    where
        F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
    {
        let label = file_label(path);
        let total_bytes = std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|source| ParseError::Io {
                file: label.clone(),
                source,
            })?;

        let mut scanner = ArrayScanner::new(self.batch_size, total_bytes, &label);
        let err = match scan_buffered(path, &mut scanner, &mut handler) {
            Ok(flow) => return scanner.outcome(flow),
            Err(err) => err,
        };

        let batch_size = fallback_batch_size(self.batch_size, total_bytes);
        tracing::warn!(
            "[PARSER] Streaming {} failed after {} records ({}), retrying in {} byte chunks with batch size {}",
            label,
            scanner.delivered,
            err,
            FALLBACK_CHUNK_BYTES,
            batch_size
        );

        let mut fallback = scanner.resume(batch_size);
        match scan_chunked(path, &mut fallback, &mut handler) {
            Ok(flow) => fallback.outcome(flow),
            Err(source) => Err(ParseError::Io {
                file: label,
                source,
            }),
        }
    }
}

/// Convenience wrapper over [`StreamingArrayParser::process_array_file`]
pub fn process_array_file<F>(path: &Path, batch_size: usize, handler: F) -> Result<usize, ParseError>
where
    F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
{
    StreamingArrayParser::new(batch_size).process_array_file(path, handler)
}

/// Smaller batches on the degraded path, smallest for very large files
pub fn fallback_batch_size(batch_size: usize, total_bytes: u64) -> usize {
    if total_bytes > LARGE_FILE_BYTES {
        (batch_size / 4).max(1)
    } else {
        (batch_size / 2).max(1)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn scan_buffered<F>(path: &Path, scanner: &mut ArrayScanner, handler: &mut F) -> io::Result<ControlFlow<()>>
where
    F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
{
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(STREAM_BUFFER_BYTES, file);

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let len = buf.len();
        let flow = scanner.feed(buf, handler);
        reader.consume(len);
        if flow.is_break() {
            return Ok(flow);
        }
    }

    Ok(scanner.finish(handler))
}

fn scan_chunked<F>(path: &Path, scanner: &mut ArrayScanner, handler: &mut F) -> io::Result<ControlFlow<()>>
where
    F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
{
    let mut file = File::open(path)?;
    let mut chunk = vec![0u8; FALLBACK_CHUNK_BYTES];

    loop {
        let n = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if scanner.feed(&chunk[..n], handler).is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }

    Ok(scanner.finish(handler))
}

/// Bracket/string state machine plus the pending batch
struct ArrayScanner {
    label: String,
    batch_size: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    element: Vec<u8>,
    batch: Vec<Value>,
    /// Element ordinal, counting malformed ones
    elements_seen: usize,
    /// Elements below this ordinal were delivered by an earlier pass
    skip_until: usize,
    /// Ordinal boundary of the last flushed batch
    flushed_through: usize,
    delivered: usize,
    bytes_read: u64,
    total_bytes: u64,
}

impl ArrayScanner {
    fn new(batch_size: usize, total_bytes: u64, label: &str) -> Self {
        Self {
            label: label.to_string(),
            batch_size: batch_size.max(1),
            depth: 0,
            in_string: false,
            escaped: false,
            element: Vec::new(),
            batch: Vec::with_capacity(batch_size.max(1)),
            elements_seen: 0,
            skip_until: 0,
            flushed_through: 0,
            delivered: 0,
            bytes_read: 0,
            total_bytes,
        }
    }

    /// Fresh scan state that skips what this pass already delivered
    fn resume(&self, batch_size: usize) -> Self {
        let mut next = Self::new(batch_size, self.total_bytes, &self.label);
        next.skip_until = self.flushed_through;
        next.delivered = self.delivered;
        next
    }

    fn feed<F>(&mut self, bytes: &[u8], handler: &mut F) -> ControlFlow<()>
    where
        F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
    {
        for &byte in bytes {
            self.bytes_read += 1;

            if self.in_string {
                if self.depth >= 2 {
                    self.element.push(byte);
                }
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => {
                    self.in_string = true;
                    if self.depth >= 2 {
                        self.element.push(byte);
                    }
                }
                b'[' => {
                    self.depth += 1;
                    if self.depth >= 2 {
                        self.element.push(byte);
                    }
                }
                b']' => {
                    if self.depth >= 2 {
                        self.element.push(byte);
                    }
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 1 && self.complete_element(handler).is_break() {
                        return ControlFlow::Break(());
                    }
                }
                _ => {
                    if self.depth >= 2 {
                        self.element.push(byte);
                    }
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn complete_element<F>(&mut self, handler: &mut F) -> ControlFlow<()>
    where
        F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
    {
        let ordinal = self.elements_seen;
        self.elements_seen += 1;
        let raw = mem::take(&mut self.element);

        if ordinal < self.skip_until {
            return ControlFlow::Continue(());
        }

        match serde_json::from_slice::<Value>(&raw) {
            Ok(value) => self.batch.push(value),
            Err(e) => {
                tracing::warn!(
                    "[PARSER] Skipping malformed element #{} in {}: {}",
                    ordinal,
                    self.label,
                    e
                );
            }
        }

        if self.batch.len() >= self.batch_size {
            return self.flush(handler);
        }
        ControlFlow::Continue(())
    }

    fn flush<F>(&mut self, handler: &mut F) -> ControlFlow<()>
    where
        F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
    {
        self.flushed_through = self.elements_seen;
        if self.batch.is_empty() {
            return ControlFlow::Continue(());
        }

        let batch = mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        self.delivered += batch.len();
        tracing::debug!(
            "[PARSER] Flushing {} records from {} ({} total)",
            batch.len(),
            self.label,
            self.delivered
        );

        handler(
            batch,
            ParseProgress {
                bytes_read: self.bytes_read,
                total_bytes: self.total_bytes,
            },
        )
    }

    fn finish<F>(&mut self, handler: &mut F) -> ControlFlow<()>
    where
        F: FnMut(Vec<Value>, ParseProgress) -> ControlFlow<()>,
    {
        if self.depth != 0 || self.in_string {
            tracing::warn!(
                "[PARSER] {} ended inside an unterminated array (depth {})",
                self.label,
                self.depth
            );
        }
        self.flush(handler)
    }

    fn outcome(&self, flow: ControlFlow<()>) -> Result<usize, ParseError> {
        match flow {
            ControlFlow::Continue(()) => Ok(self.delivered),
            ControlFlow::Break(()) => Err(ParseError::Interrupted {
                processed: self.delivered,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn collect(path: &Path, batch_size: usize) -> (usize, Vec<Value>, Vec<usize>) {
        let mut records = Vec::new();
        let mut sizes = Vec::new();
        let total = process_array_file(path, batch_size, |batch, _| {
            sizes.push(batch.len());
            records.extend(batch);
            ControlFlow::Continue(())
        })
        .unwrap();
        (total, records, sizes)
    }

    const SAMPLE: &str = r#"[
        ["単語", "たんご", "n", "", ["word", "vocabulary"], 1, "", ""],
        ["a]b", "", "", "", "contains [brackets], and \"quotes\"", 2],
        ["esc\\", "", "", "", "trailing backslash", 3],
        ["obj", "", "", "", [{"type": "structured-content", "content": ["x", "]"]}], 4]
    ]"#;

    #[test]
    fn test_batch_size_does_not_change_records() {
        let file = write_temp(SAMPLE);
        let (total_one, all_at_once, _) = collect(file.path(), 100);
        let (total_many, one_by_one, sizes) = collect(file.path(), 1);

        assert_eq!(total_one, 4);
        assert_eq!(total_many, 4);
        assert_eq!(all_at_once, one_by_one);
        assert_eq!(sizes, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_brackets_inside_strings_are_not_structural() {
        let file = write_temp(SAMPLE);
        let (_, records, _) = collect(file.path(), 10);

        assert_eq!(records[1][0], json!("a]b"));
        assert_eq!(records[1][4], json!("contains [brackets], and \"quotes\""));
        assert_eq!(records[2][0], json!("esc\\"));
        assert_eq!(records[3][4][0]["content"][1], json!("]"));
    }

    #[test]
    fn test_partial_batch_flushed_at_end() {
        let file = write_temp(SAMPLE);
        let (_, _, sizes) = collect(file.path(), 3);
        assert_eq!(sizes, vec![3, 1]);
    }

    #[test]
    fn test_malformed_element_is_skipped() {
        let file = write_temp(r#"[["ok", "a"], ["broken", tru], ["also ok", "b"]]"#);
        let (total, records, _) = collect(file.path(), 10);

        assert_eq!(total, 2);
        assert_eq!(records[0][0], json!("ok"));
        assert_eq!(records[1][0], json!("also ok"));
    }

    #[test]
    fn test_non_array_elements_are_ignored() {
        let file = write_temp(r#"[1, "loose", {"k": "[v]"}, ["kept"]]"#);
        let (total, records, _) = collect(file.path(), 10);

        assert_eq!(total, 1);
        assert_eq!(records[0], json!(["kept"]));
    }

    #[test]
    fn test_empty_and_non_array_files() {
        let empty = write_temp("[]");
        assert_eq!(collect(empty.path(), 10).0, 0);

        let object = write_temp(r#"{"title": "not an array"}"#);
        assert_eq!(collect(object.path(), 10).0, 0);
    }

    #[test]
    fn test_handler_break_interrupts() {
        let file = write_temp(SAMPLE);
        let result = process_array_file(file.path(), 2, |_, _| ControlFlow::Break(()));

        match result {
            Err(ParseError::Interrupted { processed }) => assert_eq!(processed, 2),
            other => panic!("expected interruption, got {:?}", other),
        }
    }

    #[test]
    fn test_progress_reaches_end_of_file() {
        let file = write_temp(SAMPLE);
        let mut last = None;
        process_array_file(file.path(), 10, |_, progress| {
            last = Some(progress);
            ControlFlow::Continue(())
        })
        .unwrap();

        let last = last.unwrap();
        assert_eq!(last.bytes_read, last.total_bytes);
        assert_eq!(last.fraction(), 1.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = process_array_file(Path::new("/nonexistent/term_bank_1.json"), 10, |_, _| {
            ControlFlow::Continue(())
        });
        assert!(matches!(result, Err(ParseError::Io { .. })));
    }

    #[test]
    fn test_resumed_scan_skips_delivered_records() {
        let file = write_temp(SAMPLE);
        let mut handler = |_: Vec<Value>, _: ParseProgress| ControlFlow::Continue(());

        // First pass delivers two records, then the stream "fails"
        let mut first = ArrayScanner::new(2, 0, "sample");
        let head = SAMPLE.find("[\"esc").unwrap();
        let _ = first.feed(&SAMPLE.as_bytes()[..head], &mut handler);
        assert_eq!(first.delivered, 2);

        let mut seen = Vec::new();
        let mut second = first.resume(1);
        let flow = scan_chunked(file.path(), &mut second, &mut |batch: Vec<Value>, _: ParseProgress| {
            seen.extend(batch);
            ControlFlow::Continue(())
        })
        .unwrap();

        assert!(flow.is_continue());
        assert_eq!(second.delivered, 4);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0][0], json!("esc\\"));
    }

    #[test]
    fn test_fallback_batch_size_shrinks_for_large_files() {
        assert_eq!(fallback_batch_size(1000, 10 * 1024 * 1024), 500);
        assert_eq!(fallback_batch_size(1000, 60 * 1024 * 1024), 250);
        assert_eq!(fallback_batch_size(1, 60 * 1024 * 1024), 1);
    }
}
