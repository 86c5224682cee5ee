//! Forward scan that finds where a log's tail window begins.
//!
//! The log is read once, front to back, in chunks of
//! [`ScanConfig::chunk_size`] bytes. Each chunk is folded into a
//! `ScanCursor` that records the marker seen most recently and, once the
//! scan reaches `file_len - tail_bytes` (the *target*), collects the bytes
//! from the target up to and including the next line terminator.
//!
//! # Invariants
//!
//! - At most one [`ShortlogStart`] per scan.
//! - The reported marker is the latest match (by file order) that begins at
//!   or before the target. Markers further on are never reported.
//! - Memory stays at one chunk plus the longest marker plus the captured line.
//!
//! # Chunk boundaries
//!
//! With [`ScanConfig::bridge_chunk_boundaries`] enabled (the default) the
//! cursor keeps the last `max_marker_len` bytes of each chunk and the
//! unmatched tail of the open line, so a marker or a multi-byte terminator
//! split across two reads is still found and results do not depend on the
//! chunk size. Disabled, matching only looks inside a single read.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use memchr::memmem;
use tracing::{debug, warn};

use crate::config::{ConfigError, ScanConfig};
use crate::marker::{MarkerSet, PreambleLocator, last_marker_in_chunk};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The first line of the tail window and the marker active where it begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortlogStart {
    /// Serialized marker active at the start of the line, if any.
    pub marker: Option<String>,
    /// Bytes from the target offset through the line terminator.
    pub line: Vec<u8>,
}

impl ShortlogStart {
    /// The captured line as text, replacing invalid UTF-8.
    #[must_use]
    pub fn line_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.line)
    }
}

/// Errors that abort a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The log could not be opened or its length read.
    #[error("cannot open log {}: {source}", path.display())]
    Open {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A read failed part way through the log.
    #[error("read failed after {offset} bytes: {source}")]
    Read {
        /// Bytes successfully consumed before the failure.
        offset: u64,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The scan configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Scan parameters fixed for the duration of one scan.
struct Window<'a, P: ?Sized> {
    /// File offset where the tail window begins.
    target: u64,
    eol: &'a [u8],
    candidates: &'a MarkerSet,
    preamble: &'a P,
    bridge: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveMarker {
    marker: String,
    offset: u64,
}

/// State threaded from one chunk to the next.
///
/// Each step consumes the cursor and returns either the next cursor or the
/// finished result, so no state outlives the scan that built it.
#[derive(Debug, Clone, Default)]
struct ScanCursor {
    /// Bytes consumed before the current chunk.
    bytes_read: u64,
    active: Option<ActiveMarker>,
    /// Bytes of the boundary line seen so far (no terminator yet).
    fragment: Vec<u8>,
    /// Trailing bytes of earlier chunks kept for marker matching.
    overlap: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Chunk folding
// ---------------------------------------------------------------------------

impl ScanCursor {
    /// Fold one chunk into the cursor.
    fn advance<P>(mut self, chunk: &[u8], window: &Window<'_, P>) -> ControlFlow<ShortlogStart, Self>
    where
        P: PreambleLocator + ?Sized,
    {
        self.track_markers(chunk, window);

        let chunk_end = self.bytes_read + chunk.len() as u64;
        if chunk_end >= window.target {
            let start = usize::try_from(window.target.saturating_sub(self.bytes_read))
                .map_or(chunk.len(), |start| start.min(chunk.len()));

            // Bytes already searched, less the ones a split terminator could
            // still begin in.
            let searched = if window.bridge {
                self.fragment.len().saturating_sub(window.eol.len() - 1)
            } else {
                self.fragment.len()
            };
            self.fragment.extend_from_slice(&chunk[start..]);

            if let Some(eol) = memmem::find(&self.fragment[searched..], window.eol) {
                let end = searched + eol + window.eol.len();
                self.fragment.truncate(end);
                debug!(
                    target_offset = window.target,
                    line_len = end,
                    marker = self.active.as_ref().map(|active| active.offset),
                    "captured boundary line"
                );
                return ControlFlow::Break(ShortlogStart {
                    marker: self.active.map(|active| active.marker),
                    line: self.fragment,
                });
            }
        }

        self.bytes_read = chunk_end;
        ControlFlow::Continue(self)
    }

    /// Record the latest marker in `chunk` that begins at or before the target.
    fn track_markers<P>(&mut self, chunk: &[u8], window: &Window<'_, P>)
    where
        P: PreambleLocator + ?Sized,
    {
        if window.candidates.is_empty() {
            return;
        }

        let mut scan = if window.bridge {
            let mut joined = std::mem::take(&mut self.overlap);
            joined.extend_from_slice(chunk);
            joined
        } else {
            Vec::new()
        };
        let buf: &[u8] = if window.bridge { &scan } else { chunk };
        let base = self.bytes_read - (buf.len() - chunk.len()) as u64;

        // A buffer starting past the target cannot hold a reportable marker.
        if base <= window.target {
            let limit = usize::try_from(window.target - base).unwrap_or(usize::MAX);
            if let Some(hit) = last_marker_in_chunk(buf, limit, window.candidates, window.preamble) {
                let offset = base + hit.offset as u64;
                // `>=`: a re-scan of the overlap may see a longer candidate at
                // the same offset once more bytes are available.
                if self.active.as_ref().is_none_or(|active| offset >= active.offset) {
                    self.active = Some(ActiveMarker {
                        marker: hit.marker.to_string(),
                        offset,
                    });
                }
            }
        }

        if window.bridge {
            let keep_from = scan.len().saturating_sub(window.candidates.max_len());
            scan.drain(..keep_from);
            self.overlap = scan;
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan `reader` for the start of the tail window.
///
/// `file_len` is the total length of the log; the tail window begins at
/// `file_len - config.tail_bytes()`, or at the start of the log when the
/// window is larger than the log.
///
/// Returns `Ok(None)` when the log is empty, ends before the target, or has
/// no terminator after the target.
///
/// # Errors
///
/// Returns [`ScanError::Read`] on a read failure and [`ScanError::Config`]
/// for an unusable configuration.
pub fn find_shortlog_start<R, P>(
    mut reader: R,
    file_len: u64,
    candidates: &MarkerSet,
    preamble: &P,
    config: &ScanConfig,
) -> Result<Option<ShortlogStart>, ScanError>
where
    R: Read,
    P: PreambleLocator + ?Sized,
{
    config.validate()?;

    let window = Window {
        target: file_len.saturating_sub(config.tail_bytes()),
        eol: config.line_terminator.as_bytes(),
        candidates,
        preamble,
        bridge: config.bridge_chunk_boundaries,
    };
    debug!(
        file_len,
        target_offset = window.target,
        candidates = candidates.len(),
        chunk_size = config.chunk_size,
        "scanning log for tail window start"
    );

    let mut buf = vec![0u8; config.chunk_size];
    let mut cursor = ScanCursor::default();
    loop {
        let read = read_chunk(&mut reader, &mut buf).map_err(|source| ScanError::Read {
            offset: cursor.bytes_read,
            source,
        })?;
        if read == 0 {
            break;
        }
        cursor = match cursor.advance(&buf[..read], &window) {
            ControlFlow::Continue(next) => next,
            ControlFlow::Break(found) => return Ok(Some(found)),
        };
    }

    debug!(bytes_read = cursor.bytes_read, "no boundary line before end of log");
    Ok(None)
}

/// Open `path` and scan it with [`find_shortlog_start`].
///
/// # Errors
///
/// Returns [`ScanError::Open`] if the file cannot be opened or measured, and
/// any error from [`find_shortlog_start`].
pub fn scan_file<P>(
    path: &Path,
    candidates: &MarkerSet,
    preamble: &P,
    config: &ScanConfig,
) -> Result<Option<ShortlogStart>, ScanError>
where
    P: PreambleLocator + ?Sized,
{
    let open_err = |source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_err)?;
    let file_len = file.metadata().map_err(open_err)?.len();
    find_shortlog_start(file, file_len, candidates, preamble, config)
}

/// Like [`scan_file`], but never fails: errors are logged and reported as
/// no result.
pub fn locate_shortlog_start<P>(
    path: &Path,
    candidates: &MarkerSet,
    preamble: &P,
    config: &ScanConfig,
) -> Option<ShortlogStart>
where
    P: PreambleLocator + ?Sized,
{
    match scan_file(path, candidates, preamble, config) {
        Ok(found) => found,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot search log for markers");
            None
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn at_sign(buf: &[u8], from: usize) -> Option<usize> {
        buf.get(from..)?.iter().position(|&b| b == b'@').map(|i| i + from)
    }

    fn config(tail_kb: u32, chunk_size: usize) -> ScanConfig {
        ScanConfig {
            tail_kb,
            chunk_size,
            line_terminator: "\n".into(),
            bridge_chunk_boundaries: true,
        }
    }

    fn scan(log: &[u8], markers: &[&str], config: &ScanConfig) -> Option<ShortlogStart> {
        let set = MarkerSet::new(markers.iter().copied());
        find_shortlog_start(Cursor::new(log), log.len() as u64, &set, &at_sign, config).unwrap()
    }

    /// `len` bytes of filler lines, each `width` bytes including `\n`.
    fn filler(len: usize, width: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let line_len = width.min(len - out.len());
            out.extend(std::iter::repeat_n(b'.', line_len - 1));
            out.push(b'\n');
        }
        out
    }

    struct FailAfter {
        inner: Cursor<Vec<u8>>,
        remaining: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other("disk on fire"));
            }
            let limit = buf.len().min(self.remaining);
            let n = self.inner.read(&mut buf[..limit])?;
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn empty_log_has_no_result() {
        assert!(scan(b"", &["@a"], &config(1, 16)).is_none());
    }

    #[test]
    fn short_log_returns_first_line() {
        let found = scan(b"@a first\nsecond\n", &["@a"], &config(1, 4)).unwrap();
        assert_eq!(found.line, b"@a first\n");
        assert_eq!(found.marker.as_deref(), Some("@a"));
    }

    #[test]
    fn no_candidates_still_yields_line() {
        let found = scan(b"one\ntwo\n", &[], &config(1, 4)).unwrap();
        assert_eq!(found.line, b"one\n");
        assert!(found.marker.is_none());
    }

    #[test]
    fn zero_tail_finds_nothing() {
        assert!(scan(b"one\ntwo\n", &["@a"], &config(0, 4)).is_none());
        assert!(scan(b"one\ntwo", &["@a"], &config(0, 4)).is_none());
    }

    #[test]
    fn unterminated_tail_finds_nothing() {
        let mut log = filler(2048, 64);
        log.extend_from_slice(&[b'x'; 1500]);
        assert!(scan(&log, &[], &config(1, 256)).is_none());
    }

    #[test]
    fn line_starts_at_target_offset() {
        // 3 KiB of 64-byte lines, tail 1 KiB: target 2048 is a line start.
        let mut log = filler(3072, 64);
        let found = scan(&log, &[], &config(1, 500)).unwrap();
        assert_eq!(found.line, &log[2048..2112]);

        // Ten more bytes move the target ten bytes into that line; the
        // captured text runs from the target to the line's terminator.
        log.extend_from_slice(b"123456789\n");
        let found = scan(&log, &[], &config(1, 500)).unwrap();
        assert_eq!(found.line, &log[2058..2112]);
    }

    #[test]
    fn marker_after_target_is_not_reported() {
        // 10 000 bytes, "@m1" at 100, "@m2" at 9 500, target 8 976.
        let mut log = filler(100, 50);
        log.extend(b"@m1 start\n");
        log.extend(filler(9500 - log.len(), 50));
        log.extend(b"@m2 late\n");
        log.extend(filler(10_000 - log.len(), 50));
        assert_eq!(log.len(), 10_000);
        let found = scan(&log, &["@m1", "@m2"], &config(1, 16 * 1024)).unwrap();
        assert_eq!(found.marker.as_deref(), Some("@m1"));
    }

    #[test]
    fn later_marker_before_target_wins_within_one_chunk() {
        let mut log = b"@m1 start\n".to_vec();
        log.extend(filler(5000, 50));
        log.extend(b"@m2 middle\n");
        log.extend(filler(3000, 50));
        let found = scan(&log, &["@m1", "@m2"], &config(1, 64 * 1024)).unwrap();
        assert_eq!(found.marker.as_deref(), Some("@m2"));
    }

    #[test]
    fn marker_at_target_counts() {
        let mut log = filler(1024, 64);
        log.extend(b"@m1 at the boundary\n");
        log.extend(filler(1024 - 20, 64));
        let found = scan(&log, &["@m1"], &config(1, 100)).unwrap();
        assert_eq!(found.marker.as_deref(), Some("@m1"));
        assert_eq!(found.line, b"@m1 at the boundary\n");
    }

    #[test]
    fn marker_just_after_target_is_ignored() {
        let mut log = filler(1024, 64);
        log.extend(b"x@m1 after\n");
        log.extend(filler(1024 - 11, 64));
        let found = scan(&log, &["@m1"], &config(1, 100)).unwrap();
        assert!(found.marker.is_none());
        assert_eq!(found.line, b"x@m1 after\n");
    }

    #[test]
    fn long_line_is_reassembled_across_chunks() {
        // A line opens at 16 000 and ends at 16 450, past the 16 KiB read
        // boundary; the target 16 010 falls inside it.
        let mut log = filler(16_000, 100);
        log.extend(std::iter::repeat_n(b'z', 450));
        log.push(b'\n');
        log.extend(filler(17_034 - log.len(), 100));
        let found = scan(&log, &[], &config(1, 16 * 1024)).unwrap();
        assert_eq!(found.line, &log[16_010..=16_450]);
    }

    #[test]
    fn line_open_past_several_chunks() {
        let mut log = filler(1024, 32);
        log.extend(std::iter::repeat_n(b'q', 700));
        log.push(b'\n');
        log.extend(filler(1024 - 701, 32));
        let found = scan(&log, &[], &config(1, 64)).unwrap();
        let mut expected = vec![b'q'; 700];
        expected.push(b'\n');
        assert_eq!(found.line, expected);
    }

    #[test]
    fn split_marker_found_when_bridging() {
        // "@m1" straddles the 8-byte chunk boundary at offset 8.
        let mut log = b"abcdef@m1 go\n".to_vec();
        log.extend(filler(2048, 64));
        let bridged = scan(&log, &["@m1"], &config(2, 8)).unwrap();
        assert_eq!(bridged.marker.as_deref(), Some("@m1"));

        let mut legacy = config(2, 8);
        legacy.bridge_chunk_boundaries = false;
        let missed = scan(&log, &["@m1"], &legacy).unwrap();
        assert!(missed.marker.is_none());
        assert_eq!(missed.line, bridged.line);
    }

    #[test]
    fn split_terminator_found_when_bridging() {
        let mut crlf = config(1, 8);
        crlf.line_terminator = "\r\n".into();
        // "\r" is the last byte of the first chunk, "\n" the first of the next.
        let mut log = b"1234567\r\nrest\r\n".to_vec();
        log.extend(std::iter::repeat_n(b'.', 2000));
        crlf.tail_kb = 3;
        let found = scan(&log, &[], &crlf).unwrap();
        assert_eq!(found.line, b"1234567\r\n");

        crlf.bridge_chunk_boundaries = false;
        let found = scan(&log, &[], &crlf).unwrap();
        assert_eq!(found.line, b"1234567\r\nrest\r\n");
    }

    #[test]
    fn multi_byte_terminator_is_matched_exactly() {
        let mut crlf = config(1, 64);
        crlf.line_terminator = "\r\n".into();
        let found = scan(b"a\nb\rc\r\nd\r\n", &[], &crlf).unwrap();
        assert_eq!(found.line, b"a\nb\rc\r\n");
    }

    #[test]
    fn idempotent() {
        let mut log = b"@a one\n".to_vec();
        log.extend(filler(4000, 37));
        let cfg = config(1, 128);
        assert_eq!(scan(&log, &["@a"], &cfg), scan(&log, &["@a"], &cfg));
    }

    #[test]
    fn read_error_is_reported() {
        let log = filler(4096, 64);
        let reader = FailAfter {
            inner: Cursor::new(log),
            remaining: 100,
        };
        let err = find_shortlog_start(reader, 4096, &MarkerSet::default(), &at_sign, &config(1, 64))
            .unwrap_err();
        assert!(matches!(err, ScanError::Read { offset: 64, .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = find_shortlog_start(
            Cursor::new(b"a\n".to_vec()),
            2,
            &MarkerSet::default(),
            &at_sign,
            &config(1, 0),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn missing_file_is_recovered() {
        let path = Path::new("/nonexistent/shortlog/log");
        assert!(matches!(
            scan_file(path, &MarkerSet::default(), &at_sign, &ScanConfig::default()),
            Err(ScanError::Open { .. })
        ));
        assert!(
            locate_shortlog_start(path, &MarkerSet::default(), &at_sign, &ScanConfig::default())
                .is_none()
        );
    }
}
