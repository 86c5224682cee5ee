//! Candidate marker matching within one in-memory chunk.
//!
//! A marker is an opaque serialized string embedded verbatim in the log. The
//! scanner never interprets it; it only asks a [`PreambleLocator`] where a
//! marker *could* begin and then compares each candidate byte-for-byte at
//! that position.
//!
//! # Matching rules
//!
//! - A candidate matches at `pos` only if the chunk holds at least
//!   `len(candidate) + 1` bytes from `pos` and the next `len(candidate)` bytes
//!   equal the candidate.
//! - After a failed position the search resumes one byte later, so preambles
//!   nested inside another marker's bytes are still examined.
//! - Candidates are tried longest first; when one candidate is a prefix of
//!   another at the same position the more specific one wins.

use std::collections::BTreeSet;

use tracing::debug;

// ---------------------------------------------------------------------------
// Preamble location
// ---------------------------------------------------------------------------

/// Finds where an encoded marker may begin.
///
/// Implementations return the first offset `>= from` at which a marker
/// preamble starts, or `None` when the rest of `buf` holds no preamble.
pub trait PreambleLocator {
    /// Locate the next preamble at or after `from`.
    fn find_preamble(&self, buf: &[u8], from: usize) -> Option<usize>;
}

impl<F> PreambleLocator for F
where
    F: Fn(&[u8], usize) -> Option<usize>,
{
    fn find_preamble(&self, buf: &[u8], from: usize) -> Option<usize> {
        self(buf, from)
    }
}

// ---------------------------------------------------------------------------
// Candidate set
// ---------------------------------------------------------------------------

/// Immutable set of serialized markers to look for during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    /// Unique, non-empty candidates ordered longest first, then bytewise.
    markers: Vec<String>,
    max_len: usize,
}

impl MarkerSet {
    /// Build a set from serialized markers.
    ///
    /// Duplicates collapse to one entry. Empty strings are dropped: an empty
    /// candidate would match at every preamble.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = markers
            .into_iter()
            .map(Into::into)
            .filter(|marker| {
                if marker.is_empty() {
                    debug!("ignoring empty marker candidate");
                }
                !marker.is_empty()
            })
            .collect();

        let mut markers: Vec<String> = unique.into_iter().collect();
        markers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let max_len = markers.first().map_or(0, String::len);

        Self { markers, max_len }
    }

    /// Number of distinct candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns `true` when there is nothing to look for.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Byte length of the longest candidate (0 for an empty set).
    #[must_use]
    pub const fn max_len(&self) -> usize {
        self.max_len
    }

    /// Returns `true` if `marker` is one of the candidates.
    #[must_use]
    pub fn contains(&self, marker: &str) -> bool {
        self.markers.iter().any(|candidate| candidate == marker)
    }

    /// Iterate candidates in matching order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    /// Candidate matching at `pos`, if any.
    fn match_at(&self, chunk: &[u8], pos: usize) -> Option<&str> {
        let remaining = chunk.len().saturating_sub(pos);
        self.iter().find(|candidate| {
            remaining > candidate.len() && &chunk[pos..pos + candidate.len()] == candidate.as_bytes()
        })
    }
}

impl<S: Into<String>> FromIterator<S> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ---------------------------------------------------------------------------
// Chunk scanning
// ---------------------------------------------------------------------------

/// A candidate found in a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerHit<'a> {
    /// The candidate that matched.
    pub marker: &'a str,
    /// Offset of the match within the scanned chunk.
    pub offset: usize,
}

/// Find the earliest candidate occurring at a preamble position `>= from`.
///
/// Returns `None` when the chunk is exhausted without a match; callers keep
/// whatever marker they recorded from earlier chunks.
pub fn find_marker_in_chunk<'a, P>(
    chunk: &[u8],
    from: usize,
    candidates: &'a MarkerSet,
    preamble: &P,
) -> Option<MarkerHit<'a>>
where
    P: PreambleLocator + ?Sized,
{
    if candidates.is_empty() {
        return None;
    }

    let mut pos = from;
    while pos < chunk.len() {
        // A locator reporting a position behind `pos` must not stall the scan.
        let found = preamble.find_preamble(chunk, pos)?.max(pos);
        if let Some(marker) = candidates.match_at(chunk, found) {
            return Some(MarkerHit {
                marker,
                offset: found,
            });
        }
        pos = found + 1;
    }
    None
}

/// Find the last candidate in `chunk` whose match begins at or before `limit`.
///
/// Applies [`find_marker_in_chunk`] repeatedly, resuming one byte after each
/// hit, so a chunk holding several markers yields the most recent one.
pub fn last_marker_in_chunk<'a, P>(
    chunk: &[u8],
    limit: usize,
    candidates: &'a MarkerSet,
    preamble: &P,
) -> Option<MarkerHit<'a>>
where
    P: PreambleLocator + ?Sized,
{
    let mut last = None;
    let mut from = 0;
    while let Some(hit) = find_marker_in_chunk(chunk, from, candidates, preamble) {
        if hit.offset > limit {
            break;
        }
        last = Some(hit);
        from = hit.offset + 1;
    }
    last
}
