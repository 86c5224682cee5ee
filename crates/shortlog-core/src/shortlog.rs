//! Associating a style marker with the first line of a shortlog view.
//!
//! A run's log carries start/stop style notes. When only the tail of the log
//! is shown, the style that was open where the tail begins has to be
//! re-applied. This module turns the run's start markers into scan
//! candidates, runs the scan and keys the active marker by the identifier of
//! the tail's first line.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::line_id::{SHORTLOG_SEED, line_hash};
use crate::marker::{MarkerSet, PreambleLocator};
use crate::note::{self, NoteError, remove_notes};
use crate::scan::{ShortlogStart, locate_shortlog_start};

/// Whether a marker opens or closes a styled region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerCommand {
    Start,
    Stop,
}

/// A color/style marker as embedded in a run's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleMarker {
    /// Unique marker identity within the run.
    pub id: String,
    /// Name of the color map the region is rendered with.
    pub color_map: String,
    pub command: MarkerCommand,
}

impl StyleMarker {
    /// A marker opening a region styled with `color_map`.
    pub fn start(id: impl Into<String>, color_map: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color_map: color_map.into(),
            command: MarkerCommand::Start,
        }
    }

    /// A marker closing the region opened under `id`.
    pub fn stop(id: impl Into<String>, color_map: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color_map: color_map.into(),
            command: MarkerCommand::Stop,
        }
    }
}

/// A marker value keyed by the identifier of the line it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Association<T = StyleMarker> {
    /// Identifier of the tail's first line, notes removed.
    pub line_hash: String,
    pub marker: T,
}

/// Start markers by their encoded form, plus the matching scan candidates.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    by_note: HashMap<String, StyleMarker>,
    set: MarkerSet,
}

impl CandidateIndex {
    /// Index the start markers among `markers`, encoding each with `encode`.
    ///
    /// A marker that fails to encode is logged and left out; the rest are
    /// still indexed. When two markers encode identically the first is kept.
    pub fn build<I, E>(markers: I, encode: E) -> Self
    where
        I: IntoIterator<Item = StyleMarker>,
        E: Fn(&StyleMarker) -> Result<String, NoteError>,
    {
        let mut by_note = HashMap::new();
        for marker in markers {
            if marker.command != MarkerCommand::Start {
                continue;
            }
            match encode(&marker) {
                Ok(encoded) => {
                    if by_note.contains_key(&encoded) {
                        warn!(id = %marker.id, "duplicate start marker encoding, keeping the first");
                        continue;
                    }
                    by_note.insert(encoded, marker);
                }
                Err(err) => warn!(
                    id = %marker.id,
                    error = %err,
                    "will not be able to identify style marker"
                ),
            }
        }

        let set = MarkerSet::new(by_note.keys().cloned());
        Self { by_note, set }
    }

    /// Index markers encoded as console notes.
    pub fn from_markers<I>(markers: I) -> Self
    where
        I: IntoIterator<Item = StyleMarker>,
    {
        Self::build(markers, |marker| note::encode(marker))
    }

    /// Scan candidates.
    #[must_use]
    pub const fn candidates(&self) -> &MarkerSet {
        &self.set
    }

    /// Marker for an encoded note.
    #[must_use]
    pub fn get(&self, encoded: &str) -> Option<&StyleMarker> {
        self.by_note.get(encoded)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_note.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_note.is_empty()
    }

    /// Build the association for a finished scan.
    ///
    /// Returns `None` when no indexed marker was active at the line.
    #[must_use]
    pub fn associate(&self, found: &ShortlogStart) -> Option<Association> {
        let marker = self.get(found.marker.as_deref()?)?.clone();
        let line = remove_notes(&found.line_text());
        Some(Association {
            line_hash: line_hash(&line, SHORTLOG_SEED),
            marker,
        })
    }
}

/// Find the style marker to re-apply at the start of `log`'s tail window.
///
/// Scan failures are logged and yield `None`, as does a log with no
/// indexed marker before the window.
pub fn associate_shortlog<P>(
    log: &Path,
    index: &CandidateIndex,
    preamble: &P,
    config: &ScanConfig,
) -> Option<Association>
where
    P: PreambleLocator + ?Sized,
{
    if index.is_empty() {
        debug!(path = %log.display(), "no start markers to look for");
        return None;
    }
    let found = locate_shortlog_start(log, index.candidates(), preamble, config)?;
    index.associate(&found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_keeps_only_start_markers() {
        let index = CandidateIndex::from_markers([
            StyleMarker::start("a", "xterm"),
            StyleMarker::stop("a", "xterm"),
            StyleMarker::start("b", "vga"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.candidates().len(), 2);
    }

    #[test]
    fn encode_failure_excludes_only_that_marker() {
        let index = CandidateIndex::build(
            [StyleMarker::start("bad", "xterm"), StyleMarker::start("good", "xterm")],
            |marker| {
                if marker.id == "bad" {
                    Err(NoteError::Framing("test"))
                } else {
                    note::encode(marker)
                }
            },
        );
        assert_eq!(index.len(), 1);
        let encoded = note::encode(&StyleMarker::start("good", "xterm")).unwrap();
        assert_eq!(index.get(&encoded).map(|m| m.id.as_str()), Some("good"));
    }

    #[test]
    fn duplicate_encoding_keeps_first() {
        let index = CandidateIndex::build(
            [StyleMarker::start("first", "xterm"), StyleMarker::start("second", "vga")],
            |_| Ok("\x1b[8mha:same\x1b[0m".to_string()),
        );
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get("\x1b[8mha:same\x1b[0m").map(|m| m.id.as_str()),
            Some("first")
        );
    }

    #[test]
    fn associate_hashes_line_without_notes() {
        let marker = StyleMarker::start("a", "xterm");
        let encoded = note::encode(&marker).unwrap();
        let index = CandidateIndex::from_markers([marker.clone()]);

        let found = ShortlogStart {
            marker: Some(encoded.clone()),
            line: format!("{encoded}colored line\n").into_bytes(),
        };
        let association = index.associate(&found).unwrap();
        assert_eq!(association.marker, marker);
        assert_eq!(association.line_hash, line_hash("colored line\n", SHORTLOG_SEED));
    }

    #[test]
    fn associate_requires_known_marker() {
        let index = CandidateIndex::from_markers([StyleMarker::start("a", "xterm")]);
        let none_active = ShortlogStart {
            marker: None,
            line: b"plain\n".to_vec(),
        };
        assert!(index.associate(&none_active).is_none());

        let unknown = ShortlogStart {
            marker: Some("\x1b[8mha:other\x1b[0m".into()),
            line: b"plain\n".to_vec(),
        };
        assert!(index.associate(&unknown).is_none());
    }

    #[test]
    fn marker_serde_shape() {
        let json = serde_json::to_value(StyleMarker::start("a", "xterm")).unwrap();
        assert_eq!(json["command"], "start");
        assert_eq!(json["color_map"], "xterm");
    }
}
