//! shortlog-core library.
//!
//! Recovers the console note that was active where a log's tail window
//! begins, reading the log forward once in fixed-size chunks.
//!
//! # Conventions
//!
//! - **Errors**: per-module `thiserror` enums; scan I/O failures are recovered
//!   by [`scan::locate_shortlog_start`] and surface as "no result".
//! - **Logging**: `tracing` macros (`debug!` for scan progress, `warn!` for
//!   recovered failures).

pub mod config;
pub mod error;
pub mod line_id;
pub mod marker;
pub mod note;
pub mod scan;
pub mod shortlog;

pub use config::{Config, ScanConfig};
pub use marker::{MarkerHit, MarkerSet, PreambleLocator};
pub use scan::{ShortlogStart, find_shortlog_start, locate_shortlog_start};
pub use shortlog::{Association, CandidateIndex, MarkerCommand, StyleMarker};
