//! `shortlog locate`: find the first line of a log's tail window and the
//! marker active where it begins.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use shortlog_core::line_id::{SHORTLOG_SEED, line_hash};
use shortlog_core::note::{self, ConsoleNotePreamble, remove_notes};
use shortlog_core::scan::scan_file;
use shortlog_core::{MarkerSet, ScanConfig, ShortlogStart};
use tracing::debug;

use super::{WindowArgs, visible};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Log file to scan.
    pub log: PathBuf,

    /// Encoded marker to look for. Repeat for several markers.
    #[arg(long = "marker", value_name = "NOTE")]
    pub markers: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

/// Result of a locate run as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct LocateReport {
    pub log: PathBuf,
    pub tail_kb: u32,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// The marker's payload when it decodes as a console note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_payload: Option<serde_json::Value>,
}

impl LocateReport {
    fn new(log: &Path, config: &ScanConfig, found: Option<ShortlogStart>) -> Self {
        let mut report = Self {
            log: log.to_path_buf(),
            tail_kb: config.tail_kb,
            found: found.is_some(),
            line: None,
            line_hash: None,
            marker: None,
            marker_payload: None,
        };
        if let Some(start) = found {
            let text = start.line_text();
            report.line_hash = Some(line_hash(&remove_notes(&text), SHORTLOG_SEED));
            report.line = Some(text.into_owned());
            report.marker_payload = start
                .marker
                .as_deref()
                .and_then(|marker| note::decode::<serde_json::Value>(marker).ok());
            report.marker = start.marker;
        }
        report
    }
}

/// Run `shortlog locate`.
///
/// # Errors
///
/// Returns an error if the log cannot be read or output cannot be written.
pub fn run_locate(args: &LocateArgs, base: &ScanConfig, output: OutputMode) -> Result<()> {
    let config = args.window.apply(base);
    let candidates = MarkerSet::new(args.markers.iter().map(String::as_str));
    debug!(candidates = candidates.len(), "locating tail window start");

    let found = scan_file(&args.log, &candidates, &ConsoleNotePreamble, &config)
        .with_context(|| format!("cannot locate tail window in {}", args.log.display()))?;
    let report = LocateReport::new(&args.log, &config, found);

    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &LocateReport, w: &mut dyn Write) -> std::io::Result<()> {
    let Some(line) = &report.line else {
        return writeln!(w, "no boundary");
    };
    writeln!(w, "{}", report.line_hash.as_deref().unwrap_or_default())?;
    writeln!(w, "{}", report.marker.as_deref().map(visible).unwrap_or_default())?;
    write!(w, "{line}")?;
    if !line.ends_with('\n') {
        writeln!(w)?;
    }
    Ok(())
}

fn render_pretty(report: &LocateReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Tail window of {}", report.log.display()))?;
    pretty_kv(w, "tail", format!("{} KiB", report.tail_kb))?;
    let Some(line) = &report.line else {
        return pretty_kv(w, "boundary", "none");
    };
    pretty_kv(w, "line", visible(line.trim_end_matches(['\r', '\n'])))?;
    pretty_kv(w, "line hash", report.line_hash.as_deref().unwrap_or_default())?;
    match (&report.marker, &report.marker_payload) {
        (_, Some(payload)) => pretty_kv(w, "marker", payload.to_string()),
        (Some(marker), None) => pretty_kv(w, "marker", visible(marker)),
        (None, None) => pretty_kv(w, "marker", "none"),
    }
}
