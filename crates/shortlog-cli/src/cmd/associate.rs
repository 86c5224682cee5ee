//! `shortlog associate`: key the style marker open at the tail window by
//! the identifier of the window's first line.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use shortlog_core::note::ConsoleNotePreamble;
use shortlog_core::scan::scan_file;
use shortlog_core::{Association, CandidateIndex, ScanConfig, StyleMarker};
use tracing::{debug, info};

use super::WindowArgs;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct AssociateArgs {
    /// Log file to scan.
    pub log: PathBuf,

    /// JSON file holding the run's markers as an array of
    /// `{"id", "color_map", "command"}` objects.
    #[arg(long, value_name = "FILE")]
    pub markers: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Serialize)]
pub struct AssociateReport {
    pub log: PathBuf,
    /// Start markers that could be searched for.
    pub candidates: usize,
    pub association: Option<Association>,
}

/// Read the run's markers from a JSON array.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a marker array.
pub fn read_markers(path: &Path) -> Result<Vec<StyleMarker>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read markers file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("cannot parse markers file {}", path.display()))
}

/// Run `shortlog associate`.
///
/// # Errors
///
/// Returns an error if the markers file or the log cannot be read, or output
/// cannot be written.
pub fn run_associate(args: &AssociateArgs, base: &ScanConfig, output: OutputMode) -> Result<()> {
    let config = args.window.apply(base);
    let markers = read_markers(&args.markers)?;
    let index = CandidateIndex::from_markers(markers);
    debug!(candidates = index.len(), "built candidate index");

    let association = if index.is_empty() {
        None
    } else {
        scan_file(&args.log, index.candidates(), &ConsoleNotePreamble, &config)
            .with_context(|| format!("cannot scan {}", args.log.display()))?
            .and_then(|found| index.associate(&found))
    };
    if let Some(association) = &association {
        info!(
            line_hash = %association.line_hash,
            marker = %association.marker.id,
            "associated marker with tail window"
        );
    }

    let report = AssociateReport {
        log: args.log.clone(),
        candidates: index.len(),
        association,
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &AssociateReport, w: &mut dyn Write) -> std::io::Result<()> {
    match &report.association {
        Some(association) => writeln!(
            w,
            "{}\t{}\t{}",
            association.line_hash, association.marker.id, association.marker.color_map
        ),
        None => writeln!(w, "no association"),
    }
}

fn render_pretty(report: &AssociateReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Shortlog association for {}", report.log.display()))?;
    pretty_kv(w, "candidates", report.candidates.to_string())?;
    let Some(association) = &report.association else {
        return pretty_kv(w, "marker", "none");
    };
    pretty_kv(w, "line hash", &association.line_hash)?;
    pretty_kv(w, "marker", &association.marker.id)?;
    pretty_kv(w, "color map", &association.marker.color_map)
}
