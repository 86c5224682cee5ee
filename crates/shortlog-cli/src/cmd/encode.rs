//! `shortlog encode`: print a style marker as an embeddable console note.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use shortlog_core::StyleMarker;
use shortlog_core::note;

use super::visible;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Marker identity within the run.
    #[arg(long)]
    pub id: String,

    /// Color map the styled region is rendered with.
    #[arg(long, value_name = "NAME")]
    pub color_map: String,

    /// Encode a stop marker instead of a start marker.
    #[arg(long)]
    pub stop: bool,
}

#[derive(Debug, Serialize)]
pub struct EncodeReport {
    pub marker: StyleMarker,
    pub note: String,
}

/// Run `shortlog encode`.
///
/// # Errors
///
/// Returns an error if the marker cannot be encoded or output cannot be
/// written.
pub fn run_encode(args: &EncodeArgs, output: OutputMode) -> Result<()> {
    let marker = if args.stop {
        StyleMarker::stop(&args.id, &args.color_map)
    } else {
        StyleMarker::start(&args.id, &args.color_map)
    };
    let note = note::encode(&marker).context("cannot encode marker")?;
    let report = EncodeReport { marker, note };

    render_mode(
        output,
        &report,
        // Raw note so it can be spliced into a log.
        |r, w| writeln!(w, "{}", r.note),
        |r, w| {
            pretty_section(w, "Console note")?;
            pretty_kv(w, "id", &r.marker.id)?;
            pretty_kv(w, "color map", &r.marker.color_map)?;
            pretty_kv(w, "command", format!("{:?}", r.marker.command).to_lowercase())?;
            pretty_kv(w, "note", visible(&r.note))
        },
    )
}
