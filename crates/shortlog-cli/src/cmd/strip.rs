//! `shortlog strip`: print a log with its console notes removed.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use shortlog_core::note::remove_notes;

use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct StripArgs {
    /// Log file to strip.
    pub log: PathBuf,
}

#[derive(Debug, Serialize)]
struct StripReport<'a> {
    log: &'a PathBuf,
    text: String,
}

/// Run `shortlog strip`.
///
/// Text and pretty modes stream line by line; JSON mode buffers the whole
/// stripped log.
///
/// # Errors
///
/// Returns an error if the log cannot be read or output cannot be written.
pub fn run_strip(args: &StripArgs, output: OutputMode) -> Result<()> {
    let file = File::open(&args.log)
        .with_context(|| format!("cannot open {}", args.log.display()))?;
    let mut reader = BufReader::new(file);

    if output.is_json() {
        let mut text = String::new();
        strip_lines(&mut reader, &mut |line| {
            text.push_str(line);
            Ok(())
        })
        .with_context(|| format!("cannot read {}", args.log.display()))?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &StripReport { log: &args.log, text })?;
        writeln!(out)?;
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    strip_lines(&mut reader, &mut |line| out.write_all(line.as_bytes()))
        .with_context(|| format!("cannot strip {}", args.log.display()))?;
    out.flush()?;
    Ok(())
}

/// Feed each line of `reader`, notes removed, to `sink`.
///
/// Notes never span a line break, so stripping per line is exact.
fn strip_lines<R: BufRead>(
    reader: &mut R,
    sink: &mut dyn FnMut(&str) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        sink(&remove_notes(&String::from_utf8_lossy(&buf)))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortlog_core::StyleMarker;
    use shortlog_core::note;

    #[test]
    fn strips_notes_and_keeps_unterminated_tail() {
        let encoded = note::encode(&StyleMarker::start("a", "xterm")).unwrap();
        let log = format!("{encoded}one\ntwo{encoded}\nthree");
        let mut out = String::new();
        strip_lines(&mut log.as_bytes(), &mut |line| {
            out.push_str(line);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, "one\ntwo\nthree");
    }
}
