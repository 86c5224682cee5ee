#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode};
use shortlog_core::config::load_config;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "shortlog: recover the console note active at a log's tail window",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (pretty, text, json).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file to load instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Scan",
        about = "Find the first line of the tail window",
        long_about = "Scan a log once and report the first complete line of its tail window \
                      together with the latest marker at or before the window start.",
        after_help = "EXAMPLES:\n    # Locate with the default 150 KiB window\n    shortlog locate build.log\n\n    # Look for a specific note in the last 8 KiB\n    shortlog locate build.log --marker \"$NOTE\" --tail-kb 8\n\n    # Emit machine-readable output\n    shortlog locate build.log --json"
    )]
    Locate(cmd::locate::LocateArgs),

    #[command(
        next_help_heading = "Scan",
        about = "Associate the open style marker with the tail window",
        long_about = "Encode a run's start markers, scan the log for them and key the marker \
                      open at the tail window by the identifier of its first line.",
        after_help = "EXAMPLES:\n    # Associate using the run's markers\n    shortlog associate build.log --markers markers.json\n\n    # Emit machine-readable output\n    shortlog associate build.log --markers markers.json --json"
    )]
    Associate(cmd::associate::AssociateArgs),

    #[command(
        next_help_heading = "Notes",
        about = "Encode a style marker as a console note",
        after_help = "EXAMPLES:\n    # Print a start note for splicing into a log\n    shortlog encode --id red --color-map xterm --format text\n\n    # Encode a stop marker\n    shortlog encode --id red --color-map xterm --stop"
    )]
    Encode(cmd::encode::EncodeArgs),

    #[command(
        next_help_heading = "Notes",
        about = "Print a log with console notes removed",
        after_help = "EXAMPLES:\n    # Strip notes before grepping\n    shortlog strip build.log | grep error"
    )]
    Strip(cmd::strip::StripArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SHORTLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "shortlog=debug,info"
        } else {
            "shortlog=info,warn"
        })
    });

    let format = env::var("SHORTLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "loaded configuration");

    match &cli.command {
        Commands::Locate(args) => cmd::locate::run_locate(args, &config.scan, output),
        Commands::Associate(args) => cmd::associate::run_associate(args, &config.scan, output),
        Commands::Encode(args) => cmd::encode::run_encode(args, output),
        Commands::Strip(args) => cmd::strip::run_strip(args, output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error = CliError::from_error(&err);
            if output::render_error(output, &error).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
