// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OutlineIQ: PDF titles, heading outlines, links, and image previews as JSON.
//
// Entry point. Initialises logging, layers command-line flags over the
// optional JSON configuration file, and dispatches to the batch job or the
// single-file inspector.

mod batch;
mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use outlineiq_core::human_errors::{Severity, humanize_error};
use outlineiq_core::{BatchConfig, Result};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "outlineiq")]
#[command(version)]
#[command(about = "Extract titles, heading outlines, links, and image previews from PDFs as JSON", long_about = None)]
struct Cli {
    /// JSON configuration file (batch directories and extraction options)
    #[arg(long, global = true, value_name = "FILE", env = "OUTLINEIQ_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Longest edge of image previews, in pixels
    #[arg(long, global = true, value_name = "PX")]
    preview_size: Option<u32>,

    /// Preview only the first image on each page
    #[arg(long, global = true)]
    first_image_only: bool,

    /// Keep repeated headings on the same page
    #[arg(long, global = true)]
    keep_duplicates: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every PDF in a directory to one JSON file each
    Batch {
        /// Directory to scan for PDFs
        #[arg(short, long, value_name = "DIR")]
        input: Option<PathBuf>,

        /// Directory to write JSON results to
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Leave existing JSON files untouched
        #[arg(long)]
        no_overwrite: bool,

        /// Process files concurrently
        #[arg(long)]
        parallel: bool,
    },

    /// Extract one PDF, show the result, and save the JSON
    Inspect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Where to save the JSON (default: <stem>_outline.json)
        #[arg(short, long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "outlineiq failed");
            let human = humanize_error(&err);
            eprintln!("Error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::from(exit_status(human.severity))
        }
    }
}

/// sysexits-style status: bad document 65, fixable setting or path 64,
/// environment 74.
fn exit_status(severity: Severity) -> u8 {
    match severity {
        Severity::BadInput => 65,
        Severity::ActionRequired => 64,
        Severity::System => 74,
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => BatchConfig::load(path)?,
        None => BatchConfig::default(),
    };
    if let Some(size) = cli.preview_size {
        config.extract.preview_max_dimension = size;
    }
    if cli.first_image_only {
        config.extract.first_image_only = true;
    }
    if cli.keep_duplicates {
        config.extract.dedupe_headings = false;
    }
    config.extract.validate()?;

    match cli.command {
        Commands::Batch {
            input,
            output,
            no_overwrite,
            parallel,
        } => {
            if let Some(input) = input {
                config.input_dir = input;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            if no_overwrite {
                config.overwrite = false;
            }
            if parallel {
                config.parallel = true;
            }
            batch::run_batch(&config).map(|_| ())
        }
        Commands::Inspect { file, save } => {
            inspect::run_inspect(&file, save.as_deref(), &config.extract).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use outlineiq_core::OutlineError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "outlineiq",
            "batch",
            "--input",
            "pdfs",
            "--parallel",
            "--preview-size",
            "64",
        ])
        .unwrap();
        assert_eq!(cli.preview_size, Some(64));
        match cli.command {
            Commands::Batch { input, parallel, .. } => {
                assert_eq!(input, Some(PathBuf::from("pdfs")));
                assert!(parallel);
            }
            Commands::Inspect { .. } => panic!("expected batch"),
        }
    }

    #[test]
    fn exit_status_reflects_who_can_fix_the_failure() {
        let status = |err: OutlineError| exit_status(humanize_error(&err).severity);
        assert_eq!(status(OutlineError::Encrypted), 65);
        assert_eq!(status(OutlineError::BatchInput("missing".into())), 64);
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "out.json");
        assert_eq!(status(OutlineError::Io(denied)), 74);
    }

    #[test]
    fn inspect_requires_a_file() {
        assert!(Cli::try_parse_from(["outlineiq", "inspect"]).is_err());
    }
}
