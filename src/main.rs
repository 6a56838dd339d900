// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! borderhash - border-hash based text watermarking
//!
//! Embeds a text message into a lossless image, keyed by the image's own
//! border pixels, and extracts it again.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Border-Hash Based Text Watermarking
///
/// The embedding positions are derived from a hash of the image border, so
/// the border must reach extraction unmodified. Only lossless formats
/// (PNG, BMP, TIFF, TGA, PNM) preserve the watermark.
#[derive(Parser)]
#[command(name = "borderhash")]
#[command(version)]
#[command(about = "Border-hash based text watermarking")]
struct Cli {
    /// Operation mode
    #[arg(long, value_enum)]
    mode: Mode,

    /// Path to input image
    #[arg(long)]
    input: PathBuf,

    /// Path to save output image (required for embed mode)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Text message to embed (required for embed mode)
    #[arg(long)]
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Embed,
    Extract,
}

fn main() -> ExitCode {
    // Parse before logging init so --help output stays clean.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Results go to stdout; logs stay on stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_writer(io::stderr).with_env_filter(filter).with_target(false).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if !cli.input.exists() {
        bail!("Input file '{}' does not exist", cli.input.display());
    }

    match cli.mode {
        Mode::Embed => {
            let output = cli.output.context("--output is required for embed mode")?;
            let message = cli
                .message
                .filter(|m| !m.is_empty())
                .context("--message is required for embed mode")?;

            info!(input = %cli.input.display(), output = %output.display(), "embedding");
            let report = borderhash::embed_file(&cli.input, &output, &message)?;

            println!("Success: Message embedded into '{}'", output.display());
            println!("{}", length_summary(&message, report.bits_embedded));
            println!("{}", report.timing);
        }
        Mode::Extract => {
            info!(input = %cli.input.display(), "extracting");
            let report = borderhash::extract_file(&cli.input)?;

            println!("Extracted message: {}", report.message);
            println!("{}", report.timing);
        }
    }
    Ok(())
}

/// Length line printed after embedding. Counts UTF-8 bytes, the unit the
/// bit count is derived from.
fn length_summary(message: &str, bits_embedded: usize) -> String {
    format!("Message length: {} characters ({} bits)", message.len(), bits_embedded)
}
