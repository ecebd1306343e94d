//! Feed a recorded DUML byte stream back through the parser and report
//! every decoded RC push snapshot plus a final count. Useful for checking
//! captures taken with `emulate --output` or straight off the wire.

use anyhow::{Context, Result};
use clap::Parser;
use rcmon_lib::RcParser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replay a recorded frame stream through the DUML parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recording to replay.
    file: PathBuf,

    /// Chunk size for feeding the parser, mimicking transport reads.
    #[arg(long, default_value_t = 4096)]
    chunk: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data = fs::read(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let mut parser = RcParser::new(|state| info!(%state, "decoded"));

    let mut total = 0;
    for chunk in data.chunks(cli.chunk.max(1)) {
        total += parser.feed(chunk);
    }

    info!(
        "Decoded {} RC push frames from {} ({} bytes)",
        total,
        cli.file.display(),
        data.len()
    );
    Ok(())
}
