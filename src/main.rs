use anyhow::{Context, Result};
use clap::Parser;
use rcmon_lib::{RcParser, RcUsbConfig, RcUsbSource};
use std::path::PathBuf;
use std::process;
use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Monitor a DJI RM510-family remote controller and log every decoded
/// button/stick snapshot.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Read the DUML stream from a Unix-domain socket instead of USB.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// USB interface number carrying the bulk endpoints.
    #[arg(long, default_value_t = 0)]
    interface: u8,

    /// Bulk IN endpoint address.
    #[arg(long, default_value_t = 0x81)]
    endpoint_in: u8,

    /// Bulk OUT endpoint address.
    #[arg(long, default_value_t = 0x01)]
    endpoint_out: u8,

    /// Skip the initial USB reset.
    #[arg(long)]
    skip_reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut parser = RcParser::new(|state| info!(%state, "rc push"));

    let result = match &cli.socket {
        Some(path) => run_socket(path, &mut parser).await,
        None => run_usb(&cli, &mut parser).await,
    };

    if let Err(e) = result {
        error!("Monitor failed: {:?}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run_usb(cli: &Cli, parser: &mut RcParser) -> Result<()> {
    let config = RcUsbConfig {
        interface: cli.interface,
        endpoint_in: cli.endpoint_in,
        endpoint_out: cli.endpoint_out,
        skip_reset: cli.skip_reset,
    };
    let mut source = RcUsbSource::with_config(config)
        .await
        .context("Failed to open the remote controller")?;
    source.run(parser).await.context("USB read loop failed")
}

async fn run_socket(path: &PathBuf, parser: &mut RcParser) -> Result<()> {
    info!("Connecting to {}", path.display());
    let mut stream = UnixStream::connect(path)
        .await
        .with_context(|| format!("Failed to connect to {}", path.display()))?;

    let mut buf = vec![0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            info!("Socket closed by peer");
            return Ok(());
        }
        parser.feed(&buf[..n]);
    }
}
