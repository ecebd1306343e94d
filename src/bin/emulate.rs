//! Controller emulator: synthesises a scripted sweep of stick, wheel, and
//! button activity, encodes each tick as an RC push frame, and either
//! records the byte stream to a file (readable by `replay`) or serves it
//! on a Unix-domain socket (readable by `rcmon --socket`).

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use rcmon_lib::constants::{CMD_ID_RC_PUSH, CMD_SET_RC};
use rcmon_lib::{
    encode_rc_push, AckPolicy, Address, DeviceKind, FlightMode, Frame, FrameHeader, PackType,
    RcState,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Emulate an RM510 remote controller.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write the frame stream to this file.
    #[arg(long, conflicts_with = "listen")]
    output: Option<PathBuf>,

    /// Serve the frame stream on a Unix-domain socket at this path.
    #[arg(long)]
    listen: Option<PathBuf>,

    /// Frames per second when serving a socket.
    #[arg(long, default_value_t = 20)]
    rate: u32,

    /// Number of frames to produce.
    #[arg(long, default_value_t = 200)]
    frames: u32,
}

/// Symmetric triangle wave in [-amplitude, amplitude].
fn triangle(tick: u32, period: u32, amplitude: i32) -> i16 {
    let phase = i64::from(tick % period);
    let half = i64::from(period / 2);
    let value = if phase < half {
        -amplitude as i64 + (2 * amplitude as i64 * phase) / half
    } else {
        amplitude as i64 - (2 * amplitude as i64 * (phase - half)) / half
    };
    value as i16
}

/// Deterministic control sweep: sticks ride out-of-phase triangle waves,
/// wheels creep, buttons and the five-way pad fire on fixed cadences, and
/// the mode switch cycles slowly.
fn scripted_state(tick: u32) -> RcState {
    let mut state = RcState::neutral();

    state.left_stick.horizontal = triangle(tick, 80, 660);
    state.left_stick.vertical = triangle(tick.wrapping_add(20), 80, 660);
    state.right_stick.horizontal = triangle(tick.wrapping_add(40), 80, 660);
    state.right_stick.vertical = triangle(tick.wrapping_add(60), 80, 660);

    state.left_wheel = triangle(tick, 160, 660);
    state.right_wheel = triangle(tick.wrapping_add(80), 160, 660);
    state.right_wheel_delta = match tick % 50 {
        0..=4 => 5,
        25..=29 => -5,
        _ => 0,
    };

    state.shutter = tick % 40 == 0;
    state.record = tick % 100 < 10;
    state.pause = tick % 75 == 0;
    state.gohome = tick % 90 == 0;
    state.custom1 = tick % 35 == 0;
    state.custom2 = tick % 45 == 0;
    state.custom3 = tick % 55 == 0;

    state.five_way.up = tick % 30 == 0;
    state.five_way.down = tick % 30 == 10;
    state.five_way.left = tick % 30 == 20;
    state.five_way.right = tick % 60 == 15;
    state.five_way.centre = tick % 120 == 0;

    state.flight_mode = match (tick / 60) % 3 {
        0 => FlightMode::Normal,
        1 => FlightMode::Sport,
        _ => FlightMode::Tripod,
    };

    state
}

fn push_frame(tick: u32) -> Result<Bytes> {
    let payload = encode_rc_push(&scripted_state(tick));
    let frame = Frame::new(
        FrameHeader {
            sender: Address::new(DeviceKind::RemoteController, 0),
            receiver: Address::new(DeviceKind::App, 0),
            sequence: tick as u16,
            pack_type: PackType::Request,
            ack: AckPolicy::NoAck,
            encryption: 0,
            cmd_set: CMD_SET_RC,
            cmd_id: CMD_ID_RC_PUSH,
        },
        payload.to_vec(),
    );
    Ok(frame.to_bytes()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match (&cli.output, &cli.listen) {
        (Some(path), _) => record(path, cli.frames).await,
        (None, Some(path)) => serve(path, cli.frames, cli.rate).await,
        (None, None) => {
            warn!("Nothing to do: pass --output <file> or --listen <socket>");
            Ok(())
        }
    }
}

async fn record(path: &PathBuf, frames: u32) -> Result<()> {
    let mut stream = Vec::new();
    for tick in 0..frames {
        stream.extend_from_slice(&push_frame(tick)?);
    }
    tokio::fs::write(path, &stream)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        "Recorded {} frames ({} bytes) to {}",
        frames,
        stream.len(),
        path.display()
    );
    Ok(())
}

async fn serve(path: &PathBuf, frames: u32, rate: u32) -> Result<()> {
    // A stale socket file from a previous run would make bind fail.
    let _ = tokio::fs::remove_file(path).await;
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind {}", path.display()))?;
    let tick_interval = Duration::from_millis(u64::from(1000 / rate.max(1)));

    info!("Serving push frames on {}", path.display());
    loop {
        let (mut stream, _) = listener.accept().await?;
        info!("Client connected, streaming {} frames", frames);

        for tick in 0..frames {
            let frame = push_frame(tick)?;
            if let Err(e) = stream.write_all(&frame).await {
                warn!("Client went away: {}", e);
                break;
            }
            tokio::time::sleep(tick_interval).await;
        }
        info!("Stream complete, waiting for next client");
    }
}
