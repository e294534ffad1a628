//! Frame Collector Application
//!
//! Accepts one sensor connection, parses the length-prefixed frame stream,
//! and logs what arrives. With `--dump DIR` the received frames are written
//! out as numbered JPEG files.
//!
//! Usage: `collector [port] [--dump DIR]`

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_camera_streamer::constants::{DEFAULT_PORT, FRAME_HEADER_SIZE};
use lan_camera_streamer::protocol;

/// Reject frames larger than any sane camera frame
const MAX_IMAGE_SIZE: usize = 4 * 1024 * 1024;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let dump_pos = args.iter().position(|a| a == "--dump");
    let dump_dir: Option<PathBuf> = dump_pos.and_then(|i| args.get(i + 1)).map(PathBuf::from);
    let port: u16 = args
        .iter()
        .enumerate()
        .find(|(i, a)| !a.starts_with("--") && Some(*i) != dump_pos.map(|p| p + 1))
        .map(|(_, a)| a.parse())
        .transpose()
        .context("invalid port")?
        .unwrap_or(DEFAULT_PORT);

    if let Some(dir) = &dump_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create dump directory {}", dir.display()))?;
    }

    let listener = TcpListener::bind(("0.0.0.0", port))
        .with_context(|| format!("cannot listen on port {}", port))?;
    tracing::info!("Collector listening on port {}. Waiting for a sensor.", port);

    let (stream, peer) = listener.accept().context("accept failed")?;
    tracing::info!("Sensor connected from {}", peer);
    drop(listener);

    receive_frames(stream, dump_dir)
}

fn receive_frames(mut stream: TcpStream, dump_dir: Option<PathBuf>) -> Result<()> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let mut payload = Vec::new();
    let mut frame_count: u64 = 0;
    let mut bytes_total: u64 = 0;

    loop {
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::info!(
                    "Sensor disconnected after {} frames ({:.1} KB)",
                    frame_count,
                    bytes_total as f64 / 1024.0
                );
                return Ok(());
            }
            Err(e) => return Err(e).context("header read failed"),
        }

        let parsed = protocol::parse_header(&header)
            .map_err(|e| anyhow::anyhow!("stream desynchronized: {}", e))?;
        if parsed.length > MAX_IMAGE_SIZE {
            bail!("frame of {} bytes exceeds the {} byte limit", parsed.length, MAX_IMAGE_SIZE);
        }

        payload.resize(parsed.length, 0);
        stream
            .read_exact(&mut payload)
            .context("payload read failed")?;

        if let Some(dir) = &dump_dir {
            fs::write(dir.join(format!("{}.jpg", frame_count)), &payload)
                .context("dump write failed")?;
        }

        frame_count += 1;
        bytes_total += parsed.length as u64;
        if frame_count % 100 == 0 {
            tracing::info!(
                "{} frames, last: {} bytes at t={:.3}s",
                frame_count,
                parsed.length,
                parsed.timestamp
            );
        } else {
            tracing::debug!("frame {}: {} bytes at t={:.6}s", frame_count, parsed.length, parsed.timestamp);
        }
    }
}
