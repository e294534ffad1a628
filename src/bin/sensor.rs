//! Camera Sensor Application
//!
//! Streams frames from the test-pattern camera to a collector over TCP,
//! optionally recording them locally at the same time.
//!
//! Usage: `sensor [host:port] [--record] [--sync]`

use anyhow::{Context, Result};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_camera_streamer::{
    capture::TestPatternSource,
    codec::JpegFrameEncoder,
    config::AppConfig,
    network::TcpTransport,
    session::{LogStatusSink, SessionStateMachine},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting camera sensor");

    let mut config = AppConfig::load()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let record = args.iter().any(|a| a == "--record");
    let sync_on_start = args.iter().any(|a| a == "--sync");
    if let Some(target) = args.iter().find(|a| !a.starts_with("--")) {
        let (host, port) = target
            .rsplit_once(':')
            .context("target must be host:port")?;
        config.network.address = host.to_string();
        config.network.port = port.parse().context("invalid port")?;
    }

    tracing::info!(
        "Target collector: {}:{} ({} @ quality {})",
        config.network.address,
        config.network.port,
        config.capture.preset,
        config.encoder.quality
    );

    let frame_rate = config.capture.preset.frame_rate();
    let mut machine = SessionStateMachine::new(
        Box::new(TestPatternSource::new()),
        Box::new(JpegFrameEncoder::new()),
        Box::new(TcpTransport::new()),
        Box::new(LogStatusSink),
        &config,
    );

    machine.connect()?;
    if record {
        machine.start_recording()?;
    }
    if sync_on_start {
        machine.sync()?;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1) / frame_rate);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!("Streaming at {} fps - press Ctrl+C to stop", frame_rate);

    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                machine.tick();
                ticks += 1;

                if !machine.is_connected() && !machine.is_recording() {
                    tracing::info!("Session ended by peer");
                    break;
                }

                if ticks % (frame_rate as u64 * 10) == 0 {
                    let stats = machine.encoder_stats();
                    tracing::info!(
                        "Stats: {} frames encoded, {:.1} KB total, avg frame {:.0} bytes",
                        stats.frames_encoded,
                        stats.bytes_produced as f64 / 1024.0,
                        stats.average_frame_size
                    );
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    machine.stop_recording();
    machine.disconnect();
    Ok(())
}
