//! # LAN Camera Streamer
//!
//! Live camera frame streaming over LAN with local recording.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SENSOR CLIENT                         │
//! │  ┌────────────────┐                                          │
//! │  │ CaptureSource  │  polled once per tick                    │
//! │  └───────┬────────┘                                          │
//! │          ▼                                                   │
//! │  ┌────────────────┐      ┌───────────┐                       │
//! │  │  FrameEncoder  │      │ SyncClock │ relative timestamp    │
//! │  │  (JPEG)        │      │  + lock   │                       │
//! │  └───────┬────────┘      └─────┬─────┘                       │
//! │          │   EncodedFrame      │                             │
//! │          ▼                     ▼                             │
//! │  ┌───────────────────────────────────┐                       │
//! │  │        SessionStateMachine        │                       │
//! │  │  connected axis │ recording axis  │                       │
//! │  └───────┬─────────────────┬─────────┘                       │
//! │          ▼                 ▼                                 │
//! │  ┌──────────────┐   ┌──────────────────┐                     │
//! │  │   Framer +   │   │ RecordingSession │                     │
//! │  │   Transport  │   │  media/ + log    │                     │
//! │  └──────┬───────┘   └──────────────────┘                     │
//! └─────────┼────────────────────────────────────────────────────┘
//!           │ TCP: 'b' + len(7) + timestamp(13) + 'e' + payload
//!           ▼
//!   ┌───────────────┐
//!   │   COLLECTOR   │
//!   └───────────────┘
//! ```

pub mod capture;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod recording;
pub mod session;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Default TCP port for the frame collector
    pub const DEFAULT_PORT: u16 = 8888;

    /// Default JPEG quality (1-100)
    pub const DEFAULT_QUALITY: u8 = 75;

    /// Largest payload representable in the 7-digit frame header length field
    pub const MAX_PAYLOAD_SIZE: usize = 9_999_999;

    /// Wire header size in bytes
    pub const FRAME_HEADER_SIZE: usize = 22;

    /// Two unlock taps within this window actually unlock
    pub const UNLOCK_DEBOUNCE: Duration = Duration::from_millis(200);

    /// Subdirectory of a recording session that holds the frame images
    pub const MEDIA_SUBDIR: &str = "media";

    /// Timestamp log file name inside a recording session
    pub const TIMESTAMP_LOG: &str = "timestamps.txt";
}
