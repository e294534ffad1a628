//! Camera capture abstraction
//!
//! The actual camera lives outside this crate (phone camera, V4L2 device,
//! screen grabber). The core only needs the polling contract below: a
//! source is started once, polled for a new frame each tick, and stopped
//! when both the connection and recording axes are idle.

pub mod pattern;

pub use pattern::TestPatternSource;

use std::fmt;
use std::str::FromStr;

use crate::error::CaptureError;

/// One uncompressed frame, tightly packed RGBA8
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            data,
            width,
            height,
        }
    }
}

/// Resolution and frame-rate presets offered to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResolutionPreset {
    Vga60,
    Vga30,
    Hd60,
    Hd30,
    FullHd60,
    FullHd30,
}

impl ResolutionPreset {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Vga60 | Self::Vga30 => (640, 480),
            Self::Hd60 | Self::Hd30 => (1280, 720),
            Self::FullHd60 | Self::FullHd30 => (1920, 1080),
        }
    }

    pub fn frame_rate(&self) -> u32 {
        match self {
            Self::Vga60 | Self::Hd60 | Self::FullHd60 => 60,
            Self::Vga30 | Self::Hd30 | Self::FullHd30 => 30,
        }
    }

    /// Preset by menu index, in the order presented to the operator
    pub fn from_index(index: usize) -> Result<Self, CaptureError> {
        match index {
            0 => Ok(Self::Vga60),
            1 => Ok(Self::Vga30),
            2 => Ok(Self::Hd60),
            3 => Ok(Self::Hd30),
            4 => Ok(Self::FullHd60),
            5 => Ok(Self::FullHd30),
            _ => Err(CaptureError::UnsupportedPreset(index.to_string())),
        }
    }
}

impl fmt::Display for ResolutionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}@{}", w, h, self.frame_rate())
    }
}

impl FromStr for ResolutionPreset {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "640x480@60" => Ok(Self::Vga60),
            "640x480@30" => Ok(Self::Vga30),
            "1280x720@60" => Ok(Self::Hd60),
            "1280x720@30" => Ok(Self::Hd30),
            "1920x1080@60" => Ok(Self::FullHd60),
            "1920x1080@30" => Ok(Self::FullHd30),
            other => Err(CaptureError::UnsupportedPreset(other.to_string())),
        }
    }
}

/// Polling contract for a camera device
pub trait CaptureSource {
    /// Acquire the device and begin producing frames. Starting an already
    /// running source is a no-op; the device is never acquired twice.
    fn start(&mut self, device: &str, preset: ResolutionPreset) -> Result<(), CaptureError>;

    /// Release the device. Safe to call on a stopped source.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Whether a frame arrived since the last `read_pixels` call
    fn frame_available(&mut self) -> bool;

    /// Read the most recent frame and clear the availability flag
    fn read_pixels(&mut self) -> Result<PixelBuffer, CaptureError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}
