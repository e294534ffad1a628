//! Frame encoding
//!
//! Turns one captured pixel buffer into a compressed payload at the quality
//! the operator currently has dialed in.

pub mod jpeg;

pub use jpeg::JpegFrameEncoder;

use bytes::Bytes;

use crate::capture::PixelBuffer;
use crate::error::CodecError;

/// Per-frame encoder contract
pub trait FrameEncoder {
    /// Compress one frame at `quality` (1-100)
    fn encode(&mut self, frame: &PixelBuffer, quality: u8) -> Result<Bytes, CodecError>;

    fn stats(&self) -> EncoderStats;
}

/// Encoder statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f32,
}
