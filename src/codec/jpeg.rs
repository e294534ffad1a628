//! JPEG encoder over the `image` crate

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::capture::PixelBuffer;
use crate::codec::{EncoderStats, FrameEncoder};
use crate::error::CodecError;

/// JPEG frame encoder with a reused RGB staging buffer
pub struct JpegFrameEncoder {
    /// RGBA-to-RGB conversion buffer (reused to avoid per-frame allocation)
    rgb_buffer: Vec<u8>,
    frames_encoded: u64,
    bytes_produced: u64,
}

impl JpegFrameEncoder {
    pub fn new() -> Self {
        Self {
            rgb_buffer: Vec::new(),
            frames_encoded: 0,
            bytes_produced: 0,
        }
    }

    /// Strip the alpha channel; JPEG carries RGB only
    fn fill_rgb(&mut self, frame: &PixelBuffer) -> Result<(), CodecError> {
        let expected = (frame.width * frame.height * 4) as usize;
        if frame.data.len() != expected {
            return Err(CodecError::BufferSizeMismatch {
                expected,
                actual: frame.data.len(),
            });
        }
        self.rgb_buffer.clear();
        self.rgb_buffer.reserve(expected / 4 * 3);
        for px in frame.data.chunks_exact(4) {
            self.rgb_buffer.extend_from_slice(&px[..3]);
        }
        Ok(())
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&mut self, frame: &PixelBuffer, quality: u8) -> Result<Bytes, CodecError> {
        if quality == 0 || quality > 100 {
            return Err(CodecError::InvalidQuality(quality));
        }
        self.fill_rgb(frame)?;

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder
            .write_image(
                &self.rgb_buffer,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

        self.frames_encoded += 1;
        self.bytes_produced += out.len() as u64;
        Ok(Bytes::from(out))
    }

    fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }
}
