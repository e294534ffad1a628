//! Synthetic test-pattern capture source
//!
//! Produces a moving color gradient at the preset frame rate. Used by the
//! demo binaries and tests so the pipeline can run without camera hardware.

use std::time::{Duration, Instant};

use crate::capture::{CaptureSource, PixelBuffer, ResolutionPreset};
use crate::error::CaptureError;

pub struct TestPatternSource {
    running: bool,
    width: u32,
    height: u32,
    frame_interval: Duration,
    last_frame: Option<Instant>,
    frame_counter: u64,
}

impl TestPatternSource {
    pub fn new() -> Self {
        Self {
            running: false,
            width: 0,
            height: 0,
            frame_interval: Duration::from_millis(33),
            last_frame: None,
            frame_counter: 0,
        }
    }
}

impl Default for TestPatternSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for TestPatternSource {
    fn start(&mut self, device: &str, preset: ResolutionPreset) -> Result<(), CaptureError> {
        if self.running {
            return Ok(());
        }
        // "0" is the only device the synthetic camera exposes
        if device != "0" {
            return Err(CaptureError::DeviceNotFound(device.to_string()));
        }
        let (width, height) = preset.dimensions();
        self.width = width;
        self.height = height;
        self.frame_interval = Duration::from_secs(1) / preset.frame_rate();
        self.last_frame = None;
        self.frame_counter = 0;
        self.running = true;
        tracing::debug!("test pattern source started at {}", preset);
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.last_frame = None;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn frame_available(&mut self) -> bool {
        if !self.running {
            return false;
        }
        match self.last_frame {
            None => true,
            Some(at) => at.elapsed() >= self.frame_interval,
        }
    }

    fn read_pixels(&mut self) -> Result<PixelBuffer, CaptureError> {
        if !self.running {
            return Err(CaptureError::NotRunning);
        }
        self.last_frame = Some(Instant::now());
        let phase = (self.frame_counter % 256) as u8;
        self.frame_counter += 1;

        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x % 256) as u8 ^ phase);
                data.push((y % 256) as u8);
                data.push(phase);
                data.push(255);
            }
        }
        Ok(PixelBuffer::new(data, self.width, self.height))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
