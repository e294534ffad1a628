//! Local recording sessions
//!
//! One session owns one freshly created directory:
//!
//! ```text
//! session_20240101_120000/
//!   media/           0.jpg, 1.jpg, 2.jpg, ...
//!   timestamps.txt   one line per frame, relative timestamp in ms
//! ```
//!
//! Frame indices start at zero and increase by exactly one per saved frame;
//! log lines appear in the same order as the indices.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::constants::{MEDIA_SUBDIR, TIMESTAMP_LOG};
use crate::error::StorageError;

/// An open recording session. Not reusable after [`Self::finish`].
pub struct RecordingSession {
    dir: PathBuf,
    media_dir: PathBuf,
    next_index: u64,
    log: BufWriter<File>,
}

impl RecordingSession {
    /// Create a session directory under `base`, named from the wall clock.
    ///
    /// If the second-resolution name collides with an existing directory
    /// (back-to-back sessions), a numeric suffix is appended so two sessions
    /// never share a directory. Any filesystem failure aborts with nothing
    /// left active.
    pub fn create(base: &Path) -> Result<Self, StorageError> {
        let stamp = Local::now().format("session_%Y%m%d_%H%M%S").to_string();
        let mut dir = base.join(&stamp);
        let mut suffix = 1;
        while dir.exists() {
            dir = base.join(format!("{}_{}", stamp, suffix));
            suffix += 1;
        }
        Self::create_at(dir)
    }

    fn create_at(dir: PathBuf) -> Result<Self, StorageError> {
        let media_dir = dir.join(MEDIA_SUBDIR);
        fs::create_dir_all(&media_dir).map_err(|e| StorageError::CreateDir {
            path: media_dir.display().to_string(),
            source: e,
        })?;

        let log_path = dir.join(TIMESTAMP_LOG);
        let log = File::create(&log_path).map_err(|e| StorageError::OpenLog {
            path: log_path.display().to_string(),
            source: e,
        })?;

        tracing::info!("recording session started at {}", dir.display());
        Ok(Self {
            dir,
            media_dir,
            next_index: 0,
            log: BufWriter::new(log),
        })
    }

    /// Save one encoded frame and append its timestamp (milliseconds) to the
    /// log. Returns the index the frame was stored under.
    ///
    /// The index only advances when both writes succeed, so a failed save
    /// leaves no gap in the sequence.
    pub fn save(&mut self, payload: &[u8], relative_timestamp: f64) -> Result<u64, StorageError> {
        let index = self.next_index;
        let path = self.media_dir.join(format!("{}.jpg", index));
        fs::write(&path, payload).map_err(|e| StorageError::WriteFrame { index, source: e })?;

        writeln!(self.log, "{:.3}", relative_timestamp * 1000.0).map_err(StorageError::WriteLog)?;

        self.next_index += 1;
        Ok(index)
    }

    /// Number of frames saved so far
    pub fn frames_saved(&self) -> u64 {
        self.next_index
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Flush and close the session
    pub fn finish(mut self) -> Result<(), StorageError> {
        self.log.flush().map_err(StorageError::Close)?;
        tracing::info!(
            "recording session closed: {} frames in {}",
            self.next_index,
            self.dir.display()
        );
        Ok(())
    }
}
