//! Error types for the camera streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capture subsystem errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Unsupported resolution preset: {0}")]
    UnsupportedPreset(String),

    #[error("Frame read failed: {0}")]
    ReadFailed(String),

    #[error("Capture source is not running")]
    NotRunning,
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Invalid quality setting: {0} (expected 1-100)")]
    InvalidQuality(u8),

    #[error("Pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Payload too large for frame header: {0} bytes (max 9999999)")]
    PayloadTooLarge(usize),

    #[error("Timestamp not representable in frame header: {0}")]
    TimestampOutOfRange(f64),

    #[error("Invalid frame header")]
    InvalidHeader,
}

/// Recording storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create session directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to open timestamp log {path}: {source}")]
    OpenLog {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write frame {index}: {source}")]
    WriteFrame { index: u64, source: std::io::Error },

    #[error("Failed to append timestamp log: {0}")]
    WriteLog(std::io::Error),

    #[error("Failed to close session: {0}")]
    Close(std::io::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
