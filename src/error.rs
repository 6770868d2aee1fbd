//! Library error type
//!
//! Detection failures are never errors: a frame without a card simply yields
//! `None`. Only buffers that contradict their declared dimensions are rejected.

use thiserror::Error;

/// Structural errors raised while building pipeline inputs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Pixel buffer length disagrees with `width * height * 4`
    #[error("pixel buffer size mismatch for {width}x{height} RGBA frame: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    /// Declared dimensions do not fit in memory
    #[error("frame dimensions {width}x{height} overflow the addressable buffer size")]
    DimensionOverflow { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, ScanError>;
