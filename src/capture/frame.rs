//! Frame data structures for captured camera content

use image::RgbaImage;
use std::time::Instant;

use crate::error::{Result, ScanError};

/// A single RGBA camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data, row-major RGBA
    image: RgbaImage,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Wrap a raw RGBA buffer.
    ///
    /// Fails fast when the buffer length disagrees with the declared
    /// dimensions. Zero-sized frames are accepted; the pipeline treats them as
    /// "nothing detected".
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(ScanError::DimensionOverflow { width, height })?;

        if data.len() != expected {
            return Err(ScanError::BufferSizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        let image = RgbaImage::from_raw(width, height, data).ok_or(ScanError::BufferSizeMismatch {
            width,
            height,
            expected,
            actual: 0,
        })?;

        Ok(Self::from_image(image))
    }

    /// Wrap an already decoded RGBA image
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Whether the frame holds no pixels at all
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Borrow the underlying image
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA bytes
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_accepts_matching_buffer() {
        let frame = Frame::from_raw(vec![0u8; 3 * 2 * 4], 3, 2).unwrap();
        assert_eq!(frame.dimensions(), (3, 2));
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        let err = Frame::from_raw(vec![0u8; 10], 3, 2).unwrap_err();
        assert_eq!(
            err,
            ScanError::BufferSizeMismatch {
                width: 3,
                height: 2,
                expected: 24,
                actual: 10,
            }
        );
    }

    #[test]
    fn test_from_raw_rejects_long_buffer() {
        assert!(Frame::from_raw(vec![0u8; 25], 3, 2).is_err());
    }

    #[test]
    fn test_zero_sized_frame_is_allowed() {
        let frame = Frame::from_raw(Vec::new(), 0, 0).unwrap();
        assert!(frame.is_empty());
    }
}
