//! OCR (Optical Character Recognition) seam
//!
//! The text recognition engine lives outside this crate. Anything that can
//! turn an image into text plus a confidence implements [`TextRecognizer`],
//! closures included.

use anyhow::Result;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Raw OCR output for one image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcrText {
    /// Recognized text, lines separated by `\n`
    pub text: String,
    /// Recognition confidence (0 - 100)
    pub confidence: f32,
}

impl OcrText {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// External text recognition engine
pub trait TextRecognizer {
    /// Recognize the text in `image`. Called at most once per scan.
    fn recognize(&mut self, image: &RgbaImage) -> Result<OcrText>;
}

impl<F> TextRecognizer for F
where
    F: FnMut(&RgbaImage) -> Result<OcrText>,
{
    fn recognize(&mut self, image: &RgbaImage) -> Result<OcrText> {
        self(image)
    }
}
