//! Title region cropping and OCR text post-processing

use image::{imageops, RgbaImage};
use thiserror::Error;

use super::ocr::OcrText;
use crate::config::TitleConfig;

/// Why OCR text did not produce a title
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TitleRejection {
    #[error("OCR confidence {confidence:.1} below minimum {minimum:.1}")]
    LowConfidence { confidence: f32, minimum: f32 },

    #[error("no text in the leading lines")]
    NoText,

    #[error("title length {length} outside {min}..={max}")]
    LengthOutOfRange { length: usize, min: usize, max: usize },
}

/// Top band of a rectified card, full width
pub fn crop_title(rectified: &RgbaImage, fraction: f32) -> RgbaImage {
    let (width, height) = rectified.dimensions();
    let band = ((height as f32 * fraction.clamp(0.0, 1.0)).floor() as u32).min(height);
    imageops::crop_imm(rectified, 0, 0, width, band).to_image()
}

/// Centred box covering `width_fraction` x `height_fraction` of a frame
pub fn guide_box(frame: &RgbaImage, width_fraction: f32, height_fraction: f32) -> RgbaImage {
    let (width, height) = frame.dimensions();
    let w = ((width as f32 * width_fraction.clamp(0.0, 1.0)).floor() as u32).min(width);
    let h = ((height as f32 * height_fraction.clamp(0.0, 1.0)).floor() as u32).min(height);
    imageops::crop_imm(frame, (width - w) / 2, (height - h) / 2, w, h).to_image()
}

/// Keep word characters, whitespace and apostrophes; collapse whitespace; lowercase.
///
/// Word characters include Unicode letters and digits, so accented names
/// such as "Lim-Dûl" keep their accents.
pub fn clean_title(line: &str) -> String {
    let kept: String = line
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '\'' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Turn raw OCR output into a candidate card title
pub fn evaluate_title(ocr: &OcrText, config: &TitleConfig) -> Result<String, TitleRejection> {
    if ocr.confidence < config.min_confidence {
        return Err(TitleRejection::LowConfidence {
            confidence: ocr.confidence,
            minimum: config.min_confidence,
        });
    }

    let line = ocr
        .text
        .lines()
        .take(config.max_lines)
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(TitleRejection::NoText)?;

    let title = clean_title(line);
    let length = title.chars().count();
    if length < config.min_length || length > config.max_length {
        return Err(TitleRejection::LengthOutOfRange {
            length,
            min: config.min_length,
            max: config.max_length,
        });
    }

    Ok(title)
}
