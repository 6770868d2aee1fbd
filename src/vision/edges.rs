//! Sobel edge detection with single-pass hysteresis
//!
//! A simplified Canny: no non-maximum suppression, and weak responses are
//! promoted only when one of their direct 8-neighbours is strong.

use image::GrayImage;

use super::preprocess::GrayF32;
use super::rows::for_each_row;
use crate::config::EdgeConfig;

/// Edge map value for edge pixels
pub const EDGE: u8 = 255;

/// Sobel gradient magnitude; the one-pixel border is left at zero
pub fn gradient_magnitude(src: &GrayF32) -> Vec<f32> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let mut magnitude = vec![0.0f32; w * h];
    if w < 3 || h < 3 {
        return magnitude;
    }

    let s: &[f32] = src;
    for_each_row(&mut magnitude, w, |y, row| {
        if y == 0 || y == h - 1 {
            return;
        }
        let up = &s[(y - 1) * w..y * w];
        let mid = &s[y * w..(y + 1) * w];
        let down = &s[(y + 1) * w..(y + 2) * w];

        for x in 1..w - 1 {
            let gx = (up[x + 1] + 2.0 * mid[x + 1] + down[x + 1])
                - (up[x - 1] + 2.0 * mid[x - 1] + down[x - 1]);
            let gy = (down[x - 1] + 2.0 * down[x] + down[x + 1])
                - (up[x - 1] + 2.0 * up[x] + up[x + 1]);
            row[x] = (gx * gx + gy * gy).sqrt();
        }
    });

    magnitude
}

/// Binary (0/255) edge map of a blurred grayscale image
pub fn detect_edges(src: &GrayF32, config: &EdgeConfig) -> GrayImage {
    let (width, height) = src.dimensions();
    let w = width as usize;
    let h = height as usize;
    let mut edges = GrayImage::new(width, height);
    if w < 3 || h < 3 {
        return edges;
    }

    let magnitude = gradient_magnitude(src);
    let m: &[f32] = &magnitude;
    let low = config.low_threshold;
    let high = config.high_threshold;

    for_each_row(&mut *edges, w, |y, row| {
        if y == 0 || y == h - 1 {
            return;
        }
        for x in 1..w - 1 {
            let value = m[y * w + x];
            let is_edge = if value > high {
                true
            } else if value > low {
                has_strong_neighbor(m, w, x, y, high)
            } else {
                false
            };
            if is_edge {
                row[x] = EDGE;
            }
        }
    });

    edges
}

/// Whether any 8-neighbour of an interior pixel exceeds `high`
fn has_strong_neighbor(magnitude: &[f32], w: usize, x: usize, y: usize, high: f32) -> bool {
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if (nx != x || ny != y) && magnitude[ny * w + nx] > high {
                return true;
            }
        }
    }
    false
}

/// Number of edge pixels in a map
pub fn count_edges(edges: &GrayImage) -> usize {
    edges.iter().filter(|&&v| v == EDGE).count()
}
