//! Perspective rectification
//!
//! Inverse mapping: every destination pixel is mapped back into the source
//! frame and filled with the nearest source pixel. Destination pixels that
//! land outside the frame stay transparent black.

use image::RgbaImage;

use super::geometry::{CornerSet, Point};
use super::rows::for_each_row;
use crate::config::RectifyMode;

/// Coefficients of the projective map from the unit square onto a quad.
///
/// `x = (h0 u + h1 v + h2) / (h6 u + h7 v + 1)`,
/// `y = (h3 u + h4 v + h5) / (h6 u + h7 v + 1)`, taking
/// `(0,0), (1,0), (1,1), (0,1)` to the four corners in order.
/// `None` when the corners are degenerate.
pub fn square_to_quad(corners: &CornerSet) -> Option<[f64; 9]> {
    let p = corners.points().map(|c| (c.x as f64, c.y as f64));
    let sx = p[0].0 - p[1].0 + p[2].0 - p[3].0;
    let sy = p[0].1 - p[1].1 + p[2].1 - p[3].1;

    let h = if sx == 0.0 && sy == 0.0 {
        // Parallelogram: the map is affine
        [
            p[1].0 - p[0].0,
            p[3].0 - p[0].0,
            p[0].0,
            p[1].1 - p[0].1,
            p[3].1 - p[0].1,
            p[0].1,
            0.0,
            0.0,
            1.0,
        ]
    } else {
        let dx1 = p[1].0 - p[2].0;
        let dx2 = p[3].0 - p[2].0;
        let dy1 = p[1].1 - p[2].1;
        let dy2 = p[3].1 - p[2].1;
        let den = dx1 * dy2 - dx2 * dy1;
        if den.abs() < 1e-9 {
            return None;
        }
        let g = (sx * dy2 - dx2 * sy) / den;
        let k = (dx1 * sy - sx * dy1) / den;
        [
            p[1].0 - p[0].0 + g * p[1].0,
            p[3].0 - p[0].0 + k * p[3].0,
            p[0].0,
            p[1].1 - p[0].1 + g * p[1].1,
            p[3].1 - p[0].1 + k * p[3].1,
            p[0].1,
            g,
            k,
            1.0,
        ]
    };

    h.iter().all(|v| v.is_finite()).then_some(h)
}

/// Destination-to-source coordinate mapping
#[derive(Debug, Clone, Copy)]
enum Mapping {
    Bilinear([Point; 4]),
    Projective([f64; 9]),
}

impl Mapping {
    fn new(corners: &CornerSet, mode: RectifyMode) -> Self {
        match mode {
            RectifyMode::Bilinear => Mapping::Bilinear(*corners.points()),
            RectifyMode::Homography => square_to_quad(corners)
                .map(Mapping::Projective)
                .unwrap_or(Mapping::Bilinear(*corners.points())),
        }
    }

    /// Source position of normalised destination coordinates
    fn map(&self, u: f64, v: f64) -> Option<(f64, f64)> {
        match self {
            Mapping::Bilinear(c) => {
                let w0 = (1.0 - u) * (1.0 - v);
                let w1 = u * (1.0 - v);
                let w2 = u * v;
                let w3 = (1.0 - u) * v;
                let x = c[0].x as f64 * w0 + c[1].x as f64 * w1 + c[2].x as f64 * w2 + c[3].x as f64 * w3;
                let y = c[0].y as f64 * w0 + c[1].y as f64 * w1 + c[2].y as f64 * w2 + c[3].y as f64 * w3;
                Some((x, y))
            }
            Mapping::Projective(h) => {
                let w = h[6] * u + h[7] * v + h[8];
                if w.abs() < f64::EPSILON {
                    return None;
                }
                Some(((h[0] * u + h[1] * v + h[2]) / w, (h[3] * u + h[4] * v + h[5]) / w))
            }
        }
    }
}

/// Warp the quadrilateral `corners` of `image` into a `width` x `height` image
pub fn rectify(image: &RgbaImage, corners: &CornerSet, width: u32, height: u32, mode: RectifyMode) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let mapping = Mapping::new(corners, mode);
    let src: &[u8] = image.as_raw();
    let src_w = image.width() as i64;
    let src_h = image.height() as i64;
    let w = width as usize;

    for_each_row(&mut *out, w * 4, |dy, row| {
        let v = dy as f64 / height as f64;
        for (dx, px) in row.chunks_exact_mut(4).enumerate() {
            let u = dx as f64 / width as f64;
            let Some((x, y)) = mapping.map(u, v) else {
                continue;
            };
            let sx = x.round();
            let sy = y.round();
            if !(0.0..src_w as f64).contains(&sx) || !(0.0..src_h as f64).contains(&sy) {
                continue;
            }
            let offset = (sy as usize * src_w as usize + sx as usize) * 4;
            px.copy_from_slice(&src[offset..offset + 4]);
        }
    });

    out
}
