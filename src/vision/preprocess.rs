//! Grayscale conversion and Gaussian smoothing
//!
//! Converts RGBA frames to floating-point luma and suppresses sensor noise
//! with a separable Gaussian. Near the borders the kernel is truncated and
//! renormalised by the weights that actually fall inside the image, so edges
//! of the frame are not darkened the way zero padding would.

use image::{ImageBuffer, Luma, RgbaImage};

use super::rows::for_each_row;

/// Single-channel floating point image
pub type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Convert RGBA pixels to luma (`0.299R + 0.587G + 0.114B`), alpha ignored
pub fn grayscale(image: &RgbaImage) -> GrayF32 {
    let (width, height) = image.dimensions();
    let mut gray = GrayF32::new(width, height);

    for (dst, px) in gray.iter_mut().zip(image.as_raw().chunks_exact(4)) {
        *dst = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
    }

    gray
}

/// Unnormalised 1-D Gaussian weights for offsets `-r..=r`, `r = ceil(3 sigma)`
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(0.0) as i32;
    let denom = 2.0 * sigma * sigma;
    (-radius..=radius)
        .map(|d| (-((d * d) as f32) / denom).exp())
        .collect()
}

/// Separable Gaussian blur with border renormalisation
pub fn gaussian_blur(src: &GrayF32, sigma: f32) -> GrayF32 {
    let (width, height) = src.dimensions();
    if sigma <= 0.0 || width == 0 || height == 0 {
        return src.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let w = width as usize;
    let h = height as usize;

    // Horizontal pass
    let source: &[f32] = src;
    let mut horizontal = GrayF32::new(width, height);
    for_each_row(&mut *horizontal, w, |y, row| {
        let line = &source[y * w..(y + 1) * w];
        for (x, out) in row.iter_mut().enumerate() {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(w - 1);
            let mut acc = 0.0;
            let mut weight = 0.0;
            for sx in lo..=hi {
                let k = kernel[sx + radius - x];
                acc += k * line[sx];
                weight += k;
            }
            *out = acc / weight;
        }
    });

    // Vertical pass
    let source: &[f32] = &horizontal;
    let mut blurred = GrayF32::new(width, height);
    for_each_row(&mut *blurred, w, |y, row| {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(h - 1);
        let mut weight = 0.0;
        for sy in lo..=hi {
            let k = kernel[sy + radius - y];
            weight += k;
            let line = &source[sy * w..(sy + 1) * w];
            for (out, &v) in row.iter_mut().zip(line) {
                *out += k * v;
            }
        }
        for out in row.iter_mut() {
            *out /= weight;
        }
    });

    blurred
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_grayscale_weights() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 0]));
        img.put_pixel(2, 0, Rgba([0, 0, 255, 255]));

        let gray = grayscale(&img);
        assert!((gray.get_pixel(0, 0).0[0] - 76.245).abs() < 1e-3);
        assert!((gray.get_pixel(1, 0).0[0] - 149.685).abs() < 1e-3);
        assert!((gray.get_pixel(2, 0).0[0] - 29.07).abs() < 1e-3);
    }

    #[test]
    fn test_kernel_radius() {
        assert_eq!(gaussian_kernel(1.0).len(), 7);
        assert_eq!(gaussian_kernel(1.5).len(), 11);
        let k = gaussian_kernel(1.0);
        assert!((k[3] - 1.0).abs() < 1e-6);
        assert!((k[0] - k[6]).abs() < 1e-6);
    }

    #[test]
    fn test_blur_preserves_constant_image() {
        // Renormalised borders keep a flat field flat, corners included
        let src = GrayF32::from_pixel(9, 5, Luma([120.0]));
        let blurred = gaussian_blur(&src, 1.0);
        for px in blurred.pixels() {
            assert!((px.0[0] - 120.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_blur_spreads_impulse_symmetrically() {
        let mut src = GrayF32::new(11, 11);
        src.put_pixel(5, 5, Luma([100.0]));
        let blurred = gaussian_blur(&src, 1.0);

        let center = blurred.get_pixel(5, 5).0[0];
        assert!(center < 100.0 && center > 0.0);
        assert!((blurred.get_pixel(4, 5).0[0] - blurred.get_pixel(6, 5).0[0]).abs() < 1e-4);
        assert!((blurred.get_pixel(5, 4).0[0] - blurred.get_pixel(5, 6).0[0]).abs() < 1e-4);

        let total: f32 = blurred.pixels().map(|p| p.0[0]).sum();
        assert!((total - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let mut src = GrayF32::new(3, 3);
        src.put_pixel(1, 1, Luma([42.0]));
        assert_eq!(gaussian_blur(&src, 0.0), src);
    }
}
