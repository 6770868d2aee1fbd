//! Connected-component contour extraction
//!
//! Flood fills the edge map with an explicit worklist and 8-connectivity.
//! The resulting point sets are unordered: their sequence only reflects the
//! traversal, not adjacency along the boundary.

use image::GrayImage;

use super::geometry::{Bounds, Point};
use crate::config::ContourConfig;

/// Offsets of the 8-connected neighbourhood (x, y)
const NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// One connected set of edge pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    /// Pixel coordinates in traversal order
    pub points: Vec<Point>,
    /// Bounding box of `points`
    pub bounds: Bounds,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Flood fill every connected component of non-zero pixels
pub fn trace_contours(edges: &GrayImage) -> Vec<Contour> {
    let w = edges.width() as usize;
    let h = edges.height() as usize;
    let data: &[u8] = edges;

    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();
    let mut contours = Vec::new();

    for seed in 0..w * h {
        if data[seed] == 0 || visited[seed] {
            continue;
        }

        visited[seed] = true;
        stack.push(seed);
        let mut points = Vec::new();
        let mut bounds = Bounds {
            min_x: (seed % w) as f32,
            min_y: (seed / w) as f32,
            max_x: (seed % w) as f32,
            max_y: (seed / w) as f32,
        };

        while let Some(idx) = stack.pop() {
            let x = (idx % w) as i32;
            let y = (idx / w) as i32;
            let p = Point::new(x as f32, y as f32);
            bounds.include(p);
            points.push(p);

            for (dx, dy) in NEIGHBORHOOD {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if data[n] != 0 && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        contours.push(Contour { points, bounds });
    }

    contours
}

/// Keep contours large enough and card-shaped enough to be worth simplifying,
/// largest first
pub fn filter_contours(
    contours: Vec<Contour>,
    width: u32,
    height: u32,
    config: &ContourConfig,
) -> Vec<Contour> {
    let image_area = width as f32 * height as f32;
    let min_points = (config.min_points as f32).max(config.min_area_fraction * image_area);
    let min_width = config.min_extent_fraction * width as f32;
    let min_height = config.min_extent_fraction * height as f32;

    let mut retained: Vec<Contour> = contours
        .into_iter()
        .filter(|c| {
            let aspect = c.bounds.aspect();
            c.len() as f32 > min_points
                && c.bounds.width() > min_width
                && c.bounds.height() > min_height
                && aspect >= config.min_aspect
                && aspect <= config.max_aspect
        })
        .collect();

    retained.sort_by(|a, b| b.len().cmp(&a.len()));
    retained
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn outline(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for x in x0..=x1 {
            img.put_pixel(x, y0, Luma([255]));
            img.put_pixel(x, y1, Luma([255]));
        }
        for y in y0..=y1 {
            img.put_pixel(x0, y, Luma([255]));
            img.put_pixel(x1, y, Luma([255]));
        }
    }

    #[test]
    fn test_empty_map_has_no_contours() {
        assert!(trace_contours(&GrayImage::new(20, 20)).is_empty());
        assert!(trace_contours(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn test_components_are_separated() {
        let mut img = GrayImage::new(30, 30);
        outline(&mut img, 2, 2, 10, 10);
        outline(&mut img, 15, 15, 25, 28);

        let contours = trace_contours(&img);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].len(), 32);
        assert_eq!(contours[0].bounds.min_x, 2.0);
        assert_eq!(contours[0].bounds.max_y, 10.0);
        assert_eq!(contours[1].len(), 2 * 11 + 2 * 12);
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mut img = GrayImage::new(6, 6);
        for i in 0..6 {
            img.put_pixel(i, i, Luma([255]));
        }
        let contours = trace_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 6);
    }

    #[test]
    fn test_filter_rejects_small_and_elongated() {
        let mut img = GrayImage::new(200, 200);
        // Card-shaped outline: 101 x 141, 480 pixels
        outline(&mut img, 20, 20, 120, 160);
        // Tiny outline
        outline(&mut img, 150, 10, 160, 20);
        // Long thin outline, aspect far above 2
        outline(&mut img, 130, 180, 195, 190);

        let traced = trace_contours(&img);
        assert_eq!(traced.len(), 3);

        let retained = filter_contours(traced, 200, 200, &ContourConfig::default());
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].bounds.min_x, 20.0);
    }

    #[test]
    fn test_filter_sorts_by_size() {
        let mut img = GrayImage::new(300, 300);
        outline(&mut img, 10, 10, 100, 120);
        outline(&mut img, 140, 20, 290, 250);

        let retained = filter_contours(trace_contours(&img), 300, 300, &ContourConfig::default());
        assert_eq!(retained.len(), 2);
        assert!(retained[0].len() > retained[1].len());
        assert_eq!(retained[0].bounds.min_x, 140.0);
    }
}
