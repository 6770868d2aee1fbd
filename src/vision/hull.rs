//! Convex hull and quadrilateral reduction

use std::f32::consts::FRAC_PI_2;

use super::geometry::{centroid, Bounds, Point};

/// Orientation of `r` relative to the directed line `p -> q`.
///
/// Evaluated in f64: pixel coordinates of large frames overflow the exact
/// integer range of f32 products.
fn orient(p: Point, q: Point, r: Point) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    (q.x as f64 - px) * (r.y as f64 - py) - (q.y as f64 - py) * (r.x as f64 - px)
}

fn distance_sq(a: Point, b: Point) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    dx * dx + dy * dy
}

/// Gift-wrapping convex hull, O(n * h).
///
/// Starts at the leftmost point (topmost on ties). Collinear points on a
/// hull edge are skipped, so an axis-aligned pixel rectangle yields exactly
/// its four corners.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let Some(start) = points
        .iter()
        .copied()
        .reduce(|best, p| if (p.x, p.y) < (best.x, best.y) { p } else { best })
    else {
        return Vec::new();
    };

    let mut hull = vec![start];
    let mut current = start;

    for _ in 0..points.len() {
        let mut next: Option<Point> = None;
        for &r in points {
            if r == current {
                continue;
            }
            next = match next {
                None => Some(r),
                Some(q) => {
                    let o = orient(current, q, r);
                    if o < 0.0 || (o == 0.0 && distance_sq(current, r) > distance_sq(current, q)) {
                        Some(r)
                    } else {
                        Some(q)
                    }
                }
            };
        }

        match next {
            Some(q) if q != start => {
                hull.push(q);
                current = q;
            }
            _ => break,
        }
    }

    hull
}

/// Quadrant index of an offset from the centroid, in image coordinates:
/// 0 = top-left, 1 = top-right, 2 = bottom-right, 3 = bottom-left
fn quadrant(dx: f32, dy: f32) -> usize {
    let angle = dy.atan2(dx);
    if angle < -FRAC_PI_2 {
        0
    } else if angle < 0.0 {
        1
    } else if angle < FRAC_PI_2 {
        2
    } else {
        3
    }
}

/// Reduce a polygon to four corners.
///
/// A polygon whose hull already has four vertices keeps them. Otherwise the
/// farthest point from the centroid is taken in each angular quadrant; an
/// empty quadrant borrows the midpoint of its two neighbours, or the
/// matching bounding-box corner when a neighbour is empty too.
///
/// Returns `None` only for an empty input.
pub fn reduce_to_quad(points: &[Point]) -> Option<[Point; 4]> {
    let bounds = Bounds::of(points)?;
    let hull = convex_hull(points);
    if let Ok(quad) = <[Point; 4]>::try_from(hull.as_slice()) {
        return Some(quad);
    }

    let c = centroid(&hull);
    let mut best: [Option<(Point, f32)>; 4] = [None; 4];
    for &p in &hull {
        let q = quadrant(p.x - c.x, p.y - c.y);
        let d = p.distance(&c);
        if best[q].map_or(true, |(_, bd)| d > bd) {
            best[q] = Some((p, d));
        }
    }

    let fallback = [
        Point::new(bounds.min_x, bounds.min_y),
        Point::new(bounds.max_x, bounds.min_y),
        Point::new(bounds.max_x, bounds.max_y),
        Point::new(bounds.min_x, bounds.max_y),
    ];

    let mut quad = [Point::default(); 4];
    for i in 0..4 {
        quad[i] = match best[i] {
            Some((p, _)) => p,
            None => match (best[(i + 3) % 4], best[(i + 1) % 4]) {
                (Some((a, _)), Some((b, _))) => a.midpoint(&b),
                _ => fallback[i],
            },
        };
    }

    Some(quad)
}
