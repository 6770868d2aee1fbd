//! Sub-pixel corner refinement
//!
//! The edge detector leaves a band several pixels wide around the card
//! outline, and the hull of that band sits on its outer rim. Each side is
//! re-fit through the pixels near it and the corners are moved to the
//! intersections of adjacent fitted lines, which centres them on the band.

use super::geometry::{CornerSet, Point};

/// Portion of each side, at either end, ignored as rounded-corner zone
const END_MARGIN: f32 = 0.15;

/// Minimum pixels supporting a side fit
const MIN_SUPPORT: usize = 10;

/// Minimum distance tolerance around a side, in pixels
const MIN_TOLERANCE: f32 = 6.0;

/// Distance tolerance as a fraction of the side length
const TOLERANCE_FRACTION: f32 = 0.03;

/// Minimum |sin| of the angle between adjacent fitted sides (about 10 degrees)
const MIN_SIN: f32 = 0.17;

/// Line through `origin` with unit direction `dir`
#[derive(Debug, Clone, Copy)]
struct Line {
    origin: Point,
    dir: (f32, f32),
}

/// Total least squares line fit: the principal axis of the point cloud
fn fit_line(points: &[Point]) -> Option<Line> {
    if points.len() < MIN_SUPPORT {
        return None;
    }

    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (mx, my) = (sx / n, sy / n);

    let (mut cxx, mut cyy, mut cxy) = (0.0f64, 0.0f64, 0.0f64);
    for p in points {
        let dx = p.x as f64 - mx;
        let dy = p.y as f64 - my;
        cxx += dx * dx;
        cyy += dy * dy;
        cxy += dx * dy;
    }

    let theta = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
    Some(Line {
        origin: Point::new(mx as f32, my as f32),
        dir: (theta.cos() as f32, theta.sin() as f32),
    })
}

fn intersect(a: &Line, b: &Line) -> Option<Point> {
    let denom = a.dir.0 * b.dir.1 - a.dir.1 * b.dir.0;
    if denom.abs() < MIN_SIN {
        return None;
    }
    let wx = b.origin.x - a.origin.x;
    let wy = b.origin.y - a.origin.y;
    let t = (wx * b.dir.1 - wy * b.dir.0) / denom;
    let p = Point::new(a.origin.x + t * a.dir.0, a.origin.y + t * a.dir.1);
    (p.x.is_finite() && p.y.is_finite()).then_some(p)
}

/// Points lying along the middle of side `a -> b`
fn side_support(a: Point, b: Point, points: &[Point]) -> Vec<Point> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return Vec::new();
    }
    let len = len_sq.sqrt();
    let tolerance = MIN_TOLERANCE.max(TOLERANCE_FRACTION * len);

    points
        .iter()
        .copied()
        .filter(|p| {
            let px = p.x - a.x;
            let py = p.y - a.y;
            let t = (px * dx + py * dy) / len_sq;
            let distance = (px * dy - py * dx).abs() / len;
            (END_MARGIN..=1.0 - END_MARGIN).contains(&t) && distance <= tolerance
        })
        .collect()
}

/// Upper bound on fit passes
const MAX_PASSES: usize = 4;

/// Corner movement, in pixels, below which the fit has settled
const SETTLED_SHIFT: f32 = 0.5;

/// One pass: fit each side of `c` and intersect neighbouring lines
fn refit(c: &[Point; 4], points: &[Point]) -> Option<[Point; 4]> {
    let mut lines = Vec::with_capacity(4);
    for i in 0..4 {
        let support = side_support(c[i], c[(i + 1) % 4], points);
        lines.push(fit_line(&support)?);
    }

    let mut refined = [Point::default(); 4];
    for i in 0..4 {
        // Corner i joins side i-1 (ending at it) and side i (starting at it)
        refined[i] = intersect(&lines[(i + 3) % 4], &lines[i])?;
    }
    Some(refined)
}

fn largest_shift(a: &[Point; 4], b: &[Point; 4]) -> f32 {
    a.iter().zip(b).map(|(p, q)| p.distance(q)).fold(0.0, f32::max)
}

/// Re-fit the four sides of `corners` to `points`.
///
/// Passes repeat against the previous pass's corners until no corner moves
/// more than half a pixel. A seed that sits partway along a rounded corner
/// tilts the first pass's support bands; later passes straighten them.
///
/// Returns the refined corners, in the same order, and the largest
/// displacement from `corners`. `None` when the first pass finds a side
/// without support, nearly parallel sides, or a corner moving further than
/// `max_shift_fraction` of the longer diagonal. A later pass failing those
/// checks keeps the previous pass's corners.
pub fn refine_corners(
    corners: &CornerSet,
    points: &[Point],
    max_shift_fraction: f32,
) -> Option<(CornerSet, f32)> {
    let seed = corners.points();
    let diagonal = seed[0].distance(&seed[2]).max(seed[1].distance(&seed[3]));
    let max_shift = max_shift_fraction * diagonal;

    let mut current: Option<([Point; 4], f32)> = None;
    for _ in 0..MAX_PASSES {
        let from = current.map_or(*seed, |(c, _)| c);
        let Some(next) = refit(&from, points) else {
            break;
        };
        let total = largest_shift(&next, seed);
        if total > max_shift {
            break;
        }

        current = Some((next, total));
        if largest_shift(&next, &from) < SETTLED_SHIFT {
            break;
        }
    }

    current.map(|(c, total)| (CornerSet::from_ordered(c), total))
}
