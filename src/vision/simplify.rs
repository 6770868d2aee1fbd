//! Douglas-Peucker polygon simplification
//!
//! Iterative: pending index ranges live on an explicit work stack so deep or
//! adversarial inputs cannot exhaust the call stack.

use super::geometry::{perpendicular_distance, Point};

/// Simplify an open polyline, always keeping its first and last points
pub fn simplify(points: &[Point], epsilon: f32) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let a = points[start];
        let b = points[end];
        let mut max_dist = 0.0f32;
        let mut split = start;
        for (i, p) in points.iter().enumerate().take(end).skip(start + 1) {
            let d = perpendicular_distance(*p, a, b);
            if d > max_dist {
                max_dist = d;
                split = i;
            }
        }

        if max_dist > epsilon {
            keep[split] = true;
            stack.push((split, end));
            stack.push((start, split));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Index of the ring point farthest from `from`, and its distance
fn farthest(ring: &[Point], from: Point) -> (usize, f32) {
    ring.iter()
        .enumerate()
        .map(|(i, p)| (i, from.distance(p)))
        .fold((0, 0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best })
}

/// Simplify a closed ring.
///
/// The ring is split at an approximately diametral pair: the point farthest
/// from the first point, and the point farthest from that one. Both halves
/// are simplified as open polylines and joined back together, starting at
/// the first split point.
pub fn simplify_closed(ring: &[Point], epsilon: f32) -> Vec<Point> {
    let n = ring.len();
    if n < 3 {
        return ring.to_vec();
    }

    let (start, _) = farthest(ring, ring[0]);
    let (end, span) = farthest(ring, ring[start]);
    if span <= epsilon {
        return vec![ring[start]];
    }

    let rotated: Vec<Point> = ring[start..].iter().chain(&ring[..start]).copied().collect();
    let far = (end + n - start) % n;
    let origin = rotated[0];

    let first = simplify(&rotated[..=far], epsilon);

    let mut tail: Vec<Point> = rotated[far..].to_vec();
    tail.push(origin);
    let second = simplify(&tail, epsilon);

    let mut result = first;
    // Skip the shared split point and the closing repeat of the origin
    result.extend_from_slice(&second[1..second.len() - 1]);
    result
}
