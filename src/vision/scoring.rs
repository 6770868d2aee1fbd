//! Rectangularity scoring and candidate selection
//!
//! Every retained contour is wrapped in its convex hull, simplified at each
//! epsilon of the sweep, and the resulting polygons are scored on size,
//! convexity, vertex count, aspect ratio and fill. The highest score wins;
//! on ties the earliest polygon (largest contour, smallest epsilon) is kept.

use serde::Serialize;

use super::contours::Contour;
use super::geometry::{cross, perimeter, polygon_area, Bounds, Point};
use super::hull::{convex_hull, reduce_to_quad};
use super::simplify::simplify_closed;
use crate::config::{DetectionConfig, ScoringConfig};
use crate::events::{EventSink, ScanEvent};

/// Individual score components, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub size: f32,
    pub convexity: f32,
    pub quad: f32,
    pub aspect: f32,
    pub fill: f32,
    /// Weighted sum, clamped to `[0, 1]`
    pub total: f32,
}

/// Fraction of turns sharing the dominant direction, less 0.1 per vertex beyond four
pub fn convexity_score(polygon: &[Point]) -> f32 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }

    let mut positive = 0usize;
    let mut negative = 0usize;
    for i in 0..n {
        let c = cross(polygon[i], polygon[(i + 1) % n], polygon[(i + 2) % n]);
        if c > 0.0 {
            positive += 1;
        } else if c < 0.0 {
            negative += 1;
        }
    }

    let dominant = positive.max(negative) as f32 / n as f32;
    let excess = n.saturating_sub(4) as f32 * 0.1;
    (dominant - excess).clamp(0.0, 1.0)
}

/// Full marks up to six vertices, less 0.1 per vertex beyond
pub fn quad_score(vertices: usize) -> f32 {
    (1.0 - vertices.saturating_sub(6) as f32 * 0.1).clamp(0.0, 1.0)
}

/// Closeness of a width/height ratio to the card aspect
pub fn aspect_score(ratio: f32, config: &ScoringConfig) -> f32 {
    if ratio < config.min_aspect || ratio > config.max_aspect || config.target_aspect <= 0.0 {
        return 0.0;
    }
    let deviation = (ratio - config.target_aspect).abs() / config.target_aspect;
    (1.0 - 0.5 * deviation).max(0.3)
}

/// Score a simplified polygon against an image of `width` x `height`
pub fn score_polygon(polygon: &[Point], width: u32, height: u32, config: &ScoringConfig) -> ScoreBreakdown {
    let Some(bounds) = Bounds::of(polygon) else {
        return ScoreBreakdown::default();
    };
    let image_area = width as f32 * height as f32;
    let bbox_area = bounds.area();
    if image_area <= 0.0 || bbox_area <= 0.0 {
        return ScoreBreakdown::default();
    }

    let size_ratio = bbox_area / image_area;
    let size = size_ratio.clamp(0.0, 1.0);
    let convexity = convexity_score(polygon);
    let quad = quad_score(polygon.len());
    let aspect = aspect_score(bounds.aspect(), config);
    let fill = (1.2 * polygon_area(polygon) / bbox_area).min(1.0);

    let total = if size_ratio < config.min_size_fraction {
        0.0
    } else {
        (config.size_weight * size
            + config.convexity_weight * convexity
            + config.quad_weight * quad
            + config.aspect_weight * aspect
            + config.fill_weight * fill)
            .clamp(0.0, 1.0)
    };

    ScoreBreakdown {
        size,
        convexity,
        quad,
        aspect,
        fill,
        total,
    }
}

/// Best quadrilateral found so far
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index into the retained contour list
    pub contour: usize,
    /// Reduced four-corner polygon, unordered
    pub polygon: [Point; 4],
    /// Area of the simplified polygon before reduction
    pub area: f32,
    pub score: f32,
    /// Absolute Douglas-Peucker tolerance that produced the polygon
    pub epsilon: f32,
    /// Vertex count of the simplified polygon
    pub vertices: usize,
}

/// Sweep every contour and epsilon, returning the best-scoring quadrilateral.
///
/// Each improvement is reported as [`ScanEvent::CandidateAccepted`].
pub fn select_candidate(
    contours: &[Contour],
    width: u32,
    height: u32,
    detection: &DetectionConfig,
    scoring: &ScoringConfig,
    sink: &dyn EventSink,
) -> Option<Candidate> {
    let min_area = scoring.min_area_fraction * width as f32 * height as f32;
    let mut best: Option<Candidate> = None;

    for (index, contour) in contours.iter().enumerate() {
        let hull = convex_hull(&contour.points);
        if hull.len() < 3 {
            continue;
        }
        let hull_perimeter = perimeter(&hull);

        for &fraction in &detection.epsilon_fractions {
            let epsilon = fraction * hull_perimeter;
            let polygon = simplify_closed(&hull, epsilon);
            let vertices = polygon.len();
            if vertices < detection.min_vertices || vertices > detection.max_vertices {
                continue;
            }

            let area = polygon_area(&polygon);
            if area <= min_area {
                continue;
            }

            let score = score_polygon(&polygon, width, height, scoring).total;
            if best.as_ref().is_some_and(|b| score <= b.score) {
                continue;
            }
            let Some(quad) = reduce_to_quad(&polygon) else {
                continue;
            };

            sink.emit(ScanEvent::CandidateAccepted {
                contour: index,
                epsilon,
                vertices,
                score,
                area,
            });
            best = Some(Candidate {
                contour: index,
                polygon: quad,
                area,
                score,
                epsilon,
                vertices,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crossbeam_channel::unbounded;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    fn outline_contour(x0: i32, y0: i32, x1: i32, y1: i32) -> Contour {
        let mut points = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                if x == x0 || x == x1 || y == y0 || y == y1 {
                    points.push(Point::new(x as f32, y as f32));
                }
            }
        }
        let bounds = Bounds::of(&points).unwrap();
        Contour { points, bounds }
    }

    #[test]
    fn test_axis_aligned_rectangle_is_fully_convex() {
        assert_eq!(convexity_score(&rect(0.0, 0.0, 30.0, 20.0)), 1.0);
        let mut reversed = rect(0.0, 0.0, 30.0, 20.0);
        reversed.reverse();
        assert_eq!(convexity_score(&reversed), 1.0);
    }

    #[test]
    fn test_concave_polygon_loses_convexity() {
        let arrow = [
            Point::new(0.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(40.0, 0.0),
            Point::new(20.0, 40.0),
        ];
        assert!((convexity_score(&arrow) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_component_scores() {
        assert_eq!(quad_score(4), 1.0);
        assert_eq!(quad_score(6), 1.0);
        assert!((quad_score(9) - 0.7).abs() < 1e-6);

        let config = ScoringConfig::default();
        assert_eq!(aspect_score(0.716, &config), 1.0);
        assert_eq!(aspect_score(0.2, &config), 0.0);
        assert_eq!(aspect_score(3.5, &config), 0.0);
        assert_eq!(aspect_score(2.9, &config), 0.3);
    }

    #[test]
    fn test_tiny_polygon_scores_zero() {
        let score = score_polygon(&rect(0.0, 0.0, 10.0, 10.0), 400, 300, &ScoringConfig::default());
        assert_eq!(score.total, 0.0);
        assert_eq!(score.convexity, 1.0);
    }

    #[test]
    fn test_card_shaped_polygon_scores_high() {
        let score = score_polygon(&rect(50.0, 20.0, 330.0, 410.0), 400, 420, &ScoringConfig::default());
        assert!(score.total > 0.9, "{:?}", score);
        assert!(score.total <= 1.0);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 4000) as f32 / 10.0
        };
        let config = ScoringConfig::default();
        for n in 3..14 {
            for _ in 0..50 {
                let polygon: Vec<Point> = (0..n).map(|_| Point::new(next(), next())).collect();
                let s = score_polygon(&polygon, 400, 400, &config);
                for v in [s.size, s.convexity, s.quad, s.aspect, s.fill, s.total] {
                    assert!((0.0..=1.0).contains(&v), "{:?}", s);
                }
            }
        }
    }

    #[test]
    fn test_select_candidate_prefers_card_outline() {
        let contours = vec![outline_contour(60, 40, 260, 320), outline_contour(300, 20, 380, 100)];
        let (tx, rx) = unbounded();
        let candidate = select_candidate(
            &contours,
            400,
            400,
            &DetectionConfig::default(),
            &ScoringConfig::default(),
            &tx,
        )
        .unwrap();

        assert_eq!(candidate.contour, 0);
        assert_eq!(candidate.vertices, 4);
        assert!((candidate.epsilon - 9.6).abs() < 1e-4);
        assert!((candidate.area - 200.0 * 280.0).abs() < 1e-2);

        // Later epsilons yield the same polygon and are not an improvement
        let events: Vec<ScanEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ScanEvent::CandidateAccepted { contour: 0, vertices: 4, .. }));
    }

    #[test]
    fn test_select_candidate_requires_minimum_area() {
        let contours = vec![outline_contour(10, 10, 40, 50)];
        let found = select_candidate(
            &contours,
            400,
            400,
            &DetectionConfig::default(),
            &ScoringConfig::default(),
            &NullSink,
        );
        assert!(found.is_none());
    }
}
