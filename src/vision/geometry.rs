//! Planar geometry shared by the detection stages

use serde::{Deserialize, Serialize};

/// Real-valued 2D image coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Bounding box of a point set, `None` when empty
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &points[1..] {
            bounds.include(*p);
        }
        Some(bounds)
    }

    /// Grow the box to contain `p`
    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Width over height, zero for a flat box
    pub fn aspect(&self) -> f32 {
        let h = self.height();
        if h <= f32::EPSILON {
            0.0
        } else {
            self.width() / h
        }
    }
}

/// Four card corners ordered by angle about their centroid.
///
/// For an upright card this is top-left, top-right, bottom-right,
/// bottom-left. Rotated or upside-down cards keep the angular order but the
/// labels no longer match the card's own orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet([Point; 4]);

impl CornerSet {
    /// Order four arbitrary points by angle about their centroid
    pub fn from_unordered(points: [Point; 4]) -> Self {
        let c = centroid(&points);
        let mut ordered = points;
        ordered.sort_by(|a, b| {
            let ta = (a.y - c.y).atan2(a.x - c.x);
            let tb = (b.y - c.y).atan2(b.x - c.x);
            ta.total_cmp(&tb)
        });
        Self(ordered)
    }

    /// Wrap points that are already in corner order
    pub const fn from_ordered(points: [Point; 4]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn top_right(&self) -> Point {
        self.0[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// Enclosed area
    pub fn area(&self) -> f32 {
        polygon_area(&self.0)
    }
}

/// Mean of a point set
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let (sx, sy) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let n = points.len() as f64;
    Point::new((sx / n) as f32, (sy / n) as f32)
}

/// Z component of `(b - a) x (c - b)`
pub fn cross(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

/// Unsigned shoelace area of a closed polygon
pub fn polygon_area(polygon: &[Point]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        sum += polygon[j].x as f64 * polygon[i].y as f64 - polygon[i].x as f64 * polygon[j].y as f64;
        j = i;
    }
    (sum.abs() * 0.5) as f32
}

/// Length of a closed polygon's boundary
pub fn perimeter(polygon: &[Point]) -> f32 {
    let len = polygon.len();
    if len < 2 {
        return 0.0;
    }
    let mut p = 0.0;
    let mut j = len - 1;
    for i in 0..len {
        p += polygon[i].distance(&polygon[j]);
        j = i;
    }
    p
}

/// Distance from `p` to the infinite line through `a` and `b`
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON {
        return p.distance(&a);
    }
    ((p.x - a.x) * dy - (p.y - a.y) * dx).abs() / len
}
