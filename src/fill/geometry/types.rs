//! Core geometry primitives for copper fill
//!
//! Points, axis-aligned extents and the standard pad primitives that
//! obstacles are described with. All coordinates are board units (f64).

use serde::{Deserialize, Serialize};

/// A 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Snap to the database grid so repeated passes produce identical coordinates
    pub fn snapped(&self, grid: f64) -> Point {
        if grid <= 0.0 {
            return *self;
        }
        let factor = 1.0 / grid;
        Point::new((self.x * factor).round() / factor, (self.y * factor).round() / factor)
    }

    /// Rotate about `origin` by `degrees` counter-clockwise
    pub fn rotated(&self, origin: Point, degrees: f64) -> Point {
        if degrees == 0.0 {
            return *self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - origin.x;
        let dy = self.y - origin.y;
        Point::new(origin.x + dx * cos - dy * sin, origin.y + dx * sin + dy * cos)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box: min_x, min_y, max_x, max_y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extents {
    /// Inverted box that any union replaces
    pub const EMPTY: Extents = Extents {
        min_x: f64::MAX,
        min_y: f64::MAX,
        max_x: f64::MIN,
        max_y: f64::MIN,
    };

    /// Build from two corners in any order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut ext = Extents::EMPTY;
        for p in points {
            ext.include_point(*p);
        }
        ext
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.max_x - self.min_x }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.max_y - self.min_y }
    }

    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    pub fn include_point(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grow to cover `other`. Returns true if anything changed.
    pub fn include(&mut self, other: &Extents) -> bool {
        if other.is_empty() {
            return false;
        }
        let before = *self;
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        before != *self
    }

    pub fn union(&self, other: &Extents) -> Extents {
        let mut out = *self;
        out.include(other);
        out
    }

    /// Closed-interval overlap test (touching boxes intersect)
    pub fn intersects(&self, other: &Extents) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// True if `other` lies entirely within this box
    pub fn contains(&self, other: &Extents) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn inflated(&self, amount: f64) -> Extents {
        if self.is_empty() {
            return *self;
        }
        Extents {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    pub fn intersection(&self, other: &Extents) -> Extents {
        let out = Extents {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        if out.is_empty() { Extents::EMPTY } else { out }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }
}

impl Default for Extents {
    fn default() -> Self {
        Extents::EMPTY
    }
}

/// Standard pad primitive, centred on the owning object's position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StandardPrimitive {
    Circle { diameter: f64 },
    Rectangle { width: f64, height: f64 },
    Oval { width: f64, height: f64 },
    RoundRect { width: f64, height: f64, corner_radius: f64 },
    /// Points relative to the pad centre
    CustomPolygon { points: Vec<Point> },
}

impl StandardPrimitive {
    /// Half-size of the unrotated primitive's bounding box
    pub fn half_extent(&self) -> (f64, f64) {
        match self {
            StandardPrimitive::Circle { diameter } => (diameter * 0.5, diameter * 0.5),
            StandardPrimitive::Rectangle { width, height }
            | StandardPrimitive::Oval { width, height }
            | StandardPrimitive::RoundRect { width, height, .. } => (width * 0.5, height * 0.5),
            StandardPrimitive::CustomPolygon { points } => {
                let ext = Extents::from_points(points);
                if ext.is_empty() {
                    (0.0, 0.0)
                } else {
                    (
                        ext.max_x.abs().max(ext.min_x.abs()),
                        ext.max_y.abs().max(ext.min_y.abs()),
                    )
                }
            }
        }
    }

    /// Conservative extents at `center` with rotation applied
    pub fn extents_at(&self, center: Point, rotation: f64) -> Extents {
        let (hx, hy) = self.half_extent();
        let r = if rotation.rem_euclid(90.0) == 0.0 {
            if rotation.rem_euclid(180.0) == 0.0 { (hx, hy) } else { (hy, hx) }
        } else {
            let h = hx.hypot(hy);
            (h, h)
        };
        Extents::new(center.x - r.0, center.y - r.1, center.x + r.0, center.y + r.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_union_and_touching() {
        let a = Extents::new(0.0, 0.0, 1.0, 1.0);
        let b = Extents::new(1.0, 0.0, 2.0, 1.0);
        assert!(a.intersects(&b));
        assert_eq!(a.union(&b), Extents::new(0.0, 0.0, 2.0, 1.0));
        assert!(!Extents::EMPTY.intersects(&a));
    }

    #[test]
    fn test_extents_normalizes_corners() {
        let e = Extents::new(5.0, 4.0, 1.0, 2.0);
        assert_eq!(e.min_x, 1.0);
        assert_eq!(e.max_y, 4.0);
        assert!((e.area() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_snap_is_stable() {
        let p = Point::new(1.23456789, -9.87654321);
        let s = p.snapped(1e-4);
        assert_eq!(s, s.snapped(1e-4));
        assert!((s.x - 1.2346).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_primitive_extents() {
        let rect = StandardPrimitive::Rectangle { width: 4.0, height: 2.0 };
        let e = rect.extents_at(Point::new(10.0, 10.0), 90.0);
        assert!((e.width() - 2.0).abs() < 1e-12);
        assert!((e.height() - 4.0).abs() < 1e-12);
    }
}
