//! Polygon boolean and offset engine
//!
//! `BooleanEngine` is the seam the void pipeline talks to; `ClipperEngine`
//! implements it on top of geo-clipper, which scales coordinates onto an
//! integer grid (`1 / grid`) before clipping. Inputs are validated first so
//! numerical trouble surfaces as a `BooleanError` instead of garbage output.

use super::polyset::PolySet;
use super::ring::{Ring, DEFAULT_ARC_TOLERANCE};
use super::types::Point;
use geo_clipper::{Clipper, EndType, JoinType};
use geo_types::MultiPolygon;
use thiserror::Error;

/// Largest scaled coordinate accepted by the integer clipper
const MAX_SCALED_COORD: f64 = 1.0e15;

/// Boolean operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    AndNot,
    Or,
    Xor,
}

/// Corner treatment for offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TrimMode {
    /// Mitred corners; right angles survive, acute spikes are squared off
    #[default]
    Sharp,
    /// Every convex corner is chamfered
    Chamfer,
    /// Arc corners
    Round,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BooleanError {
    #[error("non-finite coordinate in {0} operand")]
    NonFinite(&'static str),
    #[error("coordinate out of clipper range in {0} operand")]
    OutOfRange(&'static str),
    #[error("degenerate operand: {0}")]
    DegenerateInput(String),
    #[error("inconsistent result for {op:?}: area {result:.6} escapes operand bounds (area {bound:.6})")]
    Inconsistent { op: BooleanOp, result: f64, bound: f64 },
}

/// Polygon boolean/offset capability
pub trait BooleanEngine: Send + Sync {
    fn boolean(&self, subject: &PolySet, clip: &PolySet, op: BooleanOp) -> Result<PolySet, BooleanError>;

    /// Grow (positive delta) or shrink (negative delta) closed polygons
    fn offset(&self, shape: &PolySet, delta: f64, trim: TrimMode) -> Result<PolySet, BooleanError>;

    /// Fatten an open polyline into a polygon with round ends
    fn offset_path(&self, points: &[Point], half_width: f64) -> Result<PolySet, BooleanError>;

    /// Resolve overlaps and self-intersections
    fn normalize(&self, shape: &PolySet) -> Result<PolySet, BooleanError> {
        self.boolean(shape, &PolySet::new(), BooleanOp::Or)
    }
}

/// geo-clipper backed engine
#[derive(Debug, Clone)]
pub struct ClipperEngine {
    /// Scale factor onto the integer grid
    pub factor: f64,
    /// Chord tolerance for flattening arcs
    pub arc_tolerance: f64,
    /// Miter limit (multiple of the offset distance) for `TrimMode::Sharp`
    pub miter_limit: f64,
}

impl Default for ClipperEngine {
    fn default() -> Self {
        Self { factor: 1.0e4, arc_tolerance: DEFAULT_ARC_TOLERANCE, miter_limit: 2.0 }
    }
}

impl ClipperEngine {
    pub fn new(grid: f64, arc_tolerance: f64) -> Self {
        Self {
            factor: if grid > 0.0 { 1.0 / grid } else { 1.0e4 },
            arc_tolerance,
            ..Default::default()
        }
    }

    fn validate(&self, shape: &PolySet, role: &'static str) -> Result<(), BooleanError> {
        let check = |ring: &Ring| -> Result<(), BooleanError> {
            for (p, arc) in ring.iter() {
                let c = arc.map(|a| a.center).unwrap_or(p);
                if !p.is_finite() || !c.is_finite() {
                    return Err(BooleanError::NonFinite(role));
                }
                let limit = MAX_SCALED_COORD / self.factor;
                if p.x.abs() > limit || p.y.abs() > limit {
                    return Err(BooleanError::OutOfRange(role));
                }
            }
            Ok(())
        };
        for ring in &shape.rings {
            check(ring)?;
            for hole in &ring.holes {
                check(hole)?;
            }
        }
        Ok(())
    }

    fn join_type(&self, trim: TrimMode) -> JoinType {
        match trim {
            TrimMode::Sharp => JoinType::Miter(self.miter_limit),
            TrimMode::Chamfer => JoinType::Square,
            TrimMode::Round => JoinType::Round(self.arc_tolerance * self.factor),
        }
    }

    fn finish(&self, mp: MultiPolygon<f64>) -> Result<PolySet, BooleanError> {
        let out = PolySet::from_multi_polygon(&mp);
        self.validate(&out, "result")?;
        Ok(out)
    }
}

impl BooleanEngine for ClipperEngine {
    fn boolean(&self, subject: &PolySet, clip: &PolySet, op: BooleanOp) -> Result<PolySet, BooleanError> {
        self.validate(subject, "subject")?;
        self.validate(clip, "clip")?;

        let a = subject.to_multi_polygon(self.arc_tolerance);
        let b = clip.to_multi_polygon(self.arc_tolerance);
        let mp = match op {
            BooleanOp::And => a.intersection(&b, self.factor),
            BooleanOp::AndNot => a.difference(&b, self.factor),
            BooleanOp::Or => a.union(&b, self.factor),
            BooleanOp::Xor => a.xor(&b, self.factor),
        };

        // Output must stay inside the operands' extents, one grid cell of slack
        let ext_a = subject.extents();
        let ext_b = clip.extents();
        let bound = match op {
            BooleanOp::And => ext_a.intersection(&ext_b),
            BooleanOp::AndNot => ext_a,
            BooleanOp::Or | BooleanOp::Xor => ext_a.union(&ext_b),
        };
        let out = self.finish(mp)?;
        let out_ext = out.extents();
        if !out_ext.is_empty() && !bound.inflated(2.0 / self.factor).contains(&out_ext) {
            return Err(BooleanError::Inconsistent { op, result: out.area(), bound: bound.area() });
        }
        Ok(out)
    }

    fn offset(&self, shape: &PolySet, delta: f64, trim: TrimMode) -> Result<PolySet, BooleanError> {
        if !delta.is_finite() {
            return Err(BooleanError::NonFinite("offset distance"));
        }
        self.validate(shape, "offset")?;
        if shape.is_empty() {
            return Ok(PolySet::new());
        }
        let mp = shape.to_multi_polygon(self.arc_tolerance);
        let out = mp.offset(delta, self.join_type(trim), EndType::ClosedPolygon, self.factor);
        self.finish(out)
    }

    fn offset_path(&self, points: &[Point], half_width: f64) -> Result<PolySet, BooleanError> {
        if points.is_empty() {
            return Err(BooleanError::DegenerateInput("empty path".to_string()));
        }
        if !(half_width > 0.0) || !half_width.is_finite() {
            return Err(BooleanError::DegenerateInput(format!("path half width {half_width}")));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(BooleanError::NonFinite("path"));
        }
        // Union of one capsule per segment: a rectangle along it plus a
        // disc on every vertex, which gives round ends and round joins
        let mut pieces = Vec::with_capacity(points.len() * 2);
        for p in points {
            pieces.extend(Ring::circle(*p, half_width));
        }
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let len = a.distance(&b);
            if len <= f64::EPSILON {
                continue;
            }
            let nx = -(b.y - a.y) / len * half_width;
            let ny = (b.x - a.x) / len * half_width;
            let corners = [
                Point::new(a.x - nx, a.y - ny),
                Point::new(b.x - nx, b.y - ny),
                Point::new(b.x + nx, b.y + ny),
                Point::new(a.x + nx, a.y + ny),
            ];
            pieces.extend(Ring::from_points(&corners));
        }
        self.normalize(&PolySet::from_rings(pieces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::geometry::types::Extents;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> PolySet {
        PolySet::from_ring(Ring::rectangle(&Extents::new(x0, y0, x1, y1)).unwrap())
    }

    #[test]
    fn test_and_not_creates_hole() {
        let engine = ClipperEngine::default();
        let out = engine
            .boolean(&rect(0.0, 0.0, 10.0, 10.0), &rect(4.0, 4.0, 6.0, 6.0), BooleanOp::AndNot)
            .unwrap();
        assert_eq!(out.rings.len(), 1);
        assert_eq!(out.hole_count(), 1);
        assert_relative_eq!(out.area(), 96.0, epsilon = 1e-6);
    }

    #[test]
    fn test_or_merges_overlapping() {
        let engine = ClipperEngine::default();
        let out = engine
            .boolean(&rect(0.0, 0.0, 2.0, 2.0), &rect(1.0, 0.0, 3.0, 2.0), BooleanOp::Or)
            .unwrap();
        assert_eq!(out.rings.len(), 1);
        assert_relative_eq!(out.area(), 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_and_not_splits_shape() {
        let engine = ClipperEngine::default();
        let out = engine
            .boolean(&rect(0.0, 0.0, 10.0, 2.0), &rect(4.0, -1.0, 6.0, 3.0), BooleanOp::AndNot)
            .unwrap();
        assert_eq!(out.rings.len(), 2);
    }

    #[test]
    fn test_sharp_offset_round_trips_square() {
        let engine = ClipperEngine::default();
        let square = rect(0.0, 0.0, 10.0, 10.0);
        let shrunk = engine.offset(&square, -1.0, TrimMode::Sharp).unwrap();
        assert_relative_eq!(shrunk.area(), 64.0, epsilon = 1e-6);
        let grown = engine.offset(&shrunk, 1.0, TrimMode::Sharp).unwrap();
        assert!(grown.same_geometry(&square, 1e-6));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let engine = ClipperEngine::default();
        let err = engine.offset(&rect(0.0, 0.0, 1.0, 1.0), f64::NAN, TrimMode::Sharp);
        assert!(matches!(err, Err(BooleanError::NonFinite(_))));
        let huge = rect(0.0, 0.0, 1.0e13, 1.0);
        assert!(matches!(
            engine.boolean(&huge, &PolySet::new(), BooleanOp::Or),
            Err(BooleanError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_offset_path_covers_segment() {
        let engine = ClipperEngine::default();
        let out = engine
            .offset_path(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 1.0)
            .unwrap();
        let ext = out.extents();
        assert_relative_eq!(ext.min_x, -1.0, epsilon = 0.05);
        assert_relative_eq!(ext.max_x, 11.0, epsilon = 0.05);
        assert_relative_eq!(ext.max_y, 1.0, epsilon = 0.01);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out.area(), 20.0 + std::f64::consts::PI, epsilon = 0.01);
    }

    #[test]
    fn test_offset_path_bends_stay_one_polygon() {
        let engine = ClipperEngine::default();
        let path = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let out = engine.offset_path(&path, 0.5).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.hole_count(), 0);
        assert!(out.contains_point(Point::new(10.0, 5.0), 1e-3));
        assert!(out.contains_point(Point::new(5.0, 0.4), 1e-3));
        assert!(!out.contains_point(Point::new(5.0, 5.0), 1e-3));
    }

    #[test]
    fn test_offset_path_single_point_is_disc() {
        let engine = ClipperEngine::default();
        let out = engine.offset_path(&[Point::new(3.0, 3.0)], 1.0).unwrap();
        assert_relative_eq!(out.area(), std::f64::consts::PI, epsilon = 0.01);
    }
}
