//! Fragment cleaning and smoothing
//!
//! Cleaning drops fragments below the minimum area. Smoothing is a
//! morphological opening by the minimum aperture: necks thinner than the
//! aperture are cut, slivers vanish, and nothing is ever added back that
//! the voided shape did not already have.
//!
//! Circles lose their arcs going through the integer clipper, so circular
//! holes and islands seen before smoothing are put back as exact arcs.

use super::context::InstanceContext;
use super::error::{VoidError, VoidResult};
use crate::fill::geometry::{BooleanOp, Direction, Extents, Point, PolySet, Ring, TrimMode};
use tracing::debug;

/// Drop fragments whose net area is below `min_area`
pub fn clean_fragments(fragments: PolySet, ctx: &mut InstanceContext<'_>) -> VoidResult<PolySet> {
    let min_area = ctx.params.min_area;
    if fragments.is_empty() || min_area <= 0.0 {
        return Ok(fragments);
    }
    let before = fragments.len();
    let rings: Vec<Ring> = fragments.rings.into_iter().filter(|r| r.net_area() >= min_area).collect();
    ctx.stats.fragments_filtered += before - rings.len();
    if rings.is_empty() {
        debug!("[Smooth] All {before} fragments below minimum area");
        return Err(VoidError::NoShapesLeft);
    }
    Ok(PolySet::from_rings(rings))
}

/// Exact circles recorded before the shape goes through the clipper
#[derive(Debug, Default)]
struct ArcTracker {
    holes: Vec<(Point, f64)>,
    islands: Vec<(Point, f64)>,
}

impl ArcTracker {
    fn scan(shape: &PolySet) -> Self {
        let mut tracker = ArcTracker::default();
        for ring in &shape.rings {
            if ring.holes.is_empty() {
                if let Some(c) = ring.as_circle() {
                    tracker.islands.push(c);
                }
            }
            tracker.holes.extend(ring.holes.iter().filter_map(Ring::as_circle));
        }
        tracker
    }

    fn is_empty(&self) -> bool {
        self.holes.is_empty() && self.islands.is_empty()
    }

    fn matches(ring: &Ring, (center, radius): (Point, f64), slack: f64) -> bool {
        let ext = ring.extents();
        let want = Extents::new(center.x - radius, center.y - radius, center.x + radius, center.y + radius);
        (ext.min_x - want.min_x).abs() <= slack
            && (ext.min_y - want.min_y).abs() <= slack
            && (ext.max_x - want.max_x).abs() <= slack
            && (ext.max_y - want.max_y).abs() <= slack
    }

    /// Swap polygonized circles back to arcs. Islands that collapsed under
    /// the opening come back if they are large enough to keep.
    fn restore(&self, shape: &mut PolySet, slack: f64, min_area: f64) {
        for ring in &mut shape.rings {
            let mut restored: Vec<(usize, Point, f64)> = Vec::new();
            for (index, hole) in ring.holes.iter_mut().enumerate() {
                if hole.has_arcs() {
                    continue;
                }
                if let Some(&(c, r)) = self.holes.iter().find(|&&circle| Self::matches(hole, circle, slack)) {
                    if let Some(mut exact) = Ring::circle(c, r) {
                        exact.set_direction(Direction::Clockwise);
                        exact.flags = hole.flags;
                        *hole = exact;
                        restored.push((index, c, r));
                    }
                }
            }
            if restored.is_empty() {
                continue;
            }
            // Holes swallowed by a restored circle would overlap it
            let holes = std::mem::take(&mut ring.holes);
            ring.holes = holes
                .into_iter()
                .enumerate()
                .filter(|(index, h)| {
                    restored.iter().any(|(i, _, _)| i == index)
                        || !restored.iter().any(|&(_, c, r)| within_circle(h, c, r + slack))
                })
                .map(|(_, h)| h)
                .collect();
        }
        for &(c, r) in &self.islands {
            let existing = shape
                .rings
                .iter_mut()
                .find(|ring| ring.holes.is_empty() && Self::matches(ring, (c, r), slack));
            match existing {
                Some(ring) => {
                    if let Some(exact) = Ring::circle(c, r) {
                        *ring = exact;
                    }
                }
                None => {
                    if let Some(exact) = Ring::circle(c, r).filter(|e| e.area() >= min_area) {
                        shape.rings.push(exact);
                    }
                }
            }
        }
    }
}

/// Every vertex of `ring` lies within `radius` of `center`
fn within_circle(ring: &Ring, center: Point, radius: f64) -> bool {
    ring.points().iter().all(|p| p.distance(&center) <= radius)
}

/// Open `shape` by the minimum aperture and clip it to `keepin`
pub fn smooth(shape: &PolySet, keepin: Option<&PolySet>, ctx: &mut InstanceContext<'_>) -> VoidResult<PolySet> {
    let params = &ctx.params;
    let engine = ctx.engine;
    let half = params.min_aperture * 0.5;
    let grid = params.grid;

    let mut out = if half > 0.0 {
        let tracker = ArcTracker::scan(shape);
        let contracted = engine.offset(shape, -half, TrimMode::Sharp)?;
        let normalized = engine.normalize(&contracted)?;
        let expanded = engine.offset(&normalized, half, params.trim_mode)?;

        // Expansion can bridge across voids it should not; those bridges go.
        // Chord slivers between the two flattenings of one arc are noise.
        let sliver = params.min_area.max(params.min_aperture * grid);
        let mut reconnect = engine.boolean(&expanded, shape, BooleanOp::AndNot)?;
        reconnect.rings.retain(|r| r.net_area() >= sliver);
        let mut opened = if reconnect.is_empty() {
            expanded
        } else {
            ctx.stats.reconnects_removed += reconnect.len();
            debug!("[Smooth] Removing {} reconnect areas", reconnect.len());
            engine.boolean(&expanded, &reconnect, BooleanOp::AndNot)?
        };
        if !tracker.is_empty() {
            tracker.restore(&mut opened, half + 2.0 * params.arc_tolerance + grid, params.min_area);
        }
        opened
    } else {
        shape.clone()
    };

    if let Some(keepin) = keepin {
        out = engine.boolean(&out, keepin, BooleanOp::And)?;
    }
    out.remove_collinear(grid);
    out.snap(grid);
    if out.is_empty() && !shape.is_empty() {
        return Err(VoidError::NoShapesLeft);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::geometry::{BooleanEngine, ClipperEngine};
    use crate::fill::voiding::context::CancelFlag;
    use crate::fill::voiding::params::VoidParams;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
        Ring::rectangle(&Extents::new(x0, y0, x1, y1)).unwrap()
    }

    #[test]
    fn test_square_survives_smoothing() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let shape = PolySet::from_ring(rect(0.0, 0.0, 100.0, 100.0));
        let out = smooth(&shape, None, &mut ctx).unwrap();
        assert!(out.same_geometry(&shape, 1e-3));
    }

    #[test]
    fn test_thin_neck_is_cut() {
        let engine = ClipperEngine::default();
        let params = VoidParams { min_aperture: 1.0, ..Default::default() };
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        // Two 10x10 pads joined by a 0.4 wide neck
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(20.0, 0.0, 30.0, 10.0);
        let neck = rect(10.0, 4.8, 20.0, 5.2);
        let joined = engine
            .boolean(&PolySet::from_rings(vec![a, b]), &PolySet::from_ring(neck), BooleanOp::Or)
            .unwrap();
        assert_eq!(joined.len(), 1);
        let out = smooth(&joined, None, &mut ctx).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.area() <= joined.area() + 1e-6);
    }

    #[test]
    fn test_circular_hole_restored_as_arc() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let mut outer = rect(0.0, 0.0, 50.0, 50.0);
        let mut hole = Ring::circle(Point::new(25.0, 25.0), 3.0).unwrap();
        hole.set_direction(Direction::Clockwise);
        outer.holes.push(hole);
        let out = smooth(&PolySet::from_ring(outer), None, &mut ctx).unwrap();
        assert_eq!(out.hole_count(), 1);
        let (c, r) = out.rings[0].holes[0].as_circle().unwrap();
        assert_eq!(c, Point::new(25.0, 25.0));
        assert_relative_eq!(r, 3.0);
        assert_eq!(ctx.stats.reconnects_removed, 0);
    }

    #[test]
    fn test_restored_circles_leave_no_inner_holes() {
        let engine = ClipperEngine::default();
        let params = VoidParams { min_aperture: 0.5, ..Default::default() };
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        let mut outer = rect(0.0, 0.0, 50.0, 50.0);
        for (x, r) in [(10.0, 1.1), (25.0, 3.0), (40.0, 0.7)] {
            let mut hole = Ring::circle(Point::new(x, 25.0), r).unwrap();
            hole.set_direction(Direction::Clockwise);
            outer.holes.push(hole);
        }
        let out = smooth(&PolySet::from_ring(outer), None, &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.hole_count(), 3);
        assert!(out.rings[0].holes.iter().all(|h| h.as_circle().is_some()));
    }

    #[test]
    fn test_stray_hole_inside_restored_circle_dropped() {
        let tracker = ArcTracker { holes: vec![(Point::new(5.0, 5.0), 2.0)], islands: Vec::new() };
        let mut outer = rect(0.0, 0.0, 10.0, 10.0);
        let mut polygonized = Ring::from_points(&Ring::circle(Point::new(5.0, 5.0), 2.0).unwrap().flatten(0.01)).unwrap();
        polygonized.set_direction(Direction::Clockwise);
        let mut stray = rect(4.9, 6.0, 4.95, 6.05);
        stray.set_direction(Direction::Clockwise);
        outer.holes = vec![polygonized, stray];
        let mut shape = PolySet::from_ring(outer);
        tracker.restore(&mut shape, 0.05, 0.01);
        assert_eq!(shape.hole_count(), 1);
        assert_eq!(shape.rings[0].holes[0].as_circle(), Some((Point::new(5.0, 5.0), 2.0)));
    }

    #[test]
    fn test_keepin_clips_result() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let shape = PolySet::from_ring(rect(0.0, 0.0, 100.0, 100.0));
        let keepin = PolySet::from_ring(rect(0.0, 0.0, 60.0, 100.0));
        let out = smooth(&shape, Some(&keepin), &mut ctx).unwrap();
        assert_relative_eq!(out.area(), 6000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_clean_drops_small_fragments() {
        let engine = ClipperEngine::default();
        let params = VoidParams { min_area: 1.0, ..Default::default() };
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        let frags = PolySet::from_rings(vec![rect(0.0, 0.0, 10.0, 10.0), rect(20.0, 0.0, 20.5, 0.5)]);
        let out = clean_fragments(frags, &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(ctx.stats.fragments_filtered, 1);

        let tiny = PolySet::from_ring(rect(0.0, 0.0, 0.5, 0.5));
        assert!(matches!(clean_fragments(tiny, &mut ctx), Err(VoidError::NoShapesLeft)));
    }
}
