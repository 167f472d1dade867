//! Boolean merge of voids into the shape
//!
//! Existing holes are detached and treated as voids, the void list is
//! consolidated, then everything that is not stand-alone is subtracted in
//! one boolean. Stand-alone voids are handed back to be attached as plain
//! holes after cleaning.

use super::consolidate::consolidate_voids;
use super::context::InstanceContext;
use super::error::{VoidError, VoidResult};
use crate::fill::geometry::{BooleanError, BooleanOp, Direction, PolySet, Ring, RingFlags};
use tracing::{debug, warn};

/// Result of merging voids into one shape
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub fragments: PolySet,
    /// Voids to attach as holes once fragments are final
    pub stand_alone: Vec<Ring>,
}

pub fn merge_voids(
    mut shape: PolySet,
    voids: Vec<Ring>,
    do_clean: bool,
    ctx: &mut InstanceContext<'_>,
) -> VoidResult<MergeOutcome> {
    let tol = ctx.params.arc_tolerance;
    let engine = ctx.engine;

    let mut all = shape.take_holes(RingFlags::EXISTING_VOID);
    all.extend(voids);

    if all.is_empty() {
        // Nothing to subtract; a crossed outline still has to be resolved
        if shape.rings.iter().any(|r| r.is_self_intersecting(tol)) {
            debug!("[Merge] Normalizing self-intersecting outline");
            shape = engine.normalize(&shape)?;
        }
        if shape.is_empty() {
            return Err(VoidError::ShapeFullyVoided);
        }
        return Ok(MergeOutcome { fragments: shape, stand_alone: Vec::new() });
    }

    let consolidated = consolidate_voids(all, &shape, do_clean, ctx)?;
    ctx.check_cancel()?;
    let (stand_alone, cutting): (Vec<Ring>, Vec<Ring>) =
        consolidated.into_iter().partition(|v| v.flags.contains(RingFlags::STAND_ALONE));

    let fragments = if cutting.is_empty() {
        if shape.rings.iter().any(|r| r.is_self_intersecting(tol)) {
            engine.normalize(&shape)?
        } else {
            shape
        }
    } else {
        let clip = PolySet::from_rings(cutting);
        match engine.boolean(&shape, &clip, BooleanOp::AndNot) {
            Ok(out) => out,
            Err(e) => {
                warn!("[Merge] Boolean subtract failed ({e}), attaching voids as holes instead");
                let out = recover(&shape, clip, ctx).map_err(|_| VoidError::BooleanOpFailed(e))?;
                ctx.stats.boolean_recovered = true;
                out
            }
        }
    };

    if fragments.is_empty() {
        return Err(VoidError::ShapeFullyVoided);
    }
    debug!("[Merge] {} fragments, {} stand-alone voids", fragments.len(), stand_alone.len());
    Ok(MergeOutcome { fragments, stand_alone })
}

/// Fallback when the subtract fails: union the voids, hang each one under
/// the outer ring containing it, lift their islands to outer rings and
/// normalize the lot.
fn recover(shape: &PolySet, clip: PolySet, ctx: &InstanceContext<'_>) -> Result<PolySet, BooleanError> {
    let tol = ctx.params.arc_tolerance;
    let merged = ctx.engine.boolean(&clip, &PolySet::new(), BooleanOp::Or)?;
    let mut result = shape.clone();
    let mut islands = Vec::new();
    for mut void in merged.rings {
        islands.extend(void.holes.drain(..));
        let ext = void.extents();
        let sample = void.iter().next().map(|(p, _)| p).unwrap_or_else(|| ext.center());
        let owner = result
            .rings
            .iter_mut()
            .find(|outer| outer.extents().contains(&ext) && outer.contains_point(sample, tol));
        match owner {
            Some(outer) => {
                void.set_direction(Direction::Clockwise);
                outer.holes.push(void);
            }
            None => debug!("[Merge] Dropping void outside every outer ring during recovery"),
        }
    }
    for mut island in islands {
        island.set_direction(Direction::CounterClockwise);
        result.rings.push(island);
    }
    ctx.engine.normalize(&result)
}

/// Attach stand-alone voids as holes of the fragment containing them.
/// Any that no longer fit cleanly are subtracted instead.
pub fn attach_stand_alone(
    mut fragments: PolySet,
    voids: Vec<Ring>,
    ctx: &InstanceContext<'_>,
) -> VoidResult<PolySet> {
    let tol = ctx.params.arc_tolerance;
    let mut leftover = Vec::new();
    for mut void in voids {
        let ext = void.extents();
        let sample = void.iter().next().map(|(p, _)| p).unwrap_or_else(|| ext.center());
        let owner = fragments.rings.iter_mut().find(|outer| {
            outer.extents().contains(&ext)
                && outer.contains_point(sample, tol)
                && outer.holes.iter().all(|h| !h.extents().intersects(&ext))
        });
        match owner {
            Some(outer) => {
                void.set_direction(Direction::Clockwise);
                void.flags.remove(RingFlags::STAND_ALONE);
                outer.holes.push(void);
            }
            None => leftover.push(void),
        }
    }
    if leftover.is_empty() {
        return Ok(fragments);
    }
    debug!("[Merge] {} stand-alone voids subtracted", leftover.len());
    let out = ctx.engine.boolean(&fragments, &PolySet::from_rings(leftover), BooleanOp::AndNot)?;
    if out.is_empty() {
        return Err(VoidError::ShapeFullyVoided);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::geometry::{BooleanEngine, ClipperEngine, Extents, Point, TrimMode};
    use crate::fill::voiding::context::CancelFlag;
    use crate::fill::voiding::params::VoidParams;
    use approx::assert_relative_eq;

    /// Engine whose subtract always fails
    struct FailingEngine(ClipperEngine);

    impl BooleanEngine for FailingEngine {
        fn boolean(&self, subject: &PolySet, clip: &PolySet, op: BooleanOp) -> Result<PolySet, BooleanError> {
            if op == BooleanOp::AndNot {
                return Err(BooleanError::DegenerateInput("forced failure".into()));
            }
            self.0.boolean(subject, clip, op)
        }

        fn offset(&self, shape: &PolySet, delta: f64, trim: TrimMode) -> Result<PolySet, BooleanError> {
            self.0.offset(shape, delta, trim)
        }

        fn offset_path(&self, points: &[Point], half_width: f64) -> Result<PolySet, BooleanError> {
            self.0.offset_path(points, half_width)
        }
    }

    fn square(size: f64) -> PolySet {
        PolySet::from_ring(Ring::rectangle(&Extents::new(0.0, 0.0, size, size)).unwrap())
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
        Ring::rectangle(&Extents::new(x0, y0, x1, y1)).unwrap()
    }

    #[test]
    fn test_crossing_void_is_subtracted() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let out = merge_voids(square(100.0), vec![rect(90.0, -10.0, 110.0, 110.0)], true, &mut ctx).unwrap();
        assert!(out.stand_alone.is_empty());
        assert_relative_eq!(out.fragments.area(), 9000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_interior_void_returned_stand_alone() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let out = merge_voids(square(100.0), vec![rect(40.0, 40.0, 60.0, 60.0)], true, &mut ctx).unwrap();
        assert_eq!(out.stand_alone.len(), 1);
        let attached = attach_stand_alone(out.fragments, out.stand_alone, &ctx).unwrap();
        assert_eq!(attached.hole_count(), 1);
        assert_relative_eq!(attached.area(), 9600.0, epsilon = 1e-6);
    }

    #[test]
    fn test_void_splits_shape() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let out = merge_voids(square(100.0), vec![rect(45.0, -5.0, 55.0, 105.0)], true, &mut ctx).unwrap();
        assert_eq!(out.fragments.len(), 2);
    }

    #[test]
    fn test_enclosing_void_consumes_shape() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let err = merge_voids(square(10.0), vec![rect(-5.0, -5.0, 15.0, 15.0)], true, &mut ctx).unwrap_err();
        assert!(err.is_consumed());
    }

    #[test]
    fn test_existing_holes_are_kept() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let mut shape = square(100.0);
        let mut hole = rect(10.0, 10.0, 20.0, 20.0);
        hole.set_direction(Direction::Clockwise);
        shape.rings[0].holes.push(hole);
        let out = merge_voids(shape, vec![rect(95.0, 40.0, 105.0, 50.0)], true, &mut ctx).unwrap();
        let attached = attach_stand_alone(out.fragments, out.stand_alone, &ctx).unwrap();
        assert_eq!(attached.hole_count(), 1);
        assert_relative_eq!(attached.area(), 10000.0 - 100.0 - 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_failed_subtract_recovers_with_holes() {
        let engine = FailingEngine(ClipperEngine::default());
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        // Two overlapping voids are never stand-alone, forcing the subtract
        let voids = vec![rect(20.0, 20.0, 40.0, 40.0), rect(30.0, 30.0, 50.0, 50.0)];
        let out = merge_voids(square(100.0), voids, true, &mut ctx).unwrap();
        assert!(ctx.stats.boolean_recovered);
        assert_eq!(out.fragments.len(), 1);
        assert_eq!(out.fragments.hole_count(), 1);
        assert_relative_eq!(out.fragments.area(), 10000.0 - 700.0, epsilon = 1e-3);
    }

    #[test]
    fn test_failed_recovery_reports_boolean_error() {
        struct AlwaysFails;
        impl BooleanEngine for AlwaysFails {
            fn boolean(&self, _: &PolySet, _: &PolySet, _: BooleanOp) -> Result<PolySet, BooleanError> {
                Err(BooleanError::DegenerateInput("forced failure".into()))
            }
            fn offset(&self, _: &PolySet, _: f64, _: TrimMode) -> Result<PolySet, BooleanError> {
                Err(BooleanError::DegenerateInput("forced failure".into()))
            }
            fn offset_path(&self, _: &[Point], _: f64) -> Result<PolySet, BooleanError> {
                Err(BooleanError::DegenerateInput("forced failure".into()))
            }
        }
        let engine = AlwaysFails;
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let voids = vec![rect(20.0, 20.0, 40.0, 40.0), rect(30.0, 30.0, 50.0, 50.0)];
        let err = merge_voids(square(100.0), voids, true, &mut ctx).unwrap_err();
        assert!(matches!(err, VoidError::BooleanOpFailed(_)));
    }

    #[test]
    fn test_no_voids_normalizes_bowtie() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let bowtie = Ring::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ])
        .unwrap();
        let out = merge_voids(PolySet::from_ring(bowtie), Vec::new(), true, &mut ctx).unwrap();
        assert_eq!(out.fragments.len(), 2);
        assert!(out.fragments.rings.iter().all(|r| !r.is_self_intersecting(0.01)));
    }
}
