//! Void generation
//!
//! Turns candidates into clearance rings in three passes:
//! 1. other copper shapes, which may cut the target outline itself
//! 2. pins, optionally grouped into combined openings
//! 3. everything else (pads, vias, lines, ungrouped pins)
//!
//! Same-net pads flagged for thermals get a relief instead of a clearance.

use super::collector::{Candidate, VoidTarget};
use super::context::{InstanceContext, ThermalRecord};
use super::error::{VoidError, VoidResult};
use super::model::ObstacleKind;
use super::outline::OutlineIndex;
use crate::fill::geometry::{
    BooleanEngine, BooleanOp, Direction, Extents, Point, PolySet, Ring, RingFlags, StandardPrimitive, TrimMode,
};
use tracing::debug;

/// Voids produced for one shape
#[derive(Debug, Default)]
pub struct HoleReport {
    pub voids: Vec<Ring>,
    /// The target outline was cut by a higher-priority shape
    pub shape_changed: bool,
}

pub fn generate_holes(
    target: &mut VoidTarget,
    candidates: &[Candidate],
    ctx: &mut InstanceContext<'_>,
) -> VoidResult<HoleReport> {
    let tol = ctx.params.arc_tolerance;
    let mut report = HoleReport::default();
    let mut processed = 0usize;

    // Pass 1: shapes. Pieces crossing the outline are cut out right away.
    let outline = OutlineIndex::build(&target.geometry.outline_only(), tol);
    let mut cutters = Vec::new();
    for c in candidates.iter().filter(|c| matches!(c.obstacle.kind, ObstacleKind::Shape { .. })) {
        processed += 1;
        ctx.checkpoint(processed)?;
        for ring in clearance_rings(c, ctx.engine)? {
            if outline.touches(&ring, tol) {
                cutters.push(ring);
            } else {
                report.voids.push(ring);
            }
        }
    }
    if !cutters.is_empty() {
        let cut = ctx.engine.boolean(&target.geometry, &PolySet::from_rings(cutters), BooleanOp::AndNot)?;
        if cut.is_empty() {
            return Err(VoidError::ShapeFullyVoided);
        }
        debug!("[Autovoid] Boundary {} outline cut by higher-priority shapes", target.boundary.id.0);
        target.geometry = cut;
        report.shape_changed = true;
        ctx.stats.shape_changed = true;
    }

    // Pass 2: pins
    let pins: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !c.thermal && matches!(c.obstacle.kind, ObstacleKind::Pin { .. }))
        .collect();
    let spacing = ctx.params.inline_pin_spacing;
    if spacing > 0.0 && pins.len() > 1 {
        for group in group_pins(&pins, spacing) {
            processed += group.len();
            ctx.checkpoint(processed)?;
            let members: Vec<&Candidate> = group.iter().map(|&i| pins[i]).collect();
            report.voids.extend(pin_group_rings(&members, spacing, ctx.engine)?);
            for m in members {
                ctx.pin_voids.insert(m.obstacle.id);
            }
        }
    }

    // Thermal reliefs
    for c in candidates.iter().filter(|c| c.thermal) {
        processed += 1;
        ctx.checkpoint(processed)?;
        let (pieces, relief) = thermal_rings(c, ctx)?;
        if !pieces.is_empty() {
            ctx.thermals.push(ThermalRecord { obstacle: c.obstacle.id, center: c.obstacle.reference_point(), relief });
            report.voids.extend(pieces);
        }
    }

    // Pass 3: everything else
    for c in candidates.iter().filter(|c| !c.thermal) {
        match c.obstacle.kind {
            ObstacleKind::Shape { .. } | ObstacleKind::ConstraintRegion { .. } => continue,
            ObstacleKind::Pin { .. } if ctx.pin_voids.contains(c.obstacle.id) => continue,
            ObstacleKind::Pin { .. } => {
                ctx.pin_voids.insert(c.obstacle.id);
            }
            _ => {}
        }
        processed += 1;
        ctx.checkpoint(processed)?;
        let rings = clearance_rings(c, ctx.engine)?;
        if rings.is_empty() {
            debug!("[Autovoid] Object {} has degenerate geometry, skipped", c.obstacle.id.0);
        }
        report.voids.extend(rings);
    }

    let grid = ctx.params.grid;
    let hatch = (target.boundary.hatched && ctx.params.snap_to_hatch && ctx.params.hatch_pitch > 0.0)
        .then_some(ctx.params.hatch_pitch);
    report.voids = report
        .voids
        .into_iter()
        .filter_map(|mut ring| {
            if let Some(pitch) = hatch {
                let flags = ring.flags;
                ring = Ring::rectangle(&snap_out(&ring.extents(), pitch))?;
                ring.flags = flags;
            }
            ring.snap(grid);
            ring.set_direction(Direction::CounterClockwise);
            Some(ring)
        })
        .collect();

    ctx.stats.voids_generated = report.voids.len();
    Ok(report)
}

/// Clearance outline of one candidate
pub fn clearance_rings(c: &Candidate, engine: &dyn BooleanEngine) -> VoidResult<Vec<Ring>> {
    let clearance = c.clearance;
    let rings = match &c.obstacle.kind {
        ObstacleKind::Pad { center, primitive, rotation }
        | ObstacleKind::Pin { center, primitive, rotation, .. } => {
            primitive_rings(primitive, *center, *rotation, clearance, engine)?
        }
        ObstacleKind::Via { center, diameter } => Ring::circle(*center, diameter * 0.5 + clearance).into_iter().collect(),
        ObstacleKind::Line { points, width } => {
            let half = width * 0.5 + clearance;
            if half <= 0.0 || points.is_empty() {
                Vec::new()
            } else {
                engine.offset_path(points, half)?.rings
            }
        }
        ObstacleKind::Shape { outline, .. } => {
            if clearance > 0.0 {
                engine.offset(outline, clearance, TrimMode::Round)?.rings
            } else {
                outline.rings.clone()
            }
        }
        ObstacleKind::ConstraintRegion { .. } => Vec::new(),
    };
    Ok(rings)
}

/// Pad primitive grown by `clearance`, placed and rotated
fn primitive_rings(
    primitive: &StandardPrimitive,
    center: Point,
    rotation: f64,
    clearance: f64,
    engine: &dyn BooleanEngine,
) -> VoidResult<Vec<Ring>> {
    let boxed = |w: f64, h: f64| {
        Extents::new(
            center.x - w * 0.5 - clearance,
            center.y - h * 0.5 - clearance,
            center.x + w * 0.5 + clearance,
            center.y + h * 0.5 + clearance,
        )
    };
    let ring = match primitive {
        StandardPrimitive::Circle { diameter } => Ring::circle(center, diameter * 0.5 + clearance),
        StandardPrimitive::Rectangle { width, height } => Ring::rounded_rect(&boxed(*width, *height), clearance),
        StandardPrimitive::Oval { width, height } => {
            Ring::rounded_rect(&boxed(*width, *height), width.min(*height) * 0.5 + clearance)
        }
        StandardPrimitive::RoundRect { width, height, corner_radius } => {
            Ring::rounded_rect(&boxed(*width, *height), corner_radius + clearance)
        }
        StandardPrimitive::CustomPolygon { points } => {
            let placed: Vec<Point> = points.iter().map(|p| Point::new(center.x + p.x, center.y + p.y)).collect();
            let Some(mut ring) = Ring::from_points(&placed) else {
                return Ok(Vec::new());
            };
            ring.set_direction(Direction::CounterClockwise);
            ring.rotate(center, rotation);
            if clearance <= 0.0 {
                return Ok(vec![ring]);
            }
            return Ok(engine.offset(&PolySet::from_ring(ring), clearance, TrimMode::Round)?.rings);
        }
    };
    Ok(ring
        .map(|mut r| {
            r.rotate(center, rotation);
            r
        })
        .into_iter()
        .collect())
}

/// Group pins whose clearance boxes come within `spacing` of each other
fn group_pins(pins: &[&Candidate], spacing: f64) -> Vec<Vec<usize>> {
    let boxes: Vec<Extents> = pins.iter().map(|c| c.reach(0.0).inflated(spacing * 0.5)).collect();
    let mut parent: Vec<usize> = (0..pins.len()).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    for i in 0..pins.len() {
        for j in (i + 1)..pins.len() {
            if boxes[i].intersects(&boxes[j]) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; pins.len()];
    for i in 0..pins.len() {
        let root = find(&mut parent, i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}

/// One combined opening for a row of pins: grow by half the spacing so
/// neighbours fuse, then shrink back with round joins
fn pin_group_rings(members: &[&Candidate], spacing: f64, engine: &dyn BooleanEngine) -> VoidResult<Vec<Ring>> {
    let mut rings = Vec::new();
    for c in members {
        rings.extend(clearance_rings(c, engine)?);
    }
    if members.len() < 2 {
        return Ok(rings);
    }
    let clearances = PolySet::from_rings(rings);
    let grown = engine.offset(&clearances, spacing * 0.5, TrimMode::Round)?;
    let closed = engine.offset(&grown, -spacing * 0.5, TrimMode::Round)?;
    // The closing never gives up clearance a single pin needed
    Ok(engine.boolean(&closed, &clearances, BooleanOp::Or)?.rings)
}

/// Relief for a same-net pad: annulus of `thermal.gap` minus spokes
fn thermal_rings(c: &Candidate, ctx: &InstanceContext<'_>) -> VoidResult<(Vec<Ring>, Extents)> {
    let thermal = &ctx.params.thermal;
    let engine = ctx.engine;
    let bare = Candidate { clearance: 0.0, ..c.clone() };
    let grown = Candidate { clearance: thermal.gap, ..c.clone() };
    let inner = PolySet::from_rings(clearance_rings(&bare, engine)?);
    let outer = PolySet::from_rings(clearance_rings(&grown, engine)?);
    if inner.is_empty() || outer.is_empty() {
        return Ok((Vec::new(), Extents::EMPTY));
    }
    let annulus = engine.boolean(&outer, &inner, BooleanOp::AndNot)?;

    let center = c.obstacle.reference_point();
    let ext = outer.extents();
    let length = ext.width().hypot(ext.height());
    let half = thermal.spoke_width * 0.5;
    let mut spokes = Vec::new();
    if thermal.spoke_count > 0 && half > 0.0 {
        for k in 0..thermal.spoke_count {
            let angle = thermal.spoke_angle + k as f64 * 360.0 / thermal.spoke_count as f64;
            let pts = [
                Point::new(center.x, center.y - half),
                Point::new(center.x + length, center.y - half),
                Point::new(center.x + length, center.y + half),
                Point::new(center.x, center.y + half),
            ];
            if let Some(mut spoke) = Ring::from_points(&pts) {
                spoke.rotate(center, angle);
                spokes.push(spoke);
            }
        }
    }
    let relief = if spokes.is_empty() {
        annulus
    } else {
        engine.boolean(&annulus, &PolySet::from_rings(spokes), BooleanOp::AndNot)?
    };
    let pieces = relief
        .rings
        .into_iter()
        .map(|mut r| {
            r.flags |= RingFlags::THERMAL;
            r
        })
        .collect();
    Ok((pieces, ext))
}

/// Grow a box outward to the hatch grid
fn snap_out(ext: &Extents, pitch: f64) -> Extents {
    Extents::new(
        (ext.min_x / pitch).floor() * pitch,
        (ext.min_y / pitch).floor() * pitch,
        (ext.max_x / pitch).ceil() * pitch,
        (ext.max_y / pitch).ceil() * pitch,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::geometry::ClipperEngine;
    use crate::fill::voiding::context::CancelFlag;
    use crate::fill::voiding::model::{BoundaryId, BoundaryRecord, Obstacle, ObstacleId};
    use crate::fill::voiding::params::VoidParams;
    use approx::assert_relative_eq;

    fn target(size: f64) -> VoidTarget {
        let outline = PolySet::from_ring(Ring::rectangle(&Extents::new(0.0, 0.0, size, size)).unwrap());
        VoidTarget {
            boundary: BoundaryRecord {
                id: BoundaryId(1),
                layer: "L1".into(),
                net: Some("GND".into()),
                outline: outline.clone(),
                priority: 0,
                hatched: false,
                frozen: false,
                keepin: None,
                out_of_date: false,
                last_fill_mode: None,
            },
            geometry: outline,
            scope: None,
        }
    }

    fn candidate(id: u64, kind: ObstacleKind, clearance: f64) -> Candidate {
        Candidate {
            obstacle: Obstacle { id: ObstacleId(id), layer: "L1".into(), net: Some("SIG".into()), kind },
            clearance,
            thermal: false,
        }
    }

    fn square_pad(x: f64, y: f64, size: f64) -> ObstacleKind {
        ObstacleKind::Pad {
            center: Point::new(x, y),
            primitive: StandardPrimitive::Rectangle { width: size, height: size },
            rotation: 0.0,
        }
    }

    fn pin(x: f64, y: f64) -> ObstacleKind {
        ObstacleKind::Pin {
            center: Point::new(x, y),
            primitive: StandardPrimitive::Circle { diameter: 1.0 },
            rotation: 0.0,
            component: "U1".into(),
            pin: "1".into(),
        }
    }

    #[test]
    fn test_square_pad_clearance_extents() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let mut t = target(100.0);
        let cands = vec![candidate(5, square_pad(50.0, 50.0, 10.0), 2.0)];
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert_eq!(report.voids.len(), 1);
        let ext = report.voids[0].extents();
        assert_relative_eq!(ext.width(), 14.0, epsilon = 1e-6);
        assert_relative_eq!(ext.height(), 14.0, epsilon = 1e-6);
        assert_relative_eq!(ext.center().x, 50.0, epsilon = 1e-6);
        assert!(!report.shape_changed);
    }

    #[test]
    fn test_shape_crossing_outline_cuts_target() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let mut t = target(100.0);
        let other = PolySet::from_ring(Ring::rectangle(&Extents::new(90.0, 0.0, 120.0, 100.0)).unwrap());
        let cands = vec![candidate(
            7,
            ObstacleKind::Shape { boundary: Some(BoundaryId(9)), priority: 5, outline: other, fragments: None },
            1.0,
        )];
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert!(report.shape_changed);
        assert!(report.voids.is_empty());
        assert_relative_eq!(t.geometry.extents().max_x, 89.0, epsilon = 0.01);
    }

    #[test]
    fn test_inline_pins_fuse_into_one_opening() {
        let engine = ClipperEngine::default();
        let params = VoidParams { inline_pin_spacing: 1.0, ..Default::default() };
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        let mut t = target(100.0);
        let cands: Vec<Candidate> = (0..4).map(|i| candidate(10 + i, pin(20.0 + i as f64 * 2.0, 50.0), 0.2)).collect();
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert_eq!(report.voids.len(), 1);
        assert_eq!(ctx.pin_voids.len(), 4);
        let ext = report.voids[0].extents();
        assert_relative_eq!(ext.min_x, 19.3, epsilon = 0.05);
        assert_relative_eq!(ext.max_x, 26.7, epsilon = 0.05);
        assert_eq!(report.voids[0].holes.len(), 0);
    }

    #[test]
    fn test_distant_pins_stay_separate_groups() {
        let engine = ClipperEngine::default();
        let params = VoidParams { inline_pin_spacing: 1.0, ..Default::default() };
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        let mut t = target(100.0);
        let cands = vec![
            candidate(10, pin(20.0, 50.0), 0.2),
            candidate(11, pin(22.0, 50.0), 0.2),
            candidate(12, pin(60.0, 50.0), 0.2),
        ];
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert_eq!(report.voids.len(), 2);
        assert_eq!(ctx.pin_voids.len(), 3);
    }

    #[test]
    fn test_pins_without_spacing_void_individually() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let mut t = target(100.0);
        let cands: Vec<Candidate> = (0..3).map(|i| candidate(10 + i, pin(20.0 + i as f64 * 2.0, 50.0), 0.2)).collect();
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert_eq!(report.voids.len(), 3);
        assert!(report.voids.iter().all(|r| r.as_circle().is_some()));
    }

    #[test]
    fn test_thermal_relief_splits_into_spoke_gaps() {
        let engine = ClipperEngine::default();
        let mut params = VoidParams::default();
        params.thermal.enabled = true;
        params.thermal.gap = 0.5;
        params.thermal.spoke_width = 0.4;
        params.thermal.spoke_count = 4;
        params.thermal.spoke_angle = 45.0;
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        let mut t = target(100.0);
        let mut c = candidate(3, ObstacleKind::Via { center: Point::new(50.0, 50.0), diameter: 1.0 }, 0.2);
        c.thermal = true;
        let report = generate_holes(&mut t, &[c], &mut ctx).unwrap();
        assert_eq!(report.voids.len(), 4);
        assert!(report.voids.iter().all(|r| r.flags.contains(RingFlags::THERMAL)));
        assert_eq!(ctx.thermals.len(), 1);
    }

    #[test]
    fn test_degenerate_obstacle_skipped() {
        let engine = ClipperEngine::default();
        let mut ctx = InstanceContext::new(VoidParams::default(), &engine, CancelFlag::new());
        let mut t = target(100.0);
        let cands = vec![candidate(1, ObstacleKind::Via { center: Point::new(5.0, 5.0), diameter: 0.0 }, 0.0)];
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert!(report.voids.is_empty());
    }

    #[test]
    fn test_hatch_snap_squares_voids() {
        let engine = ClipperEngine::default();
        let params = VoidParams { snap_to_hatch: true, hatch_pitch: 1.0, ..Default::default() };
        let mut ctx = InstanceContext::new(params, &engine, CancelFlag::new());
        let mut t = target(100.0);
        t.boundary.hatched = true;
        let cands = vec![candidate(1, ObstacleKind::Via { center: Point::new(50.2, 50.2), diameter: 1.0 }, 0.2)];
        let report = generate_holes(&mut t, &cands, &mut ctx).unwrap();
        assert_eq!(report.voids[0].extents(), Extents::new(49.0, 49.0, 51.0, 51.0));
    }
}
