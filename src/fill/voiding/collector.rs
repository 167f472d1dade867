//! Candidate collection
//!
//! Gathers every object that may need a void in the target shape: objects
//! on the same layer whose clearance reaches the shape, minus the shape's
//! own boundary, same-net copper and lower-priority fills. Each object is
//! visited at most once per pass.

use super::context::InstanceContext;
use super::error::{VoidError, VoidResult};
use super::model::{BoundaryRecord, Obstacle, ObstacleKind};
use super::outline::{OutlineIndex, Placement};
use crate::fill::geometry::{Extents, PolySet};
use crate::host::BoardView;
use tracing::debug;

/// Shape being voided in this pass
#[derive(Debug, Clone)]
pub struct VoidTarget {
    pub boundary: BoundaryRecord,
    /// Metal to void; may already carry holes from an earlier pass
    pub geometry: PolySet,
    /// Only objects whose clearance reaches this window are considered
    pub scope: Option<Extents>,
}

/// An object that will be turned into a void
#[derive(Debug, Clone)]
pub struct Candidate {
    pub obstacle: Obstacle,
    pub clearance: f64,
    /// Same-net pad that gets a relief instead of a full clearance
    pub thermal: bool,
}

impl Candidate {
    /// Extents of the void this candidate can produce
    pub fn reach(&self, thermal_gap: f64) -> Extents {
        let grow = if self.thermal { thermal_gap } else { self.clearance };
        self.obstacle.extents().inflated(grow)
    }
}

/// Constraint regions on `layer` with the clearance each imposes
pub fn layer_regions<V: BoardView + ?Sized>(view: &V, layer: &str) -> Vec<(PolySet, f64)> {
    view.constraint_regions(layer)
        .into_iter()
        .filter_map(|o| match o.kind {
            ObstacleKind::ConstraintRegion { outline, clearance } => Some((outline, clearance)),
            _ => None,
        })
        .collect()
}

/// Largest clearance a region can impose on an object whose void reaches
/// `window`; zero when no region is close enough
pub fn region_clearance(regions: &[(PolySet, f64)], window: &Extents) -> f64 {
    regions
        .iter()
        .filter(|(outline, clearance)| outline.extents().intersects(&window.inflated(*clearance)))
        .map(|(_, clearance)| *clearance)
        .fold(0.0, f64::max)
}

/// Collect candidates for `target` in host enumeration order
pub fn collect_candidates<V: BoardView + ?Sized>(
    view: &V,
    target: &VoidTarget,
    ctx: &mut InstanceContext<'_>,
) -> VoidResult<Vec<Candidate>> {
    let tol = ctx.params.arc_tolerance;
    let layer = target.boundary.layer.as_str();
    let outline = OutlineIndex::build(&target.geometry.outline_only(), tol);
    if outline.is_empty() {
        return Err(VoidError::Geometry(format!("boundary {} has no outline", target.boundary.id.0)));
    }
    let boundary_index = ctx
        .params
        .check_surrounding_boundary
        .then(|| OutlineIndex::build(&target.boundary.outline, tol));

    let extents = target.geometry.extents();
    let regions = layer_regions(view, layer);
    let reach = ctx.params.reach_with(region_clearance(&regions, &extents));
    let mut search = extents.inflated(reach);
    if let Some(scope) = &target.scope {
        search = search.intersection(&scope.inflated(reach));
    }
    if search.is_empty() {
        return Ok(Vec::new());
    }

    let own_net = target.boundary.net.as_deref();
    let own_priority = target.boundary.priority;
    let mut objects = view.obstacles_in(layer, &search);
    if boundary_index.is_some() {
        // Higher-priority fills anywhere around the parent boundary
        let around = target.boundary.outline.extents().inflated(reach);
        let extra: Vec<Obstacle> = view
            .obstacles_in(layer, &around)
            .into_iter()
            .filter(|o| matches!(o.kind, ObstacleKind::Shape { boundary: Some(_), priority, .. } if priority > own_priority))
            .filter(|o| !objects.iter().any(|seen| seen.id == o.id))
            .collect();
        if !extra.is_empty() {
            debug!("[Autovoid] Boundary {}: {} surrounding fills pulled in", target.boundary.id.0, extra.len());
            objects.extend(extra);
        }
    }

    let mut out = Vec::new();

    for mut obstacle in objects {
        let Some(class) = obstacle.class() else {
            continue;
        };
        if !ctx.visited.insert(obstacle.id) {
            continue;
        }
        let same_net = obstacle.same_net(own_net);
        let mut thermal = false;

        match &obstacle.kind {
            ObstacleKind::Shape { boundary: Some(b), .. } if *b == target.boundary.id => continue,
            ObstacleKind::Shape { .. } => {
                if same_net {
                    continue;
                }
            }
            ObstacleKind::Pad { .. } | ObstacleKind::Via { .. } | ObstacleKind::Pin { .. } => {
                if same_net {
                    if ctx.params.thermal.enabled {
                        thermal = true;
                    } else {
                        record_same_net(ctx, &obstacle);
                        continue;
                    }
                }
            }
            ObstacleKind::Line { .. } => {
                if same_net {
                    record_same_net(ctx, &obstacle);
                    continue;
                }
            }
            ObstacleKind::ConstraintRegion { .. } => continue,
        }

        if let ObstacleKind::Shape { boundary: Some(_), priority, outline, fragments } = &mut obstacle.kind {
            if *priority < own_priority {
                continue;
            }
            // Higher-priority fills are final; equal ones clear each other's outline
            match fragments.take() {
                Some(f) if *priority > own_priority => *outline = f,
                _ => {}
            }
        }

        let reference = obstacle.reference_point();
        let clearance = regions
            .iter()
            .find(|(outline, _)| outline.contains_point(reference, tol))
            .map(|(_, c)| (c + ctx.params.expand_adjust).max(0.0))
            .unwrap_or_else(|| ctx.params.clearance_for(class));

        if let (Some(bi), ObstacleKind::Shape { boundary: Some(_), outline, .. }) = (&boundary_index, &obstacle.kind) {
            let ext = outline.extents().inflated(clearance);
            if bi.classify(&ext, ext.center()) == Placement::Outside {
                continue;
            }
        }

        let candidate = Candidate { obstacle, clearance, thermal };
        let reach_box = candidate.reach(ctx.params.thermal.gap);
        if let Some(scope) = &target.scope {
            if !reach_box.intersects(scope) {
                continue;
            }
        }
        if outline.classify(&reach_box, reference) == Placement::Outside {
            debug!("[Autovoid] Object {} lies outside boundary {}", candidate.obstacle.id.0, target.boundary.id.0);
            continue;
        }
        out.push(candidate);
    }

    ctx.stats.candidates = out.len();
    debug!("[Autovoid] Boundary {}: {} candidates", target.boundary.id.0, out.len());
    Ok(out)
}

fn record_same_net(ctx: &mut InstanceContext<'_>, obstacle: &Obstacle) {
    if ctx.params.same_net_drc {
        ctx.same_net.push((obstacle.id, obstacle.extents()));
        ctx.stats.same_net_hits += 1;
    }
}
