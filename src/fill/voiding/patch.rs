//! Incremental patch updater
//!
//! Repairs only the damaged windows of a boundary. Fragments that do not
//! reach a window are never rewritten. Each window's piece of the outline
//! is voided rough, stitched back onto what is left of the affected
//! fragments, and the combined result is cleaned once.
//!
//! ```text
//! Idle -> Decide -> FullRevoid ----------------> Committed
//!                \-> PatchRegion -> [Heal] ---/
//! ```

use super::collector::VoidTarget;
use super::error::{VoidError, VoidResult};
use super::model::{BoundaryId, BoundaryRecord, ShapeId};
use super::params::FillMode;
use super::pipeline::{unconnected_thermals, Autovoider, VoidOutcome, VoidReport};
use super::smooth::{clean_fragments, smooth};
use crate::fill::geometry::{BooleanOp, Extents, PolySet, Ring};
use crate::host::BoardStore;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchState {
    Idle,
    Decide,
    FullRevoid,
    PatchRegion,
    Heal,
    Committed,
}

/// Damaged part of one boundary
#[derive(Debug, Clone)]
pub struct Damage {
    pub boundary: BoundaryId,
    /// Windows whose voids are stale
    pub windows: Vec<Extents>,
    /// The boundary's own outline changed
    pub revoid_boundary: bool,
    /// Fill mode or hatch setting changed since the last pass
    pub mode_transition: bool,
}

pub struct PatchUpdater<'v, 'a> {
    voider: &'v Autovoider<'a>,
    state: PatchState,
    trace: Vec<PatchState>,
}

impl<'v, 'a> PatchUpdater<'v, 'a> {
    pub fn new(voider: &'v Autovoider<'a>) -> Self {
        Self { voider, state: PatchState::Idle, trace: vec![PatchState::Idle] }
    }

    pub fn state(&self) -> PatchState {
        self.state
    }

    pub fn trace(&self) -> &[PatchState] {
        &self.trace
    }

    fn transition(&mut self, next: PatchState) {
        debug!("[Patch] {:?} -> {:?}", self.state, next);
        self.state = next;
        self.trace.push(next);
    }

    /// Repair one boundary. Failures other than cancellation leave the
    /// boundary out of date and are reported, not returned.
    pub fn run<S: BoardStore + ?Sized>(&mut self, store: &mut S, damage: &Damage) -> VoidResult<VoidReport> {
        let voider = self.voider;
        self.transition(PatchState::Decide);
        let boundary = store
            .boundary(damage.boundary)
            .ok_or_else(|| VoidError::NotVoidable(damage.boundary.0, "unknown boundary".to_string()))?;
        let fragments = store.fragments(boundary.id);
        let params = voider.params();

        let full = !params.local_patch
            || damage.revoid_boundary
            || damage.mode_transition
            || damage.windows.is_empty()
            || fragments.is_empty()
            || boundary.out_of_date
            || boundary.hatched;

        let mark = store.begin();
        let result = if full {
            self.transition(PatchState::FullRevoid);
            let output = voider.run_pass(&*store, &boundary);
            voider.write_pass(store, &boundary, output)
        } else {
            self.transition(PatchState::PatchRegion);
            let current: Vec<(Option<ShapeId>, Ring)> =
                fragments.into_iter().map(|f| (Some(f.id), f.geometry)).collect();
            self.patch_windows(store, &boundary, current, &damage.windows)
        };

        match result {
            Ok(mut report) => {
                store.commit(mark);
                self.transition(PatchState::Committed);
                report.trace = self.trace.clone();
                Ok(report)
            }
            Err(e) if e.is_cancelled() => {
                store.rollback(mark);
                debug!("[Patch] Boundary {} cancelled", boundary.id.0);
                Err(e)
            }
            Err(e) => {
                store.rollback(mark);
                warn!("[Patch] Boundary {} left out of date: {e}", boundary.id.0);
                store.set_out_of_date(boundary.id, true)?;
                let mut report = VoidReport::new(boundary.id, VoidOutcome::MarkedOutOfDate { reason: e.to_string() });
                report.trace = self.trace.clone();
                Ok(report)
            }
        }
    }

    fn patch_windows<S: BoardStore + ?Sized>(
        &mut self,
        store: &mut S,
        boundary: &BoundaryRecord,
        mut working: Vec<(Option<ShapeId>, Ring)>,
        windows: &[Extents],
    ) -> VoidResult<VoidReport> {
        let voider = self.voider;
        let params = voider.params().clone();
        let mut removed: Vec<ShapeId> = Vec::new();
        let mut stats = Default::default();
        let mut unconnected = Vec::new();
        // Some window's fragments all fell under the minimum area
        let mut no_shapes_left = false;

        let mut outline = boundary.outline.clone();
        if let Some(k) = &boundary.keepin {
            outline = voider.engine().boolean(&outline, k, BooleanOp::And)?;
        }

        for window in windows {
            let mut ctx = voider.context();
            let engine = ctx.engine;
            let region = window.inflated(params.min_aperture.max(params.grid));
            let Some(region_ring) = Ring::rectangle(&region) else {
                continue;
            };
            let region_poly = PolySet::from_ring(region_ring);

            let (affected, untouched): (Vec<_>, Vec<_>) =
                working.into_iter().partition(|(_, ring)| ring.extents().intersects(&region));
            removed.extend(affected.iter().filter_map(|(id, _)| *id));
            debug!("[Patch] Window {:?}: {} fragments affected", region, affected.len());

            let rest = if affected.is_empty() {
                PolySet::new()
            } else {
                let rings = affected.into_iter().map(|(_, r)| r).collect();
                engine.boolean(&PolySet::from_rings(rings), &region_poly, BooleanOp::AndNot)?
            };

            let piece_outline = engine.boolean(&outline, &region_poly, BooleanOp::And)?;
            let piece = if piece_outline.is_empty() {
                PolySet::new()
            } else {
                let target = VoidTarget { boundary: boundary.clone(), geometry: piece_outline, scope: Some(region) };
                match voider.void_target(&*store, target, FillMode::Rough, &mut ctx) {
                    Ok(p) => p,
                    Err(e) if e.is_consumed() => PolySet::new(),
                    Err(e) => return Err(e),
                }
            };

            let joined = if rest.is_empty() {
                piece
            } else if piece.is_empty() {
                rest
            } else {
                if rest.extents().inflated(params.grid).intersects(&piece.extents()) {
                    self.transition(PatchState::Heal);
                }
                engine.boolean(&rest, &piece, BooleanOp::Or)?
            };

            let mode = voider.mode_for(boundary);
            let mut cleaned = joined;
            if mode.cleans() && !cleaned.is_empty() {
                cleaned = match clean_fragments(cleaned, &mut ctx) {
                    Ok(c) => c,
                    Err(VoidError::NoShapesLeft) => {
                        no_shapes_left = true;
                        PolySet::new()
                    }
                    Err(e) => return Err(e),
                };
            }
            if mode.smooths() && !cleaned.is_empty() {
                cleaned = match smooth(&cleaned, boundary.keepin.as_ref(), &mut ctx)
                    .and_then(|s| clean_fragments(s, &mut ctx))
                {
                    Ok(c) => c,
                    Err(VoidError::NoShapesLeft) => {
                        no_shapes_left = true;
                        PolySet::new()
                    }
                    Err(e) => return Err(e),
                };
            }

            unconnected.extend(unconnected_thermals(&cleaned, &ctx.thermals, params.arc_tolerance));
            stats = ctx.stats;
            working = untouched;
            working.extend(cleaned.rings.into_iter().map(|r| (None, r)));
        }

        let added: Vec<Ring> = working.iter().filter(|(id, _)| id.is_none()).map(|(_, r)| r.clone()).collect();
        let total = working.len();
        store.update_fragments(boundary.id, &removed, added)?;
        store.set_out_of_date(boundary.id, false)?;
        store.set_fill_mode(boundary.id, voider.mode_for(boundary))?;

        let outcome = match total {
            0 if no_shapes_left => VoidOutcome::NoShapesLeft,
            0 => VoidOutcome::FullyVoided,
            n => VoidOutcome::Voided { fragments: n },
        };
        Ok(VoidReport { boundary: boundary.id, outcome, stats, unconnected_thermals: unconnected, trace: Vec::new() })
    }
}
