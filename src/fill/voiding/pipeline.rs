//! Pass orchestration
//!
//! `Autovoider` runs collector, hole generator, merge and smoothing for
//! each boundary and writes the fragments back through the host store.
//! Computing a pass only reads the board, so independent boundaries can be
//! computed on the rayon pool; writes always happen serially afterwards.
//!
//! Boundaries are processed highest priority first. Within one priority
//! tier no boundary reads another's fragments, which keeps parallel runs
//! identical to serial ones.

use super::collector::{collect_candidates, layer_regions, region_clearance, VoidTarget};
use super::context::{CancelFlag, InstanceContext, PassStats, ThermalRecord};
use super::error::{VoidError, VoidResult};
use super::holes::generate_holes;
use super::merge::{attach_stand_alone, merge_voids};
use super::model::{BoundaryId, BoundaryRecord, Obstacle, ObstacleId, ObstacleKind, ShapeId};
use super::params::{FillMode, Schedule, VoidParams};
use super::patch::{Damage, PatchState, PatchUpdater};
use super::smooth::{clean_fragments, smooth};
use crate::fill::geometry::{BooleanEngine, BooleanOp, Extents, PolySet};
use crate::host::{BoardStore, BoardView, DrcCollaborator, NoDrc};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, info_span, warn};

/// How a boundary ended up after a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum VoidOutcome {
    Voided { fragments: usize },
    /// Voids covered the whole shape; all fragments removed
    FullyVoided,
    /// Every fragment fell under the minimum area
    NoShapesLeft,
    /// Left for a later pass to retry
    MarkedOutOfDate { reason: String },
    Skipped { reason: String },
}

impl VoidOutcome {
    pub fn is_voided(&self) -> bool {
        matches!(self, VoidOutcome::Voided { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VoidReport {
    pub boundary: BoundaryId,
    pub outcome: VoidOutcome,
    pub stats: PassStats,
    /// Thermal pads whose relief left them without metal to the fill
    pub unconnected_thermals: Vec<ObstacleId>,
    /// States the patch updater went through, empty for direct revoids
    pub trace: Vec<PatchState>,
}

impl VoidReport {
    pub(crate) fn new(boundary: BoundaryId, outcome: VoidOutcome) -> Self {
        Self { boundary, outcome, stats: PassStats::default(), unconnected_thermals: Vec::new(), trace: Vec::new() }
    }
}

/// An obstacle was added (`before` empty), deleted (`after` empty) or
/// moved/edited (both set)
#[derive(Debug, Clone, Default)]
pub struct ObjectChange {
    pub before: Option<Obstacle>,
    pub after: Option<Obstacle>,
}

/// What a batch update does to each boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillAction {
    /// Revoid every boundary from its outline
    #[default]
    FullFill,
    /// Revoid only boundaries currently out of date
    UpdateVoids,
    /// Only mark boundaries out of date
    OutOfDateOnly,
}

/// Fragments computed for one boundary plus the context that produced them
pub(crate) struct PassOutput<'a> {
    pub result: VoidResult<PolySet>,
    pub ctx: InstanceContext<'a>,
}

/// Clears the re-entry flag when the outer call returns
struct ReentryGuard<'g>(&'g AtomicBool);

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Autovoider<'a> {
    engine: &'a dyn BooleanEngine,
    params: VoidParams,
    cancel: CancelFlag,
    drc: &'a dyn DrcCollaborator,
    busy: AtomicBool,
}

impl<'a> Autovoider<'a> {
    pub fn new(engine: &'a dyn BooleanEngine, params: VoidParams) -> Self {
        Self { engine, params, cancel: CancelFlag::new(), drc: &NoDrc, busy: AtomicBool::new(false) }
    }

    pub fn with_drc(mut self, drc: &'a dyn DrcCollaborator) -> Self {
        self.drc = drc;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn params(&self) -> &VoidParams {
        &self.params
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub(crate) fn engine(&self) -> &'a dyn BooleanEngine {
        self.engine
    }

    pub(crate) fn context(&self) -> InstanceContext<'a> {
        InstanceContext::new(self.params.clone(), self.engine, self.cancel.clone())
    }

    /// Fill mode a pass over `boundary` runs with
    pub(crate) fn mode_for(&self, boundary: &BoundaryRecord) -> FillMode {
        self.params.fill_mode.for_boundary(boundary.hatched)
    }

    /// The boundary's fragments were written in a different mode, or by
    /// no pass at all
    fn mode_transition(&self, boundary: &BoundaryRecord) -> bool {
        boundary.last_fill_mode != Some(self.mode_for(boundary))
    }

    fn enter(&self) -> Option<ReentryGuard<'_>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(ReentryGuard(&self.busy))
        }
    }

    /// Void `target` and return its fragments. Reads the board only.
    pub(crate) fn void_target<V: BoardView + ?Sized>(
        &self,
        view: &V,
        mut target: VoidTarget,
        mode: FillMode,
        ctx: &mut InstanceContext<'a>,
    ) -> VoidResult<PolySet> {
        let engine = ctx.engine;
        ctx.check_cancel()?;
        let keepin = target.boundary.keepin.clone();
        if let Some(k) = &keepin {
            target.geometry = engine.boolean(&target.geometry, k, BooleanOp::And)?;
            if target.geometry.is_empty() {
                return Err(VoidError::ShapeFullyVoided);
            }
        }

        let candidates = collect_candidates(view, &target, ctx)?;
        let holes = generate_holes(&mut target, &candidates, ctx)?;
        ctx.check_cancel()?;

        let merged = merge_voids(target.geometry, holes.voids, mode.cleans(), ctx)?;
        let mut fragments = merged.fragments;
        if mode.cleans() {
            fragments = clean_fragments(fragments, ctx)?;
        }
        if mode.smooths() {
            fragments = smooth(&fragments, keepin.as_ref(), ctx)?;
            fragments = clean_fragments(fragments, ctx)?;
        }
        attach_stand_alone(fragments, merged.stand_alone, ctx)
    }

    /// Compute a full revoid of `boundary` from its outline
    pub(crate) fn run_pass<V: BoardView + ?Sized>(&self, view: &V, boundary: &BoundaryRecord) -> PassOutput<'a> {
        let span = info_span!("autovoid", boundary = boundary.id.0);
        let _enter = span.enter();
        let mut ctx = self.context();
        let target = VoidTarget { boundary: boundary.clone(), geometry: boundary.outline.clone(), scope: None };
        let mode = self.mode_for(boundary);
        let result = self.void_target(view, target, mode, &mut ctx);
        PassOutput { result, ctx }
    }

    /// Write a computed pass. Generic failures propagate unchanged.
    pub(crate) fn write_pass<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        boundary: &BoundaryRecord,
        output: PassOutput<'a>,
    ) -> VoidResult<VoidReport> {
        let PassOutput { result, ctx } = output;
        let (rings, outcome, unconnected) = match result {
            Ok(fragments) => {
                let unconnected = unconnected_thermals(&fragments, &ctx.thermals, self.params.arc_tolerance);
                let outcome = VoidOutcome::Voided { fragments: fragments.len() };
                (fragments.rings, outcome, unconnected)
            }
            Err(VoidError::ShapeFullyVoided) => (Vec::new(), VoidOutcome::FullyVoided, Vec::new()),
            Err(VoidError::NoShapesLeft) => (Vec::new(), VoidOutcome::NoShapesLeft, Vec::new()),
            Err(e) => return Err(e),
        };

        let old: Vec<ShapeId> = store.fragments(boundary.id).into_iter().map(|s| s.id).collect();
        store.update_fragments(boundary.id, &old, rings)?;
        store.set_out_of_date(boundary.id, false)?;
        store.set_fill_mode(boundary.id, self.mode_for(boundary))?;

        for (obstacle, area) in &ctx.same_net {
            self.drc.report_same_net(boundary.id, *obstacle, *area);
        }
        if !unconnected.is_empty() {
            warn!("[Autovoid] Boundary {}: {} thermal pads left unconnected", boundary.id.0, unconnected.len());
        }
        info!("[Autovoid] Boundary {} -> {:?}", boundary.id.0, outcome);
        Ok(VoidReport { boundary: boundary.id, outcome, stats: ctx.stats, unconnected_thermals: unconnected, trace: Vec::new() })
    }

    /// Full revoid of one boundary inside its own transaction. A generic
    /// failure rolls back, marks the boundary out of date and is returned.
    pub fn autovoid_shape<S: BoardStore + ?Sized>(&self, store: &mut S, id: BoundaryId) -> VoidResult<VoidReport> {
        let boundary = store
            .boundary(id)
            .ok_or_else(|| VoidError::NotVoidable(id.0, "unknown boundary".to_string()))?;
        if !store.dynamic_fill_enabled() {
            store.set_out_of_date(id, true)?;
            return Ok(VoidReport::new(id, VoidOutcome::MarkedOutOfDate { reason: "dynamic fill disabled".into() }));
        }

        let mark = store.begin();
        let output = self.run_pass(&*store, &boundary);
        match self.write_pass(store, &boundary, output) {
            Ok(report) => {
                store.commit(mark);
                Ok(report)
            }
            Err(e) => {
                store.rollback(mark);
                if e.is_cancelled() {
                    debug!("[Autovoid] Boundary {} cancelled", id.0);
                } else {
                    warn!("[Autovoid] Boundary {} failed: {e}", id.0);
                    store.set_out_of_date(id, true)?;
                }
                Err(e)
            }
        }
    }

    /// Commit one pass of a batch. Generic failures become out-of-date marks.
    fn settle<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        boundary: &BoundaryRecord,
        output: PassOutput<'a>,
    ) -> VoidResult<VoidReport> {
        let mark = store.begin();
        match self.write_pass(store, boundary, output) {
            Ok(report) => {
                store.commit(mark);
                Ok(report)
            }
            Err(e) if e.is_cancelled() => {
                store.rollback(mark);
                Err(e)
            }
            Err(e) => {
                store.rollback(mark);
                warn!("[Autovoid] Boundary {} failed: {e}", boundary.id.0);
                store.set_out_of_date(boundary.id, true)?;
                Ok(VoidReport::new(boundary.id, VoidOutcome::MarkedOutOfDate { reason: e.to_string() }))
            }
        }
    }

    fn ordered_records<S: BoardStore + ?Sized>(&self, store: &S, ids: &[BoundaryId]) -> VoidResult<Vec<BoundaryRecord>> {
        let unique: IndexSet<BoundaryId> = ids.iter().copied().collect();
        let mut records = Vec::with_capacity(unique.len());
        for id in unique {
            records.push(
                store
                    .boundary(id)
                    .ok_or_else(|| VoidError::NotVoidable(id.0, "unknown boundary".to_string()))?,
            );
        }
        records.sort_by_key(|b| std::cmp::Reverse(b.priority));
        Ok(records)
    }

    /// Revoid many boundaries, highest priority first. Cancellation rolls
    /// back the whole batch.
    pub fn autovoid_shapes<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        ids: &[BoundaryId],
    ) -> VoidResult<Vec<VoidReport>> {
        let records = self.ordered_records(&*store, ids)?;
        if !store.dynamic_fill_enabled() {
            return self.mark_all_out_of_date(store, &records, "dynamic fill disabled");
        }
        let mark = store.begin();
        let result = match self.params.schedule {
            Schedule::Serial => self.run_serial(store, &records),
            Schedule::Parallel => self.run_parallel(store, &records),
        };
        match result {
            Ok(reports) => {
                store.commit(mark);
                Ok(reports)
            }
            Err(e) => {
                store.rollback(mark);
                Err(e)
            }
        }
    }

    fn run_serial<S: BoardStore + ?Sized>(&self, store: &mut S, records: &[BoundaryRecord]) -> VoidResult<Vec<VoidReport>> {
        let mut reports = Vec::with_capacity(records.len());
        for boundary in records {
            let output = self.run_pass(&*store, boundary);
            reports.push(self.settle(store, boundary, output)?);
        }
        Ok(reports)
    }

    fn run_parallel<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        records: &[BoundaryRecord],
    ) -> VoidResult<Vec<VoidReport>> {
        let mut reports = Vec::with_capacity(records.len());
        let mut start = 0;
        while start < records.len() {
            let priority = records[start].priority;
            let end = start + records[start..].iter().take_while(|b| b.priority == priority).count();
            let tier = &records[start..end];
            debug!("[Autovoid] Computing priority tier {priority} ({} boundaries) in parallel", tier.len());

            let view: &S = store;
            let outputs: Vec<PassOutput<'a>> = tier.par_iter().map(|b| self.run_pass(view, b)).collect();
            for (boundary, output) in tier.iter().zip(outputs) {
                reports.push(self.settle(store, boundary, output)?);
            }
            start = end;
        }
        Ok(reports)
    }

    fn mark_all_out_of_date<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        records: &[BoundaryRecord],
        reason: &str,
    ) -> VoidResult<Vec<VoidReport>> {
        let mut reports = Vec::with_capacity(records.len());
        for b in records {
            store.set_out_of_date(b.id, true)?;
            reports.push(VoidReport::new(b.id, VoidOutcome::MarkedOutOfDate { reason: reason.to_string() }));
        }
        Ok(reports)
    }

    /// Patch every boundary the change reaches. A call made while another
    /// `void_object` is running is ignored.
    pub fn void_object<S: BoardStore + ?Sized>(&self, store: &mut S, change: &ObjectChange) -> VoidResult<Vec<VoidReport>> {
        let Some(_guard) = self.enter() else {
            debug!("[Autovoid] Nested void_object call ignored");
            return Ok(Vec::new());
        };

        let objects: Vec<&Obstacle> = change.before.iter().chain(change.after.iter()).collect();
        if objects.is_empty() || objects.iter().all(|o| o.extents().is_empty()) {
            debug!("[Autovoid] Change carries nothing voidable");
            return Ok(Vec::new());
        }

        let mut windows: IndexMap<String, Vec<Extents>> = IndexMap::new();
        let mut revoid: IndexSet<BoundaryId> = IndexSet::new();
        for o in &objects {
            let ext = o.extents();
            if !ext.is_empty() {
                let regions = layer_regions(&*store, &o.layer);
                let reach = self.params.reach_with(region_clearance(&regions, &ext));
                windows.entry(o.layer.clone()).or_default().push(ext.inflated(reach));
            }
            if let ObstacleKind::Shape { boundary: Some(b), .. } = &o.kind {
                revoid.insert(*b);
            }
        }

        let mut damages = Vec::new();
        for (layer, layer_windows) in &windows {
            for id in store.boundaries_on_layer(layer) {
                let Some(boundary) = store.boundary(id) else {
                    continue;
                };
                if boundary.frozen {
                    continue;
                }
                let ext = boundary.outline.extents();
                let hits: Vec<Extents> = layer_windows.iter().copied().filter(|w| w.intersects(&ext)).collect();
                if hits.is_empty() && !revoid.contains(&id) {
                    continue;
                }
                let mode_transition = self.mode_transition(&boundary);
                damages.push((
                    boundary.priority,
                    Damage { boundary: id, windows: hits, revoid_boundary: revoid.contains(&id), mode_transition },
                ));
            }
        }
        damages.sort_by_key(|(p, _)| std::cmp::Reverse(*p));
        self.apply_damages(store, damages.into_iter().map(|(_, d)| d).collect())
    }

    /// Re-void the part of every boundary on `layer` under `window`
    pub fn update_window<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        layer: &str,
        window: Extents,
    ) -> VoidResult<Vec<VoidReport>> {
        let mut damages = Vec::new();
        for id in store.boundaries_on_layer(layer) {
            let Some(boundary) = store.boundary(id) else {
                continue;
            };
            if boundary.frozen || !boundary.outline.extents().intersects(&window) {
                continue;
            }
            let mode_transition = self.mode_transition(&boundary);
            damages.push((
                boundary.priority,
                Damage { boundary: id, windows: vec![window], revoid_boundary: false, mode_transition },
            ));
        }
        damages.sort_by_key(|(p, _)| std::cmp::Reverse(*p));
        self.apply_damages(store, damages.into_iter().map(|(_, d)| d).collect())
    }

    fn apply_damages<S: BoardStore + ?Sized>(&self, store: &mut S, damages: Vec<Damage>) -> VoidResult<Vec<VoidReport>> {
        if !store.dynamic_fill_enabled() {
            let mut reports = Vec::with_capacity(damages.len());
            for d in damages {
                store.set_out_of_date(d.boundary, true)?;
                reports.push(VoidReport::new(d.boundary, VoidOutcome::MarkedOutOfDate { reason: "dynamic fill disabled".into() }));
            }
            return Ok(reports);
        }
        let mark = store.begin();
        let mut reports = Vec::with_capacity(damages.len());
        for damage in damages {
            let mut updater = PatchUpdater::new(self);
            match updater.run(store, &damage) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    store.rollback(mark);
                    return Err(e);
                }
            }
        }
        store.commit(mark);
        Ok(reports)
    }

    /// Batch update with a per-layer cascade: after one boundary on a layer
    /// fails, the rest of that layer is only marked out of date.
    pub fn update_boundaries<S: BoardStore + ?Sized>(
        &self,
        store: &mut S,
        ids: &[BoundaryId],
        action: FillAction,
    ) -> VoidResult<Vec<VoidReport>> {
        let records = self.ordered_records(&*store, ids)?;
        let action = if store.dynamic_fill_enabled() { action } else { FillAction::OutOfDateOnly };

        let mut by_layer: IndexMap<String, Vec<BoundaryRecord>> = IndexMap::new();
        for b in records {
            by_layer.entry(b.layer.clone()).or_default().push(b);
        }

        let mark = store.begin();
        let mut reports = Vec::new();
        for (layer, boundaries) in by_layer {
            let mut ood_only = action == FillAction::OutOfDateOnly;
            for boundary in boundaries {
                if boundary.frozen {
                    reports.push(VoidReport::new(boundary.id, VoidOutcome::Skipped { reason: "frozen".into() }));
                    continue;
                }
                if ood_only {
                    store.set_out_of_date(boundary.id, true)?;
                    reports.push(VoidReport::new(
                        boundary.id,
                        VoidOutcome::MarkedOutOfDate { reason: "out-of-date only".into() },
                    ));
                    continue;
                }
                if action == FillAction::UpdateVoids && !boundary.out_of_date {
                    reports.push(VoidReport::new(boundary.id, VoidOutcome::Skipped { reason: "up to date".into() }));
                    continue;
                }
                let output = self.run_pass(&*store, &boundary);
                let report = match self.settle(store, &boundary, output) {
                    Ok(r) => r,
                    Err(e) => {
                        store.rollback(mark);
                        return Err(e);
                    }
                };
                if matches!(report.outcome, VoidOutcome::MarkedOutOfDate { .. }) {
                    info!("[Autovoid] Layer {layer}: remaining boundaries only marked out of date");
                    ood_only = true;
                }
                reports.push(report);
            }
        }
        store.commit(mark);
        Ok(reports)
    }
}

/// Thermal pads whose relief cut them off from the surrounding fill
pub fn unconnected_thermals(fragments: &PolySet, thermals: &[ThermalRecord], tolerance: f64) -> Vec<ObstacleId> {
    thermals
        .iter()
        .filter(|t| {
            match fragments.rings.iter().find(|r| r.contains_point_with_holes(t.center, tolerance)) {
                None => true,
                Some(ring) => t.relief.contains(&ring.extents()),
            }
        })
        .map(|t| t.obstacle)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::geometry::{ClipperEngine, Point, Ring, StandardPrimitive};
    use crate::host::MemoryBoard;
    use approx::assert_relative_eq;

    fn square(size: f64) -> PolySet {
        PolySet::from_ring(Ring::rectangle(&Extents::new(0.0, 0.0, size, size)).unwrap())
    }

    fn pad(id: u64, x: f64, y: f64, size: f64) -> Obstacle {
        Obstacle {
            id: ObstacleId(id),
            layer: "L1".into(),
            net: Some("SIG".into()),
            kind: ObstacleKind::Pad {
                center: Point::new(x, y),
                primitive: StandardPrimitive::Rectangle { width: size, height: size },
                rotation: 0.0,
            },
        }
    }

    fn uniform(clearance: f64) -> VoidParams {
        VoidParams { clearance: crate::fill::voiding::params::ClearanceTable::uniform(clearance), ..Default::default() }
    }

    #[test]
    fn test_pad_clears_fourteen_unit_hole() {
        let mut board = MemoryBoard::new();
        let id = board.add_boundary("L1", Some("GND"), square(100.0), 0);
        board.add_obstacle(pad(10, 50.0, 50.0, 10.0));
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, uniform(2.0));
        let report = voider.autovoid_shape(&mut board, id).unwrap();
        assert_eq!(report.outcome, VoidOutcome::Voided { fragments: 1 });

        let frags = board.fragments(id);
        assert_eq!(frags.len(), 1);
        let shape = &frags[0].geometry;
        assert_relative_eq!(shape.extents().width(), 100.0, epsilon = 1e-6);
        assert_eq!(shape.holes.len(), 1);
        let hole = shape.holes[0].extents();
        assert_relative_eq!(hole.width(), 14.0, epsilon = 1e-3);
        assert_relative_eq!(hole.height(), 14.0, epsilon = 1e-3);
        assert_relative_eq!(hole.center().x, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_covering_obstacle_reports_fully_voided() {
        let mut board = MemoryBoard::new();
        let id = board.add_boundary("L1", Some("GND"), square(10.0), 0);
        board.add_obstacle(pad(10, 5.0, 5.0, 20.0));
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, uniform(1.0));
        let report = voider.autovoid_shape(&mut board, id).unwrap();
        assert_eq!(report.outcome, VoidOutcome::FullyVoided);
        assert!(board.fragments(id).is_empty());
    }

    #[test]
    fn test_cancelled_pass_leaves_board_untouched() {
        let mut board = MemoryBoard::new();
        let id = board.add_boundary("L1", Some("GND"), square(100.0), 0);
        board.add_obstacle(pad(10, 50.0, 50.0, 10.0));
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, uniform(2.0));
        voider.autovoid_shape(&mut board, id).unwrap();
        let before = board.fragments(id);

        board.add_obstacle(pad(11, 20.0, 20.0, 4.0));
        voider.cancel_flag().cancel();
        let err = voider.autovoid_shape(&mut board, id).unwrap_err();
        assert!(err.is_cancelled());
        let after = board.fragments(id);
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].id, before[0].id);
        assert!(!board.boundary(id).unwrap().out_of_date);
    }

    #[test]
    fn test_dynamic_fill_disabled_marks_out_of_date() {
        let mut board = MemoryBoard::new();
        let id = board.add_boundary("L1", Some("GND"), square(100.0), 0);
        board.set_dynamic_fill(false);
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, VoidParams::default());
        let report = voider.autovoid_shape(&mut board, id).unwrap();
        assert!(matches!(report.outcome, VoidOutcome::MarkedOutOfDate { .. }));
        assert!(board.boundary(id).unwrap().out_of_date);
    }

    #[test]
    fn test_nested_void_object_is_ignored() {
        let mut board = MemoryBoard::new();
        board.add_boundary("L1", Some("GND"), square(100.0), 0);
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, VoidParams::default());
        let _outer = voider.enter().unwrap();
        let change = ObjectChange { before: None, after: Some(pad(10, 50.0, 50.0, 2.0)) };
        let reports = voider.void_object(&mut board, &change).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_update_boundaries_skips_frozen_and_up_to_date() {
        let mut board = MemoryBoard::new();
        let a = board.add_boundary("L1", Some("GND"), square(100.0), 0);
        let b = board.add_boundary("L2", Some("GND"), square(100.0), 0);
        board.set_frozen(b, true);
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, VoidParams::default());
        let reports = voider.update_boundaries(&mut board, &[a, b], FillAction::UpdateVoids).unwrap();
        assert!(matches!(reports[0].outcome, VoidOutcome::Skipped { .. }));
        assert!(matches!(reports[1].outcome, VoidOutcome::Skipped { .. }));

        board.set_out_of_date(a, true).unwrap();
        let reports = voider.update_boundaries(&mut board, &[a], FillAction::UpdateVoids).unwrap();
        assert!(reports[0].outcome.is_voided());
        assert!(!board.boundary(a).unwrap().out_of_date);
    }

    #[test]
    fn test_out_of_date_only_touches_no_geometry() {
        let mut board = MemoryBoard::new();
        let a = board.add_boundary("L1", Some("GND"), square(100.0), 0);
        let engine = ClipperEngine::default();
        let voider = Autovoider::new(&engine, VoidParams::default());
        let reports = voider.update_boundaries(&mut board, &[a], FillAction::OutOfDateOnly).unwrap();
        assert!(matches!(reports[0].outcome, VoidOutcome::MarkedOutOfDate { .. }));
        assert!(board.fragments(a).is_empty());
        assert!(board.boundary(a).unwrap().out_of_date);
    }

    #[test]
    fn test_unconnected_thermal_detected() {
        let island = Ring::circle(Point::new(50.0, 50.0), 0.5).unwrap();
        let mut outer = Ring::rectangle(&Extents::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let mut hole = Ring::circle(Point::new(50.0, 50.0), 1.0).unwrap();
        hole.set_direction(crate::fill::geometry::Direction::Clockwise);
        outer.holes.push(hole);
        let fragments = PolySet::from_rings(vec![outer, island]);
        let records = [ThermalRecord {
            obstacle: ObstacleId(3),
            center: Point::new(50.0, 50.0),
            relief: Extents::new(49.0, 49.0, 51.0, 51.0),
        }];
        assert_eq!(unconnected_thermals(&fragments, &records, 0.001), vec![ObstacleId(3)]);
        assert!(unconnected_thermals(&square(100.0), &records, 0.001).is_empty());
    }
}
