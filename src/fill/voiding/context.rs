//! Per-pass state
//!
//! Everything one voiding pass accumulates lives in an `InstanceContext`
//! created at the start of the pass and dropped at the end. Nothing is
//! shared between passes except the cancellation flag.

use super::error::{VoidError, VoidResult};
use super::model::ObstacleId;
use super::params::VoidParams;
use crate::fill::geometry::{BooleanEngine, Extents, Point};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation signal polled by long-running passes
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Set of objects already handled in this pass
#[derive(Debug, Clone, Default)]
pub struct ScanSet(HashSet<ObstacleId>);

impl ScanSet {
    /// Returns false if the object was already present
    pub fn insert(&mut self, id: ObstacleId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: ObstacleId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Same-net pad given a thermal relief in this pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThermalRecord {
    pub obstacle: ObstacleId,
    pub center: Point,
    /// Outer extents of the relief annulus
    pub relief: Extents,
}

/// Counters reported back to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassStats {
    pub candidates: usize,
    pub voids_generated: usize,
    pub voids_stripped: usize,
    pub duplicates_removed: usize,
    pub stand_alone: usize,
    pub same_net_hits: usize,
    pub reconnects_removed: usize,
    pub fragments_filtered: usize,
    pub boolean_recovered: bool,
    pub shape_changed: bool,
}

/// State for one voiding pass over one shape
pub struct InstanceContext<'a> {
    pub params: VoidParams,
    pub engine: &'a dyn BooleanEngine,
    cancel: CancelFlag,
    /// Objects already turned into candidates
    pub visited: ScanSet,
    /// Pins voided by the pin pattern
    pub pin_voids: ScanSet,
    pub thermals: Vec<ThermalRecord>,
    /// Same-net overlaps to hand to the DRC collaborator
    pub same_net: Vec<(ObstacleId, Extents)>,
    pub stats: PassStats,
}

impl<'a> InstanceContext<'a> {
    pub fn new(params: VoidParams, engine: &'a dyn BooleanEngine, cancel: CancelFlag) -> Self {
        Self {
            params,
            engine,
            cancel,
            visited: ScanSet::default(),
            pin_voids: ScanSet::default(),
            thermals: Vec::new(),
            same_net: Vec::new(),
            stats: PassStats::default(),
        }
    }

    pub fn check_cancel(&self) -> VoidResult<()> {
        if self.cancel.is_cancelled() {
            Err(VoidError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Poll cancellation every `cancel_poll_interval` items
    pub fn checkpoint(&self, processed: usize) -> VoidResult<()> {
        let interval = self.params.cancel_poll_interval.max(1);
        if processed % interval == 0 {
            self.check_cancel()
        } else {
            Ok(())
        }
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}
