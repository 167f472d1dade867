//! Collaborator interfaces the voiding engine depends on
//!
//! The engine never owns board data. It reads through `BoardView`, writes
//! results through `BoardStore`, and brackets every top-level pass in a
//! transaction so a cancelled or failed pass leaves no partial state.

use crate::fill::geometry::{Extents, Ring};
use crate::fill::voiding::{BoundaryId, BoundaryRecord, FillMode, Obstacle, ObstacleId, ShapeId, ShapeRecord};

/// Opaque transaction handle returned by `Transactions::begin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnMark(pub usize);

/// Read-only board access. Must be shareable across worker threads.
pub trait BoardView: Sync {
    fn boundary(&self, id: BoundaryId) -> Option<BoundaryRecord>;

    /// Boundaries on a layer in stable host order
    fn boundaries_on_layer(&self, layer: &str) -> Vec<BoundaryId>;

    /// Current voided fragments of a boundary
    fn fragments(&self, id: BoundaryId) -> Vec<ShapeRecord>;

    /// Objects on `layer` whose extents overlap `window`, in stable host
    /// order. Other dynamic fills appear as `ObstacleKind::Shape`.
    fn obstacles_in(&self, layer: &str, window: &Extents) -> Vec<Obstacle>;

    fn obstacle(&self, id: ObstacleId) -> Option<Obstacle>;

    /// Every `ObstacleKind::ConstraintRegion` on `layer`, in host order
    fn constraint_regions(&self, layer: &str) -> Vec<Obstacle>;

    /// When false every fill action degrades to marking out-of-date
    fn dynamic_fill_enabled(&self) -> bool {
        true
    }
}

pub trait Transactions {
    fn begin(&mut self) -> TxnMark;
    fn commit(&mut self, mark: TxnMark);
    fn rollback(&mut self, mark: TxnMark);
}

/// Mutable board access
pub trait BoardStore: BoardView + Transactions {
    /// Drop fragments `remove` of `boundary` and add `add` as new fragments
    fn update_fragments(&mut self, boundary: BoundaryId, remove: &[ShapeId], add: Vec<Ring>) -> anyhow::Result<Vec<ShapeId>>;

    fn set_out_of_date(&mut self, boundary: BoundaryId, flag: bool) -> anyhow::Result<()>;

    /// Remember the fill mode fragments were last written with
    fn set_fill_mode(&mut self, boundary: BoundaryId, mode: FillMode) -> anyhow::Result<()>;
}

/// Receives same-net overlaps found while collecting candidates
pub trait DrcCollaborator: Sync {
    fn report_same_net(&self, boundary: BoundaryId, obstacle: ObstacleId, area: Extents);
}

/// DRC collaborator that ignores every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDrc;

impl DrcCollaborator for NoDrc {
    fn report_same_net(&self, _boundary: BoundaryId, _obstacle: ObstacleId, _area: Extents) {}
}
