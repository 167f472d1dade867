//! Copper fill voiding
//!
//! Cuts clearance voids into dynamic fills around every object that must
//! stay clear of them, then cleans and smooths the result.
//!
//! # Submodules
//! - `model` - Boundary, fragment and obstacle records
//! - `params` - Clearance and smoothing parameter bundle
//! - `error` - Pipeline error taxonomy
//! - `context` - Per-pass state and cancellation
//! - `outline` - Inside/outside classification against a shape outline
//! - `collector` - Candidate obstacle collection
//! - `holes` - Clearance and thermal relief generation
//! - `consolidate` - Void list cleanup before the boolean
//! - `merge` - Boolean subtract with recovery
//! - `smooth` - Minimum-area cleaning and aperture smoothing
//! - `patch` - Incremental window repair
//! - `pipeline` - Orchestration and host-facing entry points

mod model;
mod params;
mod error;
mod context;
mod outline;
mod collector;
mod holes;
mod consolidate;
mod merge;
mod smooth;
mod patch;
mod pipeline;

pub use model::{BoundaryId, BoundaryRecord, Obstacle, ObstacleId, ObstacleKind, ShapeId, ShapeRecord};
pub use params::{ClearanceTable, FillMode, ObjectClass, Schedule, ThermalParams, VoidParams};
pub use error::{VoidError, VoidResult};
pub use context::{CancelFlag, InstanceContext, PassStats, ScanSet, ThermalRecord};
pub use outline::{OutlineIndex, Placement};
pub use collector::{collect_candidates, layer_regions, region_clearance, Candidate, VoidTarget};
pub use holes::{clearance_rings, generate_holes, HoleReport};
pub use consolidate::consolidate_voids;
pub use merge::{attach_stand_alone, merge_voids, MergeOutcome};
pub use smooth::{clean_fragments, smooth};
pub use patch::{Damage, PatchState, PatchUpdater};
pub use pipeline::{unconnected_thermals, Autovoider, FillAction, ObjectChange, VoidOutcome, VoidReport};
