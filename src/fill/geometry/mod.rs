//! Geometry for copper fill voiding
//!
//! # Submodules
//! - `types` - Points, extents and pad primitives
//! - `ring` - Arena-backed rings with arc segments and hole chains
//! - `polyset` - Shapes as sets of outer rings
//! - `boolean` - Boolean/offset engine seam and the geo-clipper implementation

pub mod types;
pub mod ring;
pub mod polyset;
pub mod boolean;

pub use types::{Extents, Point, StandardPrimitive};
pub use ring::{arc_steps, segments_cross, ArcSeg, Direction, Ring, RingFlags, DEFAULT_ARC_TOLERANCE};
pub use polyset::{PolySet, PolygonJson};
pub use boolean::{BooleanEngine, BooleanError, BooleanOp, ClipperEngine, TrimMode};
