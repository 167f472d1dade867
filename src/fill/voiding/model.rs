//! Board objects the voiding pipeline reads
//!
//! Ids are host-assigned and unique across boundaries and obstacles, so a
//! dynamic shape seen as an obstacle can reuse its boundary id.

use super::params::{FillMode, ObjectClass};
use crate::fill::geometry::{Extents, Point, PolySet, Ring, StandardPrimitive};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundaryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(pub u64);

/// Parent outline of a dynamic fill. Its voided pieces are `ShapeRecord`s.
#[derive(Debug, Clone)]
pub struct BoundaryRecord {
    pub id: BoundaryId,
    pub layer: String,
    pub net: Option<String>,
    pub outline: PolySet,
    /// Higher priority shapes are voided first and others clear them
    pub priority: i32,
    pub hatched: bool,
    /// Frozen boundaries are left alone by batch and window updates
    pub frozen: bool,
    /// Route keepin the fill must stay inside
    pub keepin: Option<PolySet>,
    pub out_of_date: bool,
    /// Mode of the last pass that wrote fragments
    pub last_fill_mode: Option<FillMode>,
}

/// One voided fragment of a boundary
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub boundary: BoundaryId,
    pub geometry: Ring,
}

/// Something copper must keep clear of
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub layer: String,
    pub net: Option<String>,
    pub kind: ObstacleKind,
}

/// Closed set of obstacle kinds
#[derive(Debug, Clone)]
pub enum ObstacleKind {
    Pad { center: Point, primitive: StandardPrimitive, rotation: f64 },
    Via { center: Point, diameter: f64 },
    Pin { center: Point, primitive: StandardPrimitive, rotation: f64, component: String, pin: String },
    Line { points: Vec<Point>, width: f64 },
    /// Copper shape. `boundary` is set for dynamic fills, whose current
    /// fragments (if voided already) ride along with the outline.
    Shape { boundary: Option<BoundaryId>, priority: i32, outline: PolySet, fragments: Option<PolySet> },
    /// Rule area overriding clearances for objects inside it; never voided
    ConstraintRegion { outline: PolySet, clearance: f64 },
}

impl Obstacle {
    pub fn class(&self) -> Option<ObjectClass> {
        match &self.kind {
            ObstacleKind::Pad { .. } => Some(ObjectClass::Pad),
            ObstacleKind::Via { .. } => Some(ObjectClass::Via),
            ObstacleKind::Pin { .. } => Some(ObjectClass::Pin),
            ObstacleKind::Line { .. } => Some(ObjectClass::Line),
            ObstacleKind::Shape { .. } => Some(ObjectClass::Shape),
            ObstacleKind::ConstraintRegion { .. } => None,
        }
    }

    /// Extents of the object itself, before clearance
    pub fn extents(&self) -> Extents {
        match &self.kind {
            ObstacleKind::Pad { center, primitive, rotation }
            | ObstacleKind::Pin { center, primitive, rotation, .. } => primitive.extents_at(*center, *rotation),
            ObstacleKind::Via { center, diameter } => {
                let r = diameter * 0.5;
                Extents::new(center.x - r, center.y - r, center.x + r, center.y + r)
            }
            ObstacleKind::Line { points, width } => Extents::from_points(points).inflated(width * 0.5),
            ObstacleKind::Shape { outline, fragments, .. } => outline.extents().union(
                &fragments.as_ref().map(PolySet::extents).unwrap_or(Extents::EMPTY),
            ),
            ObstacleKind::ConstraintRegion { outline, .. } => outline.extents(),
        }
    }

    /// Point used for rule-region lookup and thermal connectivity
    pub fn reference_point(&self) -> Point {
        match &self.kind {
            ObstacleKind::Pad { center, .. }
            | ObstacleKind::Pin { center, .. }
            | ObstacleKind::Via { center, .. } => *center,
            _ => self.extents().center(),
        }
    }

    pub fn same_net(&self, net: Option<&str>) -> bool {
        match (self.net.as_deref(), net) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
