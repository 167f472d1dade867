//! JSON board description loaded by the server
//!
//! A board file lists dynamic fill boundaries and the objects they must
//! clear. Outlines use the same `{outer, holes}` polygon form the server
//! returns fragments in.

use super::memory::MemoryBoard;
use crate::fill::geometry::{Point, PolySet, PolygonJson, StandardPrimitive};
use crate::fill::voiding::{BoundaryId, BoundaryRecord, Obstacle, ObstacleId, ObstacleKind, VoidParams};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryJson {
    pub id: u64,
    pub layer: String,
    #[serde(default)]
    pub net: Option<String>,
    pub outline: Vec<PolygonJson>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub hatched: bool,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub keepin: Option<Vec<PolygonJson>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleJson {
    pub id: u64,
    pub layer: String,
    #[serde(default)]
    pub net: Option<String>,
    #[serde(flatten)]
    pub kind: ObstacleKindJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObstacleKindJson {
    Pad {
        center: Point,
        primitive: StandardPrimitive,
        #[serde(default)]
        rotation: f64,
    },
    Via {
        center: Point,
        diameter: f64,
    },
    Pin {
        center: Point,
        primitive: StandardPrimitive,
        #[serde(default)]
        rotation: f64,
        #[serde(default)]
        component: String,
        #[serde(default)]
        pin: String,
    },
    Line {
        points: Vec<Point>,
        width: f64,
    },
    /// Static copper; dynamic fills are boundaries instead
    Shape {
        outline: Vec<PolygonJson>,
    },
    ConstraintRegion {
        outline: Vec<PolygonJson>,
        clearance: f64,
    },
}

impl ObstacleJson {
    pub fn into_obstacle(self) -> Obstacle {
        let kind = match self.kind {
            ObstacleKindJson::Pad { center, primitive, rotation } => ObstacleKind::Pad { center, primitive, rotation },
            ObstacleKindJson::Via { center, diameter } => ObstacleKind::Via { center, diameter },
            ObstacleKindJson::Pin { center, primitive, rotation, component, pin } => {
                ObstacleKind::Pin { center, primitive, rotation, component, pin }
            }
            ObstacleKindJson::Line { points, width } => ObstacleKind::Line { points, width },
            ObstacleKindJson::Shape { outline } => ObstacleKind::Shape {
                boundary: None,
                priority: i32::MAX,
                outline: PolySet::from_outline_json(&outline),
                fragments: None,
            },
            ObstacleKindJson::ConstraintRegion { outline, clearance } => {
                ObstacleKind::ConstraintRegion { outline: PolySet::from_outline_json(&outline), clearance }
            }
        };
        Obstacle { id: ObstacleId(self.id), layer: self.layer, net: self.net, kind }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardFile {
    #[serde(default)]
    pub params: Option<VoidParams>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryJson>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleJson>,
    #[serde(default = "default_true")]
    pub dynamic_fill: bool,
}

impl BoardFile {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid board JSON")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Build the board, returning it with the file's parameters (if any)
    pub fn into_board(self) -> anyhow::Result<(MemoryBoard, Option<VoidParams>)> {
        let mut board = MemoryBoard::new();
        board.set_dynamic_fill(self.dynamic_fill);
        for b in self.boundaries {
            let outline = PolySet::from_outline_json(&b.outline);
            if outline.is_empty() {
                bail!("boundary {} has no usable outline", b.id);
            }
            board.insert_boundary(BoundaryRecord {
                id: BoundaryId(b.id),
                layer: b.layer,
                net: b.net,
                outline,
                priority: b.priority,
                hatched: b.hatched,
                frozen: b.frozen,
                keepin: b.keepin.map(|k| PolySet::from_outline_json(&k)),
                out_of_date: false,
                last_fill_mode: None,
            })?;
        }
        for o in self.obstacles {
            if board.boundary_ids().contains(&BoundaryId(o.id)) {
                bail!("obstacle id {} collides with a boundary", o.id);
            }
            if board.add_obstacle(o.into_obstacle()).is_some() {
                bail!("duplicate obstacle id");
            }
        }
        Ok((board, self.params))
    }
}
