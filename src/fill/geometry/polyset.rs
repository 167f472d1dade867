//! Copper shape geometry: a list of outer rings, each owning its holes
//!
//! Outer rings are kept counter-clockwise and holes clockwise whenever a
//! `PolySet` leaves the boolean engine. Conversion to and from
//! `geo_types::MultiPolygon` flattens arcs at the given tolerance.

use super::ring::{Direction, Ring, RingFlags};
use super::types::{Extents, Point};
use geo_types::{MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

/// A set of outer rings with their hole chains
#[derive(Debug, Clone, Default)]
pub struct PolySet {
    pub rings: Vec<Ring>,
}

impl PolySet {
    pub fn new() -> Self {
        Self { rings: Vec::new() }
    }

    pub fn from_ring(ring: Ring) -> Self {
        Self { rings: vec![ring] }
    }

    pub fn from_rings(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn extents(&self) -> Extents {
        let mut ext = Extents::EMPTY;
        for r in &self.rings {
            ext.include(&r.extents());
        }
        ext
    }

    /// Metal area: outer areas minus hole areas
    pub fn area(&self) -> f64 {
        self.rings.iter().map(Ring::net_area).sum()
    }

    pub fn hole_count(&self) -> usize {
        self.rings.iter().map(|r| r.holes.len()).sum()
    }

    /// Orient outer rings counter-clockwise and holes clockwise
    pub fn normalize_directions(&mut self) {
        for ring in &mut self.rings {
            ring.set_direction(Direction::CounterClockwise);
            for hole in &mut ring.holes {
                hole.set_direction(Direction::Clockwise);
            }
        }
    }

    /// Copy of the outer rings with all holes stripped
    pub fn outline_only(&self) -> PolySet {
        PolySet {
            rings: self
                .rings
                .iter()
                .map(|r| {
                    let mut outer = r.clone();
                    outer.holes.clear();
                    outer
                })
                .collect(),
        }
    }

    /// Detach every hole from its outer ring, flagging it as pre-existing
    pub fn take_holes(&mut self, flag: RingFlags) -> Vec<Ring> {
        let mut out = Vec::new();
        for ring in &mut self.rings {
            for mut hole in ring.holes.drain(..) {
                hole.flags |= flag;
                out.push(hole);
            }
        }
        out
    }

    /// Point inside metal (inside an outer ring and outside its holes)
    pub fn contains_point(&self, p: Point, tolerance: f64) -> bool {
        self.rings.iter().any(|r| r.contains_point_with_holes(p, tolerance))
    }

    pub fn snap(&mut self, grid: f64) {
        for ring in &mut self.rings {
            ring.snap(grid);
        }
    }

    pub fn remove_collinear(&mut self, eps: f64) {
        for ring in &mut self.rings {
            ring.remove_collinear(eps);
            for hole in &mut ring.holes {
                hole.remove_collinear(eps);
            }
        }
    }

    /// Order-independent geometric equality of outlines and holes
    pub fn same_geometry(&self, other: &PolySet, eps: f64) -> bool {
        if self.rings.len() != other.rings.len() || self.hole_count() != other.hole_count() {
            return false;
        }
        let mut used = vec![false; other.rings.len()];
        for a in &self.rings {
            let found = other.rings.iter().enumerate().position(|(i, b)| {
                !used[i]
                    && a.holes.len() == b.holes.len()
                    && a.same_outline(b, eps)
                    && a.holes.iter().all(|ha| b.holes.iter().any(|hb| ha.same_outline(hb, eps)))
            });
            match found {
                Some(i) => used[i] = true,
                None => return false,
            }
        }
        true
    }

    pub fn to_multi_polygon(&self, tolerance: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(
            self.rings
                .iter()
                .map(|r| {
                    Polygon::new(
                        r.to_line_string(tolerance),
                        r.holes.iter().map(|h| h.to_line_string(tolerance)).collect(),
                    )
                })
                .collect(),
        )
    }

    /// Rebuild from a geo multipolygon, dropping degenerate rings and
    /// normalising winding
    pub fn from_multi_polygon(mp: &MultiPolygon<f64>) -> PolySet {
        let mut rings = Vec::with_capacity(mp.0.len());
        for poly in &mp.0 {
            let Some(mut outer) = Ring::from_line_string(poly.exterior()) else {
                continue;
            };
            outer.set_direction(Direction::CounterClockwise);
            for interior in poly.interiors() {
                if let Some(mut hole) = Ring::from_line_string(interior) {
                    hole.set_direction(Direction::Clockwise);
                    outer.holes.push(hole);
                }
            }
            rings.push(outer);
        }
        PolySet { rings }
    }

    /// Serializable point lists for clients
    pub fn to_outline_json(&self, tolerance: f64) -> Vec<PolygonJson> {
        self.rings
            .iter()
            .map(|r| PolygonJson {
                outer: r.flatten(tolerance),
                holes: r.holes.iter().map(|h| h.flatten(tolerance)).collect(),
            })
            .collect()
    }

    pub fn from_outline_json(polys: &[PolygonJson]) -> PolySet {
        let mut rings = Vec::new();
        for p in polys {
            let Some(mut outer) = Ring::from_points(&p.outer) else {
                continue;
            };
            outer.set_direction(Direction::CounterClockwise);
            for h in &p.holes {
                if let Some(mut hole) = Ring::from_points(h) {
                    hole.set_direction(Direction::Clockwise);
                    outer.holes.push(hole);
                }
            }
            rings.push(outer);
        }
        PolySet { rings }
    }
}

/// Plain polygon-with-holes record used by board files and the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonJson {
    pub outer: Vec<Point>,
    #[serde(default)]
    pub holes: Vec<Vec<Point>>,
}
