//! In-memory board used by the server and tests
//!
//! Obstacles are indexed per layer in an rstar R-tree. Dynamic fills are
//! not stored as obstacles; `obstacles_in` synthesizes a `Shape` obstacle
//! for every boundary on the layer so fills clear each other.
//! Transactions snapshot the fill state (boundaries and fragments).

use super::traits::{BoardStore, BoardView, Transactions, TxnMark};
use crate::fill::geometry::{Extents, PolySet, Ring};
use crate::fill::voiding::{
    BoundaryId, BoundaryRecord, FillMode, Obstacle, ObstacleId, ObstacleKind, ShapeId, ShapeRecord,
};
use anyhow::bail;
use indexmap::IndexMap;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

/// Obstacle envelope stored in the R-tree
#[derive(Debug, Clone, PartialEq)]
struct ObstacleEntry {
    id: ObstacleId,
    bounds: AABB<[f64; 2]>,
}

impl ObstacleEntry {
    fn new(id: ObstacleId, ext: &Extents) -> Self {
        Self { id, bounds: AABB::from_corners([ext.min_x, ext.min_y], [ext.max_x, ext.max_y]) }
    }
}

impl RTreeObject for ObstacleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

#[derive(Debug, Clone)]
struct FillSnapshot {
    boundaries: IndexMap<BoundaryId, BoundaryRecord>,
    fragments: IndexMap<BoundaryId, Vec<ShapeRecord>>,
}

pub struct MemoryBoard {
    boundaries: IndexMap<BoundaryId, BoundaryRecord>,
    /// Present once a boundary has been voided, even if nothing is left
    fragments: IndexMap<BoundaryId, Vec<ShapeRecord>>,
    obstacles: IndexMap<ObstacleId, Obstacle>,
    spatial: HashMap<String, RTree<ObstacleEntry>>,
    snapshots: Vec<FillSnapshot>,
    next_id: u64,
    dynamic_fill: bool,
}

impl Default for MemoryBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self {
            boundaries: IndexMap::new(),
            fragments: IndexMap::new(),
            obstacles: IndexMap::new(),
            spatial: HashMap::new(),
            snapshots: Vec::new(),
            next_id: 1,
            dynamic_fill: true,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reserve_id(&mut self, id: u64) {
        self.next_id = self.next_id.max(id + 1);
    }

    /// Add a dynamic fill boundary with a fresh id
    pub fn add_boundary(&mut self, layer: &str, net: Option<&str>, outline: PolySet, priority: i32) -> BoundaryId {
        let id = BoundaryId(self.allocate_id());
        self.boundaries.insert(
            id,
            BoundaryRecord {
                id,
                layer: layer.to_string(),
                net: net.map(str::to_string),
                outline,
                priority,
                hatched: false,
                frozen: false,
                keepin: None,
                out_of_date: false,
                last_fill_mode: None,
            },
        );
        id
    }

    /// Insert a fully specified boundary, keeping its id
    pub fn insert_boundary(&mut self, record: BoundaryRecord) -> anyhow::Result<()> {
        if self.boundaries.contains_key(&record.id) || self.obstacles.contains_key(&ObstacleId(record.id.0)) {
            bail!("id {} already in use", record.id.0);
        }
        self.reserve_id(record.id.0);
        self.boundaries.insert(record.id, record);
        Ok(())
    }

    /// Add or replace an obstacle, returning the previous version
    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> Option<Obstacle> {
        self.reserve_id(obstacle.id.0);
        let previous = self.remove_obstacle(obstacle.id);
        let entry = ObstacleEntry::new(obstacle.id, &obstacle.extents());
        self.spatial.entry(obstacle.layer.clone()).or_default().insert(entry);
        self.obstacles.insert(obstacle.id, obstacle);
        previous
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let obstacle = self.obstacles.shift_remove(&id)?;
        if let Some(tree) = self.spatial.get_mut(&obstacle.layer) {
            tree.remove(&ObstacleEntry::new(id, &obstacle.extents()));
        }
        Some(obstacle)
    }

    pub fn set_dynamic_fill(&mut self, enabled: bool) {
        self.dynamic_fill = enabled;
    }

    fn boundary_mut(&mut self, id: BoundaryId) -> anyhow::Result<&mut BoundaryRecord> {
        match self.boundaries.get_mut(&id) {
            Some(b) => Ok(b),
            None => bail!("unknown boundary {}", id.0),
        }
    }

    pub fn set_frozen(&mut self, id: BoundaryId, frozen: bool) {
        if let Ok(b) = self.boundary_mut(id) {
            b.frozen = frozen;
        }
    }

    pub fn set_hatched(&mut self, id: BoundaryId, hatched: bool) {
        if let Ok(b) = self.boundary_mut(id) {
            b.hatched = hatched;
        }
    }

    pub fn set_keepin(&mut self, id: BoundaryId, keepin: Option<PolySet>) {
        if let Ok(b) = self.boundary_mut(id) {
            b.keepin = keepin;
        }
    }

    pub fn boundary_ids(&self) -> Vec<BoundaryId> {
        self.boundaries.keys().copied().collect()
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    /// Layers in first-seen order across boundaries and obstacles
    pub fn layers(&self) -> Vec<String> {
        let mut layers: Vec<String> = Vec::new();
        let names = self.boundaries.values().map(|b| &b.layer).chain(self.obstacles.values().map(|o| &o.layer));
        for name in names {
            if !layers.contains(name) {
                layers.push(name.clone());
            }
        }
        layers
    }

    /// Current metal of a boundary as one shape
    pub fn fill_geometry(&self, id: BoundaryId) -> PolySet {
        PolySet::from_rings(self.fragments(id).into_iter().map(|f| f.geometry).collect())
    }

    fn shape_obstacle(&self, boundary: &BoundaryRecord) -> Obstacle {
        let fragments = self
            .fragments
            .get(&boundary.id)
            .map(|frags| PolySet::from_rings(frags.iter().map(|f| f.geometry.clone()).collect()));
        Obstacle {
            id: ObstacleId(boundary.id.0),
            layer: boundary.layer.clone(),
            net: boundary.net.clone(),
            kind: ObstacleKind::Shape {
                boundary: Some(boundary.id),
                priority: boundary.priority,
                outline: boundary.outline.clone(),
                fragments,
            },
        }
    }
}

impl BoardView for MemoryBoard {
    fn boundary(&self, id: BoundaryId) -> Option<BoundaryRecord> {
        self.boundaries.get(&id).cloned()
    }

    fn boundaries_on_layer(&self, layer: &str) -> Vec<BoundaryId> {
        self.boundaries.values().filter(|b| b.layer == layer).map(|b| b.id).collect()
    }

    fn fragments(&self, id: BoundaryId) -> Vec<ShapeRecord> {
        self.fragments.get(&id).cloned().unwrap_or_default()
    }

    fn obstacles_in(&self, layer: &str, window: &Extents) -> Vec<Obstacle> {
        if window.is_empty() {
            return Vec::new();
        }
        let mut found: Vec<(usize, Obstacle)> = Vec::new();
        if let Some(tree) = self.spatial.get(layer) {
            let envelope = AABB::from_corners([window.min_x, window.min_y], [window.max_x, window.max_y]);
            for entry in tree.locate_in_envelope_intersecting(&envelope) {
                if let Some((index, _, obstacle)) = self.obstacles.get_full(&entry.id) {
                    found.push((index, obstacle.clone()));
                }
            }
        }
        found.sort_by_key(|(index, _)| *index);
        let mut out: Vec<Obstacle> = found.into_iter().map(|(_, o)| o).collect();

        for boundary in self.boundaries.values().filter(|b| b.layer == layer) {
            let shape = self.shape_obstacle(boundary);
            if shape.extents().intersects(window) {
                out.push(shape);
            }
        }
        out
    }

    fn obstacle(&self, id: ObstacleId) -> Option<Obstacle> {
        if let Some(o) = self.obstacles.get(&id) {
            return Some(o.clone());
        }
        self.boundaries.get(&BoundaryId(id.0)).map(|b| self.shape_obstacle(b))
    }

    fn constraint_regions(&self, layer: &str) -> Vec<Obstacle> {
        self.obstacles
            .values()
            .filter(|o| o.layer == layer && matches!(o.kind, ObstacleKind::ConstraintRegion { .. }))
            .cloned()
            .collect()
    }

    fn dynamic_fill_enabled(&self) -> bool {
        self.dynamic_fill
    }
}

impl Transactions for MemoryBoard {
    fn begin(&mut self) -> TxnMark {
        self.snapshots.push(FillSnapshot { boundaries: self.boundaries.clone(), fragments: self.fragments.clone() });
        TxnMark(self.snapshots.len() - 1)
    }

    fn commit(&mut self, mark: TxnMark) {
        self.snapshots.truncate(mark.0);
    }

    fn rollback(&mut self, mark: TxnMark) {
        if mark.0 >= self.snapshots.len() {
            return;
        }
        let snapshot = self.snapshots.swap_remove(mark.0);
        self.snapshots.truncate(mark.0);
        self.boundaries = snapshot.boundaries;
        self.fragments = snapshot.fragments;
    }
}

impl BoardStore for MemoryBoard {
    fn update_fragments(&mut self, boundary: BoundaryId, remove: &[ShapeId], add: Vec<Ring>) -> anyhow::Result<Vec<ShapeId>> {
        if !self.boundaries.contains_key(&boundary) {
            bail!("unknown boundary {}", boundary.0);
        }
        let mut current = self.fragments.get(&boundary).cloned().unwrap_or_default();
        for id in remove {
            let Some(pos) = current.iter().position(|f| f.id == *id) else {
                bail!("fragment {} not found on boundary {}", id.0, boundary.0);
            };
            current.remove(pos);
        }
        let mut added = Vec::with_capacity(add.len());
        for geometry in add {
            let id = ShapeId(self.allocate_id());
            current.push(ShapeRecord { id, boundary, geometry });
            added.push(id);
        }
        self.fragments.insert(boundary, current);
        Ok(added)
    }

    fn set_out_of_date(&mut self, boundary: BoundaryId, flag: bool) -> anyhow::Result<()> {
        self.boundary_mut(boundary)?.out_of_date = flag;
        Ok(())
    }

    fn set_fill_mode(&mut self, boundary: BoundaryId, mode: FillMode) -> anyhow::Result<()> {
        self.boundary_mut(boundary)?.last_fill_mode = Some(mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::geometry::Point;

    fn square(x: f64, size: f64) -> PolySet {
        PolySet::from_ring(Ring::rectangle(&Extents::new(x, 0.0, x + size, size)).unwrap())
    }

    fn via(id: u64, x: f64, y: f64) -> Obstacle {
        Obstacle {
            id: ObstacleId(id),
            layer: "L1".into(),
            net: None,
            kind: ObstacleKind::Via { center: Point::new(x, y), diameter: 1.0 },
        }
    }

    #[test]
    fn test_obstacles_in_window_keep_insertion_order() {
        let mut board = MemoryBoard::new();
        board.add_obstacle(via(30, 5.0, 5.0));
        board.add_obstacle(via(10, 6.0, 5.0));
        board.add_obstacle(via(20, 50.0, 50.0));
        let ids: Vec<u64> = board.obstacles_in("L1", &Extents::new(0.0, 0.0, 10.0, 10.0)).iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![30, 10]);
        assert!(board.obstacles_in("L2", &Extents::new(0.0, 0.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn test_boundaries_appear_as_shape_obstacles() {
        let mut board = MemoryBoard::new();
        let a = board.add_boundary("L1", None, square(0.0, 10.0), 0);
        let found = board.obstacles_in("L1", &Extents::new(5.0, 5.0, 6.0, 6.0));
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0].kind, ObstacleKind::Shape { boundary: Some(b), fragments: None, .. } if b == a));
    }

    #[test]
    fn test_rollback_restores_fragments() {
        let mut board = MemoryBoard::new();
        let a = board.add_boundary("L1", None, square(0.0, 10.0), 0);
        let first = board.update_fragments(a, &[], vec![Ring::rectangle(&Extents::new(0.0, 0.0, 5.0, 5.0)).unwrap()]).unwrap();

        let mark = board.begin();
        board.update_fragments(a, &first, Vec::new()).unwrap();
        board.set_out_of_date(a, true).unwrap();
        assert!(board.fragments(a).is_empty());
        board.rollback(mark);

        assert_eq!(board.fragments(a).len(), 1);
        assert!(!board.boundary(a).unwrap().out_of_date);
    }

    #[test]
    fn test_nested_commit_keeps_outer_snapshot() {
        let mut board = MemoryBoard::new();
        let a = board.add_boundary("L1", None, square(0.0, 10.0), 0);
        let outer = board.begin();
        let inner = board.begin();
        board.set_out_of_date(a, true).unwrap();
        board.commit(inner);
        board.rollback(outer);
        assert!(!board.boundary(a).unwrap().out_of_date);
    }

    #[test]
    fn test_unknown_fragment_rejected() {
        let mut board = MemoryBoard::new();
        let a = board.add_boundary("L1", None, square(0.0, 10.0), 0);
        assert!(board.update_fragments(a, &[ShapeId(999)], Vec::new()).is_err());
    }

    #[test]
    fn test_replacing_obstacle_moves_it_in_index() {
        let mut board = MemoryBoard::new();
        board.add_obstacle(via(7, 5.0, 5.0));
        let old = board.add_obstacle(via(7, 80.0, 80.0));
        assert!(old.is_some());
        assert!(board.obstacles_in("L1", &Extents::new(0.0, 0.0, 10.0, 10.0)).is_empty());
        assert_eq!(board.obstacles_in("L1", &Extents::new(75.0, 75.0, 85.0, 85.0)).len(), 1);
        assert_eq!(board.obstacle_count(), 1);
    }
}
