//! Three-way range tree over axis-aligned boxes
//!
//! Each interior node splits on one axis at `coord`. Boxes wholly below the
//! split go LEFT, wholly above go RIGHT, and anything straddling it stays in
//! MIDDLE. Every child slot is either an unordered leaf list or another node.
//! Node boxes always cover everything stored beneath them.
//!
//! Inserts walk straight down without restructuring; call `rebalance` after
//! bulk loading or heavy churn to rebuild a split-quality tree.

use super::arena::{Item, ItemArena, ItemId};
use crate::fill::geometry::Extents;
use thiserror::Error;
use tracing::debug;

/// Lists shorter than this are never split
pub const LEAF_THRESHOLD: usize = 8;

pub(crate) const LEFT: usize = 0;
pub(crate) const MIDDLE: usize = 1;
pub(crate) const RIGHT: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeTreeError {
    #[error("no item with the given box and tag is stored in the tree")]
    NotFound,
    #[error("range tree was modified while a query cursor was live")]
    StaleCursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone)]
pub(crate) enum Child {
    List(Vec<ItemId>),
    Node(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) axis: Axis,
    pub(crate) coord: f64,
    pub(crate) bbox: Extents,
    pub(crate) children: [Child; 3],
}

impl Node {
    fn leaf_root() -> Self {
        // Split at -inf puts every finite box on the RIGHT list
        Self {
            axis: Axis::X,
            coord: f64::MIN,
            bbox: Extents::EMPTY,
            children: [Child::List(Vec::new()), Child::List(Vec::new()), Child::List(Vec::new())],
        }
    }
}

/// Which child slot a box belongs in at a node
pub(crate) fn side(axis: Axis, coord: f64, b: &Extents) -> usize {
    let (lo, hi) = match axis {
        Axis::X => (b.min_x, b.max_x),
        Axis::Y => (b.min_y, b.max_y),
    };
    if hi < coord {
        LEFT
    } else if lo > coord {
        RIGHT
    } else {
        MIDDLE
    }
}

/// Integer bit length, the cheap log used by the split figure of merit
fn bit_length(n: usize) -> f64 {
    (usize::BITS - n.leading_zeros()) as f64
}

/// Spatial index of boxes carrying a `T` payload
#[derive(Debug, Clone)]
pub struct RangeTree<T> {
    pub(crate) nodes: Vec<Node>,
    pub(crate) arena: ItemArena<T>,
    pub(crate) generation: u64,
    inserts_since_rebalance: usize,
}

impl<T> Default for RangeTree<T> {
    fn default() -> Self {
        Self {
            nodes: vec![Node::leaf_root()],
            arena: ItemArena::new(),
            generation: 0,
            inserts_since_rebalance: 0,
        }
    }
}

impl<T: Copy + PartialEq> RangeTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a batch of items and rebalance once
    pub fn from_items(items: impl IntoIterator<Item = (Extents, T)>) -> Self {
        let mut tree = Self::new();
        for (bbox, tag) in items {
            tree.insert(bbox, tag);
        }
        tree.rebalance();
        tree
    }

    pub fn len(&self) -> usize {
        self.arena.live()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.live() == 0
    }

    /// Box covering every stored item
    pub fn bbox(&self) -> Extents {
        self.nodes[0].bbox
    }

    pub fn item(&self, id: ItemId) -> Option<&Item<T>> {
        self.arena.get(id)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Heuristic for callers that insert incrementally
    pub fn needs_rebalance(&self) -> bool {
        self.inserts_since_rebalance > LEAF_THRESHOLD && self.inserts_since_rebalance * 2 > self.len()
    }

    /// Store a box. Inverted corners are normalised first.
    pub fn insert(&mut self, bbox: Extents, tag: T) -> ItemId {
        let bbox = Extents::new(bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y);
        let id = self.arena.alloc(Item { bbox, tag });
        let mut node = 0;
        loop {
            let n = &mut self.nodes[node];
            n.bbox.include(&bbox);
            let s = side(n.axis, n.coord, &bbox);
            match &mut n.children[s] {
                Child::List(list) => {
                    list.push(id);
                    break;
                }
                Child::Node(next) => node = *next,
            }
        }
        self.generation += 1;
        self.inserts_since_rebalance += 1;
        id
    }

    /// Remove the item matching both box and tag exactly
    pub fn remove(&mut self, bbox: Extents, tag: T) -> Result<(), RangeTreeError> {
        let bbox = Extents::new(bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y);
        let mut path = Vec::new();
        let mut node = 0;
        let slot = loop {
            path.push(node);
            let n = &self.nodes[node];
            let s = side(n.axis, n.coord, &bbox);
            match &n.children[s] {
                Child::List(_) => break s,
                Child::Node(next) => node = *next,
            }
        };

        let arena = &self.arena;
        let Child::List(list) = &mut self.nodes[node].children[slot] else {
            return Err(RangeTreeError::NotFound);
        };
        let pos = list
            .iter()
            .position(|id| arena.get(*id).is_some_and(|it| it.bbox == bbox && it.tag == tag))
            .ok_or(RangeTreeError::NotFound)?;
        let id = list.swap_remove(pos);
        self.arena.free(id);
        self.generation += 1;

        // Shrink boxes back up the path until one no longer changes
        while let Some(n) = path.pop() {
            let fresh = self.child_union(n);
            if fresh == self.nodes[n].bbox {
                break;
            }
            self.nodes[n].bbox = fresh;
        }
        Ok(())
    }

    fn child_union(&self, node: usize) -> Extents {
        let mut ext = Extents::EMPTY;
        for child in &self.nodes[node].children {
            match child {
                Child::List(list) => {
                    for id in list {
                        if let Some(item) = self.arena.get(*id) {
                            ext.include(&item.bbox);
                        }
                    }
                }
                Child::Node(n) => {
                    ext.include(&self.nodes[*n].bbox);
                }
            }
        }
        ext
    }

    /// Every live item id in traversal order
    fn collect_ids(&self) -> Vec<ItemId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![0usize];
        while let Some(n) = stack.pop() {
            for child in &self.nodes[n].children {
                match child {
                    Child::List(list) => out.extend_from_slice(list),
                    Child::Node(next) => stack.push(*next),
                }
            }
        }
        out
    }

    /// Pick an axis and split coordinate, or `None` to keep a leaf list
    fn choose_split(&self, ids: &[ItemId]) -> Option<(Axis, f64, [Vec<ItemId>; 3])> {
        let n = ids.len();
        if n < LEAF_THRESHOLD {
            return None;
        }
        let boxes: Vec<&Extents> = ids.iter().filter_map(|id| self.arena.get(*id)).map(|i| &i.bbox).collect();
        let mut bounds = Extents::EMPTY;
        for b in &boxes {
            bounds.include(b);
        }
        let xmid = (bounds.min_x + bounds.max_x) * 0.5;
        let ymid = (bounds.min_y + bounds.max_y) * 0.5;

        let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) = (0usize, 0usize, 0usize, 0usize);
        for b in &boxes {
            if b.max_x < xmid {
                x_lo += 1;
            } else if b.min_x > xmid {
                x_hi += 1;
            }
            if b.max_y < ymid {
                y_lo += 1;
            } else if b.min_y > ymid {
                y_hi += 1;
            }
        }

        // Middle entries are weighted by the whole count: they are rescanned
        // by every query that reaches this node
        let fom = |lo: usize, hi: usize| {
            lo as f64 * bit_length(lo) + n as f64 * bit_length(n - lo - hi) + hi as f64 * bit_length(hi)
        };
        let (axis, coord, lo, hi) = if fom(x_lo, x_hi) <= fom(y_lo, y_hi) {
            (Axis::X, xmid, x_lo, x_hi)
        } else {
            (Axis::Y, ymid, y_lo, y_hi)
        };
        if lo + hi < LEAF_THRESHOLD {
            return None;
        }

        let mut parts: [Vec<ItemId>; 3] = [Vec::with_capacity(lo), Vec::new(), Vec::with_capacity(hi)];
        for id in ids {
            if let Some(item) = self.arena.get(*id) {
                parts[side(axis, coord, &item.bbox)].push(*id);
            }
        }
        Some((axis, coord, parts))
    }

    /// Rebuild the whole tree from its items. Compacts the arena into a
    /// fresh one when it spans more than one page.
    pub fn rebalance(&mut self) {
        let mut ids = self.collect_ids();
        if self.arena.page_count() > 1 {
            let mut fresh = ItemArena::new();
            let mut remapped = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(item) = self.arena.free(*id) {
                    remapped.push(fresh.alloc(item));
                }
            }
            debug!("[RangeTree] Compacted {} items into a fresh arena", remapped.len());
            self.arena = fresh;
            ids = remapped;
        }

        self.nodes.clear();
        let mut stack: Vec<(usize, [Vec<ItemId>; 3])> = Vec::new();
        match self.choose_split(&ids) {
            None => {
                let mut root = Node::leaf_root();
                root.children[RIGHT] = Child::List(ids);
                self.nodes.push(root);
            }
            Some((axis, coord, parts)) => {
                self.nodes.push(Node { axis, coord, ..Node::leaf_root() });
                stack.push((0, parts));
            }
        }

        // Explicit stack keeps degenerate inputs from recursing deeply
        while let Some((node, parts)) = stack.pop() {
            for (slot, part) in parts.into_iter().enumerate() {
                match self.choose_split(&part) {
                    None => self.nodes[node].children[slot] = Child::List(part),
                    Some((axis, coord, sub)) => {
                        let child = self.nodes.len();
                        self.nodes.push(Node { axis, coord, ..Node::leaf_root() });
                        self.nodes[node].children[slot] = Child::Node(child);
                        stack.push((child, sub));
                    }
                }
            }
        }

        // Children always sit at higher indices than their parent
        for n in (0..self.nodes.len()).rev() {
            self.nodes[n].bbox = self.child_union(n);
        }
        self.generation += 1;
        self.inserts_since_rebalance = 0;
    }

    /// Maximum node depth, for diagnostics
    pub fn depth(&self) -> usize {
        let mut best = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((n, d)) = stack.pop() {
            best = best.max(d);
            for child in &self.nodes[n].children {
                if let Child::Node(next) = child {
                    stack.push((*next, d + 1));
                }
            }
        }
        best
    }

    /// Longest leaf list, for diagnostics
    pub fn longest_list(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|n| n.children.iter())
            .filter_map(|c| match c {
                Child::List(l) => Some(l.len()),
                Child::Node(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Check that every node box covers its contents
    #[cfg(test)]
    pub(crate) fn boxes_cover_contents(&self) -> bool {
        (0..self.nodes.len()).all(|n| {
            let contents = self.child_union(n);
            contents.is_empty() || self.nodes[n].bbox.contains(&contents)
        })
    }
}
