//! Overlap queries against a `RangeTree`
//!
//! `QueryCursor` owns its traversal stack and can be restarted or narrowed
//! without reallocating. It remembers the tree generation it was started
//! against and refuses to continue once the tree has been modified.
//! `RangeQuery` wraps a cursor in an iterator that borrows the tree, so the
//! borrow checker rules out mutation for its lifetime.

use super::arena::{Item, ItemId};
use super::tree::{side, Child, RangeTree, RangeTreeError, LEFT, MIDDLE, RIGHT};
use crate::fill::geometry::Extents;

#[derive(Debug, Clone, Copy)]
enum Frame {
    Node(usize),
    List { node: usize, slot: usize, pos: usize },
}

/// Restartable traversal state for an overlap query
#[derive(Debug, Clone)]
pub struct QueryCursor {
    search: Extents,
    stack: Vec<Frame>,
    generation: u64,
}

impl QueryCursor {
    pub fn new<T: Copy + PartialEq>(tree: &RangeTree<T>, search: Extents) -> Self {
        let mut cursor = Self { search, stack: Vec::with_capacity(32), generation: 0 };
        cursor.reset(tree, search);
        cursor
    }

    /// Restart from the root with a new search box
    pub fn reset<T: Copy + PartialEq>(&mut self, tree: &RangeTree<T>, search: Extents) {
        self.search = Extents::new(search.min_x, search.min_y, search.max_x, search.max_y);
        self.stack.clear();
        self.stack.push(Frame::Node(0));
        self.generation = tree.generation();
    }

    /// Shrink the search box in place; pending frames are re-pruned lazily
    pub fn narrow(&mut self, window: &Extents) {
        self.search = self.search.intersection(window);
    }

    pub fn search_box(&self) -> Extents {
        self.search
    }

    /// Next overlapping item, or `Ok(None)` when exhausted
    pub fn advance<T: Copy + PartialEq>(&mut self, tree: &RangeTree<T>) -> Result<Option<ItemId>, RangeTreeError> {
        if self.generation != tree.generation() {
            return Err(RangeTreeError::StaleCursor);
        }
        if self.search.is_empty() {
            self.stack.clear();
            return Ok(None);
        }
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Node(n) => {
                    let node = &tree.nodes[n];
                    if !node.bbox.intersects(&self.search) {
                        continue;
                    }
                    let slots: &[usize] = match side(node.axis, node.coord, &self.search) {
                        LEFT => &[MIDDLE, LEFT],
                        RIGHT => &[MIDDLE, RIGHT],
                        _ => &[MIDDLE, RIGHT, LEFT],
                    };
                    for &slot in slots {
                        match &node.children[slot] {
                            Child::List(list) if list.is_empty() => {}
                            Child::List(_) => self.stack.push(Frame::List { node: n, slot, pos: 0 }),
                            Child::Node(child) => self.stack.push(Frame::Node(*child)),
                        }
                    }
                }
                Frame::List { node, slot, pos } => {
                    let Child::List(list) = &tree.nodes[node].children[slot] else {
                        continue;
                    };
                    // Scan lazily; park the position before yielding
                    let mut p = pos;
                    while p < list.len() {
                        let id = list[p];
                        p += 1;
                        if tree.arena.get(id).is_some_and(|it| it.bbox.intersects(&self.search)) {
                            self.stack.push(Frame::List { node, slot, pos: p });
                            return Ok(Some(id));
                        }
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Iterator over items overlapping a box
pub struct RangeQuery<'a, T> {
    tree: &'a RangeTree<T>,
    cursor: QueryCursor,
}

impl<'a, T: Copy + PartialEq> Iterator for RangeQuery<'a, T> {
    type Item = &'a Item<T>;

    fn next(&mut self) -> Option<Self::Item> {
        // The shared borrow of the tree means the generation cannot move
        let id = self.cursor.advance(self.tree).ok().flatten()?;
        self.tree.item(id)
    }
}

impl<T: Copy + PartialEq> RangeTree<T> {
    /// Items whose boxes overlap `search`; touching counts as overlapping
    pub fn query(&self, search: Extents) -> RangeQuery<'_, T> {
        RangeQuery { tree: self, cursor: QueryCursor::new(self, search) }
    }

    /// Payloads of every item overlapping `search`
    pub fn query_tags(&self, search: Extents) -> Vec<T> {
        self.query(search).map(|item| item.tag).collect()
    }

    pub fn any_overlap(&self, search: Extents) -> bool {
        self.query(search).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(items: &[(Extents, u32)], search: &Extents) -> Vec<u32> {
        let mut out: Vec<u32> = items.iter().filter(|(b, _)| b.intersects(search)).map(|(_, t)| *t).collect();
        out.sort();
        out
    }

    fn scattered(n: u32) -> Vec<(Extents, u32)> {
        // Deterministic pseudo-random layout with a mix of sizes
        let mut seed = 12345u64;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64) / (u32::MAX as f64 / 2.0)
        };
        (0..n)
            .map(|i| {
                let x = next() * 1000.0;
                let y = next() * 1000.0;
                let w = 1.0 + next() * if i % 17 == 0 { 400.0 } else { 20.0 };
                let h = 1.0 + next() * 20.0;
                (Extents::new(x, y, x + w, y + h), i)
            })
            .collect()
    }

    #[test]
    fn test_query_matches_brute_force() {
        let items = scattered(3000);
        let tree = RangeTree::from_items(items.iter().copied());
        for search in [
            Extents::new(100.0, 100.0, 200.0, 200.0),
            Extents::new(0.0, 0.0, 2000.0, 2000.0),
            Extents::new(500.0, -10.0, 500.0, 2000.0),
            Extents::new(-50.0, -50.0, -10.0, -10.0),
        ] {
            let mut got = tree.query_tags(search);
            got.sort();
            assert_eq!(got, brute_force(&items, &search));
        }
    }

    #[test]
    fn test_query_before_rebalance() {
        let items = scattered(200);
        let mut tree = RangeTree::new();
        for (b, t) in &items {
            tree.insert(*b, *t);
        }
        let search = Extents::new(300.0, 300.0, 600.0, 600.0);
        let mut got = tree.query_tags(search);
        got.sort();
        assert_eq!(got, brute_force(&items, &search));
    }

    #[test]
    fn test_touching_boxes_overlap() {
        let tree = RangeTree::from_items([(Extents::new(0.0, 0.0, 1.0, 1.0), 9u32)]);
        assert_eq!(tree.query_tags(Extents::new(1.0, 1.0, 2.0, 2.0)), vec![9]);
    }

    #[test]
    fn test_stale_cursor_is_reported() {
        let mut tree = RangeTree::from_items(scattered(50));
        let mut cursor = QueryCursor::new(&tree, Extents::new(0.0, 0.0, 1000.0, 1000.0));
        assert!(cursor.advance(&tree).unwrap().is_some());
        tree.insert(Extents::new(0.0, 0.0, 1.0, 1.0), 999);
        assert_eq!(cursor.advance(&tree), Err(RangeTreeError::StaleCursor));
        cursor.reset(&tree, Extents::new(0.0, 0.0, 1.0, 1.0));
        let mut seen = Vec::new();
        while let Some(id) = cursor.advance(&tree).unwrap() {
            seen.push(tree.item(id).unwrap().tag);
        }
        assert!(seen.contains(&999));
    }

    #[test]
    fn test_narrowed_cursor_skips_outside_items() {
        let items: Vec<(Extents, u32)> =
            (0..100).map(|i| (Extents::new(i as f64 * 10.0, 0.0, i as f64 * 10.0 + 1.0, 1.0), i)).collect();
        let tree = RangeTree::from_items(items);
        let mut cursor = QueryCursor::new(&tree, Extents::new(0.0, 0.0, 1000.0, 1.0));
        cursor.narrow(&Extents::new(0.0, 0.0, 55.0, 1.0));
        let mut count = 0;
        while cursor.advance(&tree).unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 6);
    }
}
