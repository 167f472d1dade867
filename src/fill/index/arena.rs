//! Paged item storage for the range tree
//!
//! Items are allocated into fixed-size pages and addressed by `ItemId`.
//! Freed slots are not reused; a rebalance that finds more than one page
//! compacts live items into a fresh arena.

use crate::fill::geometry::Extents;

/// Items per backing page
pub const PAGE_ITEMS: usize = 8 * 1024;

/// Handle to an item in an `ItemArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u32);

impl ItemId {
    fn page(self) -> usize {
        self.0 as usize / PAGE_ITEMS
    }

    fn slot(self) -> usize {
        self.0 as usize % PAGE_ITEMS
    }
}

/// A stored box and its caller payload
#[derive(Debug, Clone, PartialEq)]
pub struct Item<T> {
    pub bbox: Extents,
    pub tag: T,
}

#[derive(Debug, Clone)]
pub struct ItemArena<T> {
    pages: Vec<Vec<Option<Item<T>>>>,
    live: usize,
}

impl<T> Default for ItemArena<T> {
    fn default() -> Self {
        Self { pages: Vec::new(), live: 0 }
    }
}

impl<T> ItemArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, item: Item<T>) -> ItemId {
        let needs_page = self.pages.last().map_or(true, |p| p.len() >= PAGE_ITEMS);
        if needs_page {
            self.pages.push(Vec::with_capacity(PAGE_ITEMS));
        }
        let page_idx = self.pages.len() - 1;
        let page = &mut self.pages[page_idx];
        let id = ItemId((page_idx * PAGE_ITEMS + page.len()) as u32);
        page.push(Some(item));
        self.live += 1;
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item<T>> {
        self.pages.get(id.page())?.get(id.slot())?.as_ref()
    }

    pub fn free(&mut self, id: ItemId) -> Option<Item<T>> {
        let taken = self.pages.get_mut(id.page())?.get_mut(id.slot())?.take();
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Allocated slots including freed ones
    pub fn allocated(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(i: u32) -> Item<u32> {
        Item { bbox: Extents::new(0.0, 0.0, 1.0, 1.0), tag: i }
    }

    #[test]
    fn test_alloc_spills_into_new_page() {
        let mut arena = ItemArena::new();
        for i in 0..(PAGE_ITEMS as u32 + 1) {
            arena.alloc(item(i));
        }
        assert_eq!(arena.page_count(), 2);
        assert_eq!(arena.live(), PAGE_ITEMS + 1);
    }

    #[test]
    fn test_free_is_idempotent() {
        let mut arena = ItemArena::new();
        let id = arena.alloc(item(7));
        assert_eq!(arena.free(id).map(|i| i.tag), Some(7));
        assert!(arena.free(id).is_none());
        assert!(arena.get(id).is_none());
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.allocated(), 1);
    }
}
