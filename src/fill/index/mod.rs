//! Box index used to classify and consolidate voids
//!
//! # Submodules
//! - `arena` - Paged item storage with compaction
//! - `tree` - Three-way split tree: insert, exact remove, rebalance
//! - `query` - Lazy overlap queries with restartable cursors

mod arena;
mod tree;
mod query;

pub use arena::{Item, ItemId, PAGE_ITEMS};
pub use tree::{RangeTree, RangeTreeError, LEAF_THRESHOLD};
pub use query::{QueryCursor, RangeQuery};
