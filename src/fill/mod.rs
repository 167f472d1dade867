//! Dynamic copper fill engine
//!
//! # Submodules
//! - `geometry` - Rings, shapes and the boolean engine seam
//! - `index` - Three-way range tree over boxes
//! - `voiding` - The voiding pipeline itself

pub mod geometry;
pub mod index;
pub mod voiding;
