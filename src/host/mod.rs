//! Host board collaborators
//!
//! # Submodules
//! - `traits` - Read/write/transaction interfaces the voiding engine uses
//! - `memory` - In-memory board with an rstar obstacle index
//! - `board_file` - JSON board description

pub mod board_file;
pub mod memory;
pub mod traits;

pub use board_file::{BoardFile, BoundaryJson, ObstacleJson, ObstacleKindJson};
pub use memory::MemoryBoard;
pub use traits::{BoardStore, BoardView, DrcCollaborator, NoDrc, Transactions, TxnMark};
