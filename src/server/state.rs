//! Server state: the loaded board and the parameters passes run with

use crate::fill::geometry::ClipperEngine;
use crate::fill::voiding::{Autovoider, VoidParams};
use crate::host::MemoryBoard;

pub struct ServerState {
    pub board_path: Option<String>,
    pub board: Option<MemoryBoard>,
    pub params: VoidParams,
    pub engine: ClipperEngine,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    pub fn new() -> Self {
        let params = VoidParams::default();
        Self {
            board_path: None,
            engine: ClipperEngine::new(params.grid, params.arc_tolerance),
            params,
            board: None,
        }
    }

    pub fn is_board_loaded(&self) -> bool {
        self.board.is_some()
    }

    /// Replace the parameters and rebuild the engine on the new grid
    pub fn set_params(&mut self, params: VoidParams) {
        self.engine = ClipperEngine::new(params.grid, params.arc_tolerance);
        self.params = params;
    }

    /// Split borrow: a voider over the engine plus the mutable board. Each
    /// request gets a fresh voider and so a fresh cancellation flag.
    pub fn voider_and_board(&mut self) -> Option<(Autovoider<'_>, &mut MemoryBoard)> {
        let board = self.board.as_mut()?;
        let voider = Autovoider::new(&self.engine, self.params.clone());
        Some((voider, board))
    }
}
