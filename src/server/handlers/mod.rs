//! Handler module declarations and request dispatch

pub mod board;
pub mod voiding;

pub use board::*;
pub use voiding::*;

use crate::server::protocol::{error_codes, Request, Response};
use crate::server::state::ServerState;

/// Route one request to its handler
pub fn handle_request(state: &mut ServerState, request: Request) -> Response {
    let Request { id, method, params } = request;
    match method.as_str() {
        "Load" => handle_load(state, id, params),
        "SetParams" => handle_set_params(state, id, params),
        "GetShape" => handle_get_shape(state, id, params),
        "GetBoardSummary" => handle_get_board_summary(state, id),
        "Autovoid" => handle_autovoid(state, id, params),
        "VoidObject" => handle_void_object(state, id, params),
        "UpdateWindow" => handle_update_window(state, id, params),
        _ => Response::error(id, error_codes::METHOD_NOT_FOUND, format!("Unknown method: {}", method)),
    }
}
