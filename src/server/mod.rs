//! JSON-lines server front end for the voiding engine
//!
//! One request per stdin line, one response per stdout line.
//!
//! # Module Structure
//! - `protocol` - Request/response types and error codes
//! - `state` - Loaded board and active parameters
//! - `handlers` - Request handlers and dispatch

pub mod handlers;
pub mod protocol;
pub mod state;

pub use handlers::handle_request;
pub use protocol::{error_codes, ErrorResponse, Request, Response};
pub use state::ServerState;

/// Parse and answer one protocol line. Blank lines yield nothing.
pub fn handle_line(state: &mut ServerState, line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(state, request),
        Err(e) => Response::error(None, error_codes::PARSE_ERROR, format!("Failed to parse request: {}", e)),
    };
    match serde_json::to_string(&response) {
        Ok(text) => Some(text),
        Err(e) => Some(format!(
            r#"{{"id":null,"error":{{"code":{},"message":"{}"}}}}"#,
            error_codes::INTERNAL_ERROR,
            e.to_string().replace('"', "'")
        )),
    }
}
