//! JSON-lines request/response types for the void server

use serde::{Deserialize, Serialize};

/// Request format
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: Option<serde_json::Value>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// Response format
#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Response { id, result: Some(result), error: None }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: String) -> Self {
        Response { id, result: None, error: Some(ErrorResponse { code, message }) }
    }

    /// Serialize `value` as the result, or report why it could not be
    pub fn from_serializable<T: Serialize>(id: Option<serde_json::Value>, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Response::success(id, v),
            Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, format!("Failed to encode result: {}", e)),
        }
    }
}

/// Standard error codes plus voiding-specific ones
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Custom error codes
    pub const NO_BOARD_LOADED: i32 = 2;
    pub const BOUNDARY_NOT_FOUND: i32 = 3;
    pub const OBSTACLE_NOT_FOUND: i32 = 4;
    pub const LOAD_FAILED: i32 = 5;
    pub const VOID_CANCELLED: i32 = 6;
    pub const VOID_FAILED: i32 = 7;
}
