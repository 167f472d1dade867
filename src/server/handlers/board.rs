//! Board operations: Load, SetParams, GetShape, GetBoardSummary

use crate::fill::geometry::{PolySet, PolygonJson};
use crate::fill::voiding::{BoundaryId, VoidParams};
use crate::host::{BoardFile, BoardView};
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Handle Load request - reads a board JSON file or an inline board object
pub fn handle_load(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize)]
    struct LoadParams {
        #[serde(default)]
        file_path: Option<String>,
        #[serde(default)]
        board: Option<serde_json::Value>,
    }

    let params: LoadParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            return Response::error(
                id,
                error_codes::INVALID_PARAMS,
                "Invalid params: expected {file_path: string} or {board: object}".to_string(),
            );
        }
    };

    let start = Instant::now();
    let file = match (&params.file_path, params.board) {
        (Some(path), _) => BoardFile::load(path),
        (None, Some(board)) => serde_json::from_value::<BoardFile>(board).map_err(anyhow::Error::from),
        (None, None) => {
            return Response::error(id, error_codes::INVALID_PARAMS, "Load needs file_path or board".to_string());
        }
    };
    let loaded = file.and_then(BoardFile::into_board);
    let (board, file_params) = match loaded {
        Ok(b) => b,
        Err(e) => return Response::error(id, error_codes::LOAD_FAILED, format!("Failed to load board: {:#}", e)),
    };

    if let Some(p) = file_params {
        state.set_params(p);
    }
    let summary = serde_json::json!({
        "boundaries": board.boundary_ids().len(),
        "obstacles": board.obstacle_count(),
        "layers": board.layers(),
    });
    info!(
        "[Server] Loaded board with {} boundaries, {} obstacles in {:.2?}",
        board.boundary_ids().len(),
        board.obstacle_count(),
        start.elapsed()
    );
    state.board_path = params.file_path;
    state.board = Some(board);
    Response::success(id, summary)
}

/// Handle SetParams request - partial parameters are filled from defaults
pub fn handle_set_params(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    let value = params.unwrap_or_else(|| serde_json::json!({}));
    let parsed: VoidParams = match serde_json::from_value(value) {
        Ok(p) => p,
        Err(e) => return Response::error(id, error_codes::INVALID_PARAMS, format!("Invalid void parameters: {}", e)),
    };
    if parsed.grid <= 0.0 || !parsed.grid.is_finite() {
        return Response::error(id, error_codes::INVALID_PARAMS, "grid must be positive".to_string());
    }
    state.set_params(parsed);
    Response::from_serializable(id, &state.params)
}

#[derive(Debug, Serialize)]
struct FragmentJson {
    id: u64,
    polygon: Vec<PolygonJson>,
    area: f64,
}

#[derive(Debug, Serialize)]
struct ShapeJson {
    id: u64,
    layer: String,
    net: Option<String>,
    priority: i32,
    hatched: bool,
    frozen: bool,
    out_of_date: bool,
    outline: Vec<PolygonJson>,
    fragments: Vec<FragmentJson>,
}

/// Handle GetShape request - outline and current fragments of one boundary
pub fn handle_get_shape(state: &ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize)]
    struct GetShapeParams {
        id: u64,
    }

    let params: GetShapeParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => return Response::error(id, error_codes::INVALID_PARAMS, "Invalid params: expected {id: number}".to_string()),
    };
    let Some(board) = &state.board else {
        return Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded. Call Load first.".to_string());
    };
    let Some(boundary) = board.boundary(BoundaryId(params.id)) else {
        return Response::error(id, error_codes::BOUNDARY_NOT_FOUND, format!("Boundary {} not found", params.id));
    };

    let tol = state.params.arc_tolerance;
    let fragments = board
        .fragments(boundary.id)
        .into_iter()
        .map(|f| FragmentJson {
            id: f.id.0,
            area: f.geometry.net_area(),
            polygon: PolySet::from_ring(f.geometry).to_outline_json(tol),
        })
        .collect();
    let shape = ShapeJson {
        id: boundary.id.0,
        outline: boundary.outline.to_outline_json(tol),
        layer: boundary.layer,
        net: boundary.net,
        priority: boundary.priority,
        hatched: boundary.hatched,
        frozen: boundary.frozen,
        out_of_date: boundary.out_of_date,
        fragments,
    };
    Response::from_serializable(id, &shape)
}

/// Handle GetBoardSummary request - per-boundary fragment counts and state
pub fn handle_get_board_summary(state: &ServerState, id: Option<serde_json::Value>) -> Response {
    let Some(board) = &state.board else {
        return Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded. Call Load first.".to_string());
    };
    let boundaries: Vec<serde_json::Value> = board
        .boundary_ids()
        .into_iter()
        .filter_map(|b| board.boundary(b))
        .map(|b| {
            serde_json::json!({
                "id": b.id.0,
                "layer": b.layer,
                "fragments": board.fragments(b.id).len(),
                "metal_area": board.fill_geometry(b.id).area(),
                "out_of_date": b.out_of_date,
            })
        })
        .collect();
    Response::success(
        id,
        serde_json::json!({
            "file": state.board_path,
            "dynamic_fill": board.dynamic_fill_enabled(),
            "layers": board.layers(),
            "obstacles": board.obstacle_count(),
            "boundaries": boundaries,
        }),
    )
}
