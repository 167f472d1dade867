//! Voiding operations: Autovoid, VoidObject, UpdateWindow

use crate::fill::geometry::Extents;
use crate::fill::voiding::{BoundaryId, FillAction, ObjectChange, ObstacleId, Schedule, VoidError, VoidReport};
use crate::host::{BoardView, ObstacleJson};
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use serde::Deserialize;
use tracing::info;

fn no_board(id: Option<serde_json::Value>) -> Response {
    Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded. Call Load first.".to_string())
}

fn void_error(id: Option<serde_json::Value>, e: VoidError) -> Response {
    let code = match &e {
        VoidError::Cancelled => error_codes::VOID_CANCELLED,
        VoidError::NotVoidable(..) => error_codes::BOUNDARY_NOT_FOUND,
        _ => error_codes::VOID_FAILED,
    };
    Response::error(id, code, e.to_string())
}

fn reports(id: Option<serde_json::Value>, reports: &[VoidReport]) -> Response {
    match serde_json::to_value(reports) {
        Ok(v) => Response::success(id, serde_json::json!({ "reports": v })),
        Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, format!("Failed to encode reports: {}", e)),
    }
}

/// Handle Autovoid request - revoid the given boundaries, or all of them
pub fn handle_autovoid(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize, Default)]
    struct AutovoidParams {
        #[serde(default)]
        shape_ids: Option<Vec<u64>>,
        #[serde(default)]
        parallel: Option<bool>,
        /// Batch action; absent means a plain revoid
        #[serde(default)]
        action: Option<FillAction>,
    }

    let params: AutovoidParams = match params {
        None => AutovoidParams::default(),
        Some(p) => match serde_json::from_value(p) {
            Ok(p) => p,
            Err(e) => return Response::error(id, error_codes::INVALID_PARAMS, format!("Invalid params: {}", e)),
        },
    };
    if let Some(parallel) = params.parallel {
        state.params.schedule = if parallel { Schedule::Parallel } else { Schedule::Serial };
    }
    let Some((voider, board)) = state.voider_and_board() else {
        return no_board(id);
    };

    let ids: Vec<BoundaryId> = match params.shape_ids {
        Some(ids) => ids.into_iter().map(BoundaryId).collect(),
        None => board.boundary_ids(),
    };
    info!("[Server] Autovoid {} boundaries ({:?})", ids.len(), voider.params().schedule);
    let result = match params.action {
        Some(action) => voider.update_boundaries(board, &ids, action),
        None => voider.autovoid_shapes(board, &ids),
    };
    match result {
        Ok(r) => reports(id, &r),
        Err(e) => void_error(id, e),
    }
}

/// Handle VoidObject request - apply an add/move/delete and patch the fills
pub fn handle_void_object(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Action {
        Add,
        Move,
        Delete,
    }

    #[derive(Deserialize)]
    struct VoidObjectParams {
        action: Action,
        #[serde(default)]
        obstacle: Option<ObstacleJson>,
        #[serde(default)]
        id: Option<u64>,
    }

    let params: VoidObjectParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            return Response::error(
                id,
                error_codes::INVALID_PARAMS,
                "Invalid params: expected {action: add|move|delete, obstacle?, id?}".to_string(),
            );
        }
    };
    let Some((voider, board)) = state.voider_and_board() else {
        return no_board(id);
    };

    let change = match (params.action, params.obstacle, params.id) {
        (Action::Add, Some(obstacle), _) => {
            let after = obstacle.into_obstacle();
            if board.boundary(BoundaryId(after.id.0)).is_some() {
                return Response::error(id, error_codes::INVALID_PARAMS, format!("Id {} belongs to a boundary", after.id.0));
            }
            let before = board.add_obstacle(after.clone());
            ObjectChange { before, after: Some(after) }
        }
        (Action::Move, Some(obstacle), _) => {
            let after = obstacle.into_obstacle();
            if board.obstacle(after.id).is_none() || board.boundary(BoundaryId(after.id.0)).is_some() {
                return Response::error(id, error_codes::OBSTACLE_NOT_FOUND, format!("Obstacle {} not found", after.id.0));
            }
            let before = board.add_obstacle(after.clone());
            ObjectChange { before, after: Some(after) }
        }
        (Action::Delete, obstacle, object_id) => {
            let Some(object_id) = object_id.or(obstacle.map(|o| o.id)) else {
                return Response::error(id, error_codes::INVALID_PARAMS, "Delete needs id".to_string());
            };
            match board.remove_obstacle(ObstacleId(object_id)) {
                Some(before) => ObjectChange { before: Some(before), after: None },
                None => return Response::error(id, error_codes::OBSTACLE_NOT_FOUND, format!("Obstacle {} not found", object_id)),
            }
        }
        _ => return Response::error(id, error_codes::INVALID_PARAMS, "Add and Move need an obstacle".to_string()),
    };

    match voider.void_object(board, &change) {
        Ok(r) => reports(id, &r),
        Err(e) => void_error(id, e),
    }
}

/// Handle UpdateWindow request - revoid everything on a layer under a window
pub fn handle_update_window(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize)]
    struct UpdateWindowParams {
        layer: String,
        window: Extents,
    }

    let params: UpdateWindowParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            return Response::error(
                id,
                error_codes::INVALID_PARAMS,
                "Invalid params: expected {layer: string, window: {min_x, min_y, max_x, max_y}}".to_string(),
            );
        }
    };
    let Some((voider, board)) = state.voider_and_board() else {
        return no_board(id);
    };
    let window = Extents::new(params.window.min_x, params.window.min_y, params.window.max_x, params.window.max_y);
    match voider.update_window(board, &params.layer, window) {
        Ok(r) => reports(id, &r),
        Err(e) => void_error(id, e),
    }
}
