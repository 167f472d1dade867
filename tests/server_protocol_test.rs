// JSON-lines protocol round trips through the server dispatcher
use copper_void::server::{error_codes, handle_line, ServerState};
use serde_json::{json, Value};

fn board_json() -> Value {
    json!({
        "boundaries": [
            {"id": 1, "layer": "TOP", "net": "GND",
             "outline": [{"outer": [{"x": 0, "y": 0}, {"x": 100, "y": 0}, {"x": 100, "y": 100}, {"x": 0, "y": 100}]}]}
        ],
        "obstacles": [
            {"id": 10, "layer": "TOP", "net": "SIG", "kind": "pad",
             "center": {"x": 50, "y": 50}, "primitive": {"type": "Rectangle", "width": 10, "height": 10}}
        ]
    })
}

fn call(state: &mut ServerState, id: u64, method: &str, params: Value) -> Value {
    let line = json!({"id": id, "method": method, "params": params}).to_string();
    let response = handle_line(state, &line).unwrap();
    serde_json::from_str(&response).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_autovoid_and_read_back() {
        let mut state = ServerState::new();
        let loaded = call(&mut state, 1, "Load", json!({"board": board_json()}));
        assert_eq!(loaded["id"], 1);
        assert_eq!(loaded["result"]["boundaries"], 1);
        assert_eq!(loaded["result"]["obstacles"], 1);

        call(&mut state, 2, "SetParams", json!({"clearance": {"pad": 2.0}}));
        let voided = call(&mut state, 3, "Autovoid", json!({"shape_ids": [1]}));
        let reports = voided["result"]["reports"].as_array().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["outcome"]["status"], "Voided");
        assert_eq!(reports[0]["outcome"]["fragments"], 1);

        let shape = call(&mut state, 4, "GetShape", json!({"id": 1}));
        let fragments = shape["result"]["fragments"].as_array().unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0]["polygon"][0]["holes"].as_array().unwrap().len(), 1);
        assert_eq!(shape["result"]["out_of_date"], false);
    }

    #[test]
    fn test_void_object_delete_restores_fill() {
        let mut state = ServerState::new();
        call(&mut state, 1, "Load", json!({"board": board_json()}));
        call(&mut state, 2, "Autovoid", json!({}));

        let deleted = call(&mut state, 3, "VoidObject", json!({"action": "delete", "id": 10}));
        assert!(deleted.get("error").is_none(), "{}", deleted);
        let summary = call(&mut state, 4, "GetBoardSummary", Value::Null);
        let area = summary["result"]["boundaries"][0]["metal_area"].as_f64().unwrap();
        assert!((area - 10000.0).abs() < 1e-3, "area {}", area);
        assert_eq!(summary["result"]["obstacles"], 0);

        let missing = call(&mut state, 5, "VoidObject", json!({"action": "delete", "id": 10}));
        assert_eq!(missing["error"]["code"], error_codes::OBSTACLE_NOT_FOUND);
    }

    #[test]
    fn test_errors_use_protocol_codes() {
        let mut state = ServerState::new();
        let no_board = call(&mut state, 1, "Autovoid", json!({}));
        assert_eq!(no_board["error"]["code"], error_codes::NO_BOARD_LOADED);

        let unknown = call(&mut state, 2, "Teleport", Value::Null);
        assert_eq!(unknown["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let garbage: Value = serde_json::from_str(&handle_line(&mut state, "{not json").unwrap()).unwrap();
        assert_eq!(garbage["error"]["code"], error_codes::PARSE_ERROR);
        assert!(handle_line(&mut state, "   ").is_none());

        call(&mut state, 3, "Load", json!({"board": board_json()}));
        let missing = call(&mut state, 4, "GetShape", json!({"id": 99}));
        assert_eq!(missing["error"]["code"], error_codes::BOUNDARY_NOT_FOUND);
        let bad_autovoid = call(&mut state, 5, "Autovoid", json!({"shape_ids": [99]}));
        assert_eq!(bad_autovoid["error"]["code"], error_codes::BOUNDARY_NOT_FOUND);
    }

    #[test]
    fn test_load_failure_reported() {
        let mut state = ServerState::new();
        let response = call(&mut state, 1, "Load", json!({"file_path": "/nonexistent/board.json"}));
        assert_eq!(response["error"]["code"], error_codes::LOAD_FAILED);
        assert!(!state.is_board_loaded());
    }
}
