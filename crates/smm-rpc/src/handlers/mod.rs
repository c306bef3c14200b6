//! JSON-RPC request handlers, split by domain.

mod game;
mod installations;
mod profiles;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smm_core::SmmError;
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

const JSONRPC_VERSION: &str = "2.0";

/// Standard code for a structurally invalid request.
const INVALID_REQUEST: i32 = -32600;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Look up a parameter under its snake_case or camelCase name.
fn param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    params.get(snake).or_else(|| params.get(camel))
}

fn missing_param(snake: &str) -> SmmError {
    SmmError::InvalidParams {
        message: format!("Missing required parameter: {}", snake),
    }
}

pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    param(params, snake, camel).and_then(Value::as_str)
}

pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> smm_core::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| missing_param(snake))
}

pub(crate) fn get_bool_param(params: &Value, snake: &str, camel: &str) -> Option<bool> {
    param(params, snake, camel).and_then(Value::as_bool)
}

pub(crate) fn require_bool_param(params: &Value, snake: &str, camel: &str) -> smm_core::Result<bool> {
    get_bool_param(params, snake, camel).ok_or_else(|| missing_param(snake))
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if request.jsonrpc != JSONRPC_VERSION {
        warn!("Rejecting {} request with jsonrpc={:?}", method, request.jsonrpc);
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid Request: jsonrpc must be \"{}\"", JSONRPC_VERSION),
            )),
        );
    }

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
async fn dispatch_method(state: &AppState, method: &str, params: &Value) -> smm_core::Result<Value> {
    match method {
        // Installations
        "get_installations" => installations::get_installations(state, params).await,
        "get_installations_metadata" => {
            installations::get_installations_metadata(state, params).await
        }
        "get_current_installation_metadata" => {
            installations::get_current_installation_metadata(state, params).await
        }
        "get_invalid_installs" => installations::get_invalid_installs(state, params).await,
        "get_find_errors" => installations::get_find_errors(state, params).await,
        "get_remote_installations" => installations::get_remote_installations(state, params).await,
        "get_selected_install" => installations::get_selected_install(state, params).await,
        "select_install" => installations::select_install(state, params).await,
        "add_custom_installation" => installations::add_custom_installation(state, params).await,
        "add_installation" => installations::add_installation(state, params).await,
        "remove_installation" => installations::remove_installation(state, params).await,
        "clear_installations" => installations::clear_installations(state, params).await,
        "ensure_selected_installation_is_valid" => {
            installations::ensure_selected_installation_is_valid(state, params).await
        }

        // Mods & Profiles
        "get_mods_enabled" => profiles::get_mods_enabled(state, params).await,
        "set_mods_enabled" => profiles::set_mods_enabled(state, params).await,
        "get_profiles" => profiles::get_profiles(state, params).await,
        "select_profile" => profiles::select_profile(state, params).await,
        "get_selected_install_profile_mods" => {
            profiles::get_selected_install_profile_mods(state, params).await
        }
        "get_selected_install_lockfile" => {
            profiles::get_selected_install_lockfile(state, params).await
        }
        "get_selected_install_lockfile_mods" => {
            profiles::get_selected_install_lockfile_mods(state, params).await
        }
        "selected_profile_targets" => profiles::selected_profile_targets(state, params).await,

        // Game & Status
        "is_game_running" => game::is_game_running(state, params).await,
        "launch_game" => game::launch_game(state, params).await,
        "get_current_action" => game::get_current_action(state, params).await,
        "get_latest_events" => game::get_latest_events(state, params).await,

        // Unknown method
        _ => {
            warn!("Method not found: {}", method);
            Err(SmmError::Other(format!("Method not found: {}", method)))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_response_success() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"data": "test"}));
        assert!(response.error.is_none());
        assert!(response.result.is_some());
    }

    #[test]
    fn test_json_rpc_response_error() {
        let response = JsonRpcResponse::error(Some(json!(1)), -32600, "Test error".into());
        assert!(response.error.is_some());
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[test]
    fn test_params_accept_both_casings() {
        let params = json!({"path": "/games/sf", "modsEnabled": false});
        assert_eq!(get_str_param(&params, "path", "path"), Some("/games/sf"));
        assert_eq!(
            get_bool_param(&params, "mods_enabled", "modsEnabled"),
            Some(false)
        );
    }

    #[test]
    fn test_snake_case_wins_over_camel_case() {
        let params = json!({"install_path": "/a", "installPath": "/b"});
        assert_eq!(get_str_param(&params, "install_path", "installPath"), Some("/a"));
        assert_eq!(get_str_param(&json!({"path": 1}), "path", "path"), None);
    }

    #[test]
    fn test_request_keeps_jsonrpc_version() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "1.0", "method": "x", "id": 7})).unwrap();
        assert_eq!(request.jsonrpc, "1.0");
        assert!(request.params.is_none());
    }

    #[test]
    fn test_missing_param_is_invalid_params() {
        let err = require_str_param(&json!({}), "install_path", "installPath").unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32602);
        let err = require_bool_param(&json!({"enabled": "yes"}), "enabled", "enabled").unwrap_err();
        assert!(matches!(err, SmmError::InvalidParams { .. }));
    }
}
