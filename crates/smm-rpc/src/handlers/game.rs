//! Game process and status handlers.

use crate::server::AppState;
use serde_json::{json, Value};

pub async fn is_game_running(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(json!(state.registry.is_game_running()))
}

pub async fn launch_game(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    let command = state.registry.launch_game().await?;
    Ok(json!({"success": true, "command": command}))
}

pub async fn get_current_action(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(state.registry.current_action())?)
}

/// Last payload of every registry event seen so far, keyed by event name.
pub async fn get_latest_events(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(&*state.latest_events.read().await)?)
}
