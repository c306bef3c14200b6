//! Installation list handlers.

use super::require_str_param;
use crate::server::AppState;
use serde_json::{json, Value};
use smm_core::{Installation, SmmError};

pub async fn get_installations(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(json!(state.registry.get_installations().await))
}

pub async fn get_installations_metadata(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(
        state.registry.get_installations_metadata(),
    )?)
}

pub async fn get_current_installation_metadata(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(
        state.registry.get_current_installation_metadata().await,
    )?)
}

pub async fn get_invalid_installs(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(json!(state.registry.get_invalid_installs().await))
}

pub async fn get_find_errors(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(state.registry.get_find_errors().await)?)
}

pub async fn get_remote_installations(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(json!(state.registry.get_remote_installations().await))
}

pub async fn get_selected_install(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(
        state.registry.get_selected_install().await,
    )?)
}

pub async fn select_install(state: &AppState, params: &Value) -> smm_core::Result<Value> {
    let path = require_str_param(params, "path", "path")?;
    state.registry.select_install(&path).await?;
    Ok(json!({"success": true}))
}

pub async fn add_custom_installation(state: &AppState, params: &Value) -> smm_core::Result<Value> {
    let path = require_str_param(params, "path", "path")?;
    let resolution = state.registry.add_custom_installation(&path).await?;
    Ok(json!({
        "success": true,
        "installation": resolution.installation,
        "executable": resolution.executable.map(|exe| exe.to_string_lossy().into_owned()),
        "warning": resolution.warning,
    }))
}

pub async fn add_installation(state: &AppState, params: &Value) -> smm_core::Result<Value> {
    let raw = params
        .get("installation")
        .cloned()
        .ok_or_else(|| SmmError::InvalidParams {
            message: "Missing required parameter: installation".to_string(),
        })?;
    let installation: Installation =
        serde_json::from_value(raw).map_err(|e| SmmError::InvalidParams {
            message: format!("Invalid installation: {}", e),
        })?;
    state.registry.add_installation(installation).await?;
    Ok(json!({"success": true}))
}

pub async fn remove_installation(state: &AppState, params: &Value) -> smm_core::Result<Value> {
    let path = require_str_param(params, "path", "path")?;
    state.registry.remove_installation(&path).await?;
    Ok(json!({"success": true}))
}

pub async fn clear_installations(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    state.registry.clear_installations().await?;
    Ok(json!({"success": true}))
}

pub async fn ensure_selected_installation_is_valid(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    state.registry.ensure_selected_installation_is_valid().await?;
    let selected = state
        .registry
        .get_selected_install()
        .await
        .map(|record| record.path)
        .unwrap_or_default();
    Ok(json!({"success": true, "selected_installation": selected}))
}
