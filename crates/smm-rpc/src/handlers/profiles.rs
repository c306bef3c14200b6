//! Mods toggle, profile and lockfile handlers.

use super::{require_bool_param, require_str_param};
use crate::server::AppState;
use serde_json::{json, Value};

pub async fn get_mods_enabled(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(json!(state.registry.get_mods_enabled().await))
}

pub async fn set_mods_enabled(state: &AppState, params: &Value) -> smm_core::Result<Value> {
    let enabled = require_bool_param(params, "enabled", "enabled")?;
    state.registry.set_mods_enabled(enabled).await?;
    Ok(json!({"success": true}))
}

pub async fn get_profiles(state: &AppState, _params: &Value) -> smm_core::Result<Value> {
    Ok(json!(state.registry.get_profiles().await))
}

pub async fn select_profile(state: &AppState, params: &Value) -> smm_core::Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    state.registry.select_profile(&name).await?;
    Ok(json!({"success": true}))
}

pub async fn get_selected_install_profile_mods(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(
        state.registry.get_selected_install_profile_mods().await,
    )?)
}

pub async fn get_selected_install_lockfile(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(serde_json::to_value(
        state.registry.get_selected_install_lockfile().await?,
    )?)
}

pub async fn get_selected_install_lockfile_mods(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(json!(
        state.registry.get_selected_install_lockfile_mods().await?
    ))
}

pub async fn selected_profile_targets(
    state: &AppState,
    _params: &Value,
) -> smm_core::Result<Value> {
    Ok(json!(state.registry.selected_profile_targets().await))
}
