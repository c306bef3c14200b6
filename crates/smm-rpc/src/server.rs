//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use serde_json::Value;
use smm_core::{InstallationRegistry, RegistryEvent};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Application state shared across handlers.
pub struct AppState {
    pub registry: Arc<InstallationRegistry>,
    /// Last payload seen per event name
    pub latest_events: RwLock<BTreeMap<String, Value>>,
}

impl AppState {
    pub fn new(registry: Arc<InstallationRegistry>) -> Self {
        Self {
            registry,
            latest_events: RwLock::new(BTreeMap::new()),
        }
    }
}

/// Mirror registry notifications into `latest_events`.
pub fn spawn_event_bridge(
    state: Arc<AppState>,
    mut receiver: broadcast::Receiver<RegistryEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    debug!("Event: {}", event.name());
                    state
                        .latest_events
                        .write()
                        .await
                        .insert(event.name().to_string(), event.payload());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event bridge lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Event bridge stopped");
    })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    state: Arc<AppState>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use smm_core::BroadcastEventSink;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state(temp_dir: &TempDir) -> (Arc<AppState>, BroadcastEventSink) {
        let events = BroadcastEventSink::default();
        let registry = InstallationRegistry::builder(temp_dir.path())
            .with_event_sink(Arc::new(events.clone()))
            .build()
            .await
            .unwrap();
        (Arc::new(AppState::new(Arc::new(registry))), events)
    }

    async fn rpc(app: Router, method: &str, params: Value) -> Value {
        let body = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
        let response = app
            .oneshot(
                Request::post("/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_server_starts() {
        let temp_dir = TempDir::new().unwrap();
        let (state, _events) = test_state(&temp_dir).await;

        let addr = start_server(state, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let (state, _events) = test_state(&temp_dir).await;

        let response = build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_rpc_queries_empty_registry() {
        let temp_dir = TempDir::new().unwrap();
        let (state, _events) = test_state(&temp_dir).await;
        state.registry.init().await.unwrap();
        let app = build_router(state);

        let response = rpc(app.clone(), "get_installations", json!({})).await;
        assert_eq!(response["result"], json!([]));

        let response = rpc(app, "get_mods_enabled", json!({})).await;
        assert_eq!(response["result"], json!(true));
    }

    #[tokio::test]
    async fn test_rpc_error_codes() {
        let temp_dir = TempDir::new().unwrap();
        let (state, _events) = test_state(&temp_dir).await;
        state.registry.init().await.unwrap();
        let app = build_router(state);

        let response = rpc(app.clone(), "select_install", json!({})).await;
        assert_eq!(response["error"]["code"], -32602);

        let response = rpc(app.clone(), "remove_installation", json!({"path": "/nope"})).await;
        assert_eq!(response["error"]["code"], -32001);

        let response = rpc(app.clone(), "set_mods_enabled", json!({"enabled": false})).await;
        assert_eq!(response["error"]["code"], -32002);

        let response = rpc(app, "no_such_method", json!({})).await;
        assert_eq!(response["error"]["code"], -32603);
    }

    #[tokio::test]
    async fn test_rpc_rejects_wrong_protocol_version() {
        let temp_dir = TempDir::new().unwrap();
        let (state, _events) = test_state(&temp_dir).await;
        let body = json!({"jsonrpc": "1.0", "method": "health_check", "id": 3});

        let response = build_router(state)
            .oneshot(
                Request::post("/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["id"], 3);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_event_bridge_keeps_latest_payloads() {
        let temp_dir = TempDir::new().unwrap();
        let (state, events) = test_state(&temp_dir).await;
        let bridge = spawn_event_bridge(Arc::clone(&state), events.subscribe());
        state.registry.init().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !state.latest_events.read().await.contains_key("modsEnabled") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bridge never saw modsEnabled");

        let response = rpc(build_router(Arc::clone(&state)), "get_latest_events", json!({})).await;
        assert_eq!(response["result"]["installations"], json!([]));
        assert_eq!(response["result"]["selectedInstallation"], json!(""));
        bridge.abort();
    }
}
