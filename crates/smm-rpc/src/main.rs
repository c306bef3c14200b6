//! SMM RPC Server - JSON-RPC backend for the mod manager UI.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the smm-core
//! installation registry for communication with the UI process.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use smm_core::config::AppConfig;
use smm_core::{BroadcastEventSink, InstallationRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "smm-rpc")]
#[command(about = "JSON-RPC server for the Satisfactory Mod Manager installation registry")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Data directory (defaults to the platform local data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Do not poll for a running game
    #[arg(long)]
    no_watcher: bool,
}

/// RUST_LOG directives win over the --debug switch when they parse.
fn log_filter(directives: Option<&str>, debug: bool) -> EnvFilter {
    if let Some(directives) = directives {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e),
        }
    }
    if debug {
        EnvFilter::new("smm_rpc=debug,smm_core=debug,info")
    } else {
        EnvFilter::new("info")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    FmtSubscriber::builder()
        .with_env_filter(log_filter(directives.as_deref(), args.debug))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting {} RPC Server", AppConfig::APP_NAME);

    let data_dir = match args.data_dir {
        Some(path) => path,
        None => dirs::data_local_dir()
            .map(|dir| dir.join(AppConfig::DATA_DIR_NAME))
            .ok_or_else(|| anyhow::anyhow!("No local data directory on this platform"))?,
    };
    info!("Data directory: {}", data_dir.display());

    // Subscribe before init so the startup notifications reach the bridge
    let events = BroadcastEventSink::default();
    let receiver = events.subscribe();

    let registry = InstallationRegistry::builder(&data_dir)
        .auto_create_dirs(true)
        .with_event_sink(Arc::new(events))
        .build()
        .await?;
    let state = Arc::new(server::AppState::new(Arc::new(registry)));
    server::spawn_event_bridge(Arc::clone(&state), receiver);

    state.registry.init().await?;
    if !args.no_watcher {
        state.registry.start_process_watcher().await;
    }

    let addr = server::start_server(Arc::clone(&state), &args.host, args.port).await?;

    // Print port for the UI process to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    state.registry.shutdown().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_switch_raises_crate_levels() {
        let filter = log_filter(None, true).to_string();
        assert!(filter.contains("smm_core=debug"));
        assert!(filter.contains("smm_rpc=debug"));

        let filter = log_filter(None, false).to_string();
        assert!(!filter.contains("smm_core"));
    }

    #[test]
    fn test_env_directives_override_debug_switch() {
        let filter = log_filter(Some("smm_core=trace"), false).to_string();
        assert!(filter.contains("smm_core=trace"));

        let filter = log_filter(Some("smm_core=loud"), true).to_string();
        assert!(filter.contains("smm_core=debug"));
    }
}
