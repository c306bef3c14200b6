//! Background inspection of remote installations.

use crate::events::{EventSink, RegistryEvent};
use crate::metadata::{InstallationMetadata, MetadataStore};
use crate::models::Installation;
use crate::{Result, SmmError};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Source of metadata for remotely registered installations.
#[async_trait]
pub trait RemoteInstallSource: Send + Sync {
    async fn inspect(&self, path: &str) -> Result<Installation>;
}

/// Remote source used when no network client is configured.
///
/// Every lookup fails, so remote entries end up `Invalid`.
#[derive(Debug, Clone, Default)]
pub struct OfflineRemoteSource;

#[async_trait]
impl RemoteInstallSource for OfflineRemoteSource {
    async fn inspect(&self, path: &str) -> Result<Installation> {
        Err(SmmError::RemoteDiscovery {
            path: path.to_string(),
            message: "no remote client configured".to_string(),
        })
    }
}

/// Spawn the remote pass.
///
/// Each result resolves its path's `Unknown` entry as the lookup finishes.
/// Paths removed or re-registered meanwhile are left alone. Once all lookups
/// are done the remote list and the metadata snapshot are published. Failures
/// are logged and never surface to callers.
pub fn spawn_remote_pass(
    paths: Vec<String>,
    source: Arc<dyn RemoteInstallSource>,
    store: Arc<MetadataStore>,
    events: Arc<dyn EventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if paths.is_empty() {
            return;
        }
        info!("Starting remote discovery for {} installations", paths.len());

        let mut pending: FuturesUnordered<_> = paths
            .iter()
            .cloned()
            .map(|path| {
                let source = Arc::clone(&source);
                async move {
                    let result = source.inspect(&path).await;
                    (path, result)
                }
            })
            .collect();

        let mut valid = 0usize;
        while let Some((path, result)) = pending.next().await {
            let metadata = match result {
                Ok(installation) => {
                    valid += 1;
                    InstallationMetadata::valid(installation)
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Remote installation is invalid");
                    InstallationMetadata::invalid(None)
                }
            };
            if !store.resolve_pending(&path, metadata) {
                debug!(path = %path, "Dropping remote result for a path no longer pending");
            }
        }

        info!(
            "Remote discovery finished: {} of {} valid",
            valid,
            paths.len()
        );
        events.publish(RegistryEvent::RemoteServers(paths));
        events.publish(RegistryEvent::InstallationsMetadata(store.snapshot()));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastEventSink;
    use crate::metadata::InstallState;
    use crate::models::{GameBranch, InstallType, LocationType};

    struct FakeRemote;

    #[async_trait]
    impl RemoteInstallSource for FakeRemote {
        async fn inspect(&self, path: &str) -> Result<Installation> {
            if path.contains("down") {
                return Err(SmmError::RemoteDiscovery {
                    path: path.to_string(),
                    message: "connection refused".into(),
                });
            }
            Ok(Installation {
                path: path.to_string(),
                launch_path: vec![],
                install_type: InstallType::LinuxServer,
                branch: GameBranch::Stable,
                version: 365306,
                launcher: "Remote".into(),
                location: LocationType::Remote,
            })
        }
    }

    fn pending_store(paths: &[&str]) -> Arc<MetadataStore> {
        let store = Arc::new(MetadataStore::new());
        for path in paths {
            store.store(*path, InstallationMetadata::unknown());
        }
        store
    }

    #[tokio::test]
    async fn test_remote_results_land_and_notify() {
        let store = pending_store(&["sftp://up/game", "sftp://down/game"]);
        let sink = BroadcastEventSink::new(16);
        let mut rx = sink.subscribe();

        let handle = spawn_remote_pass(
            vec!["sftp://up/game".into(), "sftp://down/game".into()],
            Arc::new(FakeRemote),
            Arc::clone(&store),
            Arc::new(sink),
        );
        handle.await.unwrap();

        assert_eq!(store.load("sftp://up/game").unwrap().state, InstallState::Valid);
        assert_eq!(
            store.load("sftp://down/game").unwrap().state,
            InstallState::Invalid
        );
        assert_eq!(rx.recv().await.unwrap().name(), "remoteServers");
        assert_eq!(rx.recv().await.unwrap().name(), "installationsMetadata");
    }

    #[tokio::test]
    async fn test_offline_source_marks_invalid() {
        let store = pending_store(&["ftp://host/srv"]);
        spawn_remote_pass(
            vec!["ftp://host/srv".into()],
            Arc::new(OfflineRemoteSource),
            Arc::clone(&store),
            Arc::new(BroadcastEventSink::default()),
        )
        .await
        .unwrap();
        assert!(!store.is_valid_install("ftp://host/srv"));
    }

    #[tokio::test]
    async fn test_results_for_settled_paths_are_dropped() {
        let store = pending_store(&["sftp://up/pending"]);
        let readded = Installation {
            path: "sftp://down/readded".into(),
            launch_path: vec![],
            install_type: InstallType::LinuxServer,
            branch: GameBranch::Stable,
            version: 0,
            launcher: "Remote".into(),
            location: LocationType::Remote,
        };
        store.store("sftp://down/readded", InstallationMetadata::valid(readded.clone()));

        spawn_remote_pass(
            vec![
                "sftp://up/pending".into(),
                "sftp://down/readded".into(),
                "sftp://up/removed".into(),
            ],
            Arc::new(FakeRemote),
            Arc::clone(&store),
            Arc::new(BroadcastEventSink::default()),
        )
        .await
        .unwrap();

        assert_eq!(store.load("sftp://up/pending").unwrap().state, InstallState::Valid);
        assert_eq!(
            store.load("sftp://down/readded").unwrap(),
            InstallationMetadata::valid(readded)
        );
        assert!(store.load("sftp://up/removed").is_none());
        assert_eq!(store.len(), 2);
    }
}
