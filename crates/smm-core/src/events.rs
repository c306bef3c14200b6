//! Observer notifications.
//!
//! The registry announces every observable state change through an
//! [`EventSink`]. Publishing is fire-and-forget.

use crate::actions::ProgressEvent;
use crate::metadata::InstallationMetadata;
use crate::models::ProfileMod;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tracing::trace;

/// A named notification with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum RegistryEvent {
    /// Valid installation paths.
    Installations(Vec<String>),
    InstallationsMetadata(BTreeMap<String, InstallationMetadata>),
    RemoteServers(Vec<String>),
    Profiles(Vec<String>),
    SelectedInstallation(String),
    SelectedProfile(String),
    ModsEnabled(bool),
    /// Target name to installation paths sharing the selected profile.
    SelectedProfileTargets(BTreeMap<String, Vec<String>>),
    /// Locked mod reference to resolved version.
    LockfileMods(BTreeMap<String, String>),
    ManifestMods(BTreeMap<String, ProfileMod>),
    IsGameRunning(bool),
    Progress(ProgressEvent),
}

impl RegistryEvent {
    /// Event name as seen by observers.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::Installations(_) => "installations",
            RegistryEvent::InstallationsMetadata(_) => "installationsMetadata",
            RegistryEvent::RemoteServers(_) => "remoteServers",
            RegistryEvent::Profiles(_) => "profiles",
            RegistryEvent::SelectedInstallation(_) => "selectedInstallation",
            RegistryEvent::SelectedProfile(_) => "selectedProfile",
            RegistryEvent::ModsEnabled(_) => "modsEnabled",
            RegistryEvent::SelectedProfileTargets(_) => "selectedProfileTargets",
            RegistryEvent::LockfileMods(_) => "lockfileMods",
            RegistryEvent::ManifestMods(_) => "manifestMods",
            RegistryEvent::IsGameRunning(_) => "isGameRunning",
            RegistryEvent::Progress(_) => "progress",
        }
    }

    /// Payload without the event name.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut value| value.get_mut("payload").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Publish primitive consumed by the registry.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: RegistryEvent);
}

/// Event sink backed by a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events. Publishing with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<RegistryEvent>,
}

impl BroadcastEventSink {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: RegistryEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            trace!(event = name, "No subscribers for event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_match_serialized_tag() {
        let events = [
            RegistryEvent::Installations(vec![]),
            RegistryEvent::ModsEnabled(true),
            RegistryEvent::SelectedProfileTargets(BTreeMap::new()),
            RegistryEvent::IsGameRunning(false),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_payload_strips_name() {
        let event = RegistryEvent::SelectedInstallation("/games/sf".into());
        assert_eq!(event.payload(), serde_json::json!("/games/sf"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let sink = BroadcastEventSink::default();
        sink.publish(RegistryEvent::IsGameRunning(true));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let sink = BroadcastEventSink::new(8);
        let mut rx = sink.subscribe();

        sink.publish(RegistryEvent::ModsEnabled(false));
        sink.publish(RegistryEvent::IsGameRunning(true));

        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::ModsEnabled(false));
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::IsGameRunning(true));
    }
}
