//! Periodic detection of a running game process.
//!
//! The watcher publishes `isGameRunning` on every successful tick, changed or
//! not. A tick whose process enumeration fails is skipped. It publishes
//! nothing and keeps the previous value.

use crate::config::{GameConfig, WatcherConfig};
use crate::events::{EventSink, RegistryEvent};
use crate::{Result, SmmError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Lists the executable names of running processes.
pub trait ProcessEnumerator: Send + Sync {
    fn process_names(&self) -> Result<Vec<String>>;
}

/// Process enumeration backed by `sysinfo`.
pub struct SysinfoProcessEnumerator {
    system: Mutex<System>,
}

impl SysinfoProcessEnumerator {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProcessEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEnumerator for SysinfoProcessEnumerator {
    fn process_names(&self) -> Result<Vec<String>> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SmmError::ProcessEnumeration {
                message: "process listing is not supported on this platform".to_string(),
            });
        }

        let mut system = self
            .system
            .lock()
            .map_err(|_| SmmError::ProcessEnumeration {
                message: "process table lock poisoned".to_string(),
            })?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new(),
        );

        Ok(system
            .processes()
            .values()
            .map(|process| process.name().to_string_lossy().into_owned())
            .collect())
    }
}

/// Polls the process table and publishes whether the game is running.
pub struct ProcessWatcher {
    enumerator: Arc<dyn ProcessEnumerator>,
    events: Arc<dyn EventSink>,
    running: Arc<AtomicBool>,
    interval: Duration,
}

impl ProcessWatcher {
    pub fn new(
        enumerator: Arc<dyn ProcessEnumerator>,
        events: Arc<dyn EventSink>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            enumerator,
            events,
            running,
            interval: WatcherConfig::POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one poll. Returns `None` if enumeration failed.
    pub fn tick(&self) -> Option<bool> {
        let names = match self.enumerator.process_names() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list processes, skipping tick");
                return None;
            }
        };

        let running = names.iter().any(|name| is_game_executable(name));
        self.running.store(running, Ordering::SeqCst);
        self.events.publish(RegistryEvent::IsGameRunning(running));
        Some(running)
    }

    /// Spawn the polling loop. The first tick runs immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("Process watcher polling every {:?}", self.interval);

            loop {
                ticker.tick().await;
                let watcher = Arc::clone(&self);
                if let Err(e) = tokio::task::spawn_blocking(move || watcher.tick()).await {
                    error!("Process watcher tick panicked: {}", e);
                }
            }
        })
    }
}

fn is_game_executable(name: &str) -> bool {
    GameConfig::RUNNING_EXECUTABLES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastEventSink;

    struct ScriptedEnumerator {
        next: Mutex<Option<Result<Vec<String>>>>,
    }

    impl ScriptedEnumerator {
        fn new() -> Self {
            Self {
                next: Mutex::new(None),
            }
        }

        fn set(&self, result: Result<Vec<String>>) {
            *self.next.lock().unwrap() = Some(result);
        }
    }

    impl ProcessEnumerator for ScriptedEnumerator {
        fn process_names(&self) -> Result<Vec<String>> {
            self.next.lock().unwrap().take().unwrap_or_else(|| Ok(vec![]))
        }
    }

    fn watcher() -> (ProcessWatcher, Arc<ScriptedEnumerator>, BroadcastEventSink) {
        let enumerator = Arc::new(ScriptedEnumerator::new());
        let sink = BroadcastEventSink::new(16);
        let watcher = ProcessWatcher::new(
            enumerator.clone(),
            Arc::new(sink.clone()),
            Arc::new(AtomicBool::new(false)),
        );
        (watcher, enumerator, sink)
    }

    #[test]
    fn test_matches_distribution_variants() {
        assert!(is_game_executable("FactoryGame-Win64-Shipping.exe"));
        assert!(is_game_executable("FactoryGameSteam-Win64-Shipping"));
        assert!(is_game_executable("FactoryGameEGS-Win64-Shipping.exe"));
        assert!(!is_game_executable("FactoryGame.exe"));
        assert!(!is_game_executable("explorer.exe"));
    }

    #[tokio::test]
    async fn test_tick_publishes_every_time() {
        let (watcher, enumerator, sink) = watcher();
        let mut rx = sink.subscribe();

        enumerator.set(Ok(vec!["FactoryGameSteam-Win64-Shipping.exe".into()]));
        assert_eq!(watcher.tick(), Some(true));
        enumerator.set(Ok(vec!["FactoryGameSteam-Win64-Shipping.exe".into()]));
        assert_eq!(watcher.tick(), Some(true));

        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::IsGameRunning(true));
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::IsGameRunning(true));
        assert!(watcher.is_running());
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_previous_value() {
        let (watcher, enumerator, sink) = watcher();
        let mut rx = sink.subscribe();

        enumerator.set(Ok(vec!["FactoryGame-Win64-Shipping".into()]));
        watcher.tick();
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::IsGameRunning(true));

        enumerator.set(Err(SmmError::ProcessEnumeration {
            message: "denied".into(),
        }));
        assert_eq!(watcher.tick(), None);
        assert!(watcher.is_running());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_started_loop_keeps_ticking() {
        let (watcher, _enumerator, sink) = watcher();
        let mut rx = sink.subscribe();
        let handle = Arc::new(watcher.with_interval(Duration::from_millis(10))).start();

        for _ in 0..2 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event, RegistryEvent::IsGameRunning(false));
        }

        handle.abort();
    }
}
