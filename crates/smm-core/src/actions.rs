//! Single-flight execution of state-mutating actions.
//!
//! Every mutation of the installation list, the selection or profile
//! assignments goes through [`ActionSerializer::submit`]. At most one action
//! body runs at any instant. Waiters are admitted in the wake order of the
//! underlying tokio mutex.
//!
//! Once admitted, an action body runs on its own task and always finishes,
//! even if the caller stops waiting for it. A caller dropped while still
//! queued never starts its action.

use crate::events::{EventSink, RegistryEvent};
use crate::{Result, SmmError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, field, info_span, warn, Instrument, Span};

/// Named mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SelectInstall,
    ToggleMods,
    AddInstallation,
    RemoveInstallation,
    ClearInstallations,
    SelectProfile,
    ValidateSelection,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SelectInstall => "select_install",
            ActionKind::ToggleMods => "toggle_mods",
            ActionKind::AddInstallation => "add_installation",
            ActionKind::RemoveInstallation => "remove_installation",
            ActionKind::ClearInstallations => "clear_installations",
            ActionKind::SelectProfile => "select_profile",
            ActionKind::ValidateSelection => "validate_selection",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained status reported by a running action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskUpdate {
    pub message: String,
    /// Fraction in `0.0..=1.0`, negative when indeterminate.
    pub progress: f64,
}

impl TaskUpdate {
    pub fn new(message: impl Into<String>, progress: f64) -> Self {
        Self {
            message: message.into(),
            progress: progress.clamp(0.0, 1.0),
        }
    }

    pub fn indeterminate(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            progress: -1.0,
        }
    }
}

/// Progress notification published to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub action: ActionKind,
    pub item: String,
    pub message: String,
    pub progress: f64,
    pub timestamp: DateTime<Utc>,
}

/// One-way progress channel handed to action bodies.
#[derive(Clone)]
pub struct ProgressSink {
    action: ActionKind,
    item: String,
    events: Arc<dyn EventSink>,
}

impl ProgressSink {
    pub fn new(action: ActionKind, item: impl Into<String>, events: Arc<dyn EventSink>) -> Self {
        Self {
            action,
            item: item.into(),
            events,
        }
    }

    pub fn report(&self, update: TaskUpdate) {
        debug!(message = %update.message, progress = update.progress, "Progress");
        self.events.publish(RegistryEvent::Progress(ProgressEvent {
            action: self.action,
            item: self.item.clone(),
            message: update.message,
            progress: update.progress,
            timestamp: Utc::now(),
        }));
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("action", &self.action)
            .field("item", &self.item)
            .finish()
    }
}

/// What an action body receives: a scoped span and a progress sink.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub kind: ActionKind,
    pub item: String,
    pub span: Span,
    pub progress: ProgressSink,
}

impl ActionContext {
    /// Record the installation affected by this action on its span.
    pub fn record_install(&self, path: &str) {
        self.span.record("install", path);
    }
}

/// The action currently holding the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentAction {
    pub kind: ActionKind,
    pub item: String,
}

type CurrentSlot = Arc<StdMutex<Option<CurrentAction>>>;

/// Clears the current-action slot when the admitted action ends, however it ends.
struct CurrentGuard(CurrentSlot);

impl CurrentGuard {
    fn enter(slot: &CurrentSlot, action: CurrentAction) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(action);
        Self(Arc::clone(slot))
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Admits one action at a time.
pub struct ActionSerializer {
    lock: Arc<Mutex<()>>,
    current: CurrentSlot,
    events: Arc<dyn EventSink>,
}

impl ActionSerializer {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            current: Arc::new(StdMutex::new(None)),
            events,
        }
    }

    /// Run `work` once every earlier admitted action has finished.
    ///
    /// The work's error is returned unchanged. Dropping the returned future
    /// after admission does not stop the work.
    pub async fn submit<F, Fut, T>(
        &self,
        kind: ActionKind,
        item: impl Into<String>,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce(ActionContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let item = item.into();
        let span = info_span!(
            "action",
            action = kind.as_str(),
            item = %item,
            install = field::Empty
        );

        let admitted = Arc::clone(&self.lock).lock_owned().await;
        let current = Arc::clone(&self.current);
        let ctx = ActionContext {
            kind,
            item: item.clone(),
            span: span.clone(),
            progress: ProgressSink::new(kind, item.clone(), Arc::clone(&self.events)),
        };

        let task = tokio::spawn(async move {
            let _admitted = admitted;
            let _current = CurrentGuard::enter(&current, CurrentAction { kind, item });

            let started = Instant::now();
            let result = work(ctx).instrument(span.clone()).await;

            span.in_scope(|| match &result {
                Ok(_) => debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Action completed"
                ),
                Err(e) => warn!(error = %e, "Action failed"),
            });
            result
        });

        task.await.map_err(|e| {
            error!(action = kind.as_str(), "Action task failed: {}", e);
            SmmError::Other(format!("Action {} did not complete: {}", kind, e))
        })?
    }

    pub fn current_action(&self) -> Option<CurrentAction> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastEventSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn serializer() -> (Arc<ActionSerializer>, BroadcastEventSink) {
        let sink = BroadcastEventSink::new(64);
        let serializer = Arc::new(ActionSerializer::new(Arc::new(sink.clone())));
        (serializer, sink)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_work_bodies_never_overlap() {
        let (serializer, _sink) = serializer();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let serializer = Arc::clone(&serializer);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    serializer
                        .submit(ActionKind::ToggleMods, format!("item-{i}"), |_ctx| async move {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_is_returned_unchanged() {
        let (serializer, _sink) = serializer();
        let result: Result<()> = serializer
            .submit(ActionKind::SelectInstall, "/games/sf", |_ctx| async {
                Err(SmmError::InvalidInstallation {
                    path: "/games/sf".into(),
                })
            })
            .await;
        assert!(matches!(
            result,
            Err(SmmError::InvalidInstallation { ref path }) if path == "/games/sf"
        ));
        assert!(serializer.current_action().is_none());
    }

    #[tokio::test]
    async fn test_progress_is_published() {
        let (serializer, sink) = serializer();
        let mut rx = sink.subscribe();

        serializer
            .submit(ActionKind::AddInstallation, "/games/sf", |ctx| async move {
                ctx.record_install("/games/sf");
                ctx.progress.report(TaskUpdate::new("Resolving", 0.5));
                Ok(())
            })
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            RegistryEvent::Progress(event) => {
                assert_eq!(event.action, ActionKind::AddInstallation);
                assert_eq!(event.item, "/games/sf");
                assert_eq!(event.message, "Resolving");
                assert_eq!(event.progress, 0.5);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_current_action_visible_during_work() {
        let (serializer, _sink) = serializer();
        let inner = Arc::clone(&serializer);
        let seen = serializer
            .submit(ActionKind::ClearInstallations, "all", |_ctx| async move {
                Ok(inner.current_action())
            })
            .await
            .unwrap();
        assert_eq!(
            seen,
            Some(CurrentAction {
                kind: ActionKind::ClearInstallations,
                item: "all".into()
            })
        );
    }

    #[tokio::test]
    async fn test_abandoned_submit_still_finishes() {
        let (serializer, _sink) = serializer();
        let finished = Arc::new(AtomicUsize::new(0));

        let done = Arc::clone(&finished);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            serializer.submit(ActionKind::ToggleMods, "false", |_ctx| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(
            serializer.current_action().map(|action| action.kind),
            Some(ActionKind::ToggleMods)
        );

        // The next action is admitted only after the abandoned one ends.
        let seen = Arc::clone(&finished);
        let observed = serializer
            .submit(ActionKind::SelectInstall, "/games/sf", |_ctx| async move {
                Ok(seen.load(Ordering::SeqCst))
            })
            .await
            .unwrap();
        assert_eq!(observed, 1);
        assert!(serializer.current_action().is_none());
    }

    #[tokio::test]
    async fn test_panicking_work_clears_current_action() {
        let (serializer, _sink) = serializer();
        let result: Result<()> = serializer
            .submit(ActionKind::ClearInstallations, "all", |_ctx| async {
                let missing: Option<()> = None;
                Ok(missing.expect("work body panicked"))
            })
            .await;
        assert!(matches!(result, Err(SmmError::Other(_))));
        assert!(serializer.current_action().is_none());
    }

    #[test]
    fn test_task_update_clamps() {
        assert_eq!(TaskUpdate::new("x", 2.0).progress, 1.0);
        assert!(TaskUpdate::indeterminate("x").progress < 0.0);
    }
}
