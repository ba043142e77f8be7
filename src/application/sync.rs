//! Pull-based synchronisation with the backend.
//!
//! A view keeps the last payload it observed and replaces it wholesale when a
//! poll returns something different; identical payloads are dropped so
//! subscribers are not woken for nothing. Unsaved user edits live in an
//! [`EditOverlay`] keyed by row id, which a replace never touches.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::AppError;

use super::lock;

type Equality<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Last observed payload plus the equality used to detect a change.
pub struct SyncState<T> {
    last: Option<T>,
    same: Equality<T>,
}

impl<T: PartialEq + 'static> SyncState<T> {
    pub fn new() -> Self {
        Self::with_equality(|a: &T, b: &T| a == b)
    }
}

impl<T: PartialEq + 'static> Default for SyncState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncState<T> {
    pub fn with_equality(same: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            last: None,
            same: Box::new(same),
        }
    }

    /// Replace the stored payload if `fetched` differs from it.
    /// Returns whether a replace happened.
    pub fn observe(&mut self, fetched: T) -> bool {
        if let Some(last) = &self.last {
            if (self.same)(last, &fetched) {
                return false;
            }
        }
        self.last = Some(fetched);
        true
    }

    pub fn current(&self) -> Option<&T> {
        self.last.as_ref()
    }
}

/// A [`SyncState`] whose replacements are broadcast to subscribers.
pub struct SyncedView<T> {
    state: Mutex<SyncState<T>>,
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T: PartialEq + Clone + Send + Sync + 'static> SyncedView<T> {
    pub fn new() -> Self {
        Self::from_state(SyncState::new())
    }
}

impl<T: PartialEq + Clone + Send + Sync + 'static> Default for SyncedView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> SyncedView<T> {
    pub fn from_state(state: SyncState<T>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Mutex::new(state),
            tx,
        }
    }

    pub fn apply(&self, fetched: T) -> bool {
        let published = {
            let mut state = lock(&self.state);
            if !state.observe(fetched) {
                return false;
            }
            state.current().cloned().map(Arc::new)
        };
        self.tx.send_replace(published);
        true
    }

    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<T>>> {
        self.tx.subscribe()
    }
}

/// Unsaved edits keyed by row id. Survives full refreshes of the rows.
#[derive(Debug, Clone)]
pub struct EditOverlay<K, V> {
    edits: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for EditOverlay<K, V> {
    fn default() -> Self {
        Self {
            edits: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> EditOverlay<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: K, value: V) {
        self.edits.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.edits.get(key)
    }

    /// The edited value if there is one, `fallback` otherwise.
    pub fn value_or(&self, key: &K, fallback: V) -> V {
        self.edits.get(key).cloned().unwrap_or(fallback)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.edits.remove(key)
    }

    /// Drop edits for rows that no longer exist.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.edits.retain(|k, _| keep(k));
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Running poll task. Stopping or dropping the handle clears the timer; a
/// response still in flight is discarded with the task.
pub struct SyncHandle {
    label: &'static str,
    task: JoinHandle<AppError>,
}

impl SyncHandle {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }

    /// Resolves once the backend rejected the session and the poller gave up.
    /// Pending forever otherwise, so it is meant to sit in a `select!`.
    pub async fn rejected(&mut self) -> AppError {
        match (&mut self.task).await {
            Ok(err) => err,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => AppError::Network(format!("{} poller ended: {e}", self.label)),
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
        log::debug!("{} poller stopped", self.label);
    }
}

/// Run `tick` now and then every `period` until the handle goes away.
///
/// `tick` reports whether the view changed. Errors are logged and the loop
/// keeps going with no retry beyond the next scheduled tick. A rejected
/// session ends the loop, since every further tick would be rejected too.
pub fn spawn_poller<F, Fut>(label: &'static str, period: Duration, mut tick: F) -> SyncHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, AppError>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match tick().await {
                Ok(true) => log::debug!("{label}: view replaced"),
                Ok(false) => log::trace!("{label}: unchanged"),
                Err(AppError::Unauthorized) => {
                    log::warn!("{label}: session rejected, stopping");
                    return AppError::Unauthorized;
                }
                Err(e) => log::error!("{label}: refresh failed: {e}"),
            }
        }
    });
    log::info!("{label} poller started ({} ms)", period.as_millis());
    SyncHandle { label, task }
}
