//! Trailing-edge debouncing, keyed by cart line identity.
//!
//! Each key owns at most one armed timer. Scheduling while a timer is armed
//! discards the old timer and starts a new quiet period; only the last
//! schedule before the period elapses runs its work. Work that has already
//! started is never interrupted, so cancellation cannot kill an in-flight
//! network call.
//!
//! Requires a Tokio runtime; timers are spawned tasks.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::AbortHandle;

/// An armed timer for one key.
///
/// `generation` is the claim token: a sleeper may only run its work if the
/// map still holds its own generation when it wakes. The abort handle is an
/// optimization; a stale sleeper that was never aborted fails the claim and
/// exits without side effects.
struct TimerEntry {
    generation: u64,
    abort: Option<AbortHandle>,
}

/// Per-key trailing-edge debouncer.
pub struct Debouncer {
    timers: Arc<DashMap<String, TimerEntry>>,
    generation: AtomicU64,
}

impl Debouncer {
    /// Create a debouncer with no armed timers.
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Arm (or re-arm) the timer for `key`.
    ///
    /// `work` runs once `delay` elapses without another `schedule` or
    /// [`Debouncer::cancel`] for the same key. The entry is claimed before
    /// the work starts, so `is_pending` turns false at fire time, not at
    /// completion.
    pub fn schedule<F>(&self, key: &str, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        // Insert before spawning so a zero-delay timer already finds its
        // own generation in the map.
        if let Some(previous) = self.timers.insert(
            key.to_string(),
            TimerEntry {
                generation,
                abort: None,
            },
        ) {
            if let Some(abort) = previous.abort {
                abort.abort();
            }
        }

        let timers = Arc::clone(&self.timers);
        let task_key = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let claimed = timers
                .remove_if(&task_key, |_, entry| entry.generation == generation)
                .is_some();
            if claimed {
                // Detached: cancelling the key later must not touch work
                // that already started.
                tokio::spawn(work);
            }
        });

        if let Some(mut entry) = self.timers.get_mut(key) {
            if entry.generation == generation {
                entry.abort = Some(handle.abort_handle());
            }
        }
    }

    /// Disarm the timer for `key`, if one is armed.
    pub fn cancel(&self, key: &str) {
        if let Some((_, entry)) = self.timers.remove(key) {
            if let Some(abort) = entry.abort {
                abort.abort();
            }
            tracing::trace!(key, "debounce timer cancelled");
        }
    }

    /// Disarm every timer.
    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.timers.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    /// Check if a timer is armed for `key`.
    pub fn is_pending(&self, key: &str) -> bool {
        self.timers.contains_key(key)
    }

    /// Number of armed timers.
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
