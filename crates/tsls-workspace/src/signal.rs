//! Multicast completion signals and their memoization slots.
//!
//! A [`Signal`] is the one-shot, many-subscriber completion primitive the
//! ensure-pipelines are made of: a detached task drives the work and every
//! subscriber observes the same outcome. Dropping a subscriber never cancels
//! the work.
//!
//! [`MemoSlot`] and [`MemoMap`] add the memoization contract: a live signal
//! is handed to every caller, a successful signal is retained forever, and a
//! failed signal is retracted *before* its error is published, so the next
//! caller always starts a fresh attempt.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::watch;

/// Error carried by a failed signal. Cloneable so a single failure can fan
/// out to every subscriber.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SignalError {
    message: Arc<str>,
}

impl SignalError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

type Outcome<T> = Option<Result<T, SignalError>>;

/// A shared completion signal: complete at most once, observed by any
/// number of subscribers.
pub struct Signal<T> {
    rx: watch::Receiver<Outcome<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Drive `fut` on a detached task and return the signal for its outcome.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, SignalError>> + Send + 'static,
    {
        let (signal, tx) = Self::channel();
        tokio::spawn(async move {
            let _ = tx.send(Some(fut.await));
        });
        signal
    }

    fn channel() -> (Self, watch::Sender<Outcome<T>>) {
        let (tx, rx) = watch::channel(None);
        (Self { rx }, tx)
    }

    /// Wait for the outcome. Every subscriber sees the same result.
    pub async fn wait(&self) -> Result<T, SignalError> {
        let mut rx = self.rx.clone();
        loop {
            if let Some(outcome) = rx.borrow().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Driver dropped without completing; only reachable if its
                // task panicked.
                return Err(SignalError::new("signal abandoned before completion"));
            }
        }
    }

    /// Whether the outcome is already available.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Whether two handles observe the same underlying signal.
    #[must_use]
    pub fn same_signal(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

/// A single memoized signal slot with retract-on-error semantics.
pub struct MemoSlot<T> {
    slot: Arc<Mutex<Option<Signal<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> Default for MemoSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoSlot<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> MemoSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// The memoized signal, if one is live.
    #[must_use]
    pub fn get(&self) -> Option<Signal<T>> {
        self.slot.lock().expect("memo slot poisoned").clone()
    }

    /// Return the live signal, or start `make()` on a detached task and
    /// memoize its signal. On failure the slot is cleared before the error
    /// is published to subscribers.
    pub fn get_or_spawn<F, Fut>(&self, make: F) -> Signal<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SignalError>> + Send + 'static,
    {
        let mut slot = self.slot.lock().expect("memo slot poisoned");
        if let Some(signal) = slot.as_ref() {
            return signal.clone();
        }

        let fut = make();
        let (signal, tx) = Signal::channel();
        // Publish the signal before the driver starts so its error path
        // always sees itself in the slot.
        *slot = Some(signal.clone());
        let retract_slot = self.slot.clone();
        let retract_signal = signal.clone();
        tokio::spawn(async move {
            let outcome = fut.await;
            if outcome.is_err() {
                let mut slot = retract_slot.lock().expect("memo slot poisoned");
                if slot
                    .as_ref()
                    .is_some_and(|live| live.same_signal(&retract_signal))
                {
                    *slot = None;
                }
            }
            let _ = tx.send(Some(outcome));
        });

        signal
    }

    /// Drop the memoized signal; in-flight work keeps running for its
    /// current subscribers but is no longer handed to new callers.
    pub fn invalidate(&self) {
        self.slot.lock().expect("memo slot poisoned").take();
    }
}

/// A keyed family of memoized signals, one [`MemoSlot`]'s contract per key.
pub struct MemoMap<K, T> {
    entries: Arc<Mutex<std::collections::HashMap<K, Signal<T>>>>,
}

impl<K, T> Default for MemoMap<K, T> {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
        }
    }
}

impl<K, T> Clone for MemoMap<K, T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K, T> MemoMap<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Return the live signal for `key`, or start `make()` and memoize it.
    /// Failed entries are evicted before their error is published.
    pub fn get_or_spawn<F, Fut>(&self, key: K, make: F) -> Signal<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SignalError>> + Send + 'static,
    {
        let mut entries = self.entries.lock().expect("memo map poisoned");
        if let Some(signal) = entries.get(&key) {
            return signal.clone();
        }

        let fut = make();
        let (signal, tx) = Signal::channel();
        entries.insert(key.clone(), signal.clone());
        let retract_entries = self.entries.clone();
        let retract_signal = signal.clone();
        let retract_key = key;
        tokio::spawn(async move {
            let outcome = fut.await;
            if outcome.is_err() {
                let mut entries = retract_entries.lock().expect("memo map poisoned");
                if entries
                    .get(&retract_key)
                    .is_some_and(|live| live.same_signal(&retract_signal))
                {
                    entries.remove(&retract_key);
                }
            }
            let _ = tx.send(Some(outcome));
        });

        signal
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().expect("memo map poisoned").remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().expect("memo map poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_the_same_outcome() {
        let signal = Signal::spawn(async { Ok(7u32) });
        let a = signal.clone();
        let b = signal.clone();
        assert_eq!(a.wait().await.unwrap(), 7);
        assert_eq!(b.wait().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn dropping_one_subscriber_does_not_cancel_the_work() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_inner = ran.clone();
        let signal = Signal::<()>::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ran_inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        drop(signal.clone());
        signal.wait().await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slot_reuses_the_live_signal() {
        let slot: MemoSlot<u32> = MemoSlot::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = calls.clone();
            slot.get_or_spawn(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
        };
        let second = slot.get_or_spawn(|| async { Ok(2) });

        assert!(first.same_signal(&second));
        assert_eq!(second.wait().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slot_retracts_before_error_surfaces() {
        let slot: MemoSlot<()> = MemoSlot::new();

        let failing = slot.get_or_spawn(|| async { Err(SignalError::new("boom")) });
        let err = failing.wait().await.unwrap_err();
        assert_eq!(err.message(), "boom");
        // The error having surfaced implies the slot is already empty.
        assert!(slot.get().is_none());

        let retry = slot.get_or_spawn(|| async { Ok(()) });
        assert!(!failing.same_signal(&retry));
        retry.wait().await.unwrap();
    }

    #[tokio::test]
    async fn slot_invalidate_forces_a_fresh_signal() {
        let slot: MemoSlot<()> = MemoSlot::new();
        let first = slot.get_or_spawn(|| async { Ok(()) });
        first.wait().await.unwrap();

        slot.invalidate();
        let second = slot.get_or_spawn(|| async { Ok(()) });
        assert!(!first.same_signal(&second));
    }

    #[tokio::test]
    async fn map_keys_memoize_independently() {
        let map: MemoMap<&'static str, u32> = MemoMap::default();
        let a = map.get_or_spawn("a", || async { Ok(1) });
        let b = map.get_or_spawn("b", || async { Ok(2) });
        assert_eq!(a.wait().await.unwrap(), 1);
        assert_eq!(b.wait().await.unwrap(), 2);

        let a_again = map.get_or_spawn("a", || async { Ok(99) });
        assert!(a.same_signal(&a_again));
    }

    #[tokio::test]
    async fn map_evicts_failed_entries() {
        let map: MemoMap<&'static str, u32> = MemoMap::default();
        let failing = map.get_or_spawn("k", || async { Err(SignalError::new("nope")) });
        failing.wait().await.unwrap_err();

        let retry = map.get_or_spawn("k", || async { Ok(5) });
        assert!(!failing.same_signal(&retry));
        assert_eq!(retry.wait().await.unwrap(), 5);
    }
}
