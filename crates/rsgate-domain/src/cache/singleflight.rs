//! Singleflight for deduplicating concurrent fetches of the same key.

use std::hash::Hash;

use dashmap::DashMap;
use tokio::sync::broadcast;

/// Result of trying to acquire a singleflight slot.
pub(crate) enum SingleflightSlot<T> {
    /// We won the race and should execute the operation.
    /// Contains the sender to broadcast results.
    Leader(broadcast::Sender<T>),
    /// Another task is executing; wait for its result.
    Follower(broadcast::Receiver<T>),
}

/// Deduplicates concurrent operations that share a key.
///
/// When multiple callers ask for the same key concurrently, only one
/// executes the operation and all of them receive its result.
pub(crate) struct Singleflight<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    /// Map of in-flight operations to their broadcast senders.
    in_flight: DashMap<K, broadcast::Sender<T>>,
}

impl<K, T> Singleflight<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Atomically try to acquire a slot for this operation.
    ///
    /// Returns `Leader` if this caller should execute the operation,
    /// or `Follower` if another caller is already executing it.
    pub(crate) fn acquire(&self, key: K) -> SingleflightSlot<T> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => SingleflightSlot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                SingleflightSlot::Leader(tx)
            }
        }
    }

    /// Remove a completed in-flight operation.
    pub(crate) fn complete(&self, key: &K) {
        self.in_flight.remove(key);
    }

    /// Number of operations currently in flight.
    pub(crate) fn len(&self) -> usize {
        self.in_flight.len()
    }
}

/// RAII guard that ensures singleflight cleanup on drop.
///
/// A leader whose future is dropped (cancelled or panicked) still releases
/// its slot, and its followers observe a closed channel.
pub(crate) struct SingleflightGuard<'a, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    singleflight: &'a Singleflight<K, T>,
    key: K,
    completed: bool,
}

impl<'a, K, T> SingleflightGuard<'a, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub(crate) fn new(singleflight: &'a Singleflight<K, T>, key: K) -> Self {
        Self {
            singleflight,
            key,
            completed: false,
        }
    }

    /// Mark as completed (normal path).
    pub(crate) fn complete(mut self) {
        self.singleflight.complete(&self.key);
        self.completed = true;
    }
}

impl<K, T> Drop for SingleflightGuard<'_, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            self.singleflight.complete(&self.key);
        }
    }
}
