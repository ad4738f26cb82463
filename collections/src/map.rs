//! Concurrent ordered maps: a bounded queue-fed variant and an
//! unbounded map-of-sets for acknowledgement tallies.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::deque::ConcurrentDeque;

/// Bounded ordered map refilled from a queue.
///
/// There is deliberately no `insert`: entries only enter through
/// [`complete`](Self::complete), which atomically tops the map up from
/// the given FIFO queue to the capacity and returns an ascending-key
/// snapshot. This is the sender-side pending structure of a link: keys
/// are packet sequence numbers, the snapshot order is the retransmit
/// order, and entries leave only by [`erase`](Self::erase) on ACK.
#[derive(Debug)]
pub struct BoundedSeqMap<K: Ord + Copy, V> {
    capacity: usize,
    inner: Mutex<BTreeMap<K, V>>,
}

impl<K: Ord + Copy, V: Clone> BoundedSeqMap<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Refill from `queue` up to the capacity, then return an
    /// ascending-key snapshot of the whole map.
    pub fn complete(&self, queue: &ConcurrentDeque<(K, V)>) -> Vec<(K, V)> {
        let mut guard = self.inner.lock().unwrap();
        let room = self.capacity.saturating_sub(guard.len());
        for (key, value) in queue.pop_front_k(room) {
            guard.insert(key, value);
        }
        guard.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    /// Remove the entries whose keys were acknowledged.
    pub fn erase(&self, keys: &[K]) {
        let mut guard = self.inner.lock().unwrap();
        for key in keys {
            guard.remove(key);
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Unbounded map whose values are sets — the acknowledgement tally
/// (`sequence -> set of processes that have seen it`).
#[derive(Debug, Default)]
pub struct AckMap<K: Ord + Copy, M: Ord + Clone> {
    inner: Mutex<BTreeMap<K, BTreeSet<M>>>,
}

impl<K: Ord + Copy, M: Ord + Clone> AckMap<K, M> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert `member` into the set mapped at `key`, creating the entry if
    /// absent. Returns whether the member was newly inserted.
    pub fn add_to_mapped_set(&self, key: K, member: M) -> bool {
        self.inner
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .insert(member)
    }

    /// Size of the set mapped at `key` (0 if absent).
    pub fn mapped_set_size(&self, key: &K) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(key)
            .map_or(0, |set| set.len())
    }

    /// Copy of the set mapped at `key` (empty if absent).
    pub fn get_mapped_copy(&self, key: &K) -> BTreeSet<M> {
        self.inner
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn erase(&self, key: &K) {
        self.inner.lock().unwrap().remove(key);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
