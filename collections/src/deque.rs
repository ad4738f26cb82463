//! FIFO deque with a single internal lock.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Thread-safe FIFO queue.
///
/// All operations are atomic under one internal mutex. `pop_front_k`
/// exists so a caller can drain a batch in a single critical section
/// instead of racing other consumers element by element.
#[derive(Debug, Default)]
pub struct ConcurrentDeque<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> ConcurrentDeque<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_back(&self, value: T) {
        self.inner.lock().unwrap().push_back(value);
    }

    pub fn pop_front(&self) -> Option<T> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Pop up to `k` elements in FIFO order.
    pub fn pop_front_k(&self, k: usize) -> Vec<T> {
        let mut guard = self.inner.lock().unwrap();
        let take = k.min(guard.len());
        guard.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

impl<T: Clone> ConcurrentDeque<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }
}
