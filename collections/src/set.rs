//! Unbounded concurrent ordered set.

use std::collections::BTreeSet;
use std::sync::Mutex;

/// Thread-safe ordered set without a size bound.
///
/// The bounded counterpart is [`crate::map::BoundedSeqMap`], which cannot
/// be inserted into directly — it is only refilled from a queue.
#[derive(Debug, Default)]
pub struct ConcurrentSet<T: Ord> {
    inner: Mutex<BTreeSet<T>>,
}

impl<T: Ord> ConcurrentSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeSet::new()),
        }
    }

    /// Insert a value; returns whether it was newly inserted.
    pub fn insert(&self, value: T) -> bool {
        self.inner.lock().unwrap().insert(value)
    }

    pub fn erase(&self, value: &T) {
        self.inner.lock().unwrap().remove(value);
    }

    pub fn erase_many(&self, values: &[T]) {
        let mut guard = self.inner.lock().unwrap();
        for value in values {
            guard.remove(value);
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.inner.lock().unwrap().contains(value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

impl<T: Ord + Clone> ConcurrentSet<T> {
    /// Ascending snapshot of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }
}
