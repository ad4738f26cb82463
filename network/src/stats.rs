//! Per-link transmission counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking one link's traffic. Transient send failures
/// are counted here instead of propagated; the packet stays pending and
/// is retried on the next tick.
#[derive(Debug, Default)]
pub struct LinkStats {
    pub datagrams_sent: AtomicU64,
    pub retransmissions: AtomicU64,
    pub send_errors: AtomicU64,
    pub acks_received: AtomicU64,
    pub duplicates_seen: AtomicU64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, retransmit: bool) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        if retransmit {
            self.retransmissions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicates(&self, count: u64) {
        if count > 0 {
            self.duplicates_seen.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// `(sent, retransmissions, send_errors, acks, duplicates)` snapshot.
    pub fn snapshot(&self) -> (u64, u64, u64, u64, u64) {
        (
            self.datagrams_sent.load(Ordering::Relaxed),
            self.retransmissions.load(Ordering::Relaxed),
            self.send_errors.load(Ordering::Relaxed),
            self.acks_received.load(Ordering::Relaxed),
            self.duplicates_seen.load(Ordering::Relaxed),
        )
    }
}
