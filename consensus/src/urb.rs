//! Uniform reliable broadcast over perfect links.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use concord_collections::{AckMap, ConcurrentSet};
use concord_network::Outbound;
use concord_types::{MsgSeq, ProcessId};
use concord_wire::BroadcastMessage;

use crate::log::ProtocolLog;

/// Per-origin delivery state.
///
/// `acked_by[seq]` is the set of processes known to have seen
/// `(origin, seq)` — the sender of every relayed copy we receive, plus
/// ourselves once we relay. Delivery advances `next_expected` strictly
/// in order once a strict majority has seen the message.
struct OriginState {
    pending: ConcurrentSet<MsgSeq>,
    acked_by: AckMap<MsgSeq, ProcessId>,
    next_expected: Mutex<MsgSeq>,
}

impl OriginState {
    fn new() -> Self {
        Self {
            pending: ConcurrentSet::new(),
            acked_by: AckMap::new(),
            next_expected: Mutex::new(1),
        }
    }
}

/// The uniform reliable broadcast engine of one process.
pub struct UrbEngine {
    me: ProcessId,
    cluster_size: usize,
    fanout: Arc<dyn Outbound<BroadcastMessage>>,
    log: Arc<dyn ProtocolLog>,
    own_seq: AtomicU32,
    origins: Mutex<HashMap<ProcessId, Arc<OriginState>>>,
}

impl UrbEngine {
    pub fn new(
        me: ProcessId,
        cluster_size: usize,
        fanout: Arc<dyn Outbound<BroadcastMessage>>,
        log: Arc<dyn ProtocolLog>,
    ) -> Self {
        Self {
            me,
            cluster_size,
            fanout,
            log,
            own_seq: AtomicU32::new(0),
            origins: Mutex::new(HashMap::new()),
        }
    }

    fn origin_state(&self, origin: ProcessId) -> Arc<OriginState> {
        let mut origins = self.origins.lock().unwrap();
        Arc::clone(
            origins
                .entry(origin)
                .or_insert_with(|| Arc::new(OriginState::new())),
        )
    }

    /// Broadcast the next locally-originated message. Allocates the
    /// sequence number, logs the `b` event exactly once, seeds the local
    /// bookkeeping, and fans the message out to every link.
    pub fn broadcast_next(&self) -> MsgSeq {
        let seq = self.own_seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.log.log_broadcast(seq);

        let state = self.origin_state(self.me);
        state.pending.insert(seq);
        state.acked_by.add_to_mapped_set(seq, self.me);
        self.fanout.broadcast(BroadcastMessage::new(seq, self.me));

        // a single-process cluster has its majority already
        self.try_deliver(self.me, &state);
        seq
    }

    /// Upcall from the perfect link: a first-sighting of `msg` on the
    /// link from `from`.
    pub fn on_link_message(&self, from: ProcessId, msg: BroadcastMessage) {
        let state = self.origin_state(msg.origin);

        {
            let next_expected = state.next_expected.lock().unwrap();
            if msg.seq < *next_expected {
                // already delivered here; the relay that told us has
                // long been counted
                return;
            }
        }

        state.acked_by.add_to_mapped_set(msg.seq, from);

        if state.pending.insert(msg.seq) {
            // first sight: count ourselves and relay to everyone so all
            // correct processes see the message before anyone delivers
            state.acked_by.add_to_mapped_set(msg.seq, self.me);
            self.fanout.broadcast(msg);
            trace!(origin = msg.origin, seq = msg.seq, "urb relay");
        }

        self.try_deliver(msg.origin, &state);
    }

    /// Deliver every consecutive next-expected message that a strict
    /// majority has seen.
    fn try_deliver(&self, origin: ProcessId, state: &OriginState) {
        let mut next_expected = state.next_expected.lock().unwrap();
        loop {
            let seq = *next_expected;
            let seen_by = state.acked_by.mapped_set_size(&seq);
            if seen_by * 2 <= self.cluster_size {
                break;
            }
            self.log.log_delivery(origin, seq);
            state.pending.erase(&seq);
            state.acked_by.erase(&seq);
            *next_expected += 1;
        }
    }
}
