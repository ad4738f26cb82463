//! Narrow outbound handle for the protocol layers.
//!
//! The agreement engines need exactly two capabilities — broadcast a
//! payload to every peer, or send one to a specific peer — and must not
//! hold the node itself. `Fanout` is that seam: it wraps the link table
//! and exposes nothing else, which keeps ownership acyclic (node owns
//! engine, engine holds only this handle).

use std::sync::Arc;

use concord_types::ProcessId;
use concord_wire::Payload;

use crate::table::LinkTable;

/// The outbound capability the agreement engines program against.
///
/// [`Fanout`] is the production implementation; tests substitute a
/// recording implementation.
pub trait Outbound<P>: Send + Sync + 'static {
    /// Enqueue a copy of `payload` for every peer.
    fn broadcast(&self, payload: P);

    /// Enqueue `payload` for one peer; unknown peers are ignored.
    fn send_to(&self, payload: P, peer: ProcessId);
}

/// Cloneable broadcast/unicast handle over the link table.
pub struct Fanout<P: Payload> {
    table: Arc<LinkTable<P>>,
}

impl<P: Payload> Clone for Fanout<P> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<P: Payload> Fanout<P> {
    pub fn new(table: Arc<LinkTable<P>>) -> Self {
        Self { table }
    }

    /// Enqueue a copy of `payload` on every link. Returns the number of
    /// links reached. Enqueueing never blocks; the sender worker drains
    /// the queues on its own tick.
    pub fn broadcast(&self, payload: P) -> usize {
        let mut reached = 0;
        for link in self.table.iter() {
            link.enqueue(payload.clone());
            reached += 1;
        }
        reached
    }

    /// Enqueue `payload` for one peer. Returns `false` if the peer is
    /// not in the membership (nothing is sent).
    pub fn send_to(&self, payload: P, peer: ProcessId) -> bool {
        match self.table.get(peer) {
            Some(link) => {
                link.enqueue(payload);
                true
            }
            None => false,
        }
    }
}

impl<P: Payload> Outbound<P> for Fanout<P> {
    fn broadcast(&self, payload: P) {
        Fanout::broadcast(self, payload);
    }

    fn send_to(&self, payload: P, peer: ProcessId) {
        Fanout::send_to(self, payload, peer);
    }
}
