//! One perfect link: the sending and receiving halves of a directed
//! peer relationship, composed in a single value.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;
use tracing::warn;

use concord_collections::{BoundedSeqMap, ConcurrentDeque, SlidingSet};
use concord_types::tuning::MAX_MESSAGES_PER_PACKET;
use concord_types::{PacketSeq, ProcessId, Tuning};
use concord_wire::{Packet, Payload};

use crate::stats::LinkStats;

/// Reliable channel to one peer over the node's shared socket.
///
/// Sender half: payloads enter through [`enqueue`](Self::enqueue), which
/// assigns the immutable packet sequence number. Each [`send`](Self::send)
/// tick refills the bounded pending map from the queue and emits up to
/// `window` datagrams of up to 8 payloads in ascending sequence order;
/// everything pending is retransmitted until its ACK arrives.
///
/// Receiver half: inbound data packets run through the sliding set for
/// first-sighting detection and are always ACKed — including pure
/// duplicates, which is what recovers a lost ACK.
pub struct PerfectLink<P: Payload> {
    peer: ProcessId,
    peer_addr: SocketAddr,
    socket: Arc<UdpSocket>,
    window: usize,

    // sender half
    next_seq: AtomicU32,
    highest_sent: AtomicU32,
    queue: ConcurrentDeque<(PacketSeq, P)>,
    pending: BoundedSeqMap<PacketSeq, P>,

    // receiver half
    delivered: Mutex<SlidingSet>,

    stats: LinkStats,
}

impl<P: Payload> PerfectLink<P> {
    pub fn new(
        peer: ProcessId,
        peer_addr: SocketAddr,
        socket: Arc<UdpSocket>,
        tuning: &Tuning,
    ) -> Self {
        Self {
            peer,
            peer_addr,
            socket,
            window: tuning.send_window_size as usize,
            next_seq: AtomicU32::new(0),
            highest_sent: AtomicU32::new(0),
            queue: ConcurrentDeque::new(),
            pending: BoundedSeqMap::new(tuning.pending_capacity()),
            delivered: Mutex::new(SlidingSet::new(0)),
            stats: LinkStats::new(),
        }
    }

    pub fn peer(&self) -> ProcessId {
        self.peer
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Append a payload to the outbound queue, assigning its packet
    /// sequence number. Never blocks; callers apply backpressure by
    /// watching [`queue_len`](Self::queue_len).
    pub fn enqueue(&self, payload: P) -> PacketSeq {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.queue.push_back((seq, payload));
        seq
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Payloads enqueued or pending, i.e. not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.queue.len() + self.pending.len()
    }

    /// One send tick: refill the pending window from the queue, then
    /// emit up to `window` datagrams in ascending sequence order. A
    /// failed `send_to` is counted and skipped; the entries stay pending
    /// for the next tick.
    pub async fn send(&self) {
        let snapshot = self.pending.complete(&self.queue);
        if snapshot.is_empty() {
            return;
        }

        let already_sent = self.highest_sent.load(Ordering::Relaxed);
        let mut last_sent = already_sent;

        for chunk in snapshot.chunks(MAX_MESSAGES_PER_PACKET).take(self.window) {
            let packet = Packet::Data {
                entries: chunk.to_vec(),
            };
            let bytes = match packet.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(peer = self.peer, error = %e, "dropping unencodable packet");
                    continue;
                }
            };

            match self.socket.send_to(&bytes, self.peer_addr).await {
                Ok(_) => {
                    // chunks ascend, so a first entry at or below the old
                    // high-water mark is a retransmission
                    let first = chunk[0].0;
                    self.stats.record_sent(first <= already_sent);
                    last_sent = chunk[chunk.len() - 1].0.max(last_sent);
                }
                Err(e) => {
                    self.stats.record_send_error();
                    warn!(peer = self.peer, error = %e, "send_to failed, will retry");
                }
            }
        }

        self.highest_sent.fetch_max(last_sent, Ordering::Relaxed);
    }

    /// Process one inbound packet from this link's peer.
    ///
    /// Data packets are ACKed unconditionally — the packet, not just its
    /// fresh content — and the first-sighting entries are returned for
    /// the protocol layer. ACK packets clear the listed sequence numbers
    /// from the pending map and return nothing.
    pub async fn receive(&self, packet: Packet<P>) -> Vec<(PacketSeq, P)> {
        match packet {
            Packet::Data { entries } => {
                let seqs: Vec<PacketSeq> = entries.iter().map(|(seq, _)| *seq).collect();
                let flags = {
                    let mut delivered = self.delivered.lock().unwrap();
                    delivered.insert_bulk(&seqs)
                };
                let dup_count = flags.iter().filter(|fresh| !**fresh).count() as u64;
                self.stats.record_duplicates(dup_count);

                self.send_ack(seqs).await;

                entries
                    .into_iter()
                    .zip(flags)
                    .filter_map(|(entry, fresh)| fresh.then_some(entry))
                    .collect()
            }
            Packet::Ack { seqs } => {
                self.pending.erase(&seqs);
                self.stats.record_ack();
                Vec::new()
            }
        }
    }

    async fn send_ack(&self, seqs: Vec<PacketSeq>) {
        let ack: Packet<P> = Packet::Ack { seqs };
        let bytes = match ack.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(peer = self.peer, error = %e, "dropping unencodable ack");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&bytes, self.peer_addr).await {
            // the peer will retransmit and trigger another ack
            self.stats.record_send_error();
            warn!(peer = self.peer, error = %e, "ack send failed");
        }
    }
}
