//! The node's set of perfect links, one per peer.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use concord_types::{HostsTable, ProcessId, Tuning};
use concord_wire::Payload;

use crate::link::PerfectLink;

/// All links of one node, indexed by peer id and by peer address.
///
/// The address index is what the listener uses to attribute an inbound
/// datagram to its link; membership is fixed, so both indexes are built
/// once and never change.
pub struct LinkTable<P: Payload> {
    links: BTreeMap<ProcessId, Arc<PerfectLink<P>>>,
    by_addr: HashMap<SocketAddr, Arc<PerfectLink<P>>>,
}

impl<P: Payload> LinkTable<P> {
    /// Build one link per peer (every host except `me`) over the shared
    /// socket.
    pub fn new(hosts: &HostsTable, me: ProcessId, socket: Arc<UdpSocket>, tuning: &Tuning) -> Self {
        let mut links = BTreeMap::new();
        let mut by_addr = HashMap::new();
        for host in hosts.peers(me) {
            let link = Arc::new(PerfectLink::new(
                host.id,
                host.addr,
                Arc::clone(&socket),
                tuning,
            ));
            links.insert(host.id, Arc::clone(&link));
            by_addr.insert(host.addr, link);
        }
        Self { links, by_addr }
    }

    pub fn get(&self, peer: ProcessId) -> Option<&Arc<PerfectLink<P>>> {
        self.links.get(&peer)
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&Arc<PerfectLink<P>>> {
        self.by_addr.get(addr)
    }

    /// Links in ascending peer-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PerfectLink<P>>> {
        self.links.values()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Longest outbound queue across all links — the backpressure signal
    /// observed by the broadcast loop.
    pub fn max_queue_len(&self) -> usize {
        self.links.values().map(|l| l.queue_len()).max().unwrap_or(0)
    }

    /// Total unacknowledged payloads across all links.
    pub fn total_in_flight(&self) -> usize {
        self.links.values().map(|l| l.in_flight()).sum()
    }
}
