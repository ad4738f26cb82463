//! The long-running worker tasks.
//!
//! Each worker is a spawned task owning a subscription to the shutdown
//! controller; the node retains every [`JoinHandle`] and awaits them all
//! during teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use concord_network::LinkTable;
use concord_types::{ProcessId, Tuning};
use concord_wire::{Packet, Payload};

use crate::event_log::EventLog;
use crate::shutdown::ShutdownController;

/// Handler invoked by the listener for every first-sighting payload.
pub type Upcall<P> = Arc<dyn Fn(ProcessId, P) + Send + Sync>;

/// Sender worker: on a fixed tick, drive every link's send/retransmit
/// cycle.
pub fn spawn_sender<P: Payload>(
    table: Arc<LinkTable<P>>,
    tuning: &Tuning,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    let period = Duration::from_millis(tuning.send_interval_ms);
    tokio::spawn(async move {
        let mut rx = shutdown.subscribe();
        let mut tick = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = rx.recv() => break,
                _ = tick.tick() => {
                    for link in table.iter() {
                        link.send().await;
                    }
                }
            }
        }
        debug!("sender worker stopped");
    })
}

/// Listener worker: block on `recv_from`, decode, run the owning link's
/// receive path, and hand each first-sighting payload to the upcall.
/// Malformed datagrams and unknown senders are dropped without touching
/// any state.
pub fn spawn_listener<P: Payload>(
    socket: Arc<UdpSocket>,
    table: Arc<LinkTable<P>>,
    upcall: Upcall<P>,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = shutdown.subscribe();
        let mut buf = vec![0u8; Packet::<P>::max_encoded_len()];
        loop {
            tokio::select! {
                _ = rx.recv() => break,
                received = socket.recv_from(&mut buf) => {
                    let (len, addr) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            warn!(error = %e, "recv_from failed");
                            continue;
                        }
                    };
                    let Some(link) = table.get_by_addr(&addr) else {
                        trace!(%addr, "datagram from unknown peer dropped");
                        continue;
                    };
                    match Packet::<P>::decode(&buf[..len]) {
                        Ok(packet) => {
                            let peer = link.peer();
                            trace!(peer, kind = packet.kind_str(), "packet received");
                            for (_seq, payload) in link.receive(packet).await {
                                upcall(peer, payload);
                            }
                        }
                        Err(e) => {
                            trace!(%addr, error = %e, "malformed packet dropped");
                        }
                    }
                }
            }
        }
        debug!("listener worker stopped");
    })
}

/// Event-log flusher: periodically write queued protocol output lines.
/// The final flush happens in teardown, after this worker has stopped.
pub fn spawn_log_flusher(
    event_log: Arc<EventLog>,
    tuning: &Tuning,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    let period = Duration::from_millis(tuning.log_interval_ms);
    tokio::spawn(async move {
        let mut rx = shutdown.subscribe();
        let mut tick = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = rx.recv() => break,
                _ = tick.tick() => {
                    if let Err(e) = event_log.flush() {
                        warn!(error = %e, "event log flush failed");
                    }
                }
            }
        }
        debug!("log flusher stopped");
    })
}
