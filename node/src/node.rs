//! Node assembly: one socket, one link table, one engine, four workers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use concord_consensus::{LatticeManager, ProtocolLog, UrbEngine};
use concord_network::{Fanout, LinkTable, Outbound};
use concord_types::{
    HostsTable, InstanceId, ProcessId, Proposal, RunConfig, Tuning,
};
use concord_wire::{BroadcastMessage, LatticeMessage, Payload};

use crate::error::NodeError;
use crate::event_log::EventLog;
use crate::shutdown::ShutdownController;
use crate::workers::{spawn_listener, spawn_log_flusher, spawn_sender};

/// One Concord process.
///
/// `run` binds the socket, wires the mode's engine, spawns the workers,
/// and blocks until shutdown is triggered (by signal or programmatically
/// via [`shutdown_handle`](Self::shutdown_handle)); it then joins every
/// worker and flushes the event log before returning.
pub struct Node {
    me: ProcessId,
    hosts: HostsTable,
    config: RunConfig,
    tuning: Tuning,
    event_log: Arc<EventLog>,
    shutdown: ShutdownController,
}

impl Node {
    pub fn new(
        me: ProcessId,
        hosts: HostsTable,
        config: RunConfig,
        tuning: Tuning,
        output_path: &Path,
    ) -> Result<Self, NodeError> {
        let event_log = Arc::new(EventLog::create(output_path)?);
        Ok(Self {
            me,
            hosts,
            config,
            tuning,
            event_log,
            shutdown: ShutdownController::new(),
        })
    }

    /// Clone of the shutdown controller, for the signal task and tests.
    pub fn shutdown_handle(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    pub async fn run(&self) -> Result<(), NodeError> {
        let addr = self.hosts.addr_of(self.me)?;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| NodeError::Bind { addr, source })?;
        info!(id = self.me, %addr, "socket bound");
        let socket = Arc::new(socket);

        match self.config.clone() {
            RunConfig::Broadcast { total_messages } => {
                self.run_broadcast(socket, total_messages).await
            }
            RunConfig::Lattice { proposals, .. } => self.run_lattice(socket, proposals).await,
        }
    }

    async fn run_broadcast(
        &self,
        socket: Arc<UdpSocket>,
        total_messages: u32,
    ) -> Result<(), NodeError> {
        let table = Arc::new(LinkTable::<BroadcastMessage>::new(
            &self.hosts,
            self.me,
            Arc::clone(&socket),
            &self.tuning,
        ));
        let fanout: Arc<dyn Outbound<BroadcastMessage>> =
            Arc::new(Fanout::new(Arc::clone(&table)));
        let engine = Arc::new(UrbEngine::new(
            self.me,
            self.hosts.len(),
            fanout,
            Arc::clone(&self.event_log) as Arc<dyn ProtocolLog>,
        ));

        let mut workers = self.spawn_common(&socket, &table, {
            let engine = Arc::clone(&engine);
            Arc::new(move |peer, msg| engine.on_link_message(peer, msg))
        });
        workers.push(self.spawn_broadcast_loop(engine, Arc::clone(&table), total_messages));

        self.shutdown.wait().await;
        self.teardown(workers).await?;
        report_stats(&table);
        Ok(())
    }

    async fn run_lattice(
        &self,
        socket: Arc<UdpSocket>,
        proposals: Vec<std::collections::BTreeSet<Proposal>>,
    ) -> Result<(), NodeError> {
        let table = Arc::new(LinkTable::<LatticeMessage>::new(
            &self.hosts,
            self.me,
            Arc::clone(&socket),
            &self.tuning,
        ));
        let fanout: Arc<dyn Outbound<LatticeMessage>> =
            Arc::new(Fanout::new(Arc::clone(&table)));
        let manager = Arc::new(LatticeManager::new(
            self.hosts.len(),
            fanout,
            Arc::clone(&self.event_log) as Arc<dyn ProtocolLog>,
        ));

        let mut workers = self.spawn_common(&socket, &table, {
            let manager = Arc::clone(&manager);
            Arc::new(move |peer, msg| manager.on_message(&msg, peer))
        });
        workers.push(self.spawn_proposal_walk(Arc::clone(&manager), proposals));

        self.shutdown.wait().await;
        // release the proposal walker if it is still parked on a shot
        manager.terminate();
        self.teardown(workers).await?;
        report_stats(&table);
        Ok(())
    }

    /// The three workers every mode runs: sender, listener, log flusher.
    fn spawn_common<P: Payload>(
        &self,
        socket: &Arc<UdpSocket>,
        table: &Arc<LinkTable<P>>,
        upcall: crate::workers::Upcall<P>,
    ) -> Vec<JoinHandle<()>> {
        vec![
            spawn_sender(Arc::clone(table), &self.tuning, self.shutdown.clone()),
            spawn_listener(
                Arc::clone(socket),
                Arc::clone(table),
                upcall,
                self.shutdown.clone(),
            ),
            spawn_log_flusher(
                Arc::clone(&self.event_log),
                &self.tuning,
                self.shutdown.clone(),
            ),
        ]
    }

    /// Application loop of broadcast mode: emit `total` messages,
    /// pausing while any link queue is over the backpressure threshold,
    /// then keep relaying for the rest of the run.
    fn spawn_broadcast_loop(
        &self,
        engine: Arc<UrbEngine>,
        table: Arc<LinkTable<BroadcastMessage>>,
        total_messages: u32,
    ) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        let max_queue = self.tuning.max_queue_size;
        let pause = Duration::from_millis(self.tuning.send_interval_ms);
        tokio::spawn(async move {
            for _ in 0..total_messages {
                while table.max_queue_len() > max_queue {
                    if shutdown.is_triggered() {
                        return;
                    }
                    tokio::time::sleep(pause).await;
                }
                if shutdown.is_triggered() {
                    return;
                }
                engine.broadcast_next();
            }
            info!(total_messages, "all local messages broadcast, relaying until shutdown");

            while table.total_in_flight() > 0 {
                if shutdown.is_triggered() {
                    return;
                }
                tokio::time::sleep(pause).await;
            }
            info!("every outbound payload acknowledged");
        })
    }

    /// Application loop of lattice mode: walk the shots in order,
    /// proposing the next only after the previous decided (or the node
    /// was told to terminate).
    fn spawn_proposal_walk(
        &self,
        manager: Arc<LatticeManager>,
        proposals: Vec<std::collections::BTreeSet<Proposal>>,
    ) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            for (shot, values) in proposals.into_iter().enumerate() {
                if shutdown.is_triggered() {
                    return;
                }
                let id = shot as InstanceId;
                manager.propose(id, values);
                manager.wait_decided_or_terminated(id).await;
            }
            info!("all shots proposed and decided, serving peers until shutdown");
        })
    }

    async fn teardown(&self, workers: Vec<JoinHandle<()>>) -> Result<(), NodeError> {
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "worker ended abnormally");
            }
        }
        self.event_log.flush()?;
        info!(id = self.me, "node stopped");
        Ok(())
    }
}

fn report_stats<P: Payload>(table: &LinkTable<P>) {
    for link in table.iter() {
        let (sent, retransmissions, send_errors, acks, duplicates) = link.stats().snapshot();
        info!(
            peer = link.peer(),
            sent, retransmissions, send_errors, acks, duplicates, "link stats"
        );
    }
}
