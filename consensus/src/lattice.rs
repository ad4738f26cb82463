//! A single lattice agreement shot: co-resident proposer and acceptor.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, trace};

use concord_network::Outbound;
use concord_types::{InstanceId, ProcessId, Proposal, RoundNb};
use concord_wire::{LatticeKind, LatticeMessage};

use crate::log::ProtocolLog;

struct ShotState {
    active: bool,
    has_proposal: bool,
    decided: bool,
    terminated: bool,
    active_round: RoundNb,
    proposed: BTreeSet<Proposal>,
    accepted: BTreeSet<Proposal>,
    acks: u32,
    nacks: u32,
    acks_sent: u32,
}

impl ShotState {
    fn new() -> Self {
        Self {
            active: false,
            has_proposal: false,
            decided: false,
            terminated: false,
            active_round: 0,
            proposed: BTreeSet::new(),
            accepted: BTreeSet::new(),
            acks: 0,
            nacks: 0,
            acks_sent: 0,
        }
    }
}

/// One shot of lattice agreement.
///
/// A single lock serialises `propose`, message handling, and
/// termination; the decided set only ever grows, and every state
/// transition happens under the lock. Waiters block on a
/// [`Notify`] armed before the flag check, so a decision can never slip
/// between check and sleep.
pub struct LatticeInstance {
    id: InstanceId,
    cluster_size: usize,
    fanout: Arc<dyn Outbound<LatticeMessage>>,
    log: Arc<dyn ProtocolLog>,
    state: Mutex<ShotState>,
    notify: Notify,
}

impl LatticeInstance {
    pub fn new(
        id: InstanceId,
        cluster_size: usize,
        fanout: Arc<dyn Outbound<LatticeMessage>>,
        log: Arc<dyn ProtocolLog>,
    ) -> Self {
        Self {
            id,
            cluster_size,
            fanout,
            log,
            state: Mutex::new(ShotState::new()),
            notify: Notify::new(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Propose the local value set for this shot and broadcast it.
    pub fn propose(&self, values: BTreeSet<Proposal>) {
        let mut state = self.state.lock().unwrap();
        state.has_proposal = true;
        state.active = true;
        state.proposed = values;
        self.refine_proposal(&mut state);
        self.broadcast_proposal(&state);
        // a cluster of one is its own majority
        self.check_ack_majority(&mut state);
    }

    /// Handle one inbound message for this shot. Returns whether the
    /// instance can be destroyed: it has decided and has acknowledged
    /// proposals from all `cluster_size` processes (itself included).
    pub fn on_message(&self, msg: &LatticeMessage, sender: ProcessId) -> bool {
        let mut state = self.state.lock().unwrap();
        match msg.kind {
            // acceptor role
            LatticeKind::Proposal => {
                if msg.values.is_superset(&state.accepted) {
                    state.accepted.extend(msg.values.iter().copied());
                    self.fanout.send_to(msg.to_ack(), sender);
                    state.acks_sent += 1;
                } else {
                    state.accepted.extend(msg.values.iter().copied());
                    self.fanout.send_to(msg.to_nack(state.accepted.clone()), sender);
                }
            }

            // proposer role
            LatticeKind::Ack => {
                if msg.round == state.active_round {
                    state.acks += 1;
                    self.check_ack_majority(&mut state);
                }
            }
            LatticeKind::Nack => {
                if msg.round == state.active_round {
                    state.nacks += 1;
                    state.proposed.extend(msg.values.iter().copied());

                    let replies = (state.acks + state.nacks) as usize;
                    if state.active && state.nacks > 0 && replies * 2 > self.cluster_size {
                        state.active_round += 1;
                        state.acks = 0;
                        state.nacks = 0;
                        self.refine_proposal(&mut state);
                        self.broadcast_proposal(&state);
                        trace!(
                            instance = self.id,
                            round = state.active_round,
                            "nacked, retrying with refined proposal"
                        );
                        // the self-ack alone may already be a majority
                        // in clusters of one or two
                        self.check_ack_majority(&mut state);
                    }
                }
            }
        }

        state.decided && state.acks_sent as usize == self.cluster_size
    }

    /// Block until this shot decides or the node terminates.
    pub async fn wait_decided_or_terminated(&self) {
        loop {
            let notified = self.notify.notified();
            {
                let state = self.state.lock().unwrap();
                if state.decided || state.terminated {
                    return;
                }
            }
            notified.await;
        }
    }

    /// Release any waiter without deciding.
    pub fn terminate(&self) {
        let mut state = self.state.lock().unwrap();
        state.terminated = true;
        self.notify.notify_waiters();
    }

    /// Merge everything accepted so far into the proposal and accept it
    /// ourselves: one self-ack for the new round and one acknowledgement
    /// of our own proposal.
    fn refine_proposal(&self, state: &mut ShotState) {
        let accepted = state.accepted.clone();
        state.proposed.extend(accepted);
        state.accepted = state.proposed.clone();
        state.acks_sent = 1;
        state.acks = 1;
    }

    fn broadcast_proposal(&self, state: &ShotState) {
        self.fanout.broadcast(LatticeMessage::proposal(
            self.id,
            state.active_round,
            state.proposed.clone(),
        ));
    }

    fn check_ack_majority(&self, state: &mut ShotState) {
        if state.active && state.acks as usize * 2 > self.cluster_size {
            state.active = false;
            self.decide(state);
        }
    }

    fn decide(&self, state: &mut ShotState) {
        if state.decided || !state.has_proposal {
            return;
        }
        state.decided = true;
        state.active = false;
        debug!(instance = self.id, values = ?state.proposed, "decided");
        self.log.log_decision(&state.proposed);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingLog, RecordingNet};
    use std::time::Duration;

    fn instance_of(n: usize) -> (Arc<LatticeInstance>, Arc<RecordingNet>, Arc<RecordingLog>) {
        let net = Arc::new(RecordingNet::default());
        let log = Arc::new(RecordingLog::default());
        let instance = Arc::new(LatticeInstance::new(
            0,
            n,
            Arc::clone(&net) as Arc<dyn Outbound<LatticeMessage>>,
            Arc::clone(&log) as Arc<dyn ProtocolLog>,
        ));
        (instance, net, log)
    }

    fn set(values: &[u32]) -> BTreeSet<u32> {
        values.iter().copied().collect()
    }

    fn ack(round: RoundNb) -> LatticeMessage {
        LatticeMessage::proposal(0, round, BTreeSet::new()).to_ack()
    }

    fn nack(round: RoundNb, values: &[u32]) -> LatticeMessage {
        LatticeMessage::proposal(0, round, BTreeSet::new()).to_nack(set(values))
    }

    #[test]
    fn propose_broadcasts_round_zero() {
        let (instance, net, _log) = instance_of(3);
        instance.propose(set(&[1, 2, 3]));
        let sent = net.take();
        assert_eq!(sent.len(), 1);
        let (to, msg) = &sent[0];
        assert!(to.is_none());
        assert_eq!(msg.kind, LatticeKind::Proposal);
        assert_eq!(msg.round, 0);
        assert_eq!(msg.values, set(&[1, 2, 3]));
    }

    #[test]
    fn ack_majority_decides_own_proposal() {
        let (instance, _net, log) = instance_of(3);
        instance.propose(set(&[1, 2, 3]));
        assert!(log.lines().is_empty());

        // self-ack plus one remote ack is 2 of 3
        instance.on_message(&ack(0), 2);
        assert_eq!(log.lines(), vec!["1 2 3"]);
    }

    #[test]
    fn stale_round_replies_ignored() {
        let (instance, _net, log) = instance_of(5);
        instance.propose(set(&[1]));
        instance.on_message(&ack(4), 2);
        instance.on_message(&nack(4, &[9]), 3);
        assert!(log.lines().is_empty());
    }

    #[test]
    fn nack_majority_bumps_round_and_refines() {
        let (instance, net, log) = instance_of(3);
        instance.propose(set(&[1]));
        net.take();

        // one nack: replies (self-ack + nack) are 2 of 3, so retry
        instance.on_message(&nack(0, &[2, 3]), 2);
        let sent = net.take();
        assert_eq!(sent.len(), 1);
        let (_, retry) = &sent[0];
        assert_eq!(retry.round, 1);
        assert_eq!(retry.values, set(&[1, 2, 3]));
        assert!(log.lines().is_empty());

        // decision includes everything nacked in: validity
        instance.on_message(&ack(1), 2);
        assert_eq!(log.lines(), vec!["1 2 3"]);
    }

    #[test]
    fn acceptor_acks_superset_proposals() {
        let (instance, net, _log) = instance_of(3);
        let proposal = LatticeMessage::proposal(0, 0, set(&[1, 2]));
        let destroy = instance.on_message(&proposal, 2);
        assert!(!destroy);

        let sent = net.take();
        assert_eq!(sent.len(), 1);
        let (to, reply) = &sent[0];
        assert_eq!(*to, Some(2));
        assert_eq!(reply.kind, LatticeKind::Ack);
        assert_eq!(reply.round, 0);
    }

    #[test]
    fn acceptor_nacks_with_merged_set() {
        let (instance, net, _log) = instance_of(3);
        instance.on_message(&LatticeMessage::proposal(0, 0, set(&[1, 2])), 2);
        net.take();

        // {3} does not contain the accepted {1,2}: nack with the merge
        instance.on_message(&LatticeMessage::proposal(0, 0, set(&[3])), 3);
        let sent = net.take();
        let (to, reply) = &sent[0];
        assert_eq!(*to, Some(3));
        assert_eq!(reply.kind, LatticeKind::Nack);
        assert_eq!(reply.values, set(&[1, 2, 3]));
    }

    #[test]
    fn accepted_set_grows_monotonically() {
        let (instance, net, _log) = instance_of(3);
        instance.on_message(&LatticeMessage::proposal(0, 0, set(&[1])), 2);
        instance.on_message(&LatticeMessage::proposal(0, 0, set(&[1, 2])), 3);
        instance.on_message(&LatticeMessage::proposal(0, 0, set(&[1])), 2);
        let sent = net.take();
        // last proposal no longer contains accepted {1,2}: nack carries it
        let (_, reply) = &sent[2];
        assert_eq!(reply.kind, LatticeKind::Nack);
        assert_eq!(reply.values, set(&[1, 2]));
    }

    #[test]
    fn destroy_after_decide_and_all_acks_sent() {
        let (instance, _net, log) = instance_of(2);
        instance.propose(set(&[7]));
        // n=2: self-ack alone is not a majority; the peer's ack decides
        assert!(!instance.on_message(&LatticeMessage::proposal(0, 0, set(&[7, 8])), 2));
        let destroy = instance.on_message(&ack(0), 2);
        assert_eq!(log.lines(), vec!["7"]);
        // acked our own proposal and the peer's: 2 of 2, and decided
        assert!(destroy);
    }

    #[test]
    fn single_process_cluster_decides_at_propose() {
        let (instance, _net, log) = instance_of(1);
        instance.propose(set(&[4, 2]));
        assert_eq!(log.lines(), vec!["2 4"]);
    }

    #[tokio::test]
    async fn waiter_wakes_on_decision() {
        let (instance, _net, _log) = instance_of(1);
        let waiter = {
            let instance = Arc::clone(&instance);
            tokio::spawn(async move { instance.wait_decided_or_terminated().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        instance.propose(set(&[1]));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after decide")
            .unwrap();
    }

    #[tokio::test]
    async fn waiter_wakes_on_terminate() {
        let (instance, _net, _log) = instance_of(3);
        let waiter = {
            let instance = Arc::clone(&instance);
            tokio::spawn(async move { instance.wait_decided_or_terminated().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        instance.terminate();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after terminate")
            .unwrap();
    }
}
