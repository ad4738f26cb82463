//! Multiplexer for concurrent lattice agreement shots.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use concord_network::Outbound;
use concord_types::{InstanceId, ProcessId, Proposal};
use concord_wire::LatticeMessage;

use crate::lattice::LatticeInstance;
use crate::log::ProtocolLog;

/// Ordered map of live shots, materialised lazily.
///
/// An instance comes into existence on the first local proposal or the
/// first inbound message naming its id — whichever happens first — and
/// is removed once it reports the destroy criterion (decided, and acked
/// every process's proposal). The manager lock covers only the map;
/// instance transitions run under each instance's own lock, so shots
/// make progress independently.
pub struct LatticeManager {
    cluster_size: usize,
    fanout: Arc<dyn Outbound<LatticeMessage>>,
    log: Arc<dyn ProtocolLog>,
    instances: Mutex<BTreeMap<InstanceId, Arc<LatticeInstance>>>,
}

impl LatticeManager {
    pub fn new(
        cluster_size: usize,
        fanout: Arc<dyn Outbound<LatticeMessage>>,
        log: Arc<dyn ProtocolLog>,
    ) -> Self {
        Self {
            cluster_size,
            fanout,
            log,
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    fn instance(&self, id: InstanceId) -> Arc<LatticeInstance> {
        let mut instances = self.instances.lock().unwrap();
        Arc::clone(instances.entry(id).or_insert_with(|| {
            Arc::new(LatticeInstance::new(
                id,
                self.cluster_size,
                Arc::clone(&self.fanout),
                Arc::clone(&self.log),
            ))
        }))
    }

    /// Dispatch an inbound message to its shot, creating it on first
    /// contact and destroying it when the shot reports completion.
    pub fn on_message(&self, msg: &LatticeMessage, sender: ProcessId) {
        trace!(
            instance = msg.instance,
            kind = msg.kind_str(),
            from = sender,
            "lattice message"
        );
        let instance = self.instance(msg.instance);
        if instance.on_message(msg, sender) {
            debug!(instance = msg.instance, "shot complete, destroying");
            self.instances.lock().unwrap().remove(&msg.instance);
        }
    }

    /// Propose the local value set for shot `id`.
    pub fn propose(&self, id: InstanceId, values: BTreeSet<Proposal>) {
        self.instance(id).propose(values);
    }

    /// Block until shot `id` decides or the node terminates. A shot that
    /// has already been destroyed has decided by definition.
    pub async fn wait_decided_or_terminated(&self, id: InstanceId) {
        let instance = {
            let instances = self.instances.lock().unwrap();
            instances.get(&id).cloned()
        };
        if let Some(instance) = instance {
            instance.wait_decided_or_terminated().await;
        }
    }

    /// Release every live waiter; called once at teardown.
    pub fn terminate(&self) {
        let instances: Vec<_> = self.instances.lock().unwrap().values().cloned().collect();
        for instance in instances {
            instance.terminate();
        }
    }

    /// Number of live (not yet destroyed) shots.
    pub fn live_shots(&self) -> usize {
        self.instances.lock().unwrap().len()
    }
}
