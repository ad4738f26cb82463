//! Recording doubles shared by the engine tests.

use std::collections::BTreeSet;
use std::sync::Mutex;

use concord_network::Outbound;
use concord_types::{MsgSeq, ProcessId, Proposal};
use concord_wire::LatticeMessage;

use crate::log::ProtocolLog;

/// Captures protocol-log events as rendered lines.
#[derive(Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProtocolLog for RecordingLog {
    fn log_broadcast(&self, seq: MsgSeq) {
        self.lines.lock().unwrap().push(format!("b {seq}"));
    }

    fn log_delivery(&self, origin: ProcessId, seq: MsgSeq) {
        self.lines.lock().unwrap().push(format!("d {origin} {seq}"));
    }

    fn log_decision(&self, values: &BTreeSet<Proposal>) {
        let rendered: Vec<String> = values.iter().map(u32::to_string).collect();
        self.lines.lock().unwrap().push(rendered.join(" "));
    }
}

/// Captures outbound lattice messages; `None` destination = broadcast.
#[derive(Default)]
pub struct RecordingNet {
    sent: Mutex<Vec<(Option<ProcessId>, LatticeMessage)>>,
}

impl RecordingNet {
    /// Drain and return everything sent since the last call.
    pub fn take(&self) -> Vec<(Option<ProcessId>, LatticeMessage)> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }
}

impl Outbound<LatticeMessage> for RecordingNet {
    fn broadcast(&self, payload: LatticeMessage) {
        self.sent.lock().unwrap().push((None, payload));
    }

    fn send_to(&self, payload: LatticeMessage, peer: ProcessId) {
        self.sent.lock().unwrap().push((Some(peer), payload));
    }
}
