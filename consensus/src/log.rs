//! Sink for the contractual output events.

use std::collections::BTreeSet;

use concord_types::{MsgSeq, ProcessId, Proposal};

/// Where the engines record protocol events destined for the output
/// file. The node runtime provides the durable implementation; the
/// format of each line is part of the protocol contract.
pub trait ProtocolLog: Send + Sync + 'static {
    /// `b <seq>` — the local process broadcast its own message `seq`.
    fn log_broadcast(&self, seq: MsgSeq);

    /// `d <origin> <seq>` — delivery of `origin`'s message `seq`.
    fn log_delivery(&self, origin: ProcessId, seq: MsgSeq);

    /// One line of decided values, sorted ascending, space-separated.
    fn log_decision(&self, values: &BTreeSet<Proposal>);
}
