//! The agreement engines.
//!
//! [`UrbEngine`] implements uniform reliable broadcast on top of perfect
//! links: relay on first sight, deliver on strict majority, strictly
//! FIFO per origin. [`LatticeManager`] multiplexes single-shot
//! [`LatticeInstance`] state machines, each running the proposer and
//! acceptor roles of one lattice agreement shot.
//!
//! Both engines hold only narrow handles — an
//! [`Outbound`](concord_network::Outbound) fan-out for the wire and a
//! [`ProtocolLog`] sink for the contractual output file — never the node
//! that owns them.

pub mod lattice;
pub mod log;
pub mod manager;
#[cfg(test)]
pub(crate) mod testutil;
pub mod urb;

pub use lattice::LatticeInstance;
pub use log::ProtocolLog;
pub use manager::LatticeManager;
pub use urb::UrbEngine;
