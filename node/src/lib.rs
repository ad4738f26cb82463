//! The node runtime.
//!
//! Wires one UDP socket, the per-peer link table, and the agreement
//! engine for the configured mode, then drives them with long-running
//! worker tasks: a sender ticking every link, a listener decoding and
//! dispatching inbound datagrams, an event-log flusher, and — in lattice
//! mode — a proposal walker. Teardown is signal-driven: every worker
//! observes the shutdown controller, all handles are joined, and the
//! event log is flushed before the process exits.

pub mod error;
pub mod event_log;
pub mod logging;
pub mod node;
pub mod shutdown;
pub mod workers;

pub use error::NodeError;
pub use event_log::EventLog;
pub use logging::{init_logging, LogFormat};
pub use node::Node;
pub use shutdown::ShutdownController;
