//! Fundamental types for the Concord protocols.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: protocol identifiers, the cluster membership table, the run
//! configuration (broadcast vs lattice mode), and the tuning knobs.

pub mod config;
pub mod error;
pub mod hosts;
pub mod ids;
pub mod tuning;

pub use config::RunConfig;
pub use error::ConfigError;
pub use hosts::{Host, HostsTable};
pub use ids::{InstanceId, MsgSeq, PacketSeq, ProcessId, Proposal, RoundNb};
pub use tuning::Tuning;
