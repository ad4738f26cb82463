//! Protocol identifier aliases.
//!
//! All protocol identifiers are fixed-width integers with explicit wire
//! widths; the aliases keep signatures readable without hiding the
//! representation the codec relies on.

/// Unique identifier of a cluster member (1-indexed, from the hosts file).
pub type ProcessId = u64;

/// Application-level broadcast sequence number, per-origin, starting at 1.
pub type MsgSeq = u32;

/// Link-level packet sequence number, per directed link, starting at 1.
pub type PacketSeq = u32;

/// Lattice agreement shot identifier, monotonically increasing per process.
pub type InstanceId = u32;

/// Round number within a lattice agreement instance (0 = first attempt).
pub type RoundNb = u32;

/// A single proposed value in lattice agreement.
pub type Proposal = u32;
