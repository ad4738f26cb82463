//! Wire codec for link packets and protocol payloads.
//!
//! The wire format is a fixed big-endian byte layout, so everything here
//! is hand-encoded; no serializer framework sits between the structs and
//! the bytes. The top-level wire type is [`Packet`], a tagged sum of a
//! data packet (up to [`MAX_MESSAGES_PER_PACKET`] sequenced payload
//! entries) and a cumulative ACK (the same sequence list without
//! payloads).
//!
//! ## Wire format
//!
//! ```text
//! packet    := kind:u8  n:u8  body
//! data body := n × (pkt_seq:u32  payload)
//! ack body  := n × (pkt_seq:u32)
//! ```
//!
//! with `kind 0 = DATA, 1 = ACK` and `1 <= n <= 8`. Payloads are either
//! a [`BroadcastMessage`] (`seq:u32 origin:u64`) or a [`LatticeMessage`]
//! (`kind:u8 instance:u32 round:u32 len:u16 len × value:u32`). All
//! integers are big-endian. Decoding rejects out-of-range `n`, unknown
//! kinds, truncated buffers, and oversized proposal sets.

pub mod broadcast;
pub mod codec;
pub mod error;
pub mod lattice;
pub mod packet;
pub mod payload;

pub use broadcast::BroadcastMessage;
pub use concord_types::tuning::{MAX_MESSAGES_PER_PACKET, MAX_PROPOSAL_SET_SIZE};
pub use error::WireError;
pub use lattice::{LatticeKind, LatticeMessage};
pub use packet::Packet;
pub use payload::Payload;
