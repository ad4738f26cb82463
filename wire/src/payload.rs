//! The payload seam between the link layer and the protocol layers.

use crate::codec::Reader;
use crate::error::WireError;

/// A protocol payload carried inside a data packet entry.
///
/// The link layer is payload-agnostic: it moves, sequences, and
/// retransmits any `Payload` without inspecting it. Broadcast and
/// lattice runs instantiate the link with their own payload type, so a
/// node can never mix the two on one socket.
pub trait Payload: Sized + Clone + Send + Sync + 'static {
    /// Worst-case encoded size, used to bound receive buffers.
    const MAX_ENCODED_LEN: usize;

    fn encoded_len(&self) -> usize;

    fn encode(&self, out: &mut Vec<u8>);

    fn decode(reader: &mut Reader<'_>) -> Result<Self, WireError>;
}
