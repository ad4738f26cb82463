//! Broadcast payload: one application-level message.

use concord_types::{MsgSeq, ProcessId};

use crate::codec::{put_u32, put_u64, Reader};
use crate::error::WireError;
use crate::payload::Payload;

/// An application broadcast produced by `origin` with per-origin
/// monotonically increasing `seq` starting at 1.
///
/// Wire form: `seq:u32 origin:u64`, big-endian, fixed size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BroadcastMessage {
    pub seq: MsgSeq,
    pub origin: ProcessId,
}

impl BroadcastMessage {
    pub const ENCODED_LEN: usize = 4 + 8;

    pub fn new(seq: MsgSeq, origin: ProcessId) -> Self {
        Self { seq, origin }
    }
}

impl Payload for BroadcastMessage {
    const MAX_ENCODED_LEN: usize = Self::ENCODED_LEN;

    fn encoded_len(&self) -> usize {
        Self::ENCODED_LEN
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_u32(out, self.seq);
        put_u64(out, self.origin);
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, WireError> {
        let seq = reader.get_u32()?;
        let origin = reader.get_u64()?;
        Ok(Self { seq, origin })
    }
}
