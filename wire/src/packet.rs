//! The link-level datagram.

use concord_types::tuning::MAX_MESSAGES_PER_PACKET;
use concord_types::PacketSeq;

use crate::codec::{put_u32, put_u8, Reader};
use crate::error::WireError;
use crate::payload::Payload;

const KIND_DATA: u8 = 0;
const KIND_ACK: u8 = 1;

/// One UDP datagram on a link.
///
/// A data packet carries up to eight `(pkt_seq, payload)` entries; an ACK
/// carries the matching sequence list alone. The entry count is bounded
/// on both encode and decode — a count outside `1..=8` is a corruption
/// error, never a panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet<P> {
    Data { entries: Vec<(PacketSeq, P)> },
    Ack { seqs: Vec<PacketSeq> },
}

impl<P: Payload> Packet<P> {
    /// Worst-case encoded size for receive buffer allocation.
    pub const fn max_encoded_len() -> usize {
        2 + MAX_MESSAGES_PER_PACKET * (4 + P::MAX_ENCODED_LEN)
    }

    fn entry_count(&self) -> usize {
        match self {
            Packet::Data { entries } => entries.len(),
            Packet::Ack { seqs } => seqs.len(),
        }
    }

    /// The ACK acknowledging every entry of this packet.
    pub fn to_ack(&self) -> Packet<P> {
        match self {
            Packet::Data { entries } => Packet::Ack {
                seqs: entries.iter().map(|(seq, _)| *seq).collect(),
            },
            Packet::Ack { seqs } => Packet::Ack { seqs: seqs.clone() },
        }
    }

    /// Short tag for diagnostics.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Packet::Data { .. } => "data",
            Packet::Ack { .. } => "ack",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let n = self.entry_count();
        if n == 0 || n > MAX_MESSAGES_PER_PACKET {
            return Err(WireError::BadEntryCount(n as u8));
        }

        let mut out = Vec::with_capacity(Self::max_encoded_len());
        match self {
            Packet::Data { entries } => {
                put_u8(&mut out, KIND_DATA);
                put_u8(&mut out, n as u8);
                for (seq, payload) in entries {
                    put_u32(&mut out, *seq);
                    payload.encode(&mut out);
                }
            }
            Packet::Ack { seqs } => {
                put_u8(&mut out, KIND_ACK);
                put_u8(&mut out, n as u8);
                for seq in seqs {
                    put_u32(&mut out, *seq);
                }
            }
        }
        Ok(out)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(buf);
        let kind = reader.get_u8()?;
        let n = reader.get_u8()?;
        if n == 0 || n as usize > MAX_MESSAGES_PER_PACKET {
            return Err(WireError::BadEntryCount(n));
        }

        match kind {
            KIND_DATA => {
                let mut entries = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let seq = reader.get_u32()?;
                    let payload = P::decode(&mut reader)?;
                    entries.push((seq, payload));
                }
                Ok(Packet::Data { entries })
            }
            KIND_ACK => {
                let mut seqs = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    seqs.push(reader.get_u32()?);
                }
                Ok(Packet::Ack { seqs })
            }
            other => Err(WireError::UnknownPacketKind(other)),
        }
    }
}
