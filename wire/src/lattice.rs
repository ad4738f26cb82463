//! Lattice agreement payload: proposals and their ACK/NACK replies.

use std::collections::BTreeSet;

use concord_types::tuning::MAX_PROPOSAL_SET_SIZE;
use concord_types::{InstanceId, Proposal, RoundNb};

use crate::codec::{put_u16, put_u32, put_u8, Reader};
use crate::error::WireError;
use crate::payload::Payload;

/// Role of a lattice message within an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LatticeKind {
    /// A proposer's current value set for a round.
    Proposal = 0,
    /// Acceptor accepts the proposal as-is. Carries an empty set.
    Ack = 1,
    /// Acceptor's accepted set was not contained in the proposal; the
    /// reply carries the merged accepted set.
    Nack = 2,
}

impl TryFrom<u8> for LatticeKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, WireError> {
        match value {
            0 => Ok(Self::Proposal),
            1 => Ok(Self::Ack),
            2 => Ok(Self::Nack),
            other => Err(WireError::UnknownMessageKind(other)),
        }
    }
}

/// A single lattice agreement message.
///
/// Wire form: `kind:u8 instance:u32 round:u32 len:u16 len × value:u32`.
/// The instance id is carried at the message level so that one datagram
/// can interleave messages from different shots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatticeMessage {
    pub kind: LatticeKind,
    pub instance: InstanceId,
    pub round: RoundNb,
    pub values: BTreeSet<Proposal>,
}

impl LatticeMessage {
    pub fn proposal(instance: InstanceId, round: RoundNb, values: BTreeSet<Proposal>) -> Self {
        Self {
            kind: LatticeKind::Proposal,
            instance,
            round,
            values,
        }
    }

    /// ACK reply to this message: same instance and round, empty set.
    pub fn to_ack(&self) -> Self {
        Self {
            kind: LatticeKind::Ack,
            instance: self.instance,
            round: self.round,
            values: BTreeSet::new(),
        }
    }

    /// NACK reply to this message carrying the acceptor's current
    /// accepted set.
    pub fn to_nack(&self, accepted: BTreeSet<Proposal>) -> Self {
        Self {
            kind: LatticeKind::Nack,
            instance: self.instance,
            round: self.round,
            values: accepted,
        }
    }

    /// Short tag for diagnostics.
    pub fn kind_str(&self) -> &'static str {
        match self.kind {
            LatticeKind::Proposal => "proposal",
            LatticeKind::Ack => "ack",
            LatticeKind::Nack => "nack",
        }
    }
}

impl Payload for LatticeMessage {
    const MAX_ENCODED_LEN: usize = 1 + 4 + 4 + 2 + 4 * MAX_PROPOSAL_SET_SIZE;

    fn encoded_len(&self) -> usize {
        1 + 4 + 4 + 2 + 4 * self.values.len()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_u8(out, self.kind as u8);
        put_u32(out, self.instance);
        put_u32(out, self.round);
        put_u16(out, self.values.len() as u16);
        for &value in &self.values {
            put_u32(out, value);
        }
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, WireError> {
        let kind = LatticeKind::try_from(reader.get_u8()?)?;
        let instance = reader.get_u32()?;
        let round = reader.get_u32()?;
        let len = reader.get_u16()? as usize;
        if len > MAX_PROPOSAL_SET_SIZE {
            return Err(WireError::ProposalSetTooLarge(len));
        }
        let mut values = BTreeSet::new();
        for _ in 0..len {
            values.insert(reader.get_u32()?);
        }
        Ok(Self {
            kind,
            instance,
            round,
            values,
        })
    }
}
