use thiserror::Error;

/// Decoding and encoding failures.
///
/// Every variant maps to a dropped packet at the receiver; none of them
/// may corrupt receiver state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("unknown packet kind {0}")]
    UnknownPacketKind(u8),

    #[error("unknown lattice message kind {0}")]
    UnknownMessageKind(u8),

    #[error("packet entry count {0} outside 1..=8")]
    BadEntryCount(u8),

    #[error("proposal set of {0} values exceeds the wire cap")]
    ProposalSetTooLarge(usize),
}
