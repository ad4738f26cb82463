//! Run configuration: which protocol this run exercises and its inputs.
//!
//! The config file shape selects the mode. A single integer on the first
//! line means broadcast mode (`<total_messages>`); three integers mean
//! lattice mode (`<shots> <vs> <ds>`) followed by one proposal line per
//! shot.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::ids::Proposal;

/// Parsed protocol configuration for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunConfig {
    /// Uniform reliable broadcast: every process broadcasts
    /// `total_messages` messages with sequence numbers `1..=total_messages`.
    Broadcast { total_messages: u32 },

    /// Multi-shot lattice agreement: `proposals[k]` is the local proposal
    /// set for shot `k`. `max_proposal_size` (vs) bounds each line;
    /// `distinct_values` (ds) bounds the distinct values across the run.
    Lattice {
        max_proposal_size: u32,
        distinct_values: u32,
        proposals: Vec<BTreeSet<Proposal>>,
    },
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut lines = contents.lines();
        let header = lines
            .next()
            .ok_or_else(|| ConfigError::Config("empty config file".into()))?;

        let fields: Vec<u32> = header
            .split_whitespace()
            .map(|f| {
                f.parse::<u32>()
                    .map_err(|_| ConfigError::Config(format!("bad integer `{f}` in header")))
            })
            .collect::<Result<_, _>>()?;

        match fields.as_slice() {
            [total_messages] => Ok(RunConfig::Broadcast {
                total_messages: *total_messages,
            }),
            [shots, vs, ds] => {
                let mut proposals = Vec::with_capacity(*shots as usize);
                for shot in 0..*shots {
                    let line = lines.next().ok_or_else(|| {
                        ConfigError::Config(format!(
                            "expected {shots} proposal lines, found {shot}"
                        ))
                    })?;
                    let set: BTreeSet<Proposal> = line
                        .split_whitespace()
                        .map(|f| {
                            f.parse::<Proposal>().map_err(|_| {
                                ConfigError::Config(format!(
                                    "bad proposal `{f}` on shot line {shot}"
                                ))
                            })
                        })
                        .collect::<Result<_, _>>()?;
                    if set.len() > *vs as usize {
                        return Err(ConfigError::Config(format!(
                            "shot {shot} proposes {} values, max is {vs}",
                            set.len()
                        )));
                    }
                    proposals.push(set);
                }
                Ok(RunConfig::Lattice {
                    max_proposal_size: *vs,
                    distinct_values: *ds,
                    proposals,
                })
            }
            _ => Err(ConfigError::Config(format!(
                "header must be `<m>` or `<p> <vs> <ds>`, got `{header}`"
            ))),
        }
    }
}
