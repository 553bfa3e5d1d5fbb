//! Agreement ballots.

use crate::{Hash, NodeId, Position, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Purpose of a vote.
///
/// The discriminant is the byte written into the vote digest, so the order of
/// variants is part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoteType {
    Init = 0,
    PreCom = 1,
    Com = 2,
    Fast = 3,
    FastCom = 4,
}

impl VoteType {
    pub const ALL: [VoteType; 5] = [
        VoteType::Init,
        VoteType::PreCom,
        VoteType::Com,
        VoteType::Fast,
        VoteType::FastCom,
    ];

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoteType::Init => "init",
            VoteType::PreCom => "pre-commit",
            VoteType::Com => "commit",
            VoteType::Fast => "fast",
            VoteType::FastCom => "fast-commit",
        };
        f.write_str(name)
    }
}

/// The signed fields of a vote, excluding the partial signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteHeader {
    pub proposer_id: NodeId,
    pub vote_type: VoteType,
    pub block_hash: Hash,
    pub period: u64,
    pub position: Position,
}

/// A ballot for one position, period and vote type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    pub header: VoteHeader,
    /// Threshold partial signature over the voted block, if any.
    pub partial_signature: Signature,
    pub signature: Signature,
}

impl Vote {
    /// Create an unsigned vote. Proposer and position are filled in by the
    /// caller (the proposer by the signer).
    pub fn new(vote_type: VoteType, block_hash: Hash, period: u64) -> Self {
        Self {
            header: VoteHeader {
                proposer_id: NodeId::default(),
                vote_type,
                block_hash,
                period,
                position: Position::default(),
            },
            partial_signature: Signature::default(),
            signature: Signature::default(),
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.header.position = position;
        self
    }

    pub fn vote_type(&self) -> VoteType {
        self.header.vote_type
    }

    pub fn block_hash(&self) -> Hash {
        self.header.block_hash
    }

    pub fn position(&self) -> Position {
        self.header.position
    }
}
