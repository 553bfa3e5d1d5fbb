//! Block and witness types.

use crate::{Hash, NodeId, Position, Signature};
use serde::{Deserialize, Serialize};

/// Height of the first block in the chain.
pub const GENESIS_HEIGHT: u64 = 1;

/// Compaction-chain anchor carried by a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Witness {
    pub height: u64,
    pub data: Vec<u8>,
}

/// A proposed block.
///
/// `hash` covers proposer, parent, position, timestamp, payload hash and
/// witness. `randomness` is filled in only once the block is finalized and is
/// not part of the hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub proposer_id: NodeId,
    pub parent_hash: Hash,
    pub hash: Hash,
    pub position: Position,
    /// Nanoseconds since the Unix epoch, UTC.
    pub timestamp: u64,
    pub payload: Vec<u8>,
    pub payload_hash: Hash,
    pub witness: Witness,
    pub randomness: Vec<u8>,
    pub signature: Signature,
    pub crs_signature: Signature,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.position.height == GENESIS_HEIGHT && self.parent_hash.is_null()
    }

    pub fn is_finalized(&self) -> bool {
        !self.randomness.is_empty()
    }

    /// A block that carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload_hash.is_null()
    }
}

/// Outcome of application-level block verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockVerifyStatus {
    Ok,
    /// The block may become valid once more data is available.
    RetryLater,
    InvalidBlock,
}
