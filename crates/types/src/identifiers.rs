//! Identifier types.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a consensus participant.
///
/// Derived from the participant's ECDSA public key (see
/// [`PublicKey::node_id`](crate::PublicKey::node_id)), so a recovered signer key
/// maps back to exactly one identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub Hash);

impl NodeId {
    pub fn as_hash(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", &hex::encode(self.0 .0)[..8])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0 .0[..8]))
    }
}

/// A (round, height) coordinate on the chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub round: u64,
    pub height: u64,
}

impl Position {
    pub const fn new(round: u64, height: u64) -> Self {
        Self { round, height }
    }

    /// Whether `self` comes strictly after `other` (round first, then height).
    pub fn newer(&self, other: &Position) -> bool {
        self > other
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({}, {})", self.round, self.height)
    }
}
