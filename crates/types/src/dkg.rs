//! Distributed key generation control messages.
//!
//! Only the message shapes live here; the key-share math is owned by the DKG
//! protocol implementation. Every message is keyed by (proposer, round, reset)
//! and signed once with the proposer's node key.

use crate::{BlsPublicKey, BlsSecretKey, Hash, NodeId, Signature};
use std::collections::HashMap;

/// A participant's identifier inside the DKG polynomial, stored little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DkgId(pub [u8; 32]);

impl DkgId {
    /// The DKG identifier of a node is its identity hash, read little-endian.
    pub fn from_node_id(node_id: &NodeId) -> Self {
        let mut bytes = node_id.0 .0;
        bytes.reverse();
        Self(bytes)
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        self.0
    }
}

/// Public commitments of one dealer's polynomial.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicKeyShares {
    pub master_public_keys: Vec<BlsPublicKey>,
}

impl PublicKeyShares {
    /// Concatenated compressed encodings, in polynomial order.
    pub fn master_key_bytes(&self) -> Vec<u8> {
        self.master_public_keys
            .iter()
            .flat_map(|key| key.to_bytes())
            .collect()
    }
}

/// A secret share sent from `proposer_id` to `receiver_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateShare {
    pub proposer_id: NodeId,
    pub receiver_id: NodeId,
    pub round: u64,
    pub reset: u64,
    pub private_share: BlsSecretKey,
    pub signature: Signature,
}

/// A dealer's master public key commitments for a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPublicKey {
    pub proposer_id: NodeId,
    pub round: u64,
    pub reset: u64,
    pub dkg_id: DkgId,
    pub public_key_shares: PublicKeyShares,
    pub signature: Signature,
}

/// A complaint against a dealer.
///
/// A complaint either carries the offending share (signed by the dealer) or,
/// when the share never arrived, an unsigned placeholder share. The latter is a
/// "nack".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complaint {
    pub proposer_id: NodeId,
    pub round: u64,
    pub reset: u64,
    pub private_share: PrivateShare,
    pub signature: Signature,
}

impl Complaint {
    pub fn is_nack(&self) -> bool {
        self.private_share.signature.is_empty()
    }
}

/// A threshold partial signature over `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSignature {
    pub proposer_id: NodeId,
    pub round: u64,
    pub hash: Hash,
    pub partial_signature: Signature,
    pub signature: Signature,
}

/// Announces that a node has received all master public keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MpkReady {
    pub proposer_id: NodeId,
    pub round: u64,
    pub reset: u64,
    pub signature: Signature,
}

/// Announces that a node has finished its DKG phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Finalize {
    pub proposer_id: NodeId,
    pub round: u64,
    pub reset: u64,
    pub signature: Signature,
}

/// Announces that a node derived usable group key material.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Success {
    pub proposer_id: NodeId,
    pub round: u64,
    pub reset: u64,
    pub signature: Signature,
}

/// Per-node threshold public keys recovered for a round.
#[derive(Debug, Clone, Default)]
pub struct NodePublicKeys {
    pub round: u64,
    pub public_keys: HashMap<NodeId, BlsPublicKey>,
}

impl NodePublicKeys {
    pub fn new(round: u64) -> Self {
        Self {
            round,
            public_keys: HashMap::new(),
        }
    }

    pub fn insert(&mut self, node_id: NodeId, key: BlsPublicKey) {
        self.public_keys.insert(node_id, key);
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&BlsPublicKey> {
        self.public_keys.get(node_id)
    }
}
