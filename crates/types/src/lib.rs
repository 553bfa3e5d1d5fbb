//! Core types for the meridian agreement core.
//!
//! This crate provides the foundational types used throughout the consensus
//! implementation:
//!
//! - **Primitives**: [`Hash`], node keys ([`PrivateKey`], [`PublicKey`]) and
//!   BLS threshold keys ([`BlsSecretKey`], [`BlsPublicKey`])
//! - **Identifiers**: [`NodeId`], [`Position`]
//! - **Consensus types**: [`Block`], [`Vote`], DKG control messages
//! - **Committees**: [`NodeSet`] and deterministic notary selection
//! - **Canonical digests**: the [`signing`] module defines exactly which bytes
//!   are signed for every structure
//!
//! # Design Philosophy
//!
//! This crate is self-contained. It does not depend on any other workspace
//! crates, making it the foundation layer.

mod block;
mod config;
mod crypto;
mod dkg;
mod hash;
mod identifiers;
mod node_set;
pub mod signing;
mod vote;

pub use block::{Block, BlockVerifyStatus, Witness, GENESIS_HEIGHT};
pub use config::RoundConfig;
pub use crypto::{
    BlsPublicKey, BlsSecretKey, CryptoError, PrivateKey, PublicKey, Signature, SignatureScheme,
    BLS_DST, ECDSA_SIGNATURE_LENGTH,
};
pub use dkg::{
    Complaint, DkgId, Finalize, MasterPublicKey, MpkReady, NodePublicKeys, PartialSignature,
    PrivateShare, PublicKeyShares, Success,
};
pub use hash::{Hash, HashBuilder, HASH_LENGTH};
pub use identifiers::{NodeId, Position};
pub use node_set::{NodeSet, SubSetTarget, SubSetTargetType};
pub use signing::DKG_DELAY_ROUND;
pub use vote::{Vote, VoteHeader, VoteType};

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Deterministic node key for test index `seed`.
    pub fn test_private_key(seed: u64) -> PrivateKey {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        PrivateKey::generate(&mut rng)
    }

    /// Deterministic BLS key for test index `seed`.
    pub fn test_bls_key(seed: u64) -> BlsSecretKey {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(0x5eed));
        BlsSecretKey::generate(&mut rng).expect("32-byte ikm is valid")
    }

    /// `n` deterministic node keys.
    pub fn test_private_keys(n: usize) -> Vec<PrivateKey> {
        (0..n as u64).map(test_private_key).collect()
    }

    pub fn test_hash(label: &str) -> Hash {
        Hash::digest(label.as_bytes())
    }

    /// An unsigned block at `position` with a small payload.
    pub fn test_block(position: Position) -> Block {
        Block {
            parent_hash: test_hash("parent"),
            position,
            timestamp: 1_700_000_000_000_000_000 + position.height,
            payload: format!("payload-{}-{}", position.round, position.height).into_bytes(),
            witness: Witness {
                height: position.height.saturating_sub(1),
                data: b"witness".to_vec(),
            },
            ..Default::default()
        }
    }
}
