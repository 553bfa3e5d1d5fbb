//! Capability sets supplied by the surrounding node.
//!
//! The agreement core never reaches for global state: everything it needs from
//! the outside world comes through one of these traits, and production and test
//! implementations are interchangeable.

use crate::StorageError;
use meridian_types::{
    Block, BlockVerifyStatus, BlsSecretKey, CryptoError, Hash, Position, PublicKey, RoundConfig,
    Signature, Vote, VoteType, Witness,
};

/// Application callbacks.
///
/// `block_confirmed` and `block_delivered` are only ever invoked from the
/// dispatcher worker, in submission order. The remaining methods are called
/// synchronously because the caller needs their result.
pub trait Application: Send + Sync {
    /// Payload for a block the local node is about to propose.
    fn prepare_payload(&self, position: Position) -> Vec<u8>;

    /// Compaction-chain witness for a proposal at `height`.
    fn prepare_witness(&self, height: u64) -> Witness;

    fn verify_block(&self, block: &Block) -> BlockVerifyStatus;

    fn block_confirmed(&self, block: Block);

    fn block_delivered(&self, hash: Hash, position: Position, randomness: Vec<u8>);
}

/// Optional application extension for observing block progress.
pub trait DebugHooks: Send + Sync {
    fn block_received(&self, hash: Hash);

    fn block_ready(&self, hash: Hash);
}

/// Per-round information published by governance.
///
/// Round 0 always has genesis values. `None` (or a null CRS) means the round
/// is not known yet.
pub trait RoundInfoProvider: Send + Sync {
    fn configuration(&self, round: u64) -> Option<RoundConfig>;

    fn crs(&self, round: u64) -> Option<Hash>;

    fn node_set(&self, round: u64) -> Option<Vec<PublicKey>>;
}

/// Proposal capability of one agreement instance.
pub trait AgreementReceiver: Send + Sync {
    /// Propose a block for the current position. May return [`Hash::NULL`].
    fn propose_block(&self) -> Hash;

    /// Sign and broadcast a vote. Fire-and-forget.
    fn propose_vote(&self, vote: Vote);

    /// Whether enough `vote_type` votes for `period` have been collected for
    /// the next step to act on them. Receivers that gate elsewhere keep the
    /// default.
    fn has_quorum(&self, _vote_type: VoteType, _period: u64) -> bool {
        true
    }
}

/// Leader election capability of one agreement instance.
pub trait LeaderSelector: Send + Sync {
    /// Hash of the block proposed by the current leader, or [`Hash::NULL`].
    fn leader_block_hash(&self) -> Hash;
}

/// Produces threshold partial signatures over CRS digests.
///
/// Installed on the [`Signer`](crate::Signer) once DKG for a round has produced
/// usable key material.
pub trait ThresholdSigner: Send + Sync {
    fn sign(&self, round: u64, digest: &Hash) -> Result<Signature, CryptoError>;
}

impl<F> ThresholdSigner for F
where
    F: Fn(u64, &Hash) -> Result<Signature, CryptoError> + Send + Sync,
{
    fn sign(&self, round: u64, digest: &Hash) -> Result<Signature, CryptoError> {
        self(round, digest)
    }
}

/// Storage collaborator for blocks, the compaction-chain tip and DKG keys.
pub trait Database: Send + Sync {
    fn has_block(&self, hash: &Hash) -> bool;

    fn get_block(&self, hash: &Hash) -> Result<Block, StorageError>;

    /// Insert a new block. Fails if a block with the same hash exists.
    fn put_block(&self, block: Block) -> Result<(), StorageError>;

    /// Replace an existing block. Fails if the block is unknown.
    fn update_block(&self, block: Block) -> Result<(), StorageError>;

    /// All blocks in insertion order.
    fn all_blocks(&self) -> Vec<Block>;

    /// Advance the compaction-chain tip. `height` must be exactly one above the
    /// current tip height.
    fn put_compaction_chain_tip_info(&self, hash: Hash, height: u64) -> Result<(), StorageError>;

    fn get_compaction_chain_tip_info(&self) -> (Hash, u64);

    fn get_dkg_private_key(&self, round: u64, reset: u64) -> Result<BlsSecretKey, StorageError>;

    fn put_dkg_private_key(
        &self,
        round: u64,
        reset: u64,
        key: BlsSecretKey,
    ) -> Result<(), StorageError>;
}
