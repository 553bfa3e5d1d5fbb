//! Error types shared across the agreement core.

use meridian_types::CryptoError;

/// Errors from signing or verifying structures.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid proposer id")]
    InvalidProposerId,

    #[error("hash of block is incorrect")]
    IncorrectHash,

    #[error("signature of block is incorrect")]
    IncorrectSignature,

    #[error("threshold signer not set")]
    NoThresholdSigner,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors from the storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("block exists")]
    BlockExists,

    #[error("block does not exist")]
    BlockDoesNotExist,

    #[error("invalid compaction chain tip height {height}, tip is at {tip}")]
    InvalidCompactionChainTipHeight { height: u64, tip: u64 },

    #[error("dkg private key exists for round {round} reset {reset}")]
    DkgPrivateKeyExists { round: u64, reset: u64 },

    #[error("dkg private key does not exist for round {round} reset {reset}")]
    DkgPrivateKeyDoesNotExist { round: u64, reset: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}
