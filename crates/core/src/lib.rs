//! Capabilities, signing and verification for the meridian agreement core.
//!
//! This crate sits directly above `meridian-types` and provides:
//!
//! - The capability traits the core consumes from its surroundings
//!   ([`Application`], [`RoundInfoProvider`], [`AgreementReceiver`],
//!   [`LeaderSelector`], [`ThresholdSigner`], [`Database`])
//! - [`Signer`]: an explicitly constructed signing object holding the node key
//!   and, once DKG has produced key material, a threshold signer
//! - The [`verify`] functions: pure checks over the canonical digests
//! - [`DispatchEvent`]: notifications delivered to the application off the
//!   agreement hot path
//!
//! # Signing flow
//!
//! ```text
//! Block ──sign_block──▶ payload_hash, hash, signature
//!   └───sign_crs────▶ crs_signature  (digest commitment before DKG_DELAY_ROUND,
//!                                     threshold signature afterwards)
//! ```

mod error;
mod event;
mod signer;
mod traits;
pub mod verify;

pub use error::{SignerError, StorageError};
pub use event::DispatchEvent;
pub use signer::Signer;
pub use traits::{
    AgreementReceiver, Application, Database, DebugHooks, LeaderSelector, RoundInfoProvider,
    ThresholdSigner,
};
