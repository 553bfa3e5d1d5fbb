//! Committee cache for the meridian agreement core.
//!
//! Answers "who is in the committee for round R" and "what is round R's CRS"
//! from memoized per-round snapshots backed by a
//! [`RoundInfoProvider`](meridian_core::RoundInfoProvider).
//!
//! # Retention
//!
//! Populating round R evicts every cached round R' with `R - R' > retention`
//! (default [`DEFAULT_RETENTION_ROUNDS`]), so the cache holds the newest
//! populated round plus that many rounds before it. Rounds newer than R are
//! never evicted by populating R.
//!
//! # Key pool
//!
//! Public keys are stored once in an arena shared by all rounds. Snapshots
//! hold handles into it; a key is dropped when the last retained round that
//! references its node is evicted.

mod cache;
mod key_pool;

pub use cache::{CacheError, NodeSetCache, DEFAULT_RETENTION_ROUNDS};
