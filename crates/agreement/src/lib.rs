//! Byzantine Agreement state machine for a single position.
//!
//! [`AgreementStateMachine`] runs the per-state actions, [`AgreementDriver`]
//! paces it on external ticks, and [`VoteCache`] keeps recent votes and blocks
//! around for peers that fall behind.

mod data;
mod driver;
mod state;
mod vote_cache;

#[cfg(test)]
mod test_support;

pub use data::{AgreementData, AgreementSnapshot};
pub use driver::{AgreementConfig, AgreementDriver, TickOutcome};
pub use state::{AgreementError, AgreementState, AgreementStateMachine};
pub use vote_cache::VoteCache;
