//! Per-round protocol configuration published by governance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol parameters for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Number of nodes selected into the notary set.
    pub notary_set_size: u32,
    /// Length of one agreement clock tick.
    pub lambda_ba: Duration,
    /// Length of one DKG phase.
    pub lambda_dkg: Duration,
    /// Number of blocks in a round.
    pub round_length: u64,
    pub min_block_interval: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            notary_set_size: 4,
            lambda_ba: Duration::from_millis(250),
            lambda_dkg: Duration::from_secs(1),
            round_length: 100,
            min_block_interval: Duration::from_millis(100),
        }
    }
}
