//! Events handed to the application off the agreement hot path.

use meridian_types::{Block, Hash, Position};

/// A notification queued for asynchronous delivery to the application.
///
/// Events are **passive data**: they describe something that already
/// happened and are delivered exactly in the order they were submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A block reached agreement at its position.
    BlockConfirmed(Block),

    /// A finalized block was appended to the compaction chain.
    BlockDelivered {
        hash: Hash,
        position: Position,
        randomness: Vec<u8>,
    },

    /// Debug hook: a block was received from the network.
    BlockReceived(Hash),

    /// Debug hook: a block's dependencies are satisfied.
    BlockReady(Hash),
}

impl DispatchEvent {
    /// Short event name for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::BlockConfirmed(_) => "block_confirmed",
            DispatchEvent::BlockDelivered { .. } => "block_delivered",
            DispatchEvent::BlockReceived(_) => "block_received",
            DispatchEvent::BlockReady(_) => "block_ready",
        }
    }

    /// Whether the event targets the optional [`DebugHooks`](crate::DebugHooks).
    pub fn is_debug(&self) -> bool {
        matches!(
            self,
            DispatchEvent::BlockReceived(_) | DispatchEvent::BlockReady(_)
        )
    }
}
