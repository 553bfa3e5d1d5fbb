//! Shared per-instance agreement data.

use meridian_core::{AgreementReceiver, LeaderSelector};
use meridian_types::{Hash, Position};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Fields read by states and written by the vote-collection side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgreementSnapshot {
    pub is_leader: bool,
    pub lock_value: Hash,
    pub period: u64,
    pub position: Position,
}

/// Data shared between one agreement instance and its collaborators.
///
/// Reads go through [`snapshot`](Self::snapshot), which holds the lock only
/// while copying. States never hold the lock while calling into the receiver or
/// leader selector.
pub struct AgreementData {
    inner: RwLock<AgreementSnapshot>,
    receiver: Arc<dyn AgreementReceiver>,
    leader: Arc<dyn LeaderSelector>,
}

impl AgreementData {
    pub fn new(receiver: Arc<dyn AgreementReceiver>, leader: Arc<dyn LeaderSelector>) -> Self {
        Self {
            inner: RwLock::new(AgreementSnapshot::default()),
            receiver,
            leader,
        }
    }

    pub fn snapshot(&self) -> AgreementSnapshot {
        *self.inner.read()
    }

    pub fn set_leader(&self, is_leader: bool) {
        self.inner.write().is_leader = is_leader;
    }

    pub fn set_lock_value(&self, lock_value: Hash) {
        self.inner.write().lock_value = lock_value;
    }

    pub fn set_period(&self, period: u64) {
        self.inner.write().period = period;
    }

    /// Move to a new position, resetting the lock value and period.
    pub fn reset(&self, position: Position, is_leader: bool) {
        *self.inner.write() = AgreementSnapshot {
            is_leader,
            lock_value: Hash::NULL,
            period: 1,
            position,
        };
    }

    pub fn receiver(&self) -> &dyn AgreementReceiver {
        self.receiver.as_ref()
    }

    pub fn leader(&self) -> &dyn LeaderSelector {
        self.leader.as_ref()
    }
}

impl fmt::Debug for AgreementData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgreementData")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}
