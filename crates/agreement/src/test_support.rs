//! Recording collaborators for agreement tests.

use crate::data::AgreementData;
use meridian_core::{AgreementReceiver, LeaderSelector};
use meridian_types::{Hash, Position, Vote, VoteType};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Receiver that proposes a fixed hash and records every vote.
pub(crate) struct TestReceiver {
    proposal: Hash,
    proposals: AtomicUsize,
    quorum: AtomicBool,
    votes: Mutex<Vec<Vote>>,
    /// Moved to this position by the next quorum check.
    reset_on_quorum: Mutex<Option<(Weak<AgreementData>, Position)>>,
}

impl TestReceiver {
    pub(crate) fn proposing(proposal: Hash) -> Arc<Self> {
        Arc::new(Self {
            proposal,
            proposals: AtomicUsize::new(0),
            quorum: AtomicBool::new(true),
            votes: Mutex::new(Vec::new()),
            reset_on_quorum: Mutex::new(None),
        })
    }

    pub(crate) fn votes(&self) -> Vec<Vote> {
        self.votes.lock().clone()
    }

    pub(crate) fn proposals(&self) -> usize {
        self.proposals.load(Ordering::SeqCst)
    }

    pub(crate) fn set_quorum(&self, quorum: bool) {
        self.quorum.store(quorum, Ordering::SeqCst);
    }

    /// Reset `data` to `position` from inside the next `has_quorum` call.
    pub(crate) fn reset_during_quorum(&self, data: &Arc<AgreementData>, position: Position) {
        *self.reset_on_quorum.lock() = Some((Arc::downgrade(data), position));
    }
}

impl AgreementReceiver for TestReceiver {
    fn propose_block(&self) -> Hash {
        self.proposals.fetch_add(1, Ordering::SeqCst);
        self.proposal
    }

    fn propose_vote(&self, vote: Vote) {
        self.votes.lock().push(vote);
    }

    fn has_quorum(&self, _vote_type: VoteType, _period: u64) -> bool {
        let pending = self.reset_on_quorum.lock().take();
        if let Some((data, position)) = pending {
            if let Some(data) = data.upgrade() {
                data.reset(position, false);
            }
        }
        self.quorum.load(Ordering::SeqCst)
    }
}

pub(crate) struct TestLeader {
    hash: Hash,
}

impl LeaderSelector for TestLeader {
    fn leader_block_hash(&self) -> Hash {
        self.hash
    }
}

/// Agreement data at period 1 wired to `receiver` and a leader reporting
/// `leader_hash`.
pub(crate) fn make_data(
    receiver: Arc<TestReceiver>,
    leader_hash: Hash,
) -> (Arc<AgreementData>, Arc<TestLeader>) {
    let leader = Arc::new(TestLeader { hash: leader_hash });
    let data = Arc::new(AgreementData::new(receiver, leader.clone()));
    data.set_period(1);
    (data, leader)
}
