//! Agreement states and the per-position state machine.

use crate::data::{AgreementData, AgreementSnapshot};
use meridian_types::{Hash, Vote, VoteType};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Errors raised while advancing a state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgreementError {
    /// Not enough `Init` votes to pre-commit yet.
    #[error("no enough vote in prepare state")]
    NoEnoughVoteInPrepareState,

    /// Not enough `PreCom` votes to commit yet.
    #[error("no enough vote in ack state")]
    NoEnoughVoteInAckState,
}

impl AgreementError {
    /// Quorum-not-yet-met errors: re-evaluate the same state later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgreementError::NoEnoughVoteInPrepareState | AgreementError::NoEnoughVoteInAckState
        )
    }
}

/// Phase of one Byzantine Agreement instance.
///
/// The fast path (`Fast` → `FastVote`) lets an uncontested leader settle the
/// position early; `Initial` → `PreCommit` → `Commit` → `Forward` → `PullVote`
/// is the fallback that terminates under the usual lock-value rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgreementState {
    Fast,
    FastVote,
    Initial,
    PreCommit,
    Commit,
    Forward,
    /// Re-entered indefinitely so every node eventually sees every vote.
    PullVote,
    /// Parked after an outcome; only a restart leaves it.
    Sleep,
}

impl AgreementState {
    /// Ticks the driver waits in this state before advancing it.
    ///
    /// `None` means the state is parked and never advanced by ticks.
    pub fn clocks(self) -> Option<u32> {
        match self {
            AgreementState::Fast => Some(0),
            AgreementState::FastVote => Some(3),
            AgreementState::Initial => Some(0),
            AgreementState::PreCommit => Some(2),
            AgreementState::Commit => Some(2),
            AgreementState::Forward => Some(4),
            AgreementState::PullVote => Some(4),
            AgreementState::Sleep => None,
        }
    }

    /// The state that follows this one.
    pub fn successor(self) -> AgreementState {
        match self {
            AgreementState::Fast => AgreementState::FastVote,
            AgreementState::FastVote => AgreementState::Initial,
            AgreementState::Initial => AgreementState::PreCommit,
            AgreementState::PreCommit => AgreementState::Commit,
            AgreementState::Commit => AgreementState::Forward,
            AgreementState::Forward => AgreementState::PullVote,
            AgreementState::PullVote => AgreementState::PullVote,
            AgreementState::Sleep => AgreementState::Sleep,
        }
    }

    pub fn is_parked(self) -> bool {
        self.clocks().is_none()
    }

    pub fn name(self) -> &'static str {
        match self {
            AgreementState::Fast => "fast",
            AgreementState::FastVote => "fast_vote",
            AgreementState::Initial => "initial",
            AgreementState::PreCommit => "pre_commit",
            AgreementState::Commit => "commit",
            AgreementState::Forward => "forward",
            AgreementState::PullVote => "pull_vote",
            AgreementState::Sleep => "sleep",
        }
    }
}

impl fmt::Display for AgreementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives one agreement instance through its states.
///
/// Holds no retry loop: a transient error leaves the machine in the same state
/// and the caller decides when to try again.
pub struct AgreementStateMachine {
    state: AgreementState,
    data: Arc<AgreementData>,
}

impl AgreementStateMachine {
    pub fn new(data: Arc<AgreementData>, initial: AgreementState) -> Self {
        Self {
            state: initial,
            data,
        }
    }

    /// Entry state for a new position.
    pub fn entry_state(fast_path: bool) -> AgreementState {
        if fast_path {
            AgreementState::Fast
        } else {
            AgreementState::Initial
        }
    }

    pub fn state(&self) -> AgreementState {
        self.state
    }

    pub fn clocks(&self) -> Option<u32> {
        self.state.clocks()
    }

    pub fn data(&self) -> &Arc<AgreementData> {
        &self.data
    }

    /// Perform the current state's action and move to its successor.
    pub fn next_state(&mut self) -> Result<AgreementState, AgreementError> {
        let from = self.state;
        match from {
            AgreementState::Fast => self.fast(),
            AgreementState::Initial => self.initial(),
            AgreementState::PreCommit => self.pre_commit()?,
            AgreementState::Commit => self.commit()?,
            AgreementState::FastVote
            | AgreementState::Forward
            | AgreementState::PullVote
            | AgreementState::Sleep => {}
        }
        self.state = from.successor();
        if from != self.state {
            debug!(from = %from, to = %self.state, "Agreement state transition");
        }
        Ok(self.state)
    }

    /// Jump to `state`, e.g. when a new position or period starts.
    pub fn restart(&mut self, state: AgreementState) {
        debug!(from = %self.state, to = %state, "Agreement restarted");
        self.state = state;
    }

    /// Park the machine until the next restart.
    pub fn sleep(&mut self) {
        self.state = AgreementState::Sleep;
    }

    fn fast(&self) {
        let snapshot = self.data.snapshot();
        if !snapshot.is_leader {
            return;
        }
        let hash = self.data.receiver().propose_block();
        if !hash.is_null() {
            self.propose_vote(&snapshot, VoteType::Fast, hash);
        }
    }

    fn initial(&self) {
        let snapshot = self.data.snapshot();
        // The leader already proposed in the fast state.
        if snapshot.is_leader {
            return;
        }
        let hash = self.data.receiver().propose_block();
        self.propose_vote(&snapshot, VoteType::Init, hash);
    }

    fn pre_commit(&self) -> Result<(), AgreementError> {
        let snapshot = self.data.snapshot();
        if !self
            .data
            .receiver()
            .has_quorum(VoteType::Init, snapshot.period)
        {
            return Err(AgreementError::NoEnoughVoteInPrepareState);
        }
        let hash = if snapshot.lock_value.is_skip() || snapshot.lock_value.is_null() {
            self.data.leader().leader_block_hash()
        } else {
            snapshot.lock_value
        };
        self.propose_vote(&snapshot, VoteType::PreCom, hash);
        Ok(())
    }

    fn commit(&self) -> Result<(), AgreementError> {
        let snapshot = self.data.snapshot();
        if !self
            .data
            .receiver()
            .has_quorum(VoteType::PreCom, snapshot.period)
        {
            return Err(AgreementError::NoEnoughVoteInAckState);
        }
        self.propose_vote(&snapshot, VoteType::Com, snapshot.lock_value);
        Ok(())
    }

    /// Cast a vote stamped with the same snapshot the hash was chosen from.
    fn propose_vote(&self, snapshot: &AgreementSnapshot, vote_type: VoteType, hash: Hash) {
        let vote = Vote::new(vote_type, hash, snapshot.period).with_position(snapshot.position);
        trace!(%vote_type, ?hash, period = snapshot.period, "Proposing vote");
        self.data.receiver().propose_vote(vote);
    }
}

impl fmt::Debug for AgreementStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgreementStateMachine")
            .field("state", &self.state)
            .field("data", &self.data)
            .finish()
    }
}
