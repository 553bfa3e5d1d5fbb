//! Tick-paced driver for an agreement state machine.

use crate::data::AgreementData;
use crate::state::{AgreementError, AgreementState, AgreementStateMachine};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct AgreementConfig {
    /// Start each position in the fast state instead of `Initial`.
    pub fast_path: bool,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self { fast_path: true }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// States entered during this tick, in order.
    pub entered: Vec<AgreementState>,
    /// A quorum precondition was not met; the state is retried next tick.
    pub retry: Option<AgreementError>,
}

/// Advances an [`AgreementStateMachine`] on external ticks.
///
/// A state is advanced once at least `clocks()` ticks have elapsed since it was
/// entered. Zero-clock states advance in the same tick that entered them.
/// Restart and sleep take effect between transitions, never inside one.
#[derive(Debug)]
pub struct AgreementDriver {
    machine: AgreementStateMachine,
    config: AgreementConfig,
    ticks: u32,
    transient_retries: u64,
}

impl AgreementDriver {
    pub fn new(data: Arc<AgreementData>) -> Self {
        Self::with_config(data, AgreementConfig::default())
    }

    pub fn with_config(data: Arc<AgreementData>, config: AgreementConfig) -> Self {
        let entry = AgreementStateMachine::entry_state(config.fast_path);
        Self {
            machine: AgreementStateMachine::new(data, entry),
            config,
            ticks: 0,
            transient_retries: 0,
        }
    }

    pub fn state(&self) -> AgreementState {
        self.machine.state()
    }

    pub fn data(&self) -> &Arc<AgreementData> {
        self.machine.data()
    }

    /// Ticks spent in the current state.
    pub fn ticks_in_state(&self) -> u32 {
        self.ticks
    }

    pub fn transient_retries(&self) -> u64 {
        self.transient_retries
    }

    /// Process one tick.
    pub fn on_tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.machine.state().is_parked() {
            return outcome;
        }
        self.ticks = self.ticks.saturating_add(1);

        while let Some(clocks) = self.machine.clocks() {
            if self.ticks < clocks {
                break;
            }
            match self.machine.next_state() {
                Ok(state) => {
                    self.ticks = 0;
                    outcome.entered.push(state);
                }
                Err(e) => {
                    if e.is_transient() {
                        self.transient_retries += 1;
                        trace!(state = %self.machine.state(), error = %e, "Quorum not met, retrying next tick");
                    } else {
                        warn!(state = %self.machine.state(), error = %e, "Agreement state failed");
                    }
                    outcome.retry = Some(e);
                    break;
                }
            }
        }
        outcome
    }

    /// Start over at the entry state, e.g. for a new position or period.
    pub fn restart(&mut self) {
        let entry = AgreementStateMachine::entry_state(self.config.fast_path);
        self.restart_at(entry);
    }

    pub fn restart_at(&mut self, state: AgreementState) {
        self.machine.restart(state);
        self.ticks = 0;
    }

    /// Park until the next restart.
    pub fn sleep(&mut self) {
        debug!(from = %self.machine.state(), "Agreement parked");
        self.machine.sleep();
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_data, TestReceiver};
    use meridian_types::test_utils::test_hash;
    use meridian_types::{Hash, VoteType};
    use tracing_test::traced_test;

    fn visited(driver: &mut AgreementDriver, ticks: usize) -> Vec<AgreementState> {
        let mut states = vec![driver.state()];
        for _ in 0..ticks {
            states.extend(driver.on_tick().entered);
        }
        states
    }

    #[traced_test]
    #[test]
    fn test_leader_fast_path_sequence() {
        use AgreementState::*;
        let receiver = TestReceiver::proposing(test_hash("H"));
        let (data, _) = make_data(receiver.clone(), test_hash("H"));
        data.set_leader(true);
        let mut driver = AgreementDriver::new(data);

        let states = visited(&mut driver, 30);
        assert_eq!(
            &states[..8],
            &[Fast, FastVote, Initial, PreCommit, Commit, Forward, PullVote, PullVote]
        );
        assert!(states[6..].iter().all(|s| *s == PullVote));

        let fast_votes: Vec<_> = receiver
            .votes()
            .into_iter()
            .filter(|v| v.vote_type() == VoteType::Fast)
            .collect();
        assert_eq!(fast_votes.len(), 1);
        assert_eq!(fast_votes[0].block_hash(), test_hash("H"));
    }

    #[test]
    fn test_tick_pacing() {
        use AgreementState::*;
        let receiver = TestReceiver::proposing(test_hash("H"));
        let (data, _) = make_data(receiver, test_hash("H"));
        let mut driver = AgreementDriver::new(data);

        // Fast has no clocks: the first tick enters FastVote.
        assert_eq!(driver.on_tick().entered, vec![FastVote]);
        // FastVote waits three ticks, then Initial runs in the same tick.
        assert!(driver.on_tick().entered.is_empty());
        assert!(driver.on_tick().entered.is_empty());
        assert_eq!(driver.on_tick().entered, vec![Initial, PreCommit]);
        assert!(driver.on_tick().entered.is_empty());
        assert_eq!(driver.on_tick().entered, vec![Commit]);
    }

    #[test]
    fn test_follower_null_proposal() {
        let receiver = TestReceiver::proposing(Hash::NULL);
        let (data, _) = make_data(receiver.clone(), Hash::NULL);
        let mut driver = AgreementDriver::new(data);

        visited(&mut driver, 20);

        let votes = receiver.votes();
        assert!(votes.iter().all(|v| v.vote_type() != VoteType::Fast));
        let init: Vec<_> = votes
            .iter()
            .filter(|v| v.vote_type() == VoteType::Init)
            .collect();
        assert_eq!(init.len(), 1);
        assert!(init[0].block_hash().is_null());
    }

    #[test]
    fn test_transient_errors_retry_same_state() {
        let receiver = TestReceiver::proposing(test_hash("H"));
        let (data, _) = make_data(receiver.clone(), test_hash("H"));
        let mut driver = AgreementDriver::with_config(data, AgreementConfig { fast_path: false });

        receiver.set_quorum(false);
        // Initial runs, then PreCommit waits two ticks and keeps failing.
        assert_eq!(driver.on_tick().entered, vec![AgreementState::PreCommit]);
        driver.on_tick();
        let outcome = driver.on_tick();
        assert_eq!(outcome.retry, Some(AgreementError::NoEnoughVoteInPrepareState));
        assert_eq!(driver.state(), AgreementState::PreCommit);
        let outcome = driver.on_tick();
        assert!(outcome.retry.is_some());
        assert_eq!(driver.transient_retries(), 2);

        receiver.set_quorum(true);
        assert_eq!(driver.on_tick().entered, vec![AgreementState::Commit]);
    }

    #[test]
    fn test_sleep_parks_until_restart() {
        let receiver = TestReceiver::proposing(test_hash("H"));
        let (data, _) = make_data(receiver.clone(), test_hash("H"));
        let mut driver = AgreementDriver::new(data);

        driver.sleep();
        for _ in 0..100 {
            assert_eq!(driver.on_tick(), TickOutcome::default());
        }
        assert_eq!(receiver.proposals(), 0);

        driver.restart();
        assert_eq!(driver.state(), AgreementState::Fast);
        assert_eq!(driver.on_tick().entered, vec![AgreementState::FastVote]);
    }
}
