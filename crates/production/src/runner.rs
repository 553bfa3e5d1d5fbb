//! Async runner owning one agreement instance.
//!
//! The runner is the only owner of its [`AgreementDriver`]. Ticks from an
//! [`IntervalTicker`] and control commands from a [`RunnerHandle`] arrive on
//! separate channels and are handled one at a time, so a restart or sleep
//! always lands between two state transitions.

use crate::metrics;
use crate::ticker::{IntervalTicker, Tick};
use meridian_agreement::{AgreementDriver, AgreementState};
use meridian_committee::NodeSetCache;
use meridian_types::Position;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, span, warn, Level};

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const TICK_CHANNEL_CAPACITY: usize = 16;

/// Errors from the agreement runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Runner stopped")]
    ChannelClosed,
}

/// Control messages for a running agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerCommand {
    /// Reset the agreement data to `position` and restart at the entry state.
    NewPosition { position: Position, is_leader: bool },
    /// Restart at the given state, keeping the agreement data.
    Restart(AgreementState),
    /// Park until the next restart.
    Sleep,
    Shutdown,
}

/// Cloneable handle for controlling and observing an [`AgreementRunner`].
///
/// When every handle is dropped the runner shuts down.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    command_tx: mpsc::Sender<RunnerCommand>,
    state_rx: watch::Receiver<AgreementState>,
}

impl RunnerHandle {
    pub async fn send(&self, command: RunnerCommand) -> Result<(), RunnerError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }

    pub async fn new_position(&self, position: Position, is_leader: bool) -> Result<(), RunnerError> {
        self.send(RunnerCommand::NewPosition {
            position,
            is_leader,
        })
        .await
    }

    pub async fn restart(&self, state: AgreementState) -> Result<(), RunnerError> {
        self.send(RunnerCommand::Restart(state)).await
    }

    pub async fn sleep(&self) -> Result<(), RunnerError> {
        self.send(RunnerCommand::Sleep).await
    }

    pub async fn shutdown(&self) -> Result<(), RunnerError> {
        self.send(RunnerCommand::Shutdown).await
    }

    /// Most recently published agreement state.
    pub fn state(&self) -> AgreementState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<AgreementState> {
        self.state_rx.clone()
    }
}

/// Drives an [`AgreementDriver`] from a restartable interval ticker.
pub struct AgreementRunner {
    driver: AgreementDriver,
    ticker: IntervalTicker,
    tick_rx: mpsc::Receiver<Tick>,
    command_rx: mpsc::Receiver<RunnerCommand>,
    state_tx: watch::Sender<AgreementState>,
    committee: Option<Arc<NodeSetCache>>,
}

impl AgreementRunner {
    pub fn new(driver: AgreementDriver, tick_interval: Duration) -> (Self, RunnerHandle) {
        let (tick_tx, tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(driver.state());

        let runner = Self {
            driver,
            ticker: IntervalTicker::new(tick_interval, tick_tx),
            tick_rx,
            command_rx,
            state_tx,
            committee: None,
        };
        let handle = RunnerHandle {
            command_tx,
            state_rx,
        };
        (runner, handle)
    }

    /// Pre-warm `cache` for the round of every new position.
    pub fn with_committee(mut self, cache: Arc<NodeSetCache>) -> Self {
        self.committee = Some(cache);
        self
    }

    /// Run until shutdown, returning the driver for inspection.
    pub async fn run(mut self) -> AgreementDriver {
        info!(
            state = %self.driver.state(),
            interval = ?self.ticker.interval(),
            "Starting agreement runner"
        );
        if !self.driver.state().is_parked() {
            self.ticker.start();
        }

        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(RunnerCommand::Shutdown) | None => {
                        info!("Shutdown signal received");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },

                Some(tick) = self.tick_rx.recv() => self.handle_tick(tick),
            }
        }

        self.ticker.stop();
        self.driver
    }

    fn handle_tick(&mut self, tick: Tick) {
        let tick_span = span!(
            Level::DEBUG,
            "agreement_tick",
            seq = tick.seq,
            state = %self.driver.state(),
        );
        let _guard = tick_span.enter();

        let outcome = self.driver.on_tick();
        for state in &outcome.entered {
            metrics::record_agreement_transition(state.name());
        }
        if outcome.retry.as_ref().is_some_and(|e| e.is_transient()) {
            metrics::record_transient_retry();
        }
        if !outcome.entered.is_empty() {
            self.publish_state();
        }
    }

    fn handle_command(&mut self, command: RunnerCommand) {
        debug!(?command, state = %self.driver.state(), "Runner command");
        match command {
            RunnerCommand::NewPosition {
                position,
                is_leader,
            } => {
                self.driver.data().reset(position, is_leader);
                self.touch_committee(position.round);
                self.driver.restart();
                self.restart_ticker();
            }
            RunnerCommand::Restart(state) => {
                self.driver.restart_at(state);
                self.restart_ticker();
            }
            RunnerCommand::Sleep => {
                self.driver.sleep();
                self.ticker.stop();
            }
            RunnerCommand::Shutdown => {}
        }
        metrics::record_agreement_transition(self.driver.state().name());
        self.publish_state();
    }

    fn restart_ticker(&mut self) {
        self.ticker.restart();
        // Ticks from the previous run would count against the new state.
        while self.tick_rx.try_recv().is_ok() {}
    }

    fn touch_committee(&self, round: u64) {
        let Some(cache) = &self.committee else {
            return;
        };
        match cache.touch(round) {
            Ok(()) => metrics::set_committee_rounds_cached(cache.cached_rounds().len()),
            Err(e) => warn!(round, error = %e, "Committee not ready for new position"),
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.driver.state());
    }
}
