//! Restartable interval ticker driving agreement.
//!
//! Ticks come from a tokio task that sleeps on an interval and sends a
//! [`Tick`] on the channel. Stopping aborts the task; restarting spawns a
//! fresh one so the phase starts over.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// One pulse of the agreement clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Sequence number since the last (re)start, starting at 0.
    pub seq: u64,
}

/// Emits [`Tick`]s at a fixed interval while running.
///
/// The first tick of a run fires one full interval after `start`. Must be
/// started from within a tokio runtime.
pub struct IntervalTicker {
    interval: Duration,
    tick_tx: mpsc::Sender<Tick>,
    task: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(interval: Duration, tick_tx: mpsc::Sender<Tick>) -> Self {
        Self {
            interval,
            tick_tx,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start ticking. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let tick_tx = self.tick_tx.clone();
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seq = 0u64;
            loop {
                ticks.tick().await;
                trace!(seq, "Tick");
                if tick_tx.send(Tick { seq }).await.is_err() {
                    // Receiver gone.
                    break;
                }
                seq += 1;
            }
        }));
        debug!(interval = ?self.interval, "Ticker started");
    }

    /// Stop ticking. Ticks already sent stay in the channel.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Ticker stopped");
        }
    }

    /// Stop and start again, resetting the phase and sequence.
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticks_arrive_in_sequence() {
        let (tick_tx, mut tick_rx) = mpsc::channel(10);
        let mut ticker = IntervalTicker::new(Duration::from_millis(5), tick_tx);
        ticker.start();
        assert!(ticker.is_running());

        for expected in 0..3 {
            let tick = tokio::time::timeout(Duration::from_millis(200), tick_rx.recv())
                .await
                .expect("timeout")
                .expect("channel closed");
            assert_eq!(tick.seq, expected);
        }
    }

    #[tokio::test]
    async fn test_stop_halts_ticks() {
        let (tick_tx, mut tick_rx) = mpsc::channel(10);
        let mut ticker = IntervalTicker::new(Duration::from_millis(30), tick_tx);
        ticker.start();
        ticker.stop();
        assert!(!ticker.is_running());

        let result = tokio::time::timeout(Duration::from_millis(100), tick_rx.recv()).await;
        assert!(result.is_err(), "Ticker should have been stopped");
    }

    #[tokio::test]
    async fn test_restart_resets_sequence() {
        let (tick_tx, mut tick_rx) = mpsc::channel(10);
        let mut ticker = IntervalTicker::new(Duration::from_millis(5), tick_tx);
        ticker.start();

        let _ = tokio::time::timeout(Duration::from_millis(200), tick_rx.recv())
            .await
            .expect("timeout");
        ticker.restart();
        // Drop anything sent before the restart took effect.
        while tick_rx.try_recv().is_ok() {}

        let tick = tokio::time::timeout(Duration::from_millis(200), tick_rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(tick.seq, 0);
    }

    #[tokio::test]
    async fn test_start_twice_keeps_one_task() {
        let (tick_tx, mut tick_rx) = mpsc::channel(100);
        let mut ticker = IntervalTicker::new(Duration::from_millis(20), tick_tx);
        ticker.start();
        ticker.start();

        tokio::time::sleep(Duration::from_millis(110)).await;
        ticker.stop();
        let mut seqs = Vec::new();
        while let Ok(tick) = tick_rx.try_recv() {
            seqs.push(tick.seq);
        }
        assert!(!seqs.is_empty());
        assert!(
            seqs.windows(2).all(|w| w[1] == w[0] + 1),
            "a second task would repeat sequence numbers: {seqs:?}"
        );
    }

    #[tokio::test]
    async fn test_drop_stops_ticker() {
        let (tick_tx, mut tick_rx) = mpsc::channel(10);
        {
            let mut ticker = IntervalTicker::new(Duration::from_millis(30), tick_tx);
            ticker.start();
        }
        let result = tokio::time::timeout(Duration::from_millis(100), tick_rx.recv()).await;
        // Either nothing arrives or the channel is closed because the only
        // sender was dropped with the task.
        assert!(matches!(result, Err(_) | Ok(None)));
    }
}
