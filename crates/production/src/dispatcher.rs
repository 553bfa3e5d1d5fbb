//! Non-blocking delivery of application callbacks.
//!
//! The agreement side submits [`DispatchEvent`]s and returns immediately. A
//! single named worker thread pops them in submission order and invokes the
//! matching [`Application`] or [`DebugHooks`] callback.

use crate::config::DispatcherConfig;
use crate::metrics;
use meridian_core::{Application, DebugHooks, DispatchEvent};
use meridian_types::{Block, BlockVerifyStatus, Position, Witness};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("Dispatcher is shut down")]
    ShutDown,

    #[error("Failed to spawn dispatcher worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Default)]
struct Queue {
    events: VecDeque<DispatchEvent>,
    /// Events popped by the worker whose callback has not returned yet.
    in_flight: usize,
    shutdown: bool,
}

impl Queue {
    fn is_drained(&self) -> bool {
        self.events.is_empty() && self.in_flight == 0
    }
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    /// Signalled when an event is queued or shutdown begins.
    work: Condvar,
    /// Signalled when the queue drains.
    idle: Condvar,
}

struct Handlers {
    app: Arc<dyn Application>,
    debug: Option<Arc<dyn DebugHooks>>,
}

impl Handlers {
    fn deliver(&self, event: DispatchEvent) {
        let kind = event.kind();
        match event {
            DispatchEvent::BlockConfirmed(block) => {
                trace!(hash = %block.hash, position = ?block.position, "Delivering block confirmed");
                self.app.block_confirmed(block);
            }
            DispatchEvent::BlockDelivered {
                hash,
                position,
                randomness,
            } => {
                trace!(%hash, ?position, "Delivering block delivered");
                self.app.block_delivered(hash, position, randomness);
            }
            DispatchEvent::BlockReceived(hash) => match &self.debug {
                Some(hooks) => hooks.block_received(hash),
                None => {
                    drop_unhandled(kind);
                    return;
                }
            },
            DispatchEvent::BlockReady(hash) => match &self.debug {
                Some(hooks) => hooks.block_ready(hash),
                None => {
                    drop_unhandled(kind);
                    return;
                }
            },
        }
        metrics::record_dispatched_event(kind);
    }
}

fn drop_unhandled(kind: &'static str) {
    warn!(kind, "No handler for dispatch event, dropping");
    metrics::record_dropped_event();
}

/// Queues application callbacks for a dedicated worker thread.
///
/// `block_confirmed` and `block_delivered` (plus the debug hooks when
/// installed) always run on the worker, in exactly the order they were
/// submitted. A callback that panics drops its event and delivery continues
/// with the next one. `prepare_payload`, `prepare_witness` and `verify_block` are
/// forwarded synchronously because callers need their results.
///
/// Dropping the dispatcher drains the queue and joins the worker.
pub struct Dispatcher {
    app: Arc<dyn Application>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(app: Arc<dyn Application>, config: &DispatcherConfig) -> Result<Self, DispatcherError> {
        Self::spawn(app, None, config)
    }

    /// Like [`new`](Self::new), also routing debug events to `hooks`.
    pub fn with_debug_hooks(
        app: Arc<dyn Application>,
        hooks: Arc<dyn DebugHooks>,
        config: &DispatcherConfig,
    ) -> Result<Self, DispatcherError> {
        Self::spawn(app, Some(hooks), config)
    }

    fn spawn(
        app: Arc<dyn Application>,
        debug: Option<Arc<dyn DebugHooks>>,
        config: &DispatcherConfig,
    ) -> Result<Self, DispatcherError> {
        let shared = Arc::new(Shared::default());
        let handlers = Handlers {
            app: app.clone(),
            debug,
        };
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_loop(&worker_shared, &handlers))?;

        debug!(thread = %config.thread_name, "Dispatcher started");
        Ok(Self {
            app,
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue an event for delivery. Never blocks on the application.
    pub fn submit(&self, event: DispatchEvent) -> Result<(), DispatcherError> {
        let mut queue = self.shared.queue.lock();
        if queue.shutdown {
            return Err(DispatcherError::ShutDown);
        }
        trace!(kind = event.kind(), depth = queue.events.len() + 1, "Event queued");
        queue.events.push_back(event);
        metrics::set_dispatcher_queue_depth(queue.events.len());
        drop(queue);
        self.shared.work.notify_one();
        Ok(())
    }

    /// Block until every queued and in-flight event has been delivered.
    ///
    /// There is no timeout; wrap the call if shutdown must be bounded.
    pub fn wait(&self) {
        let mut queue = self.shared.queue.lock();
        while !queue.is_drained() {
            self.shared.idle.wait(&mut queue);
        }
    }

    /// Events waiting for the worker, excluding the one in flight.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().events.len()
    }

    /// Reject further submissions, deliver what is queued, and join the worker.
    ///
    /// Idempotent. Must not be called from inside an application callback.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
        }
        self.shared.work.notify_all();

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("Dispatcher worker panicked");
            } else {
                debug!("Dispatcher stopped");
            }
        }
    }

    pub fn prepare_payload(&self, position: Position) -> Vec<u8> {
        self.app.prepare_payload(position)
    }

    pub fn prepare_witness(&self, height: u64) -> Witness {
        self.app.prepare_witness(height)
    }

    pub fn verify_block(&self, block: &Block) -> BlockVerifyStatus {
        self.app.verify_block(block)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared, handlers: &Handlers) {
    loop {
        let event = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(event) = queue.events.pop_front() {
                    queue.in_flight += 1;
                    metrics::set_dispatcher_queue_depth(queue.events.len());
                    break event;
                }
                if queue.shutdown {
                    return;
                }
                shared.work.wait(&mut queue);
            }
        };

        let kind = event.kind();
        // A panicking callback loses only its own event; the worker keeps going.
        if panic::catch_unwind(AssertUnwindSafe(|| handlers.deliver(event))).is_err() {
            error!(kind, "Application callback panicked, event dropped");
            metrics::record_dropped_event();
        }

        let mut queue = shared.queue.lock();
        queue.in_flight -= 1;
        if queue.is_drained() {
            shared.idle.notify_all();
        }
    }
}
