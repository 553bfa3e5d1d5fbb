//! Production runtime for the meridian agreement core.
//!
//! This crate wires the pure agreement components to real threads, timers and
//! storage:
//!
//! - [`Dispatcher`]: delivers application callbacks on a dedicated worker
//!   thread, strictly in submission order
//! - [`IntervalTicker`]: restartable tokio interval that paces agreement
//! - [`AgreementRunner`]: async task owning one agreement driver, controlled
//!   through a [`RunnerHandle`]
//! - [`MemoryDatabase`]: in-memory [`Database`](meridian_core::Database) with
//!   optional JSON persistence
//! - [`NodeConfig`], [`init_logging`] and [`metrics`]
//!
//! # Architecture
//!
//! ```text
//! IntervalTicker ──Tick──▶ AgreementRunner ◀──RunnerCommand── RunnerHandle
//!                                │
//!                                ▼
//!                         AgreementDriver ──votes──▶ AgreementReceiver
//!
//! confirmations ──submit──▶ Dispatcher ──worker thread──▶ Application
//! ```

pub mod config;
mod dispatcher;
pub mod metrics;
mod runner;
mod storage;
pub mod telemetry;
mod ticker;

pub use config::{ConfigError, DispatcherConfig, LoggingConfig, NodeConfig};
pub use dispatcher::{Dispatcher, DispatcherError};
pub use runner::{AgreementRunner, RunnerCommand, RunnerError, RunnerHandle};
pub use storage::MemoryDatabase;
pub use telemetry::{init_logging, TelemetryError};
pub use ticker::{IntervalTicker, Tick};
