//! Production metrics using native Prometheus client.
//!
//! Metrics are domain-specific rather than generic event counters.
//! Use traces for event-level granularity during investigations.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};
use std::sync::OnceLock;

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Domain-specific metrics for production monitoring.
pub struct Metrics {
    // === Agreement ===
    pub agreement_transitions: CounterVec,
    pub agreement_transient_retries: Counter,

    // === Dispatcher ===
    pub dispatcher_queue_depth: Gauge,
    pub dispatcher_events: CounterVec,
    pub dispatcher_events_dropped: Counter,

    // === Committee ===
    pub committee_rounds_cached: Gauge,
}

impl Metrics {
    fn new() -> Self {
        Self {
            agreement_transitions: register_counter_vec!(
                "meridian_agreement_transitions_total",
                "Agreement states entered",
                &["state"]
            )
            .unwrap(),

            agreement_transient_retries: register_counter!(
                "meridian_agreement_transient_retries_total",
                "State advances deferred because a quorum was not yet met"
            )
            .unwrap(),

            dispatcher_queue_depth: register_gauge!(
                "meridian_dispatcher_queue_depth",
                "Events waiting for the dispatcher worker"
            )
            .unwrap(),

            dispatcher_events: register_counter_vec!(
                "meridian_dispatcher_events_total",
                "Events delivered to the application",
                &["kind"]
            )
            .unwrap(),

            dispatcher_events_dropped: register_counter!(
                "meridian_dispatcher_events_dropped_total",
                "Events dropped because no handler was installed"
            )
            .unwrap(),

            committee_rounds_cached: register_gauge!(
                "meridian_committee_rounds_cached",
                "Rounds currently held by the committee cache"
            )
            .unwrap(),
        }
    }
}

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Record an agreement state being entered.
///
/// Use [`AgreementState::name`](meridian_agreement::AgreementState::name) as
/// the label so cardinality stays fixed.
pub fn record_agreement_transition(state: &str) {
    metrics()
        .agreement_transitions
        .with_label_values(&[state])
        .inc();
}

/// Record a state advance deferred by a missing quorum.
pub fn record_transient_retry() {
    metrics().agreement_transient_retries.inc();
}

/// Update the dispatcher queue depth.
pub fn set_dispatcher_queue_depth(depth: usize) {
    metrics().dispatcher_queue_depth.set(depth as f64);
}

/// Record an event delivered by the dispatcher.
pub fn record_dispatched_event(kind: &str) {
    metrics().dispatcher_events.with_label_values(&[kind]).inc();
}

/// Record an event the dispatcher had no handler for.
pub fn record_dropped_event() {
    metrics().dispatcher_events_dropped.inc();
}

/// Update the number of rounds in the committee cache.
pub fn set_committee_rounds_cached(rounds: usize) {
    metrics().committee_rounds_cached.set(rounds as f64);
}

/// Encode every registered metric in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
