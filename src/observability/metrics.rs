//! Metrics collection and exposition.
//!
//! # Metrics
//! - `monitor_probes_total` (counter): probes by outcome (ok, failed)
//! - `monitor_transitions_total` (counter): health transitions by kind
//! - `monitor_endpoints` (gauge): live subscriptions
//! - `monitor_deliveries_total` (counter): delivery attempts by result
//!
//! Recording is a no-op until a recorder is installed, so library users
//! and tests pay nothing.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::Transition;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_probe(ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    metrics::counter!("monitor_probes_total", "outcome" => outcome).increment(1);
}

pub fn record_transition(transition: &Transition) {
    let kind = match transition {
        Transition::Failed(_) => "failed",
        Transition::Recovered => "recovered",
    };
    metrics::counter!("monitor_transitions_total", "kind" => kind).increment(1);
}

pub fn set_endpoints(count: usize) {
    metrics::gauge!("monitor_endpoints").set(count as f64);
}

pub fn record_delivery(ok: bool) {
    let result = if ok { "delivered" } else { "failed" };
    metrics::counter!("monitor_deliveries_total", "result" => result).increment(1);
}
