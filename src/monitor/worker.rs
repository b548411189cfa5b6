//! Probe worker loop.
//!
//! # Responsibilities
//! - Pull one record at a time from the scheduler
//! - Probe it under the record's health lock
//! - Emit an event when the health state changes
//!
//! # Design Decisions
//! - Cancellation is checked at the top of each iteration and while
//!   idle, never while a probe is in flight
//! - Emission happens before the health lock is released, which keeps
//!   events for one record in transition order

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::health::{Prober, Transition};
use crate::lifecycle::ShutdownSignal;
use crate::monitor::events::{EventSender, HealthEvent};
use crate::observability::metrics;
use crate::scheduler::{EndpointRecord, Scheduler};

pub(crate) struct Worker<P> {
    id: usize,
    scheduler: Arc<Scheduler>,
    prober: Arc<P>,
    events: EventSender,
    probe_interval: Duration,
}

impl<P: Prober> Worker<P> {
    pub(crate) fn new(
        id: usize,
        scheduler: Arc<Scheduler>,
        prober: Arc<P>,
        events: EventSender,
        probe_interval: Duration,
    ) -> Self {
        Self {
            id,
            scheduler,
            prober,
            events,
            probe_interval,
        }
    }

    pub(crate) async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(worker_id = self.id, "Worker starting");

        loop {
            if shutdown.is_triggered() {
                break;
            }

            let record = tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                record = self.scheduler.next() => record,
            };

            self.check(&record).await;
            drop(record);

            if self.probe_interval.is_zero() {
                // A probe that completes without suspending must not starve the runtime
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;
                    _ = shutdown.triggered() => break,
                    _ = time::sleep(self.probe_interval) => {}
                }
            }
        }

        tracing::info!(worker_id = self.id, "Stopping worker");
    }

    /// Probe one record and emit on transition.
    ///
    /// Retired records are skipped, and a record retired mid-probe emits
    /// nothing.
    pub(crate) async fn check(&self, record: &EndpointRecord) {
        let mut health = record.lock_health().await;
        if record.is_retired() {
            return;
        }

        tracing::debug!(worker_id = self.id, url = %record.url(), "Requesting");
        let outcome = self.prober.probe(record.url()).await;
        metrics::record_probe(outcome.is_ok());

        // Removed while in flight; a re-added record owns the history now
        if record.is_retired() {
            tracing::debug!(worker_id = self.id, url = %record.url(), "Endpoint removed during probe");
            return;
        }

        let Some(transition) = health.observe(outcome) else {
            return;
        };
        metrics::record_transition(&transition);

        match &transition {
            Transition::Failed(error) => tracing::warn!(
                worker_id = self.id,
                owner = %record.owner(),
                url = %record.url(),
                error = %error,
                "Endpoint became unhealthy"
            ),
            Transition::Recovered => tracing::info!(
                worker_id = self.id,
                owner = %record.owner(),
                url = %record.url(),
                "Endpoint recovered"
            ),
        }

        let event = HealthEvent::from_transition(record, transition);
        if self.events.send(event).await.is_err() {
            tracing::warn!(
                worker_id = self.id,
                url = %record.url(),
                "Event receiver dropped, health event discarded"
            );
        }
    }
}
