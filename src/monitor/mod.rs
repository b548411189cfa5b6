//! Endpoint monitor: scheduler + worker pool + event channel.
//!
//! # Data Flow
//! ```text
//! add_request / remove_request / request_exists
//!     → Scheduler (live set)
//!
//! start()
//!     → N workers (worker.rs)
//!     → Scheduler::next() → probe → HealthEvent on the bounded channel
//!
//! stop()
//!     → cancel → join every worker → drop last sender → channel closes
//! ```
//!
//! # Lifecycle
//! `Created → Running → Stopping → Stopped`. A second `start()` and a
//! `stop()` outside `Running` are rejected with an error and leave the
//! state untouched. Mutations are accepted in every state except
//! `Stopped`, where they are rejected.
//!
//! The event receiver must keep draining until it yields `None`: a worker
//! blocked on a full channel finishes its emit before it can exit.

pub mod events;
mod worker;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::MonitorConfig;
use crate::health::{HttpProber, Prober};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::scheduler::{OwnerId, Scheduler};

pub use events::{EventReceiver, EventSender, HealthEvent};
use worker::Worker;

/// Misuse of the monitor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("monitor already started")]
    AlreadyStarted,

    #[error("monitor is not running")]
    NotRunning,

    #[error("monitor is stopped")]
    Stopped,
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Created,
    Running,
    Stopping,
    Stopped,
}

enum Phase {
    Created { events: EventSender },
    Running(Pool),
    Stopping,
    Stopped,
}

struct Pool {
    shutdown: Shutdown,
    workers: JoinSet<()>,
    events: EventSender,
}

impl Phase {
    fn state(&self) -> MonitorState {
        match self {
            Phase::Created { .. } => MonitorState::Created,
            Phase::Running(_) => MonitorState::Running,
            Phase::Stopping => MonitorState::Stopping,
            Phase::Stopped => MonitorState::Stopped,
        }
    }
}

/// Top-level monitoring engine.
pub struct Monitor<P = HttpProber> {
    scheduler: Arc<Scheduler>,
    prober: Arc<P>,
    workers: usize,
    probe_interval: Duration,
    phase: Mutex<Phase>,
}

impl<P: Prober> Monitor<P> {
    /// Create a monitor and the receiving end of its event channel.
    ///
    /// A worker count of zero is treated as one.
    pub fn new(config: &MonitorConfig, prober: P) -> (Self, EventReceiver) {
        let workers = config.workers.max(1);
        let (events, rx) = events::channel(config.event_buffer);

        let monitor = Self {
            scheduler: Arc::new(Scheduler::with_capacity(workers)),
            prober: Arc::new(prober),
            workers,
            probe_interval: Duration::from_millis(config.probe_interval_ms),
            phase: Mutex::new(Phase::Created { events }),
        };
        (monitor, rx)
    }

    fn phase(&self) -> std::sync::MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> MonitorState {
        self.phase().state()
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.scheduler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduler.is_empty()
    }

    fn ensure_not_stopped(&self) -> Result<(), MonitorError> {
        match self.state() {
            MonitorState::Stopped => Err(MonitorError::Stopped),
            _ => Ok(()),
        }
    }

    /// Spawn the workers on the current Tokio runtime.
    pub fn start(&self) -> Result<(), MonitorError> {
        let mut phase = self.phase();
        let events = match &*phase {
            Phase::Created { events } => events.clone(),
            Phase::Stopped => return Err(MonitorError::Stopped),
            _ => return Err(MonitorError::AlreadyStarted),
        };

        tracing::info!(
            workers = self.workers,
            endpoints = self.scheduler.len(),
            "Starting monitor workers"
        );

        let shutdown = Shutdown::new();
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let worker = Worker::new(
                id,
                self.scheduler.clone(),
                self.prober.clone(),
                events.clone(),
                self.probe_interval,
            );
            workers.spawn(worker.run(shutdown.subscribe()));
        }

        *phase = Phase::Running(Pool {
            shutdown,
            workers,
            events,
        });
        Ok(())
    }

    /// Cancel the workers and wait for all of them to exit.
    ///
    /// In-flight probes finish (and may still emit) before their worker
    /// exits. The event channel closes once this returns.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut pool = {
            let mut phase = self.phase();
            match std::mem::replace(&mut *phase, Phase::Stopping) {
                Phase::Running(pool) => pool,
                other => {
                    *phase = other;
                    return Err(MonitorError::NotRunning);
                }
            }
        };

        tracing::info!("Stopping monitor");
        pool.shutdown.trigger();

        while let Some(result) = pool.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        // Last sender goes away only after every worker has exited
        drop(pool.events);

        *self.phase() = Phase::Stopped;
        tracing::info!("Monitor stopped");
        Ok(())
    }

    /// Start monitoring `(owner, url)`. Duplicates are a no-op.
    ///
    /// Returns whether a new record was inserted.
    pub fn add_request(&self, owner: OwnerId, url: impl Into<String>) -> Result<bool, MonitorError> {
        self.ensure_not_stopped()?;
        let url = url.into();

        let inserted = self.scheduler.add(owner, url.clone());
        if inserted {
            tracing::debug!(owner = %owner, url = %url, "Endpoint added");
            metrics::set_endpoints(self.scheduler.len());
        }
        Ok(inserted)
    }

    /// Stop monitoring `(owner, url)`. Returns whether it was monitored.
    pub fn remove_request(&self, owner: OwnerId, url: &str) -> Result<bool, MonitorError> {
        self.ensure_not_stopped()?;

        let removed = self.scheduler.remove(owner, url);
        if removed {
            tracing::debug!(owner = %owner, url = %url, "Endpoint removed");
            metrics::set_endpoints(self.scheduler.len());
        }
        Ok(removed)
    }

    pub fn request_exists(&self, owner: OwnerId, url: &str) -> Result<bool, MonitorError> {
        self.ensure_not_stopped()?;
        Ok(self.scheduler.exists(owner, url))
    }

    /// Bulk-load persisted subscriptions. Returns how many were new.
    pub fn seed<I>(&self, subscriptions: I) -> Result<usize, MonitorError>
    where
        I: IntoIterator<Item = (OwnerId, String)>,
    {
        let mut added = 0;
        for (owner, url) in subscriptions {
            if self.add_request(owner, url)? {
                added += 1;
            }
        }
        tracing::info!(added, "Seeded monitor from store");
        Ok(added)
    }
}
