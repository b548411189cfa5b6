//! Delivery of health events to subscribers.
//!
//! # Data Flow
//! ```text
//! Event channel (single consumer)
//!     → run_delivery()
//!     → Delivery::deliver() (log, webhook)
//!     → subscriber
//! ```
//!
//! # Design Decisions
//! - Failed deliveries are logged and counted, never retried
//! - The loop ends when the monitor closes the channel, so every event
//!   sent before `Monitor::stop()` returned is still handed over

pub mod webhook;

use std::future::Future;

use thiserror::Error;

use crate::monitor::{EventReceiver, HealthEvent};
use crate::observability::metrics;

pub use webhook::WebhookDelivery;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery endpoint answered {0}")]
    Status(u16),
}

/// Something that forwards health events to their owners.
pub trait Delivery: Send + Sync + 'static {
    fn deliver(&self, event: &HealthEvent) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Human-readable text for a health event.
pub fn format_message(event: &HealthEvent) -> String {
    match &event.error {
        Some(error) => format!("received error: {}\nfor endpoint: {}", error, event.url),
        None => format!("endpoint recovered: {}", event.url),
    }
}

/// Writes events to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

impl Delivery for LogDelivery {
    async fn deliver(&self, event: &HealthEvent) -> Result<(), DeliveryError> {
        let message = format_message(event);
        if event.is_recovery() {
            tracing::info!(owner = %event.owner, url = %event.url, message = %message, "Health event");
        } else {
            tracing::warn!(owner = %event.owner, url = %event.url, message = %message, "Health event");
        }
        Ok(())
    }
}

/// Drain the event channel until the monitor closes it.
///
/// Returns the number of events handed to `delivery`.
pub async fn run_delivery<D: Delivery>(mut events: EventReceiver, delivery: D) -> usize {
    let mut delivered = 0;

    while let Some(event) = events.recv().await {
        match delivery.deliver(&event).await {
            Ok(()) => {
                metrics::record_delivery(true);
                delivered += 1;
            }
            Err(e) => {
                metrics::record_delivery(false);
                tracing::error!(
                    owner = %event.owner,
                    url = %event.url,
                    error = %e,
                    "Could not deliver health event"
                );
            }
        }
    }

    tracing::info!(delivered, "Event channel closed, delivery finished");
    delivered
}
