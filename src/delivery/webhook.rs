//! Webhook delivery: POST each event as JSON.

use std::time::Duration;

use serde::Serialize;

use crate::delivery::{format_message, Delivery, DeliveryError};
use crate::monitor::HealthEvent;
use crate::scheduler::OwnerId;

/// JSON body posted for each event.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub owner: OwnerId,
    pub url: &'a str,
    pub healthy: bool,
    pub error: Option<String>,
    pub message: String,
}

impl<'a> From<&'a HealthEvent> for WebhookPayload<'a> {
    fn from(event: &'a HealthEvent) -> Self {
        Self {
            owner: event.owner,
            url: &event.url,
            healthy: event.is_recovery(),
            error: event.error.as_ref().map(|e| e.to_string()),
            message: format_message(event),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookDelivery {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Delivery for WebhookDelivery {
    async fn deliver(&self, event: &HealthEvent) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&WebhookPayload::from(event))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        tracing::debug!(owner = %event.owner, url = %event.url, "Webhook delivered");
        Ok(())
    }
}
