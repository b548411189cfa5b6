//! Health events sent from workers to the delivery side.

use tokio::sync::mpsc;

use crate::health::{ProbeError, Transition};
use crate::scheduler::{EndpointRecord, OwnerId};

pub type EventSender = mpsc::Sender<HealthEvent>;
pub type EventReceiver = mpsc::Receiver<HealthEvent>;

/// A health transition of one `(owner, url)` subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEvent {
    pub owner: OwnerId,
    pub url: String,
    /// `None` means the endpoint recovered.
    pub error: Option<ProbeError>,
}

impl HealthEvent {
    pub fn failed(owner: OwnerId, url: impl Into<String>, error: ProbeError) -> Self {
        Self {
            owner,
            url: url.into(),
            error: Some(error),
        }
    }

    pub fn recovered(owner: OwnerId, url: impl Into<String>) -> Self {
        Self {
            owner,
            url: url.into(),
            error: None,
        }
    }

    /// Snapshot the record identity together with the transition.
    pub fn from_transition(record: &EndpointRecord, transition: Transition) -> Self {
        match transition {
            Transition::Failed(error) => Self::failed(record.owner(), record.url(), error),
            Transition::Recovered => Self::recovered(record.owner(), record.url()),
        }
    }

    pub fn is_recovery(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded multi-producer channel; capacity 0 is bumped to 1.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}
