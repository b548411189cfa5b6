//! Endpoint health state machine.
//!
//! # States
//! - Healthy: no error recorded (also the initial state)
//! - Unhealthy: the last transition was caused by a failed probe
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: first failed probe, error is stored
//! Unhealthy → Healthy: first successful probe, error is cleared
//! ```
//!
//! Repeated failures keep the first error; the stored error is what the
//! subscriber was told about.

use crate::health::probe::ProbeError;

/// A health change worth telling a subscriber about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Endpoint went from healthy to unhealthy.
    Failed(ProbeError),
    /// Endpoint answered again after being unhealthy.
    Recovered,
}

/// Transient health of one monitored endpoint.
#[derive(Debug, Default)]
pub struct HealthState {
    last_error: Option<ProbeError>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    /// The failure that made the endpoint unhealthy, if any.
    pub fn last_error(&self) -> Option<&ProbeError> {
        self.last_error.as_ref()
    }

    /// Feed one probe outcome into the state machine.
    ///
    /// Returns `Some` only when the outcome changes the state.
    pub fn observe(&mut self, outcome: Result<(), ProbeError>) -> Option<Transition> {
        match outcome {
            Err(error) if self.last_error.is_none() => {
                self.last_error = Some(error.clone());
                Some(Transition::Failed(error))
            }
            Err(_) => None,
            Ok(()) if self.last_error.is_some() => {
                self.last_error = None;
                Some(Transition::Recovered)
            }
            Ok(()) => None,
        }
    }
}
