//! Endpoint record abstraction.
//!
//! # Responsibilities
//! - Represent one monitored subscription: `(owner, url)`
//! - Carry the transient health state behind its own lock
//!
//! The health lock is independent from the scheduler's set lock, so a
//! slow probe on one endpoint never blocks adding or removing another.
//!
//! A record removed from the scheduler is marked retired. Workers that
//! still hold it finish their probe but emit nothing, so a re-added
//! `(owner, url)` starts a fresh transition history.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::health::HealthState;

/// Opaque subscriber identity (e.g. a chat account id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl From<i64> for OwnerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<OwnerId> for i64 {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A single endpoint being probed on behalf of one owner.
#[derive(Debug)]
pub struct EndpointRecord {
    owner: OwnerId,
    url: String,
    health: Mutex<HealthState>,
    retired: AtomicBool,
}

impl EndpointRecord {
    /// Create a record in the initial (healthy) state.
    pub fn new(owner: OwnerId, url: impl Into<String>) -> Self {
        Self {
            owner,
            url: url.into(),
            health: Mutex::new(HealthState::new()),
            retired: AtomicBool::new(false),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Exact `(owner, url)` identity check. No URL normalization.
    pub fn matches(&self, owner: OwnerId, url: &str) -> bool {
        self.owner == owner && self.url == url
    }

    /// Whether the record has left the live set.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Acquire exclusive access to the health state.
    ///
    /// Held across probe, classification and emission so transitions for
    /// the same record are never interleaved.
    pub async fn lock_health(&self) -> MutexGuard<'_, HealthState> {
        self.health.lock().await
    }
}
