//! Round-robin work source.
//!
//! Holds the live set of endpoint records and hands them out one at a
//! time in rotation. Removal swaps the last record into the freed slot,
//! so rotation order is not stable across removals; only starvation
//! freedom is kept.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Notify;

use crate::scheduler::record::{EndpointRecord, OwnerId};

#[derive(Debug, Default)]
struct Rotation {
    records: Vec<Arc<EndpointRecord>>,
    cursor: usize,
}

impl Rotation {
    fn index_of(&self, owner: OwnerId, url: &str) -> Option<usize> {
        self.records.iter().position(|r| r.matches(owner, url))
    }
}

/// Round-robin scheduler over the monitored endpoints.
///
/// All mutations and the cursor share one exclusive lock; membership
/// checks take the read side. `next()` suspends on a `Notify` while the
/// set is empty.
#[derive(Debug, Default)]
pub struct Scheduler {
    rotation: RwLock<Rotation>,
    available: Notify,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rotation: RwLock::new(Rotation {
                records: Vec::with_capacity(capacity),
                cursor: 0,
            }),
            available: Notify::new(),
        }
    }

    // The critical sections never panic, so a poisoned lock still guards
    // a consistent rotation.
    fn read(&self) -> RwLockReadGuard<'_, Rotation> {
        self.rotation.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rotation> {
        self.rotation.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record unless `(owner, url)` is already live.
    ///
    /// Returns `true` if a record was inserted.
    pub fn add(&self, owner: OwnerId, url: impl Into<String>) -> bool {
        let url = url.into();
        let inserted = {
            let mut rotation = self.write();
            if rotation.index_of(owner, &url).is_some() {
                false
            } else {
                rotation.records.push(Arc::new(EndpointRecord::new(owner, url)));
                true
            }
        };

        if inserted {
            self.available.notify_waiters();
        }
        inserted
    }

    /// Remove the matching record. Returns whether a removal occurred.
    pub fn remove(&self, owner: OwnerId, url: &str) -> bool {
        let mut rotation = self.write();
        match rotation.index_of(owner, url) {
            Some(index) => {
                rotation.records.swap_remove(index).retire();
                true
            }
            None => false,
        }
    }

    pub fn exists(&self, owner: OwnerId, url: &str) -> bool {
        self.read().index_of(owner, url).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// `(owner, url)` pairs currently live, in rotation order.
    pub fn snapshot(&self) -> Vec<(OwnerId, String)> {
        self.read()
            .records
            .iter()
            .map(|r| (r.owner(), r.url().to_string()))
            .collect()
    }

    /// Take the next record in rotation without waiting.
    pub fn try_next(&self) -> Option<Arc<EndpointRecord>> {
        let mut rotation = self.write();
        if rotation.records.is_empty() {
            return None;
        }

        if rotation.cursor >= rotation.records.len() {
            rotation.cursor = 0;
        }

        let record = rotation.records[rotation.cursor].clone();
        rotation.cursor += 1;
        Some(record)
    }

    /// Take the next record in rotation, waiting while the set is empty.
    ///
    /// Cancel safe: dropping the future consumes nothing.
    pub async fn next(&self) -> Arc<EndpointRecord> {
        loop {
            // Register before checking so an add between the check and the
            // await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(record) = self.try_next() {
                return record;
            }

            notified.await;
        }
    }
}
