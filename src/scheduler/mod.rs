//! Scheduling subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor::add_request / remove_request
//!     → round_robin.rs (live set, exclusive lock)
//!
//! Worker ready
//!     → Scheduler::next() (suspends while empty)
//!     → record.rs (per-record health lock held for one probe)
//! ```
//!
//! # Design Decisions
//! - One scheduler per monitor, no process-wide singleton
//! - Set lock and per-record lock are separate domains
//! - Strict fairness across removals is best-effort

pub mod record;
pub mod round_robin;

pub use record::{EndpointRecord, OwnerId};
pub use round_robin::Scheduler;
