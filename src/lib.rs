//! HTTP endpoint monitor library.
//!
//! Probes a changing set of HTTP(S) endpoints on behalf of subscribers
//! and reports health transitions over a bounded channel.

pub mod commands;
pub mod config;
pub mod delivery;
pub mod health;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod scheduler;
pub mod store;

pub use config::AppConfig;
pub use monitor::{HealthEvent, Monitor, MonitorError};
pub use scheduler::{OwnerId, Scheduler};
pub use store::SubscriptionStore;
