//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Logging → Metrics → Store → Seed monitor → Start workers
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Trigger cancellation → Workers finish in-flight probe
//!     → Event channel closes → Delivery drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: config errors abort startup
//! - A probe in flight is never abandoned, only the next iteration is skipped

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
