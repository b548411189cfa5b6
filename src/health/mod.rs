//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Liveness probe (probe.rs):
//!     Worker picks a record
//!     → GET record.url with a fixed timeout
//!     → Ok(()) on 200/201, ProbeError otherwise
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     Only transitions produce a Transition value
//! ```
//!
//! # Design Decisions
//! - Probe failures are data, never process errors
//! - A single failure flips the state, a single success restores it
//! - Steady-state repeats are swallowed (debounce)

pub mod probe;
pub mod state;

pub use probe::{HttpProber, ProbeError, Prober, PROBE_TIMEOUT};
pub use state::{HealthState, Transition};
