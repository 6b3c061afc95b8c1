//! Job lifecycle tracking for remote video conversions.
//!
//! [`JobTracker`] submits a conversion to the remote transcoder service
//! and drives a per-job poll loop until the service reports a terminal
//! state. Callers observe jobs through read-only snapshots or a watch
//! subscription; the poll timer is owned by the job's handle and released
//! on every terminal transition and on cancellation, never by the caller.

pub mod config;
pub mod error;
pub mod registry;

mod handle;
mod scheduler;

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use registry::JobTracker;
