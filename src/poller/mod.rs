//! PR-tracking reconciliation loop.
//!
//! Watches pull requests that background coding sessions are working on and
//! mirrors each session's status onto a check-run on the PR's head commit.
//!
//! # Module Structure
//!
//! - [`config`]: poll interval, tracking age limit, check-run naming
//! - [`registry`]: the in-memory set of tracked PRs
//! - [`engine`]: discovery, the poll cycle and check-run rendering
//! - [`log`]: the logging capability the engine reports through

mod config;
mod engine;
mod log;
mod registry;


pub use config::{DEFAULT_APP_URL, DEFAULT_CHECK_NAME, PollerConfig};
pub use engine::{CycleReport, ReconcileError, StatusPoller};
pub use log::{PollerLog, TracingLog};
pub use registry::{TrackOutcome, TrackedPrRegistry};
