//! Core domain types for the session check poller.
//!
//! This module contains the fundamental types used throughout the application,
//! designed to encode invariants via the type system.

pub mod check;
pub mod ids;
pub mod pr;
pub mod session;

// Re-export commonly used types at the module level
pub use check::{
    CheckConclusion, CheckOutput, CheckRunId, CheckRunRef, CheckRunUpdate, CheckState, CheckStatus,
};
pub use ids::{PrNumber, RepoId, SessionId, Sha};
pub use pr::{InvalidPrUrl, PrLocation, PrState, PrUrl, PullRequestInfo, TrackedPr};
pub use session::{SessionDetail, SessionFilter, SessionStatus, SessionSummary};
