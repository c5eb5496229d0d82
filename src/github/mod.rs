//! GitHub access for the poller.
//!
//! - [`ReviewClient`] / [`ReviewClientFactory`]: the operations the poller needs
//! - [`OctocrabClient`]: the real implementation, with backoff on transient errors
//! - [`GitHubApiError`]: transient vs permanent classification

mod client;
mod error;
mod review;

pub use client::{OctocrabClient, OctocrabClientFactory};
pub use error::{GitHubApiError, GitHubErrorKind};
pub use review::{CreateCheckRun, ReviewClient, ReviewClientFactory, UpdateCheckRun};
