//! Devin Checks - mirrors background coding session status onto GitHub check-runs.
//!
//! This library provides the reconciliation poller, its GitHub and session
//! provider clients, the `Mergeable: bot_ci` gate, and the HTTP surface the
//! service exposes.

pub mod config;
pub mod devin;
pub mod github;
pub mod mergeable;
pub mod poller;
pub mod retry;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub mod test_utils;
