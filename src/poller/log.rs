//! Logging capability handed to the poller.
//!
//! The poller reports progress and absorbed failures through [`PollerLog`]
//! rather than returning them: there is no caller to return them to. The host
//! picks the implementation; [`TracingLog`] forwards to `tracing`.

/// Sink for poller progress and failure messages.
pub trait PollerLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards poller messages to `tracing` under the `devin_checks::poller` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl PollerLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(target: "devin_checks::poller", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "devin_checks::poller", "{message}");
    }
}
