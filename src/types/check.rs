//! GitHub check-run vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// GitHub's check-run id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckRunId(pub u64);

impl fmt::Display for CheckRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check-run `status` as GitHub spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

impl CheckStatus {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            CheckStatus::Queued => "queued",
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Completed => "completed",
        }
    }
}

/// Check-run `conclusion`. Only meaningful for completed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    ActionRequired,
    Cancelled,
    Failure,
    Neutral,
    Success,
    Skipped,
    Stale,
    TimedOut,
}

impl CheckConclusion {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            CheckConclusion::ActionRequired => "action_required",
            CheckConclusion::Cancelled => "cancelled",
            CheckConclusion::Failure => "failure",
            CheckConclusion::Neutral => "neutral",
            CheckConclusion::Success => "success",
            CheckConclusion::Skipped => "skipped",
            CheckConclusion::Stale => "stale",
            CheckConclusion::TimedOut => "timed_out",
        }
    }
}

/// Status of a check-run with its conclusion folded in, so a conclusion can
/// only exist on a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Queued,
    InProgress,
    Completed(CheckConclusion),
}

impl CheckState {
    pub fn status(&self) -> CheckStatus {
        match self {
            CheckState::Queued => CheckStatus::Queued,
            CheckState::InProgress => CheckStatus::InProgress,
            CheckState::Completed(_) => CheckStatus::Completed,
        }
    }

    pub fn conclusion(&self) -> Option<CheckConclusion> {
        match self {
            CheckState::Completed(c) => Some(*c),
            CheckState::Queued | CheckState::InProgress => None,
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conclusion() {
            Some(c) => write!(f, "{} {}", self.status().as_api_str(), c.as_api_str()),
            None => f.write_str(self.status().as_api_str()),
        }
    }
}

/// The `output` object of a check-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
}

/// What the poller wants a check-run to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRunUpdate {
    pub state: CheckState,
    pub output: CheckOutput,
}

impl CheckRunUpdate {
    pub fn new(state: CheckState, title: impl Into<String>, summary: impl Into<String>) -> Self {
        CheckRunUpdate {
            state,
            output: CheckOutput {
                title: title.into(),
                summary: summary.into(),
            },
        }
    }
}

/// An existing check-run, as returned by a listing.
///
/// `status` and `conclusion` are kept as GitHub spells them; listings can carry
/// values (`waiting`, `startup_failure`, ...) this service never writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRunRef {
    pub id: CheckRunId,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
}

impl CheckRunRef {
    pub fn is_completed(&self) -> bool {
        self.status == CheckStatus::Completed.as_api_str()
    }
}
