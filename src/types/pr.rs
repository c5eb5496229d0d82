//! Pull request types: URL identity, GitHub-side state, and the tracking record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::ids::{PrNumber, RepoId, SessionId, Sha};

/// Host that pull request URLs must point at.
const GITHUB_HOST: &str = "github.com/";

/// The state of a pull request as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

impl PrState {
    /// Returns true if the PR is open.
    pub fn is_open(&self) -> bool {
        matches!(self, PrState::Open)
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrState::Open => "open",
            PrState::Merged => "merged",
            PrState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The subset of a GitHub pull request the poller needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub state: PrState,
    pub head_sha: Sha,
}

/// A URL that does not look like `github.com/<owner>/<repo>/pull/<number>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a GitHub pull request URL: {0}")]
pub struct InvalidPrUrl(pub String);

/// Where a pull request lives, as extracted from its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrLocation {
    pub repo: RepoId,
    pub number: PrNumber,
}

/// The web URL of a pull request. This is the registry key for tracked PRs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrUrl(pub String);

impl PrUrl {
    pub fn new(s: impl Into<String>) -> Self {
        PrUrl(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts owner, repository and PR number from the URL.
    ///
    /// Accepts anything containing `github.com/<owner>/<repo>/pull/<digits>`:
    /// the scheme is optional and trailing segments (`/files`, `#discussion`)
    /// are ignored.
    pub fn locate(&self) -> Result<PrLocation, InvalidPrUrl> {
        let invalid = || InvalidPrUrl(self.0.clone());

        let idx = self.0.find(GITHUB_HOST).ok_or_else(invalid)?;
        let mut segments = self.0[idx + GITHUB_HOST.len()..].split('/');

        let owner = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let repo = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        if segments.next() != Some("pull") {
            return Err(invalid());
        }

        let tail = segments.next().ok_or_else(invalid)?;
        let digits_end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let number = tail[..digits_end].parse::<u64>().map_err(|_| invalid())?;

        Ok(PrLocation {
            repo: RepoId::new(owner, repo),
            number: PrNumber(number),
        })
    }
}

impl fmt::Display for PrUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrUrl {
    fn from(s: &str) -> Self {
        PrUrl(s.to_string())
    }
}

/// A pull request being watched because a background session is working on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPr {
    /// Registry key.
    pub pr_url: PrUrl,
    pub repo: RepoId,
    pub pr_number: PrNumber,
    /// Commit the check-run is attached to. Refreshed on re-track.
    pub head_sha: Sha,
    /// Refreshed on re-track.
    pub session_id: SessionId,
    /// When tracking began. Never reset by re-tracking.
    pub added_at: DateTime<Utc>,
}

impl TrackedPr {
    /// Builds a tracking record for a PR URL, extracting owner/repo/number from it.
    pub fn from_url(
        pr_url: PrUrl,
        head_sha: Sha,
        session_id: SessionId,
        added_at: DateTime<Utc>,
    ) -> Result<Self, InvalidPrUrl> {
        let location = pr_url.locate()?;
        Ok(TrackedPr {
            pr_url,
            repo: location.repo,
            pr_number: location.number,
            head_sha,
            session_id,
            added_at,
        })
    }
}
