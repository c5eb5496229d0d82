//! Background coding session types, as reported by the session provider.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::SessionId;
use super::pr::PrUrl;

/// Detailed status of a session.
///
/// The provider owns this vocabulary; anything outside the four statuses the
/// poller acts on is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Working,
    Blocked,
    Finished,
    Expired,
    Other(String),
}

impl SessionStatus {
    /// Maps the provider's `status_enum` string.
    pub fn from_api_str(s: &str) -> Self {
        match s {
            "working" => SessionStatus::Working,
            "blocked" => SessionStatus::Blocked,
            "finished" => SessionStatus::Finished,
            "expired" => SessionStatus::Expired,
            other => SessionStatus::Other(other.to_string()),
        }
    }

    pub fn as_api_str(&self) -> &str {
        match self {
            SessionStatus::Working => "working",
            SessionStatus::Blocked => "blocked",
            SessionStatus::Finished => "finished",
            SessionStatus::Expired => "expired",
            SessionStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl Serialize for SessionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_api_str())
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SessionStatus::from_api_str(&s))
    }
}

/// Coarse filter applied when listing sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFilter {
    /// Sessions whose coarse status is `running`.
    Running,
    /// No filtering.
    All,
}

impl SessionFilter {
    /// The coarse status string this filter selects, if any.
    pub fn status(&self) -> Option<&'static str> {
        match self {
            SessionFilter::Running => Some("running"),
            SessionFilter::All => None,
        }
    }
}

/// One entry of a session listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    /// Coarse status (`running`, `stopped`, ...). Only a pre-filter: the
    /// detail call is authoritative.
    pub status: String,
    /// The pull request this session is working on, if it has opened one.
    pub pr_url: Option<PrUrl>,
}

/// Result of fetching a single session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetail {
    pub session_id: SessionId,
    pub status: SessionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_map_to_variants() {
        assert_eq!(SessionStatus::from_api_str("working"), SessionStatus::Working);
        assert_eq!(SessionStatus::from_api_str("blocked"), SessionStatus::Blocked);
        assert_eq!(SessionStatus::from_api_str("finished"), SessionStatus::Finished);
        assert_eq!(SessionStatus::from_api_str("expired"), SessionStatus::Expired);
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status = SessionStatus::from_api_str("suspend_requested");
        assert_eq!(status, SessionStatus::Other("suspend_requested".to_string()));
        assert_eq!(status.to_string(), "suspend_requested");
    }

    #[test]
    fn deserializes_from_plain_string() {
        let status: SessionStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(status, SessionStatus::Blocked);
    }

    #[test]
    fn running_filter_selects_running() {
        assert_eq!(SessionFilter::Running.status(), Some("running"));
        assert_eq!(SessionFilter::All.status(), None);
    }
}
