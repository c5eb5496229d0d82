//! Typed webhook events and the payload parser.
//!
//! `pull_request` deliveries drive tracking and the mergeable gate;
//! `check_run` deliveries refresh the gate. Every other event type parses to
//! `Ok(None)` and is acknowledged without action.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{PrNumber, PrUrl, RepoId, Sha};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Action performed on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    /// Closed, merged or not.
    Closed,
    /// New commits were pushed to the head branch.
    Synchronize,
    Reopened,
    #[serde(other)]
    Other,
}

/// Action performed on a check-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunAction {
    Created,
    Completed,
    /// Someone asked for the check to be re-run.
    Rerequested,
    #[serde(other)]
    Other,
}

/// A `pull_request` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PrAction,
    pub repo: RepoId,
    pub pr_number: PrNumber,
    /// The PR's web URL, which is the tracking key.
    pub pr_url: PrUrl,
    pub head_sha: Sha,
    pub merged: bool,
}

/// A `check_run` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRunEvent {
    pub action: CheckRunAction,
    pub repo: RepoId,
    /// Name of the check-run that changed.
    pub name: String,
    pub head_sha: Sha,
    /// Pull requests whose head is `head_sha`. Empty for pushes without a PR.
    pub pull_requests: Vec<PrNumber>,
}

/// Webhook events the service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PullRequest(PullRequestEvent),
    CheckRun(CheckRunEvent),
}

/// Parses a delivery given its `X-GitHub-Event` type.
///
/// Returns `Ok(None)` for event types the service does not handle.
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload).map(|e| Some(WebhookEvent::PullRequest(e))),
        "check_run" => parse_check_run(payload).map(|e| Some(WebhookEvent::CheckRun(e))),
        _ => Ok(None),
    }
}

// ============================================================================
// Raw payload structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: PrAction,
    pull_request: RawPullRequest,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    html_url: String,
    merged: Option<bool>,
    head: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawCheckRunPayload {
    action: CheckRunAction,
    check_run: RawCheckRun,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    name: String,
    head_sha: String,
    #[serde(default)]
    pull_requests: Vec<RawPullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

fn parse_pull_request(payload: &[u8]) -> Result<PullRequestEvent, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    Ok(PullRequestEvent {
        action: raw.action,
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        pr_number: PrNumber(raw.pull_request.number),
        pr_url: PrUrl::new(raw.pull_request.html_url),
        head_sha: Sha::new(raw.pull_request.head.sha),
        merged: raw.pull_request.merged.unwrap_or(false),
    })
}

fn parse_check_run(payload: &[u8]) -> Result<CheckRunEvent, ParseError> {
    let raw: RawCheckRunPayload = serde_json::from_slice(payload)?;

    Ok(CheckRunEvent {
        action: raw.action,
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        name: raw.check_run.name,
        head_sha: Sha::new(raw.check_run.head_sha),
        pull_requests: raw
            .check_run
            .pull_requests
            .into_iter()
            .map(|pr| PrNumber(pr.number))
            .collect(),
    })
}

#[cfg(test)]
pub(crate) fn pull_request_payload(action: &str, pr_url: &str, head_sha: &str) -> Vec<u8> {
    serde_json::json!({
        "action": action,
        "number": 42,
        "pull_request": {
            "number": 42,
            "html_url": pr_url,
            "state": if action == "closed" { "closed" } else { "open" },
            "merged": false,
            "head": { "sha": head_sha, "ref": "devin/feature" },
            "base": { "sha": "0".repeat(40), "ref": "main" }
        },
        "repository": {
            "name": "widgets",
            "owner": { "login": "acme" }
        }
    })
    .to_string()
    .into_bytes()
}

#[cfg(test)]
pub(crate) fn check_run_payload(
    action: &str,
    name: &str,
    head_sha: &str,
    pr_numbers: &[u64],
) -> Vec<u8> {
    let pull_requests: Vec<_> = pr_numbers
        .iter()
        .map(|n| serde_json::json!({ "number": n, "head": { "sha": head_sha } }))
        .collect();
    serde_json::json!({
        "action": action,
        "check_run": {
            "id": 9001,
            "name": name,
            "head_sha": head_sha,
            "status": if action == "completed" { "completed" } else { "queued" },
            "pull_requests": pull_requests
        },
        "repository": {
            "name": "widgets",
            "owner": { "login": "acme" }
        }
    })
    .to_string()
    .into_bytes()
}
