//! Webhook endpoint handler.
//!
//! Verifies the delivery signature, then acts on the event:
//!
//! - `pull_request` closed: stop tracking the PR and terminate its session
//! - `pull_request` synchronize: move a tracked PR onto its new head commit
//! - `pull_request` opened/synchronize/reopened: refresh the mergeable gate
//! - `check_run` for `bot_ci` on a PR: refresh the mergeable gate

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::devin::SessionProvider;
use crate::github::ReviewClientFactory;
use crate::mergeable::BOT_CI_CHECK_NAME;
use crate::types::{RepoId, Sha};
use crate::webhooks::{
    CheckRunAction, CheckRunEvent, ParseError, PrAction, PullRequestEvent, WebhookEvent,
    parse_webhook,
};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// Payload did not parse.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Response
///
/// - 202 Accepted: verified (acted on or ignored)
/// - 400 Bad Request: missing header or unparsable `pull_request`/`check_run` payload
/// - 401 Unauthorized: signature mismatch
pub async fn webhook_handler<S, F>(
    State(app_state): State<AppState<S, F>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError>
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let signature_header = get_header(&headers, HEADER_SIGNATURE)?;
    let delivery_id = headers
        .get(HEADER_DELIVERY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    debug!(delivery_id = %delivery_id, event_type = %event_type, "Received webhook");

    if let Err(e) = app_state.webhook_secret().verify(&body, &signature_header) {
        warn!(delivery_id = %delivery_id, error = %e, "Rejected webhook delivery");
        return Err(WebhookError::InvalidSignature);
    }

    match parse_webhook(&event_type, &body)? {
        Some(WebhookEvent::PullRequest(event)) => handle_pull_request(&app_state, event).await,
        Some(WebhookEvent::CheckRun(event)) => handle_check_run(&app_state, event).await,
        None => debug!(delivery_id = %delivery_id, event_type = %event_type, "Ignoring event"),
    }

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

async fn handle_pull_request<S, F>(app_state: &AppState<S, F>, event: PullRequestEvent)
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    let poller = app_state.poller();

    match event.action {
        PrAction::Closed => match poller.release_closed_pr(&event.pr_url).await {
            Ok(Some(session_id)) => info!(
                pr_url = %event.pr_url,
                session_id = %session_id,
                merged = event.merged,
                "PR closed; session terminated"
            ),
            Ok(None) => debug!(pr_url = %event.pr_url, "PR closed; no running session"),
            Err(e) => warn!(
                pr_url = %event.pr_url,
                error = %e,
                "PR closed; failed to terminate its session"
            ),
        },
        PrAction::Synchronize => {
            if poller.update_head_sha(&event.pr_url, event.head_sha.clone()) {
                info!(
                    pr_url = %event.pr_url,
                    head_sha = %event.head_sha.short(),
                    "Tracked PR moved to new head"
                );
            }
            refresh_gate(app_state, &event.repo, &event.head_sha).await;
        }
        PrAction::Opened | PrAction::Reopened => {
            info!(
                repo = %event.repo,
                pr = %event.pr_number,
                action = ?event.action,
                "PR event"
            );
            refresh_gate(app_state, &event.repo, &event.head_sha).await;
        }
        PrAction::Other => {}
    }
}

async fn handle_check_run<S, F>(app_state: &AppState<S, F>, event: CheckRunEvent)
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    if event.name != BOT_CI_CHECK_NAME || event.action == CheckRunAction::Other {
        return;
    }
    if event.pull_requests.is_empty() {
        info!(
            repo = %event.repo,
            head_sha = %event.head_sha.short(),
            "No pull requests associated with this bot_ci run"
        );
        return;
    }

    info!(
        repo = %event.repo,
        head_sha = %event.head_sha.short(),
        action = ?event.action,
        "bot_ci check changed"
    );
    refresh_gate(app_state, &event.repo, &event.head_sha).await;
}

/// Refreshes the mergeable gate. Failures are logged; the delivery is still
/// accepted.
async fn refresh_gate<S, F>(app_state: &AppState<S, F>, repo: &RepoId, head_sha: &Sha)
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    if let Err(e) = app_state.gate().refresh(repo, head_sha).await {
        warn!(
            repo = %repo,
            head_sha = %head_sha.short(),
            error = %e,
            "Failed to update mergeable gate"
        );
    }
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_header_reads_present_header() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "pull_request".parse().unwrap());

        assert_eq!(get_header(&headers, HEADER_EVENT).unwrap(), "pull_request");
    }

    #[test]
    fn get_header_reports_missing_header() {
        let headers = HeaderMap::new();

        assert!(matches!(
            get_header(&headers, HEADER_SIGNATURE),
            Err(WebhookError::MissingHeader(HEADER_SIGNATURE))
        ));
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            WebhookError::MissingHeader(HEADER_EVENT)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::InvalidSignature.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
