//! Tracked-PR management endpoints.
//!
//! Lets the service that launches sessions seed tracking as soon as a session
//! opens a PR, instead of waiting for the next startup discovery.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::AppState;
use crate::devin::SessionProvider;
use crate::github::ReviewClientFactory;
use crate::poller::TrackOutcome;
use crate::types::{InvalidPrUrl, PrUrl, SessionId, Sha, TrackedPr};

/// Errors from the tracking endpoints.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("{0}")]
    InvalidPrUrl(#[from] InvalidPrUrl),
}

impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackingError::InvalidPrUrl(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Body of `POST /api/v1/tracked`.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub pr_url: PrUrl,
    pub head_sha: Sha,
    pub session_id: SessionId,
}

/// Query of `DELETE /api/v1/tracked`.
#[derive(Debug, Deserialize)]
pub struct UntrackParams {
    pub pr_url: PrUrl,
}

/// `GET /api/v1/tracked`: every tracked PR, oldest first.
pub async fn list_handler<S, F>(State(app_state): State<AppState<S, F>>) -> Json<Vec<TrackedPr>>
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    Json(app_state.poller().list())
}

/// `POST /api/v1/tracked`: starts tracking a PR, or refreshes its head SHA and
/// session if already tracked.
///
/// - 201 Created: newly tracked
/// - 200 OK: existing entry updated
/// - 400 Bad Request: `pr_url` is not a GitHub pull request URL
pub async fn track_handler<S, F>(
    State(app_state): State<AppState<S, F>>,
    Json(request): Json<TrackRequest>,
) -> Result<(StatusCode, Json<TrackedPr>), TrackingError>
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    let pr = TrackedPr::from_url(
        request.pr_url,
        request.head_sha,
        request.session_id,
        Utc::now(),
    )?;
    let pr_url = pr.pr_url.clone();

    let poller = app_state.poller();
    let status = match poller.track(pr.clone()) {
        TrackOutcome::Inserted => StatusCode::CREATED,
        TrackOutcome::Updated => StatusCode::OK,
    };
    info!(pr_url = %pr_url, "PR tracked via API");

    Ok((status, Json(poller.get(&pr_url).unwrap_or(pr))))
}

/// `DELETE /api/v1/tracked?pr_url=...`: stops tracking. 204 whether or not the
/// PR was tracked.
pub async fn untrack_handler<S, F>(
    State(app_state): State<AppState<S, F>>,
    Query(params): Query<UntrackParams>,
) -> StatusCode
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    if app_state.poller().untrack(&params.pr_url) {
        info!(pr_url = %params.pr_url, "PR untracked via API");
    }
    StatusCode::NO_CONTENT
}
