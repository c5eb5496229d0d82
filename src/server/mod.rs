//! HTTP server for the check poller.
//!
//! # Endpoints
//!
//! - `POST /webhook` - GitHub webhook deliveries (returns 202 Accepted)
//! - `GET /api/v1/tracked` - Tracked PRs as JSON
//! - `POST /api/v1/tracked` - Start tracking a PR
//! - `DELETE /api/v1/tracked?pr_url=...` - Stop tracking a PR
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

pub mod health;
pub mod tracking;
pub mod webhook;

pub use health::health_handler;
pub use tracking::{list_handler, track_handler, untrack_handler};
pub use webhook::webhook_handler;

use crate::devin::SessionProvider;
use crate::github::ReviewClientFactory;
use crate::mergeable::MergeableGate;
use crate::poller::StatusPoller;
use crate::webhooks::WebhookSecret;

/// Shared application state, passed to handlers via Axum's `State` extractor.
pub struct AppState<S, F> {
    inner: Arc<AppStateInner<S, F>>,
}

struct AppStateInner<S, F> {
    poller: StatusPoller<S, F>,
    gate: MergeableGate<F>,
    webhook_secret: WebhookSecret,
}

impl<S, F> Clone for AppState<S, F> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, F> AppState<S, F>
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    pub fn new(
        poller: StatusPoller<S, F>,
        gate: MergeableGate<F>,
        webhook_secret: WebhookSecret,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                poller,
                gate,
                webhook_secret,
            }),
        }
    }

    pub fn poller(&self) -> &StatusPoller<S, F> {
        &self.inner.poller
    }

    pub fn gate(&self) -> &MergeableGate<F> {
        &self.inner.gate
    }

    pub fn webhook_secret(&self) -> &WebhookSecret {
        &self.inner.webhook_secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<S, F>(app_state: AppState<S, F>) -> axum::Router
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler::<S, F>))
        .route(
            "/api/v1/tracked",
            get(list_handler::<S, F>)
                .post(track_handler::<S, F>)
                .delete(untrack_handler::<S, F>),
        )
        .route("/health", get(health_handler))
        .with_state(app_state)
}
