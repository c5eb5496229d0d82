use std::sync::Arc;

use devin_checks::config::Config;
use devin_checks::devin::DevinClient;
use devin_checks::github::{OctocrabClient, OctocrabClientFactory};
use devin_checks::mergeable::MergeableGate;
use devin_checks::poller::{StatusPoller, TracingLog};
use devin_checks::server::{AppState, build_router};
use devin_checks::webhooks::WebhookSecret;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devin_checks=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let github = OctocrabClientFactory::new(OctocrabClient::from_token(config.github_token)?);
    let sessions = DevinClient::new(config.devin)?;
    let gate = MergeableGate::new(github.clone());
    let poller = StatusPoller::new(config.poller, sessions, github, Arc::new(TracingLog));

    let app = build_router(AppState::new(
        poller.clone(),
        gate,
        WebhookSecret::new(config.webhook_secret),
    ));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => shutdown.cancel(),
                Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
            }
        }
    });

    poller.start();

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    poller.stop();
    tracing::info!("shut down");
    Ok(())
}
