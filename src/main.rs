// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal-Tracker API Server
//!
//! Signs users in with GitHub and serves their goals and milestones.

use goal_tracker::{
    config::{Config, DatabaseTarget},
    db::{Database, FirestoreDb, MemoryDb},
    services::GithubClient,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment. A missing or short signing key
    // stops the process here.
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Goal-Tracker API");

    let db: Arc<dyn Database> = match config.database_target()? {
        DatabaseTarget::Firestore { project_id } => Arc::new(FirestoreDb::new(&project_id).await?),
        DatabaseTarget::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let github = GithubClient::new(
        config.github_client_id.clone(),
        config.github_client_secret.clone(),
        config.oauth_callback_url.clone(),
    )?;
    tracing::info!(callback = %config.oauth_callback_url, "GitHub OAuth client initialized");

    let port = config.port;
    let state = Arc::new(AppState::new(config, db, Arc::new(github))?);

    // Build router
    let app = goal_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goal_tracker=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
