// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Goal-Tracker: personal goals behind GitHub sign-in
//!
//! This crate provides the backend API: GitHub OAuth login, stateless bearer
//! tokens, and goal/milestone storage scoped to the signed-in principal.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{IdentityProviderClient, PrincipalResolver, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Database>,
    pub identity: IdentityProviderClient,
    pub resolver: PrincipalResolver,
    pub tokens: TokenService,
}

impl AppState {
    /// Wire the services around a store and an identity provider.
    pub fn new(
        config: Config,
        db: Arc<dyn Database>,
        provider: Arc<dyn services::IdentityProvider>,
    ) -> Result<Self, error::AuthError> {
        let tokens = TokenService::new(&config.jwt_signing_key)?;
        let identity = IdentityProviderClient::new(provider, config.oauth_state_key.clone());
        let resolver = PrincipalResolver::new(db.clone());

        Ok(Self {
            config,
            db,
            identity,
            resolver,
            tokens,
        })
    }
}
