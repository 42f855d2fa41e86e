// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::{AppError, AuthError};
use crate::models::Principal;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated principal, attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

/// Middleware that requires a valid bearer token for a principal that
/// still exists. Every failure is the same 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?.to_string();

    let principal_id = state.tokens.verify(&token)?;

    let principal = state
        .db
        .get_principal(&principal_id)
        .await?
        .ok_or(AuthError::PrincipalNotFound)?;

    request.extensions_mut().insert(AuthUser { principal });

    Ok(next.run(request).await)
}

/// Extract `<token>` from `Authorization: Bearer <token>`.
fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingCredential)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}
