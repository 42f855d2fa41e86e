// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub OAuth login and session routes.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AuthError, Result};
use crate::middleware::AuthUser;
use crate::models::PrincipalResponse;
use crate::services::oauth::STATE_TTL_SECS;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Cookie binding the OAuth state to the browser that started the flow.
pub const STATE_COOKIE: &str = "goaltrack_oauth_nonce";
const STATE_COOKIE_PATH: &str = "/auth";

/// Routes reachable without a token.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
}

/// Routes behind `require_auth`.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

/// Start OAuth flow - redirect to GitHub authorization.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let request = state.identity.begin_authorization()?;

    let cookie = Cookie::build((STATE_COOKIE, request.nonce))
        .path(STATE_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies())
        .max_age(time::Duration::seconds(STATE_TTL_SECS));

    tracing::info!(
        provider = state.identity.provider_name(),
        "Starting OAuth flow"
    );

    Ok((
        StatusCode::FOUND,
        jar.add(cookie),
        [(header::LOCATION, request.url)],
    ))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Successful login: the bearer token and who it belongs to.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// RFC 3339, UTC
    pub expires_at: String,
    pub principal: PrincipalResponse,
}

/// OAuth callback - verify state, exchange code, resolve principal, mint token.
///
/// The nonce cookie is cleared whatever the outcome.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let cookie_nonce = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(STATE_COOKIE).path(STATE_COOKIE_PATH));

    match complete_login(&state, params, cookie_nonce.as_deref()).await {
        Ok(body) => (jar, Json(body)).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

async fn complete_login(
    state: &AppState,
    params: CallbackParams,
    cookie_nonce: Option<&str>,
) -> Result<LoginResponse> {
    if let Some(error) = params.error {
        return Err(AuthError::ProviderExchange(format!(
            "provider returned {}: {}",
            error,
            params.error_description.unwrap_or_default()
        ))
        .into());
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return Err(
            AuthError::ProviderExchange("callback missing code or state".to_string()).into(),
        );
    };

    let profile = state
        .identity
        .complete_authorization(&code, &oauth_state, cookie_nonce)
        .await?;

    let principal = state.resolver.resolve(&profile).await?;
    let issued = state.tokens.issue(&principal)?;

    tracing::info!(
        principal_id = %principal.id,
        username = %principal.username,
        "Login successful"
    );

    Ok(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: format_utc_rfc3339(issued.expires_at),
        principal: PrincipalResponse::from(&principal),
    })
}

/// Current principal's public fields.
async fn me(Extension(user): Extension<AuthUser>) -> Json<PrincipalResponse> {
    Json(PrincipalResponse::from(&user.principal))
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    message: &'static str,
}

/// Logout is client-side token discard; this only acknowledges it.
async fn logout(Extension(user): Extension<AuthUser>) -> Json<LogoutResponse> {
    tracing::info!(principal_id = %user.principal.id, "Logout acknowledged");
    Json(LogoutResponse {
        message: "Logged out successfully",
    })
}
