// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub OAuth client.
//!
//! Handles:
//! - Authorization URL construction (`user:email` scope)
//! - Server-to-server code exchange
//! - Profile fetch, with `/user/emails` fallback when the public email is hidden

use crate::error::AuthError;
use crate::models::ProviderProfile;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// An external OAuth identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Stable provider name, stored on every principal (e.g. "github").
    fn name(&self) -> &str;

    /// URL the browser is sent to, carrying our anti-forgery `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange a single-use authorization code for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError>;

    /// Fetch the profile of the user the access token belongs to.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError>;
}

const PROVIDER_NAME: &str = "github";
const SCOPE: &str = "user:email";
const USER_AGENT: &str = concat!("goal-tracker/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub endpoints. Overridable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct GithubEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for GithubEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }
}

/// GitHub OAuth client.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    endpoints: GithubEndpoints,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GithubClient {
    /// Create a client against the public GitHub endpoints.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Result<Self, AuthError> {
        Self::with_endpoints(
            client_id,
            client_secret,
            redirect_uri,
            GithubEndpoints::default(),
        )
    }

    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: GithubEndpoints,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AuthError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// GET an API path with the user's token and parse the JSON body.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, String> {
        let url = format!("{}{}", self.endpoints.api_base, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| format!("GET {} failed: {}", path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("GET {}: HTTP {}: {}", path, status, body));
        }

        response
            .json()
            .await
            .map_err(|e| format!("GET {}: bad JSON: {}", path, e))
    }

    /// Primary verified address from `/user/emails`, if any.
    async fn primary_email(&self, access_token: &str) -> Option<String> {
        match self
            .get_json::<Vec<GithubEmail>>("/user/emails", access_token)
            .await
        {
            Ok(emails) => emails
                .into_iter()
                .find(|e| e.primary && e.verified)
                .map(|e| e.email),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read GitHub email list");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for GithubClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            self.endpoints.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPE),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ProviderExchange(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ProviderExchange(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        // GitHub reports a bad or reused code as 200 with an `error` field.
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderExchange(format!("bad JSON: {}", e)))?;

        match token {
            TokenResponse {
                access_token: Some(access_token),
                ..
            } if !access_token.is_empty() => Ok(access_token),
            TokenResponse {
                error,
                error_description,
                ..
            } => Err(AuthError::ProviderExchange(format!(
                "{}: {}",
                error.unwrap_or_else(|| "no_access_token".to_string()),
                error_description.unwrap_or_default()
            ))),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError> {
        let user: GithubUser = self
            .get_json("/user", access_token)
            .await
            .map_err(AuthError::ProviderProfile)?;

        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => Some(email),
            None => self.primary_email(access_token).await,
        };

        tracing::debug!(github_id = user.id, login = %user.login, "Fetched GitHub profile");

        Ok(ProviderProfile {
            provider: PROVIDER_NAME.to_string(),
            subject_id: user.id.to_string(),
            username: user.login,
            display_name: user.name.filter(|n| !n.is_empty()),
            email,
            avatar_url: user.avatar_url,
        })
    }
}

// ─── GitHub API Types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}
