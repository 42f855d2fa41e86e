// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use goal_tracker::config::Config;
use goal_tracker::db::{Database, FirestoreDb, MemoryDb};
use goal_tracker::error::AuthError;
use goal_tracker::models::{Principal, ProviderProfile};
use goal_tracker::routes::create_router;
use goal_tracker::services::IdentityProvider;
use goal_tracker::AppState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Identity provider double: each accepted code maps to a canned profile.
#[derive(Default)]
pub struct StubProvider {
    profiles: Mutex<HashMap<String, ProviderProfile>>,
}

#[allow(dead_code)]
impl StubProvider {
    /// Make `code` exchangeable for `profile`.
    pub fn accept(&self, code: &str, profile: ProviderProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(code.to_string(), profile);
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn name(&self) -> &str {
        "github"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "https://github.test/login/oauth/authorize?client_id=test_client_id&state={}",
            state
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        if self.profiles.lock().unwrap().contains_key(code) {
            Ok(format!("access-{}", code))
        } else {
            Err(AuthError::ProviderExchange("bad_verification_code".to_string()))
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AuthError> {
        let code = access_token.trim_start_matches("access-");
        self.profiles
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| AuthError::ProviderProfile("unknown token".to_string()))
    }
}

/// Everything a test needs to drive the app and poke at its state.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub provider: Arc<StubProvider>,
}

/// Create a test app over an in-memory store and a stub provider.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let db = Arc::new(MemoryDb::new());
    let provider = Arc::new(StubProvider::default());

    let state = Arc::new(
        AppState::new(
            Config::test_default(),
            db.clone() as Arc<dyn Database>,
            provider.clone() as Arc<dyn IdentityProvider>,
        )
        .expect("test config has a valid signing key"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        provider,
    }
}

#[allow(dead_code)]
pub fn github_profile(subject_id: &str, username: &str) -> ProviderProfile {
    ProviderProfile {
        provider: "github".to_string(),
        subject_id: subject_id.to_string(),
        username: username.to_string(),
        display_name: None,
        email: None,
        avatar_url: None,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Resolve a principal directly and mint a token for it.
    pub async fn login(&self, subject_id: &str, username: &str) -> (Principal, String) {
        let principal = self
            .state
            .resolver
            .resolve(&github_profile(subject_id, username))
            .await
            .unwrap();
        let token = self.state.tokens.issue(&principal).unwrap().token;
        (principal, token)
    }
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
