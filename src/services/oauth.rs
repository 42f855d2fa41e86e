// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth authorization-code flow with signed, nonce-bound state.
//!
//! State format: `base64url("{nonce_hex}|{issued_at_hex}|{hmac_hex}")`.
//! The nonce is also handed to the browser in a cookie; on return the
//! cookie must match the nonce inside the state, which binds the callback
//! to the browser that started the flow.

use crate::error::AuthError;
use crate::models::ProviderProfile;
use crate::services::github::IdentityProvider;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long a state value stays valid.
pub const STATE_TTL_SECS: i64 = 10 * 60;

const NONCE_LEN: usize = 16;

/// Where to send the browser, and what to remember until it comes back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    /// Hex nonce to store in the browser cookie
    pub nonce: String,
}

/// Identity Provider Client: one constructed instance per process.
#[derive(Clone)]
pub struct IdentityProviderClient {
    provider: Arc<dyn IdentityProvider>,
    state_key: Vec<u8>,
    rng: SystemRandom,
}

impl IdentityProviderClient {
    pub fn new(provider: Arc<dyn IdentityProvider>, state_key: Vec<u8>) -> Self {
        Self {
            provider,
            state_key,
            rng: SystemRandom::new(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn begin_authorization(&self) -> Result<AuthorizationRequest, AuthError> {
        self.begin_authorization_at(Utc::now())
    }

    /// Mint a fresh state and the provider URL carrying it.
    pub fn begin_authorization_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationRequest, AuthError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| AuthError::Configuration("system RNG unavailable".to_string()))?;
        let nonce = hex::encode(nonce);

        let state = sign_state(&self.state_key, &nonce, now.timestamp())?;
        let url = self.provider.authorization_url(&state);

        Ok(AuthorizationRequest { url, state, nonce })
    }

    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
        cookie_nonce: Option<&str>,
    ) -> Result<ProviderProfile, AuthError> {
        self.complete_authorization_at(code, state, cookie_nonce, Utc::now())
            .await
    }

    /// Check the returned state, then exchange the code and fetch the profile.
    ///
    /// No retries: the code is single-use.
    pub async fn complete_authorization_at(
        &self,
        code: &str,
        state: &str,
        cookie_nonce: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ProviderProfile, AuthError> {
        verify_state(&self.state_key, state, cookie_nonce, now.timestamp())?;

        if code.is_empty() {
            return Err(AuthError::ProviderExchange("empty authorization code".to_string()));
        }

        let access_token = self.provider.exchange_code(code).await?;
        self.provider.fetch_profile(&access_token).await
    }
}

fn state_mac(key: &[u8], payload: &str) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuthError::Configuration(format!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

fn sign_state(key: &[u8], nonce: &str, issued_at: i64) -> Result<String, AuthError> {
    let payload = format!("{}|{:x}", nonce, issued_at);
    let signature = state_mac(key, &payload)?.finalize().into_bytes();
    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify signature, age and cookie binding of a returned state value.
fn verify_state(
    key: &[u8],
    state: &str,
    cookie_nonce: Option<&str>,
    now: i64,
) -> Result<(), AuthError> {
    let reject = |reason: &str| AuthError::ProviderExchange(format!("state rejected: {}", reason));

    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| reject("not base64url"))?;
    let state_str = String::from_utf8(bytes).map_err(|_| reject("not UTF-8"))?;

    let parts: Vec<&str> = state_str.split('|').collect();
    let [nonce, issued_hex, signature_hex] = parts[..] else {
        return Err(reject("malformed"));
    };

    let signature = hex::decode(signature_hex).map_err(|_| reject("malformed signature"))?;
    state_mac(key, &format!("{}|{}", nonce, issued_hex))?
        .verify_slice(&signature)
        .map_err(|_| {
            tracing::warn!("OAuth state signature mismatch");
            reject("bad signature")
        })?;

    let issued_at = i64::from_str_radix(issued_hex, 16).map_err(|_| reject("bad timestamp"))?;
    let age = now - issued_at;
    if !(0..=STATE_TTL_SECS).contains(&age) {
        return Err(reject("expired"));
    }

    let cookie_nonce = cookie_nonce.ok_or_else(|| reject("missing nonce cookie"))?;
    if !bool::from(cookie_nonce.as_bytes().ct_eq(nonce.as_bytes())) {
        return Err(reject("nonce mismatch"));
    }

    Ok(())
}
