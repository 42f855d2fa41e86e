// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Principal model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Local identity derived from an external provider login.
///
/// Uniquely keyed by `(provider, provider_subject_id)`. `id` is assigned once
/// at creation and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Local identifier (UUID v4), embedded in bearer tokens
    pub id: String,
    /// Identity provider name (e.g. "github")
    pub provider: String,
    /// Provider's stable user identifier (e.g. GitHub numeric ID)
    pub provider_subject_id: String,
    /// Provider login handle
    pub username: String,
    /// Human-readable name, if the provider exposes one
    pub display_name: Option<String>,
    /// Email address, synthesized when the provider withholds it
    pub email: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// When this principal was first seen
    pub created_at: DateTime<Utc>,
    /// Most recent successful login
    pub last_login: DateTime<Utc>,
}

impl Principal {
    /// Build a new principal from a provider profile.
    pub fn from_profile(profile: &ProviderProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider: profile.provider.clone(),
            provider_subject_id: profile.subject_id.clone(),
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            email: profile
                .email
                .clone()
                .unwrap_or_else(|| placeholder_email(&profile.username, &profile.provider)),
            avatar_url: profile.avatar_url.clone(),
            created_at: now,
            last_login: now,
        }
    }

    /// Record a repeat login, refreshing profile fields the provider sent.
    ///
    /// A missing email on the profile keeps whatever is stored.
    pub fn record_login(&mut self, profile: &ProviderProfile, now: DateTime<Utc>) {
        self.last_login = now;
        self.username = profile.username.clone();
        if profile.display_name.is_some() {
            self.display_name = profile.display_name.clone();
        }
        if profile.avatar_url.is_some() {
            self.avatar_url = profile.avatar_url.clone();
        }
        if let Some(email) = &profile.email {
            self.email = email.clone();
        }
    }

    /// Storage key enforcing `(provider, provider_subject_id)` uniqueness.
    pub fn identity_key(&self) -> String {
        identity_key(&self.provider, &self.provider_subject_id)
    }
}

/// Document key for a `(provider, subject)` pair.
pub fn identity_key(provider: &str, subject_id: &str) -> String {
    format!(
        "{}:{}",
        urlencoding::encode(provider),
        urlencoding::encode(subject_id)
    )
}

/// `"{username}@{provider}.local"`, used when the provider hides the email.
pub fn placeholder_email(username: &str, provider: &str) -> String {
    format!("{}@{}.local", username, provider)
}

/// Profile returned by an identity provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: String,
    pub subject_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Public fields of a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PrincipalResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&Principal> for PrincipalResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            username: principal.username.clone(),
            email: principal.email.clone(),
            display_name: principal.display_name.clone(),
            avatar_url: principal.avatar_url.clone(),
        }
    }
}
