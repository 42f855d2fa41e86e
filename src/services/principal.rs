// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Principal Resolver: provider profile -> local principal.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{Principal, ProviderProfile};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct PrincipalResolver {
    db: Arc<dyn Database>,
}

impl PrincipalResolver {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn resolve(&self, profile: &ProviderProfile) -> Result<Principal, AppError> {
        self.resolve_at(profile, Utc::now()).await
    }

    /// Find or create the principal for `profile`, recording the login.
    ///
    /// A concurrent first login for the same subject loses the insert race
    /// at the store; the loser re-reads the winner's record.
    pub async fn resolve_at(
        &self,
        profile: &ProviderProfile,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        if let Some(existing) = self
            .db
            .find_principal(&profile.provider, &profile.subject_id)
            .await?
        {
            return self.record_login(existing, profile, now).await;
        }

        let principal = Principal::from_profile(profile, now);
        if self.db.create_principal(&principal).await? {
            tracing::info!(
                principal_id = %principal.id,
                provider = %principal.provider,
                subject_id = %principal.provider_subject_id,
                "Created principal"
            );
            return Ok(principal);
        }

        tracing::debug!(
            provider = %profile.provider,
            subject_id = %profile.subject_id,
            "Principal created concurrently, re-reading"
        );
        let winner = self
            .db
            .find_principal(&profile.provider, &profile.subject_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(format!(
                    "principal {}:{} conflicted on insert but is not readable",
                    profile.provider, profile.subject_id
                ))
            })?;
        self.record_login(winner, profile, now).await
    }

    async fn record_login(
        &self,
        mut principal: Principal,
        profile: &ProviderProfile,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        principal.record_login(profile, now);
        self.db.update_principal(&principal).await?;
        tracing::debug!(principal_id = %principal.id, "Recorded login");
        Ok(principal)
    }
}
