// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Principals (keyed by provider identity, so the document ID is the
//!   uniqueness constraint)
//! - Goals (milestones embedded, every query filtered by `owner_id`)

use super::{collections, Database, GoalMutation};
use crate::error::AppError;
use crate::models::principal::identity_key;
use crate::models::{Goal, Principal};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;

/// Conditional goal writes retried before giving up on a contended document.
const GOAL_UPDATE_ATTEMPTS: usize = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl Database for FirestoreDb {
    // ─── Principal Operations ────────────────────────────────────

    async fn find_principal(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> Result<Option<Principal>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::PRINCIPALS)
            .obj()
            .one(&identity_key(provider, subject_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_principal(&self, principal_id: &str) -> Result<Option<Principal>, AppError> {
        let principal_id = principal_id.to_string();
        let mut found: Vec<Principal> = self
            .client
            .fluent()
            .select()
            .from(collections::PRINCIPALS)
            .filter(move |q| q.for_all([q.field("id").eq(principal_id.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.pop())
    }

    async fn create_principal(&self, principal: &Principal) -> Result<bool, AppError> {
        // `insert` carries an implicit "must not exist" precondition.
        let result: Result<Principal, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::PRINCIPALS)
            .document_id(principal.identity_key())
            .object(principal)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(e)) => {
                tracing::debug!(
                    identity = %principal.identity_key(),
                    error = %e,
                    "Principal already exists"
                );
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn update_principal(&self, principal: &Principal) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::PRINCIPALS)
            .document_id(principal.identity_key())
            .object(principal)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Goal Operations ─────────────────────────────────────────

    async fn insert_goal(&self, goal: &Goal) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::GOALS)
            .document_id(&goal.id)
            .object(goal)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_goal(&self, owner_id: &str, goal_id: &str) -> Result<Option<Goal>, AppError> {
        let mut found: Vec<Goal> = self
            .client
            .fluent()
            .select()
            .from(collections::GOALS)
            .filter(|q| {
                q.for_all([
                    q.field("id").eq(goal_id),
                    q.field("owner_id").eq(owner_id),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.pop())
    }

    async fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::GOALS)
            .filter(|q| q.for_all([q.field("owner_id").eq(owner_id)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Optimistic read-modify-write.
    ///
    /// The write carries the document's `update_time` as a precondition, so it
    /// fails if anyone else wrote or deleted the goal after our read. On
    /// conflict the goal is re-read and `mutate` applied to the fresh copy.
    async fn update_goal_with(
        &self,
        owner_id: &str,
        goal_id: &str,
        mutate: GoalMutation<'_>,
    ) -> Result<Option<Goal>, AppError> {
        for attempt in 1..=GOAL_UPDATE_ATTEMPTS {
            let doc = self
                .client
                .fluent()
                .select()
                .by_id_in(collections::GOALS)
                .one(goal_id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            let Some(doc) = doc else {
                return Ok(None);
            };

            let mut goal: Goal = firestore::FirestoreDb::deserialize_doc_to(&doc)
                .map_err(|e| AppError::Database(e.to_string()))?;
            if goal.owner_id != owner_id {
                return Ok(None);
            }
            let read_at = doc
                .update_time
                .clone()
                .ok_or_else(|| AppError::Database(format!("goal {} has no update_time", goal_id)))
                .and_then(|ts| {
                    firestore::timestamp_utils::from_timestamp(ts)
                        .map_err(|e| AppError::Database(e.to_string()))
                })?;

            mutate(&mut goal)?;

            let written: Result<(), FirestoreError> = self
                .client
                .fluent()
                .update()
                .in_col(collections::GOALS)
                .precondition(FirestoreWritePrecondition::UpdateTime(read_at))
                .document_id(goal_id)
                .object(&goal)
                .execute()
                .await;

            match written {
                Ok(()) => return Ok(Some(goal)),
                // Deleted after our read
                Err(FirestoreError::DataNotFoundError(_)) => return Ok(None),
                Err(FirestoreError::DatabaseError(e))
                    if e.public.code == "FailedPrecondition" || e.public.code == "Aborted" =>
                {
                    tracing::debug!(goal_id, attempt, "Goal changed during update, retrying");
                }
                Err(e) => return Err(AppError::Database(e.to_string())),
            }
        }

        tracing::warn!(goal_id, owner_id, "Goal update contended, giving up");
        Err(AppError::Database(format!(
            "goal {} update conflicted {} times",
            goal_id, GOAL_UPDATE_ATTEMPTS
        )))
    }

    async fn delete_goal(&self, owner_id: &str, goal_id: &str) -> Result<bool, AppError> {
        if self.find_goal(owner_id, goal_id).await?.is_none() {
            return Ok(false);
        }

        self.client
            .fluent()
            .delete()
            .from(collections::GOALS)
            .document_id(goal_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(goal_id, owner_id, "Deleted goal");
        Ok(true)
    }
}
