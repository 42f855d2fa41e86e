// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Uniqueness of `(provider, subject_id)` is enforced by the map entry API,
//! mirroring the create-if-absent semantics of the Firestore backend.

use super::{Database, GoalMutation};
use crate::error::AppError;
use crate::models::principal::identity_key;
use crate::models::{Goal, Principal};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryDb {
    /// Principals keyed by identity key
    principals: DashMap<String, Principal>,
    /// Principal ID -> identity key
    principal_ids: DashMap<String, String>,
    /// Goals keyed by goal ID
    goals: DashMap<String, Goal>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored principals.
    pub fn principal_count(&self) -> usize {
        self.principals.len()
    }

    /// Remove a principal outright (account removal outside this service).
    pub fn remove_principal(&self, principal_id: &str) -> Option<Principal> {
        let (_, key) = self.principal_ids.remove(principal_id)?;
        self.principals.remove(&key).map(|(_, p)| p)
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn find_principal(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> Result<Option<Principal>, AppError> {
        Ok(self
            .principals
            .get(&identity_key(provider, subject_id))
            .map(|p| p.clone()))
    }

    async fn get_principal(&self, principal_id: &str) -> Result<Option<Principal>, AppError> {
        let Some(key) = self.principal_ids.get(principal_id).map(|k| k.clone()) else {
            return Ok(None);
        };
        Ok(self.principals.get(&key).map(|p| p.clone()))
    }

    async fn create_principal(&self, principal: &Principal) -> Result<bool, AppError> {
        match self.principals.entry(principal.identity_key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.principal_ids
                    .insert(principal.id.clone(), principal.identity_key());
                slot.insert(principal.clone());
                Ok(true)
            }
        }
    }

    async fn update_principal(&self, principal: &Principal) -> Result<(), AppError> {
        match self.principals.get_mut(&principal.identity_key()) {
            Some(mut existing) if existing.id == principal.id => {
                *existing = principal.clone();
                Ok(())
            }
            Some(_) => Err(AppError::Database(format!(
                "principal {} does not own identity {}",
                principal.id,
                principal.identity_key()
            ))),
            None => Err(AppError::Database(format!(
                "principal {} not found for update",
                principal.id
            ))),
        }
    }

    async fn insert_goal(&self, goal: &Goal) -> Result<(), AppError> {
        self.goals.insert(goal.id.clone(), goal.clone());
        Ok(())
    }

    async fn find_goal(&self, owner_id: &str, goal_id: &str) -> Result<Option<Goal>, AppError> {
        Ok(self
            .goals
            .get(goal_id)
            .filter(|g| g.owner_id == owner_id)
            .map(|g| g.clone()))
    }

    async fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>, AppError> {
        let mut goals: Vec<Goal> = self
            .goals
            .iter()
            .filter(|g| g.owner_id == owner_id)
            .map(|g| g.clone())
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn update_goal_with(
        &self,
        owner_id: &str,
        goal_id: &str,
        mutate: GoalMutation<'_>,
    ) -> Result<Option<Goal>, AppError> {
        // The shard stays write-locked until the edit is stored
        let Some(mut existing) = self.goals.get_mut(goal_id) else {
            return Ok(None);
        };
        if existing.owner_id != owner_id {
            return Ok(None);
        }

        let mut updated = existing.clone();
        mutate(&mut updated)?;
        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_goal(&self, owner_id: &str, goal_id: &str) -> Result<bool, AppError> {
        Ok(self
            .goals
            .remove_if(goal_id, |_, g| g.owner_id == owner_id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, GoalInput, ProviderProfile};
    use chrono::{Duration, Utc};

    fn principal(subject: &str) -> Principal {
        Principal::from_profile(
            &ProviderProfile {
                provider: "github".to_string(),
                subject_id: subject.to_string(),
                username: format!("user{}", subject),
                display_name: None,
                email: None,
                avatar_url: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_principal_rejects_duplicate_identity() {
        let db = MemoryDb::new();
        let first = principal("7");
        let second = principal("7");

        assert!(db.create_principal(&first).await.unwrap());
        assert!(!db.create_principal(&second).await.unwrap());
        assert_eq!(db.principal_count(), 1);

        let stored = db.find_principal("github", "7").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert!(db.get_principal(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_principal_cannot_swap_id() {
        let db = MemoryDb::new();
        let original = principal("8");
        db.create_principal(&original).await.unwrap();

        let mut impostor = principal("8");
        impostor.username = "mallory".to_string();
        assert!(db.update_principal(&impostor).await.is_err());

        let stored = db.get_principal(&original.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "user8");
    }

    #[tokio::test]
    async fn test_remove_principal() {
        let db = MemoryDb::new();
        let p = principal("9");
        db.create_principal(&p).await.unwrap();

        assert!(db.remove_principal(&p.id).is_some());
        assert!(db.get_principal(&p.id).await.unwrap().is_none());
        assert_eq!(db.principal_count(), 0);
    }

    fn goal(owner_id: &str) -> Goal {
        Goal::new(
            owner_id,
            GoalInput {
                title: "Run a marathon".to_string(),
                description: "Train through the spring".to_string(),
                category: Category::Health,
                status: None,
                priority: None,
                start_date: None,
                target_date: Utc::now() + Duration::days(120),
                progress: None,
                milestones: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_update_goal_with_is_owner_filtered() {
        let db = MemoryDb::new();
        let g = goal("owner");
        db.insert_goal(&g).await.unwrap();

        let rename = |goal: &mut Goal| -> Result<(), AppError> {
            goal.title = "Hijacked".to_string();
            Ok(())
        };
        assert!(db
            .update_goal_with("stranger", &g.id, &rename)
            .await
            .unwrap()
            .is_none());
        assert!(db
            .update_goal_with("owner", "missing", &rename)
            .await
            .unwrap()
            .is_none());

        let stored = db.find_goal("owner", &g.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Run a marathon");
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let db = MemoryDb::new();
        let g = goal("owner");
        db.insert_goal(&g).await.unwrap();

        let result = db
            .update_goal_with("owner", &g.id, &|goal: &mut Goal| -> Result<(), AppError> {
                goal.title = "Half done".to_string();
                Err(AppError::milestone_not_found())
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let stored = db.find_goal("owner", &g.id).await.unwrap().unwrap();
        assert_eq!(stored, g);
    }
}
