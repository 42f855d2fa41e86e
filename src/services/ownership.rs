// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Owner-scoped access to goals and their milestones.
//!
//! `OwnerScope` is the only way handlers reach goal storage. It is bound to
//! the authenticated principal, stamps that principal as owner on create, and
//! passes it as a filter on every lookup. A miss for any reason is reported
//! as `NotFound`, so a goal owned by someone else looks exactly like a goal
//! that never existed.

use crate::db::{Database, GoalMutation};
use crate::error::{AppError, Result};
use crate::models::{
    Goal, GoalInput, Milestone, MilestoneEntry, MilestoneInput, MilestonePatch, Principal,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

pub struct OwnerScope {
    db: Arc<dyn Database>,
    owner_id: String,
}

impl OwnerScope {
    pub fn new(db: Arc<dyn Database>, principal: &Principal) -> Self {
        Self {
            db,
            owner_id: principal.id.clone(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub async fn list_goals(&self) -> Result<Vec<Goal>> {
        self.db.list_goals(&self.owner_id).await
    }

    pub async fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.db
            .find_goal(&self.owner_id, goal_id)
            .await?
            .ok_or_else(AppError::goal_not_found)
    }

    pub async fn create_goal(&self, input: GoalInput) -> Result<Goal> {
        let input = input.normalized();
        input.validate()?;

        let goal = Goal::new(&self.owner_id, input, Utc::now());
        self.db.insert_goal(&goal).await?;

        tracing::info!(goal_id = %goal.id, owner_id = %self.owner_id, "Created goal");
        Ok(goal)
    }

    pub async fn update_goal(&self, goal_id: &str, input: GoalInput) -> Result<Goal> {
        let input = input.normalized();
        input.validate()?;

        self.mutate(goal_id, &|goal| {
            goal.apply_update(input.clone(), Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn delete_goal(&self, goal_id: &str) -> Result<()> {
        if !self.db.delete_goal(&self.owner_id, goal_id).await? {
            return Err(AppError::goal_not_found());
        }
        tracing::info!(goal_id, owner_id = %self.owner_id, "Deleted goal");
        Ok(())
    }

    /// Set progress (0-100); status follows.
    pub async fn set_progress(&self, goal_id: &str, progress: i64) -> Result<Goal> {
        let progress = u8::try_from(progress)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| AppError::BadRequest("Progress must be between 0 and 100".to_string()))?;

        self.mutate(goal_id, &|goal| {
            goal.set_progress(progress, Utc::now());
            Ok(())
        })
        .await
    }

    // ─── Milestones ──────────────────────────────────────────────
    //
    // Every change goes through the owner-filtered atomic update of the parent
    // goal, so concurrent edits to one goal are never lost.

    pub async fn add_milestone(&self, goal_id: &str, input: MilestoneInput) -> Result<Goal> {
        let input = input.normalized();
        input.validate()?;

        self.mutate(goal_id, &|goal| {
            goal.add_milestone(input.clone(), Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn update_milestone(
        &self,
        goal_id: &str,
        milestone_id: &str,
        patch: MilestonePatch,
    ) -> Result<Goal> {
        let patch = patch.normalized();
        patch.validate()?;

        self.mutate(goal_id, &|goal| {
            let now = Utc::now();
            goal.milestone_mut(milestone_id)
                .ok_or_else(AppError::milestone_not_found)?
                .apply(patch.clone(), now);
            goal.updated_at = now;
            Ok(())
        })
        .await
    }

    pub async fn delete_milestone(&self, goal_id: &str, milestone_id: &str) -> Result<Goal> {
        self.mutate(goal_id, &|goal| {
            if goal.remove_milestone(milestone_id, Utc::now()) {
                Ok(())
            } else {
                Err(AppError::milestone_not_found())
            }
        })
        .await
    }

    pub async fn get_milestone(&self, goal_id: &str, milestone_id: &str) -> Result<Milestone> {
        let goal = self.get_goal(goal_id).await?;
        goal.milestones
            .into_iter()
            .find(|m| m.id == milestone_id)
            .ok_or_else(AppError::milestone_not_found)
    }

    /// Every milestone across the caller's goals.
    pub async fn list_milestones(&self) -> Result<Vec<MilestoneEntry>> {
        let goals = self.list_goals().await?;
        Ok(goals
            .into_iter()
            .flat_map(|goal| {
                let goal_id = goal.id;
                let goal_title = goal.title;
                goal.milestones.into_iter().map(move |milestone| MilestoneEntry {
                    goal_id: goal_id.clone(),
                    goal_title: goal_title.clone(),
                    milestone,
                })
            })
            .collect())
    }

    async fn mutate(&self, goal_id: &str, edit: GoalMutation<'_>) -> Result<Goal> {
        self.db
            .update_goal_with(&self.owner_id, goal_id, edit)
            .await?
            .ok_or_else(AppError::goal_not_found)
    }
}
