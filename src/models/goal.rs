// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Goal aggregate with embedded milestones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Personal,
    Professional,
    Health,
    Education,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Stored goal document.
///
/// `owner_id` is stamped from the authenticated principal at creation and is
/// never taken from request bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Goal ID (UUID v4, also used as document ID)
    pub id: String,
    /// Principal ID of the creator
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: GoalStatus,
    pub priority: Priority,
    pub start_date: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
    /// Percent complete, 0-100
    pub progress: u8,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Milestone embedded in a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    /// Set when `completed` flips to true
    pub completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    /// Create a goal owned by `owner_id`.
    pub fn new(owner_id: &str, input: GoalInput, now: DateTime<Utc>) -> Self {
        let milestones = input
            .milestones
            .unwrap_or_default()
            .into_iter()
            .map(|m| Milestone::new(m, now))
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: input.title,
            description: input.description,
            category: input.category,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            start_date: input.start_date.unwrap_or(now),
            target_date: input.target_date,
            progress: input.progress.map(clamp_progress).unwrap_or(0),
            milestones,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields. Identity, owner and creation time are kept;
    /// milestones are replaced only when the input carries them.
    pub fn apply_update(&mut self, input: GoalInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.description = input.description;
        self.category = input.category;
        if let Some(status) = input.status {
            self.status = status;
        }
        if let Some(priority) = input.priority {
            self.priority = priority;
        }
        if let Some(start_date) = input.start_date {
            self.start_date = start_date;
        }
        self.target_date = input.target_date;
        if let Some(progress) = input.progress {
            self.progress = clamp_progress(progress);
        }
        if let Some(milestones) = input.milestones {
            self.milestones = milestones
                .into_iter()
                .map(|m| Milestone::new(m, now))
                .collect();
        }
        self.updated_at = now;
    }

    /// Set progress; 100 marks the goal completed, anything else in progress.
    pub fn set_progress(&mut self, progress: u8, now: DateTime<Utc>) {
        self.progress = progress;
        self.status = if progress == 100 {
            GoalStatus::Completed
        } else {
            GoalStatus::InProgress
        };
        self.updated_at = now;
    }

    pub fn add_milestone(&mut self, input: MilestoneInput, now: DateTime<Utc>) {
        self.milestones.push(Milestone::new(input, now));
        self.updated_at = now;
    }

    pub fn milestone_mut(&mut self, milestone_id: &str) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == milestone_id)
    }

    /// Remove a milestone, returning whether it existed.
    pub fn remove_milestone(&mut self, milestone_id: &str, now: DateTime<Utc>) -> bool {
        let before = self.milestones.len();
        self.milestones.retain(|m| m.id != milestone_id);
        let removed = self.milestones.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }
}

impl Milestone {
    pub fn new(input: MilestoneInput, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            completed: input.completed,
            due_date: input.due_date,
            completed_at: input.completed.then_some(now),
        }
    }

    pub fn apply(&mut self, patch: MilestonePatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(completed) = patch.completed {
            if completed && !self.completed {
                self.completed_at = Some(now);
            } else if !completed {
                self.completed_at = None;
            }
            self.completed = completed;
        }
    }
}

/// A milestone listed alongside the goal that holds it.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneEntry {
    pub goal_id: String,
    pub goal_title: String,
    pub milestone: Milestone,
}

fn clamp_progress(progress: i32) -> u8 {
    progress.clamp(0, 100) as u8
}

fn validate_future_date(date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *date < Utc::now() {
        let mut err = ValidationError::new("future_date");
        err.message = Some("Target date must be in the future".into());
        return Err(err);
    }
    Ok(())
}

// ─── Request Payloads ────────────────────────────────────────

/// Body of `POST /api/goals` and `PUT /api/goals/{id}`.
///
/// Unknown fields (including any attempt to pass an owner) are ignored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoalInput {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: String,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Description must be between 10 and 1000 characters"
    ))]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub status: Option<GoalStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "validate_future_date"))]
    pub target_date: DateTime<Utc>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    #[serde(default)]
    pub progress: Option<i32>,
    #[validate(nested)]
    #[serde(default)]
    pub milestones: Option<Vec<MilestoneInput>>,
}

impl GoalInput {
    /// Trim free-text fields before validation.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        if let Some(milestones) = self.milestones.take() {
            self.milestones = Some(milestones.into_iter().map(|m| m.normalized()).collect());
        }
        self
    }
}

/// Body of `POST /api/goals/{id}/milestones`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MilestoneInput {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Milestone title must be between 3 and 100 characters"
    ))]
    pub title: String,
    #[validate(length(
        min = 10,
        max = 500,
        message = "Milestone description must be between 10 and 500 characters"
    ))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl MilestoneInput {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self
    }
}

/// Body of `PUT /api/goals/{id}/milestones/{milestone_id}`; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MilestonePatch {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Milestone title must be between 3 and 100 characters"
    ))]
    pub title: Option<String>,
    #[validate(length(
        min = 10,
        max = 500,
        message = "Milestone description must be between 10 and 500 characters"
    ))]
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
}

impl MilestonePatch {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.description = self.description.map(|d| d.trim().to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> GoalInput {
        GoalInput {
            title: "  Run a marathon  ".to_string(),
            description: "Train for and finish a full marathon".to_string(),
            category: Category::Health,
            status: None,
            priority: None,
            start_date: None,
            target_date: Utc::now() + Duration::days(90),
            progress: None,
            milestones: Some(vec![MilestoneInput {
                title: "Run 10k".to_string(),
                description: "Finish a 10k without stopping".to_string(),
                completed: false,
                due_date: None,
            }]),
        }
    }

    #[test]
    fn test_new_goal_defaults() {
        let now = Utc::now();
        let goal = Goal::new("owner-1", input().normalized(), now);

        assert_eq!(goal.owner_id, "owner-1");
        assert_eq!(goal.title, "Run a marathon");
        assert_eq!(goal.status, GoalStatus::NotStarted);
        assert_eq!(goal.priority, Priority::Medium);
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.start_date, now);
        assert_eq!(goal.milestones.len(), 1);
        assert!(!goal.milestones[0].id.is_empty());
    }

    #[test]
    fn test_set_progress_drives_status() {
        let now = Utc::now();
        let mut goal = Goal::new("owner-1", input(), now);

        goal.set_progress(40, now);
        assert_eq!(goal.status, GoalStatus::InProgress);

        goal.set_progress(100, now);
        assert_eq!(goal.status, GoalStatus::Completed);
    }

    #[test]
    fn test_update_keeps_identity_and_milestones() {
        let created = Utc::now() - Duration::days(1);
        let mut goal = Goal::new("owner-1", input(), created);
        let id = goal.id.clone();

        let mut update = input();
        update.title = "Run two marathons".to_string();
        update.milestones = None;
        let now = Utc::now();
        goal.apply_update(update, now);

        assert_eq!(goal.id, id);
        assert_eq!(goal.owner_id, "owner-1");
        assert_eq!(goal.created_at, created);
        assert_eq!(goal.updated_at, now);
        assert_eq!(goal.title, "Run two marathons");
        assert_eq!(goal.milestones.len(), 1);
    }

    #[test]
    fn test_milestone_completion_timestamps() {
        let now = Utc::now();
        let mut goal = Goal::new("owner-1", input(), now);
        let milestone_id = goal.milestones[0].id.clone();

        let milestone = goal.milestone_mut(&milestone_id).unwrap();
        milestone.apply(
            MilestonePatch {
                completed: Some(true),
                ..Default::default()
            },
            now,
        );
        assert!(milestone.completed);
        assert_eq!(milestone.completed_at, Some(now));

        milestone.apply(
            MilestonePatch {
                completed: Some(false),
                ..Default::default()
            },
            now,
        );
        assert!(!milestone.completed);
        assert_eq!(milestone.completed_at, None);

        assert!(goal.remove_milestone(&milestone_id, now));
        assert!(!goal.remove_milestone(&milestone_id, now));
    }

    #[test]
    fn test_validation_rules() {
        assert!(input().normalized().validate().is_ok());

        let mut short_title = input();
        short_title.title = "  ab ".to_string();
        assert!(short_title.normalized().validate().is_err());

        let mut past = input();
        past.target_date = Utc::now() - Duration::days(1);
        assert!(past.validate().is_err());

        let mut progress = input();
        progress.progress = Some(101);
        assert!(progress.validate().is_err());

        let mut bad_milestone = input();
        bad_milestone.milestones = Some(vec![MilestoneInput {
            title: "ok title".to_string(),
            description: "short".to_string(),
            completed: false,
            due_date: None,
        }]);
        assert!(bad_milestone.validate().is_err());
    }

    #[test]
    fn test_unknown_owner_field_is_ignored() {
        let body = serde_json::json!({
            "title": "Learn Rust",
            "description": "Work through the async book",
            "category": "education",
            "target_date": (Utc::now() + Duration::days(30)).to_rfc3339(),
            "owner_id": "someone-else"
        });
        let parsed: GoalInput = serde_json::from_value(body).unwrap();
        let goal = Goal::new("owner-1", parsed, Utc::now());
        assert_eq!(goal.owner_id, "owner-1");
    }
}
