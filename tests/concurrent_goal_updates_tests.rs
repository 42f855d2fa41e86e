// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Overlapping edits to one goal must all be kept.

use chrono::{Duration, Utc};
use goal_tracker::db::{Database, MemoryDb};
use goal_tracker::error::AppError;
use goal_tracker::models::{Category, GoalInput, MilestoneInput, Principal};
use goal_tracker::services::OwnerScope;
use std::collections::HashSet;
use std::sync::Arc;

mod common;
use common::github_profile;

fn scope(db: Arc<dyn Database>) -> OwnerScope {
    OwnerScope::new(db, &Principal::from_profile(&github_profile("7", "erin"), Utc::now()))
}

fn goal_input() -> GoalInput {
    GoalInput {
        title: "Learn the cello".to_string(),
        description: "Practice every evening".to_string(),
        category: Category::Education,
        status: None,
        priority: None,
        start_date: None,
        target_date: Utc::now() + Duration::days(365),
        progress: None,
        milestones: None,
    }
}

fn milestone(n: usize) -> MilestoneInput {
    MilestoneInput {
        title: format!("Piece number {}", n),
        description: format!("Play piece {} start to finish", n),
        completed: false,
        due_date: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_milestone_adds_are_all_kept() {
    let db: Arc<dyn Database> = Arc::new(MemoryDb::new());
    let owner = Arc::new(scope(db));
    let goal = owner.create_goal(goal_input()).await.unwrap();

    let handles: Vec<_> = (0..200)
        .map(|n| {
            let owner = owner.clone();
            let goal_id = goal.id.clone();
            tokio::spawn(async move { owner.add_milestone(&goal_id, milestone(n)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = owner.get_goal(&goal.id).await.unwrap();
    assert_eq!(stored.milestones.len(), 200);
    let titles: HashSet<_> = stored.milestones.iter().map(|m| m.title.clone()).collect();
    assert_eq!(titles.len(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_progress_and_milestone_edits_interleave() {
    let db: Arc<dyn Database> = Arc::new(MemoryDb::new());
    let owner = Arc::new(scope(db));
    let goal = owner.create_goal(goal_input()).await.unwrap();

    let adder = {
        let owner = owner.clone();
        let goal_id = goal.id.clone();
        tokio::spawn(async move {
            for n in 0..50 {
                owner.add_milestone(&goal_id, milestone(n)).await.unwrap();
            }
        })
    };
    let progress = {
        let owner = owner.clone();
        let goal_id = goal.id.clone();
        tokio::spawn(async move {
            for p in 0..50 {
                owner.set_progress(&goal_id, p).await.unwrap();
            }
        })
    };
    adder.await.unwrap();
    progress.await.unwrap();

    let stored = owner.get_goal(&goal.id).await.unwrap();
    assert_eq!(stored.milestones.len(), 50);
    assert_eq!(stored.progress, 49);
}

#[tokio::test]
async fn test_edit_after_delete_does_not_recreate_goal() {
    let db: Arc<dyn Database> = Arc::new(MemoryDb::new());
    let owner = scope(db);
    let goal = owner.create_goal(goal_input()).await.unwrap();

    owner.delete_goal(&goal.id).await.unwrap();

    assert!(matches!(
        owner.add_milestone(&goal.id, milestone(1)).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        owner.set_progress(&goal.id, 10).await,
        Err(AppError::NotFound(_))
    ));
    assert!(owner.list_goals().await.unwrap().is_empty());
}
