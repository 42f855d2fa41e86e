// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal and milestone routes. Every handler goes through `OwnerScope`.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Goal, GoalInput, Milestone, MilestoneEntry, MilestoneInput, MilestonePatch};
use crate::services::OwnerScope;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Goal routes (require authentication via bearer token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route(
            "/api/goals/{id}",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/api/goals/{id}/progress", put(update_progress))
        .route(
            "/api/goals/{id}/milestones",
            get(list_goal_milestones).post(add_milestone),
        )
        .route(
            "/api/goals/{id}/milestones/{milestone_id}",
            put(update_milestone).delete(delete_milestone),
        )
        .route("/api/milestones", get(list_milestones))
}

fn scope(state: &AppState, user: &AuthUser) -> OwnerScope {
    OwnerScope::new(state.db.clone(), &user.principal)
}

// ─── Goals ───────────────────────────────────────────────────

async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Goal>>> {
    Ok(Json(scope(&state, &user).list_goals().await?))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(input), _): WithRejection<Json<GoalInput>, AppError>,
) -> Result<(StatusCode, Json<Goal>)> {
    let goal = scope(&state, &user).create_goal(input).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Goal>> {
    Ok(Json(scope(&state, &user).get_goal(&id).await?))
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<GoalInput>, AppError>,
) -> Result<Json<Goal>> {
    Ok(Json(scope(&state, &user).update_goal(&id, input).await?))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    scope(&state, &user).delete_goal(&id).await?;
    Ok(Json(MessageResponse {
        message: "Goal deleted successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: i64,
}

async fn update_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<ProgressRequest>, AppError>,
) -> Result<Json<Goal>> {
    Ok(Json(
        scope(&state, &user).set_progress(&id, body.progress).await?,
    ))
}

// ─── Milestones ──────────────────────────────────────────────

async fn list_goal_milestones(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Milestone>>> {
    let goal = scope(&state, &user).get_goal(&id).await?;
    Ok(Json(goal.milestones))
}

async fn add_milestone(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<MilestoneInput>, AppError>,
) -> Result<(StatusCode, Json<Goal>)> {
    let goal = scope(&state, &user).add_milestone(&id, input).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn update_milestone(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, milestone_id)): Path<(String, String)>,
    WithRejection(Json(patch), _): WithRejection<Json<MilestonePatch>, AppError>,
) -> Result<Json<Goal>> {
    Ok(Json(
        scope(&state, &user)
            .update_milestone(&id, &milestone_id, patch)
            .await?,
    ))
}

async fn delete_milestone(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, milestone_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    scope(&state, &user)
        .delete_milestone(&id, &milestone_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Milestone deleted successfully".to_string(),
    }))
}

async fn list_milestones(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<MilestoneEntry>>> {
    Ok(Json(scope(&state, &user).list_milestones().await?))
}
