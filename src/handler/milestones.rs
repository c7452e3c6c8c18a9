// handler/milestones.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::contractdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn milestone_handler() -> Router {
    Router::new()
        .route("/:milestone_id/submit", post(submit_milestone))
        .route("/:milestone_id/approve", post(approve_milestone))
        .route("/:milestone_id/reject", post(reject_milestone))
}

pub async fn submit_milestone(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(milestone_id): Path<Uuid>,
    Json(body): Json<SubmitMilestoneDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let milestone = app_state
        .milestone_service
        .submit(&auth.user, milestone_id, body.submission_note)
        .await?;

    Ok(Json(ApiResponse::success(
        "Milestone submitted successfully",
        MilestoneResponseDto::from(milestone),
    )))
}

pub async fn approve_milestone(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(milestone_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let milestone = app_state
        .milestone_service
        .approve(&auth.user, milestone_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Milestone approved, payout initiated",
        MilestoneResponseDto::from(milestone),
    )))
}

pub async fn reject_milestone(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(milestone_id): Path<Uuid>,
    Json(body): Json<RejectMilestoneDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let milestone = app_state
        .milestone_service
        .reject(&auth.user, milestone_id, body.feedback)
        .await?;

    Ok(Json(ApiResponse::success(
        "Milestone sent back for changes",
        MilestoneResponseDto::from(milestone),
    )))
}
