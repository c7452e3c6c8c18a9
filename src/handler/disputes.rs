// handler/disputes.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{contractdtos::ApiResponse, disputedtos::*},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn dispute_handler() -> Router {
    Router::new()
        .route("/:dispute_id", get(get_dispute))
        .route("/:dispute_id/resolve", post(resolve_dispute))
}

pub async fn get_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(dispute_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let dispute = app_state
        .dispute_service
        .get_dispute(&auth.user, dispute_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Dispute retrieved successfully",
        DisputeResponseDto::from(dispute),
    )))
}

// Mounted under /contracts/:contract_id/disputes
pub async fn open_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
    Json(body): Json<OpenDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let dispute = app_state
        .dispute_service
        .open_dispute(&auth.user, contract_id, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Dispute opened successfully",
        DisputeResponseDto::from(dispute),
    )))
}

pub async fn resolve_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(dispute_id): Path<Uuid>,
    Json(body): Json<ResolveDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let dispute = app_state
        .dispute_service
        .resolve_dispute(&auth.user, dispute_id, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Dispute resolved",
        DisputeResponseDto::from(dispute),
    )))
}
