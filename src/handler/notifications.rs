// handler/notifications.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::notificationdb::NotificationExt,
    dtos::contractdtos::ApiResponse,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn notification_handler() -> Router {
    Router::new()
        .route("/", get(get_notifications))
        .route("/:notification_id/read", put(mark_read))
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn get_notifications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Query(params): Query<NotificationQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;

    let notifications = app_state
        .db_client
        .get_user_notifications(auth.user.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Notifications retrieved successfully",
        notifications,
    )))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let notification = app_state
        .db_client
        .mark_notification_read(notification_id, auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Notification not found"))?;

    Ok(Json(ApiResponse::success(
        "Notification marked as read",
        notification,
    )))
}
