// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        contracts::contract_handler,
        disputes::dispute_handler,
        milestones::milestone_handler,
        notifications::notification_handler,
        webhook::webhook_handler,
    },
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest(
            "/contracts",
            contract_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/milestones",
            milestone_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/disputes",
            dispute_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/notifications",
            notification_handler().layer(middleware::from_fn(auth)),
        )
        // Signature-gated, no session auth
        .nest("/webhook", webhook_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
