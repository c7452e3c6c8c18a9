// handler/contracts.rs
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
    db::paymentdb::PaymentExt,
    dtos::contractdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn contract_handler() -> Router {
    Router::new()
        .route("/:contract_id", get(get_contract).put(edit_contract))
        .route("/:contract_id/sign", post(sign_contract))
        .route("/:contract_id/fund", post(fund_escrow))
        .route("/:contract_id/complete", post(submit_completion))
        .route("/:contract_id/approve-completion", post(approve_completion))
        .route("/:contract_id/cancel", post(cancel_contract))
        .route("/:contract_id/history", get(get_contract_history))
        .route("/:contract_id/transactions", get(get_contract_transactions))
        .route("/:contract_id/disputes", post(crate::handler::disputes::open_dispute))
}

pub async fn get_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (contract, milestones) = app_state
        .contract_service
        .get_contract(&auth.user, contract_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Contract retrieved successfully",
        ContractResponseDto::from_parts(contract, milestones),
    )))
}

pub async fn sign_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = app_state
        .contract_service
        .sign(&auth.user, contract_id)
        .await?;

    let milestones = contract_milestones(&app_state, contract_id).await?;

    Ok(Json(ApiResponse::success(
        "Contract signed successfully",
        ContractResponseDto::from_parts(contract, milestones),
    )))
}

pub async fn fund_escrow(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment_intent_id = app_state
        .contract_service
        .fund_escrow(&auth.user, contract_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Escrow deposit initiated",
        serde_json::json!({ "payment_intent_id": payment_intent_id }),
    )))
}

pub async fn edit_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
    Json(body): Json<EditContractDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (contract, milestones) = app_state
        .contract_service
        .edit(&auth.user, contract_id, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Contract updated successfully",
        ContractResponseDto::from_parts(contract, milestones),
    )))
}

pub async fn submit_completion(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
    Json(body): Json<CompleteContractDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let contract = app_state
        .contract_service
        .submit_completion(&auth.user, contract_id, body.completion_note)
        .await?;

    let milestones = contract_milestones(&app_state, contract_id).await?;

    Ok(Json(ApiResponse::success(
        "Completion requested successfully",
        ContractResponseDto::from_parts(contract, milestones),
    )))
}

pub async fn approve_completion(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = app_state
        .contract_service
        .approve_completion(&auth.user, contract_id)
        .await?;

    let milestones = contract_milestones(&app_state, contract_id).await?;

    Ok(Json(ApiResponse::success(
        "Contract completed successfully",
        ContractResponseDto::from_parts(contract, milestones),
    )))
}

pub async fn cancel_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
    Json(body): Json<CancelContractDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let contract = app_state
        .contract_service
        .cancel(&auth.user, contract_id, body.reason)
        .await?;

    let milestones = contract_milestones(&app_state, contract_id).await?;

    Ok(Json(ApiResponse::success(
        "Contract cancelled",
        ContractResponseDto::from_parts(contract, milestones),
    )))
}

pub async fn get_contract_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let edits = app_state
        .contract_service
        .get_contract_edits(&auth.user, contract_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Contract history retrieved successfully",
        edits,
    )))
}

pub async fn get_contract_transactions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    // Party check rides on the contract read
    let _ = app_state
        .contract_service
        .get_contract(&auth.user, contract_id)
        .await?;

    let transactions = app_state
        .db_client
        .get_contract_transactions(contract_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Transactions retrieved successfully",
        transactions,
    )))
}

async fn contract_milestones(
    app_state: &Arc<AppState>,
    contract_id: Uuid,
) -> Result<Vec<crate::models::contractmodel::Milestone>, HttpError> {
    use crate::db::contractdb::ContractExt;

    app_state
        .db_client
        .get_contract_milestones(contract_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))
}
