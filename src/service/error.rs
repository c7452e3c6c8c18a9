use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Contract {0} not found")]
    ContractNotFound(Uuid),

    #[error("Milestone {0} not found")]
    MilestoneNotFound(Uuid),

    #[error("Dispute {0} not found")]
    DisputeNotFound(Uuid),

    #[error("User {0} is not a party to contract {1}")]
    NotContractParty(Uuid, Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    // Harmless duplicate of a transition already applied; callers may treat
    // this as non-fatal, distinct from InvalidState
    #[error("{0}")]
    AlreadyDone(String),

    #[error("Payment provider error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let message = error.to_string();
        HttpError::new(message, error.status_code())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ContractNotFound(_)
            | ServiceError::MilestoneNotFound(_)
            | ServiceError::DisputeNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::NotContractParty(_, _)
            | ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::InvalidState(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::AlreadyDone(_) => StatusCode::CONFLICT,

            ServiceError::ExternalService(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,

            ServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
