use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    cart::{CartError, CheckoutError},
    gateway::GatewayError,
    response::{ApiResponse, Meta},
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    Gateway(#[from] GatewayError),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::MissingUser => AppError::Unauthorized(err.to_string()),
            CartError::QuantityLimit { .. } | CartError::AmountOverflow => {
                AppError::BadRequest(err.to_string())
            }
            CartError::Gateway(source) => AppError::Gateway(source),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(reason) => AppError::BadRequest(reason.to_string()),
            CheckoutError::Cart(source) => source.into(),
            CheckoutError::OrderInsert(source) => AppError::Gateway(source),
            err @ CheckoutError::OrderItems { .. } => AppError::Internal(err.into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Gateway(err @ GatewayError::Conflict(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            AppError::Gateway(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Storage(StorageError::InvalidName(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let error = match &self {
            AppError::Internal(err) => format!("{err:#}"),
            other => other.to_string(),
        };
        let body = ApiResponse {
            message,
            data: Some(ErrorData { error }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
