//! Error types and the response envelope for the Billing API.
//!
//! ```json
//! { "success": false, "data": null, "message": "Order not found: ord-9", "code": "NOT_FOUND" }
//! ```
//!
//! | BillingError                                   | Status |
//! |------------------------------------------------|--------|
//! | NotFound                                       | 404    |
//! | Validation, InvalidStateTransition,            | 400    |
//! | InsufficientBalance, PromotionLimitExceeded    |        |
//! | Forbidden                                      | 403    |
//! | Conflict                                       | 409    |
//! | Internal                                       | 500    |

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use tavola_core::{BillingError, ValidationError};

/// Uniform response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub code: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: message.into(),
            code: "OK".to_string(),
        }
    }
}

/// Billing API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// Body or query string could not be decoded.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Billing(e) => match e {
                BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
                BillingError::Forbidden(_) => StatusCode::FORBIDDEN,
                BillingError::Conflict(_) => StatusCode::CONFLICT,
                BillingError::Validation(_)
                | BillingError::InvalidStateTransition { .. }
                | BillingError::InsufficientBalance { .. }
                | BillingError::PromotionLimitExceeded { .. } => StatusCode::BAD_REQUEST,
                BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Billing(e) => e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Billing(BillingError::Internal(detail)) => {
                error!(target: "internal", error = %detail, "Internal error occurred");
                "Internal server error".to_string()
            }
            ApiError::Billing(BillingError::Validation(detail)) => detail.clone(),
            other => other.to_string(),
        };

        let body = Json(ApiResponse::<()> {
            success: false,
            data: None,
            message,
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Billing(e.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
