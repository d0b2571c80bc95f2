use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{api::CollaboratorError, api::razorpay::GatewayError, store::StoreError};

/// Envelope returned by every endpoint.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("minimum withdrawal amount is {minimum} paise")]
    MinimumNotMet { minimum: i64 },

    #[error("missing or malformed {0} header")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ForbiddenResource(String),

    #[error("product is not a booking product")]
    InvalidProductType,

    #[error("requested slot is no longer available")]
    SlotUnavailable,

    #[error("a payout is already in progress")]
    PayoutInProgress,

    #[error("{0} is already cancelled")]
    AlreadyCancelled(&'static str),

    #[error("coupon code '{0}' already exists")]
    DuplicateCoupon(String),

    #[error("{0}")]
    PolicyViolation(String),

    #[error("insufficient balance: available {available} paise")]
    InsufficientBalance { available: i64 },

    #[error("payout settings not configured")]
    NotConfigured,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    ServiceUnreachable(#[from] CollaboratorError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::NotConfigured => StatusCode::BAD_REQUEST,
            Self::MinimumNotMet { .. }
            | Self::InsufficientBalance { .. }
            | Self::PolicyViolation(_)
            | Self::InvalidProductType => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) | Self::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            Self::InvalidSignature | Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::SlotUnavailable
            | Self::PayoutInProgress
            | Self::AlreadyCancelled(_)
            | Self::DuplicateCoupon(_) => StatusCode::CONFLICT,
            Self::Gateway(_) | Self::ServiceUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "VALIDATION_ERROR",
            Self::MinimumNotMet { .. } => "MINIMUM_NOT_MET",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::ForbiddenResource(_) => "FORBIDDEN",
            Self::InvalidProductType => "INVALID_PRODUCT_TYPE",
            Self::SlotUnavailable => "SLOT_UNAVAILABLE",
            Self::PayoutInProgress => "PAYOUT_IN_PROGRESS",
            Self::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            Self::DuplicateCoupon(_) => "DUPLICATE_COUPON",
            Self::PolicyViolation(_) => "POLICY_VIOLATION",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Gateway(_) | Self::ServiceUnreachable(_) => "GATEWAY_ERROR",
            Self::Store(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            match self {
                Self::Gateway(_) | Self::ServiceUnreachable(_) => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = StdResponse::<(), ErrorBody> {
            data: None,
            message: Some(ErrorBody {
                code: self.code(),
                message,
            }),
        };

        (status, Json(body)).into_response()
    }
}
