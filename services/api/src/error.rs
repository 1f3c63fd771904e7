//! Request-level errors and their HTTP rendering.
//!
//! This is the only place an error becomes a status code. Bodies carry a
//! fixed message per status; the error's own text is for logs only.

use axum::http::StatusCode;
use dto::ErrorBody;
use uuid::Uuid;

use crate::aggregator::AggregationError;
use crate::auth::AuthenticationError;
use crate::policy::CategoryDenied;
use crate::tenant::TenantMismatch;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthenticationError),
    #[error(transparent)]
    TenantMismatch(#[from] TenantMismatch),
    #[error(transparent)]
    CategoryDenied(#[from] CategoryDenied),
    #[error("invalid request: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::TenantMismatch(_) | Self::CategoryDenied(_) => StatusCode::FORBIDDEN,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHORIZED",
            Self::TenantMismatch(_) | Self::CategoryDenied(_) => "FORBIDDEN",
            Self::InvalidQuery(_) => "BAD_REQUEST",
            Self::Aggregation(_) => "INTERNAL_ERROR",
        }
    }

    const fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "authentication required",
            Self::TenantMismatch(_) | Self::CategoryDenied(_) => "access denied",
            Self::InvalidQuery(_) => "invalid request",
            Self::Aggregation(_) => "internal server error",
        }
    }

    pub fn body(&self, request_id: Option<Uuid>) -> ErrorBody {
        ErrorBody {
            status: "error".to_string(),
            code: self.error_code().to_string(),
            message: self.public_message().to_string(),
            request_id,
        }
    }

    /// Logs the error at a level matching who is at fault.
    pub fn log(&self) {
        match self {
            Self::Unauthenticated(err) => {
                tracing::warn!(kind = err.kind(), "request not authenticated");
            }
            Self::TenantMismatch(err) => {
                tracing::warn!(requested = %err.requested, "tenant outside credential scope");
            }
            Self::CategoryDenied(err) => {
                tracing::warn!(role = %err.role, "role may not read requested categories");
            }
            Self::InvalidQuery(reason) => {
                tracing::debug!(%reason, "rejected query string");
            }
            Self::Aggregation(error) => {
                tracing::error!(%error, "metrics aggregation failed");
            }
        }
    }
}
