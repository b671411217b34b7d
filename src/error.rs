//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{AmountError, DomainError};
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Domain error carried by this error, if any
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            AppError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Check if retrying the whole operation may succeed
    pub fn is_conflict(&self) -> bool {
        self.as_domain().is_some_and(DomainError::is_conflict_error)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => {
                AppError::Domain(DomainError::not_found(key.entity(), key.id()))
            }
            StoreError::ConcurrencyConflict { key, .. } => {
                AppError::Domain(DomainError::ConcurrencyConflict(key.to_string()))
            }
            other => AppError::Store(other),
        }
    }
}

impl From<AmountError> for AppError {
    fn from(err: AmountError) -> Self {
        AppError::Domain(err.into())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InvalidAmount(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
                }
                DomainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_failed", Some(msg.clone()))
                }
                DomainError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(domain_err.to_string()),
                ),
                DomainError::RepaymentExceedsOutstanding { .. } => (
                    StatusCode::BAD_REQUEST,
                    "repayment_exceeds_outstanding",
                    Some(domain_err.to_string()),
                ),
                DomainError::SelfTransfer => {
                    (StatusCode::BAD_REQUEST, "self_transfer", None)
                }
                DomainError::CredentialMismatch { .. } => {
                    (StatusCode::UNAUTHORIZED, "credential_mismatch", None)
                }
                DomainError::Blocked { .. } => (
                    StatusCode::FORBIDDEN,
                    "instrument_blocked",
                    Some(domain_err.to_string()),
                ),
                DomainError::NotFound { .. } => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    Some(domain_err.to_string()),
                ),
                DomainError::AlreadyExists(msg) => {
                    (StatusCode::CONFLICT, "already_exists", Some(msg.clone()))
                }
                DomainError::ConcurrencyConflict(msg) => {
                    (StatusCode::CONFLICT, "concurrency_conflict", Some(msg.clone()))
                }
            },

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        // Server-side detail stays in the logs
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountNumber, CardNumber, InstrumentRef};
    use crate::store::RecordKey;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_store_not_found_becomes_domain_not_found() {
        let err: AppError = StoreError::NotFound(RecordKey::Account(AccountNumber::new(42))).into();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::NotFound {
                entity: "Account",
                ..
            })
        ));
        assert_eq!(err.to_string(), "Account not found: 42");
    }

    #[tokio::test]
    async fn test_card_not_found_body_masks_number() {
        use http_body_util::BodyExt;

        let err: AppError =
            StoreError::NotFound(RecordKey::DebitCard(CardNumber::new(4000_1234_5678_9010))).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("**9010"), "{}", body);
        assert!(!body.contains("4000123456789010"), "{}", body);
    }

    #[test]
    fn test_store_conflict_is_retryable_conflict() {
        let err: AppError = StoreError::ConcurrencyConflict {
            key: RecordKey::Account(AccountNumber::new(42)),
            expected: Some(1),
            actual: Some(2),
        }
        .into();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_status_mapping() {
        let account = InstrumentRef::Account(AccountNumber::new(1));

        assert_eq!(
            status_of(DomainError::insufficient_balance(1.into(), 0.into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::SelfTransfer.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::CredentialMismatch { instrument: account }.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(DomainError::Blocked { instrument: account }.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainError::not_found("Account", 1).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::AlreadyExists("SAVINGS".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Poisoned.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
