/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Message shown for any transport failure; the caller may simply retry.
pub const RETRY_MESSAGE: &str = "Failed to reach the observatory service. Please try again.";

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Reasons a request form refuses to go to confirmation.
///
/// Checked in declaration order; the first failing check wins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Fill all required fields: Requester, Target, R.A., Dec.")]
    MissingFields,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Target visibility is still loading. Please wait for the visibility plot.")]
    VisibilityPending,
    #[error(
        "The entered RA and DEC are not in any observable conditions. Check the visibility plot."
    )]
    NotObservable,
    #[error("Invalid {axis}: {value:?}")]
    InvalidCoordinate { axis: &'static str, value: String },
    #[error("Please enter a valid exposure time.")]
    InvalidExposure,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("External API error: {0}")]
    ExternalApi(#[from] reqwest::Error),
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    SubmitFailed(String),
}

impl ApiError {
    /// Stable machine-readable code for the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ExternalApi(e) => match e.status().map(|s| s.as_u16()) {
                Some(403) => "UPSTREAM_403",
                Some(404) => "UPSTREAM_404",
                Some(429) => "UPSTREAM_429",
                Some(500..=599) => "UPSTREAM_5XX",
                _ if e.is_timeout() => "UPSTREAM_TIMEOUT",
                _ => "UPSTREAM_ERROR",
            },
            ApiError::Upstream { status, .. } => match status {
                404 => "UPSTREAM_404",
                500..=599 => "UPSTREAM_5XX",
                _ => "UPSTREAM_ERROR",
            },
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::SubmitFailed(_) => "SUBMIT_FAILED",
        }
    }

    /// Transport and upstream failures are the only retryable class
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::ExternalApi(_) | ApiError::Upstream { .. })
    }

    /// Text shown to the user; transport details stay in the logs
    pub fn user_message(&self) -> String {
        if self.is_transport() {
            RETRY_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::ExternalApi(e) => {
                error!("upstream request failed: {}", e);
                RETRY_MESSAGE.to_string()
            }
            ApiError::Upstream { status, message } => {
                error!("upstream reported {}: {}", status, message);
                RETRY_MESSAGE.to_string()
            }
            ApiError::Internal(msg) => {
                error!("internal error: {}", msg);
                msg.clone()
            }
            other => {
                warn!("request rejected: {}", other);
                other.to_string()
            }
        };

        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        // Always HTTP 200 with ok=false; the client branches on the envelope
        (StatusCode::OK, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            "Fill all required fields: Requester, Target, R.A., Dec."
        );
        assert_eq!(
            ValidationError::InvalidEmail.to_string(),
            "Please enter a valid email address."
        );
        assert_ne!(
            ValidationError::VisibilityPending.to_string(),
            ValidationError::NotObservable.to_string()
        );
    }

    #[test]
    fn test_upstream_codes() {
        let err = ApiError::Upstream {
            status: 404,
            message: "File not found".into(),
        };
        assert_eq!(err.code(), "UPSTREAM_404");
        assert!(err.is_transport());
        assert!(!ApiError::Validation(ValidationError::InvalidEmail).is_transport());
        assert_eq!(err.user_message(), RETRY_MESSAGE);
    }

    #[test]
    fn test_submit_failure_keeps_its_message() {
        let err = ApiError::SubmitFailed("Failed to send the email. Please try again.".into());
        assert_eq!(err.code(), "SUBMIT_FAILED");
        assert_eq!(err.user_message(), "Failed to send the email. Please try again.");
    }
}
