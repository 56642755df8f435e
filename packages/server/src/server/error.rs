//! Mapping from domain errors to JSON HTTP responses
//!
//! Every error body is `{error, message}` plus a few optional hints. Internal
//! failures are logged here and reported with a generic message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::multipart::MultipartError,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::domains::capture::ImageError;
use crate::domains::handoff::{HandoffError, InvalidLinkRedirect};
use crate::domains::otp::OtpError;
use crate::domains::verification::VerificationError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
    #[serde(flatten)]
    redirect: Option<InvalidLinkRedirect>,
}

/// An error ready to be sent to the client
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
                remaining_attempts: None,
                retry_after_secs: None,
                retryable: None,
                redirect: None,
            },
        }
    }

    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Log the real cause, tell the client nothing about it
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
    }

    pub fn invalid_link(message: impl Into<String>) -> Self {
        let mut err = Self::bad_request("invalid_link", message);
        err.body.redirect = Some(InvalidLinkRedirect::default());
        err
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn retryable(mut self, retryable: bool) -> Self {
        self.body.retryable = Some(retryable);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after = self.body.retry_after_secs;
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.max(0).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        let message = err.to_string();
        match err {
            OtpError::InvalidPhone => Self::bad_request("invalid_phone", message),
            OtpError::InvalidUserId => Self::bad_request("invalid_user_id", message),
            OtpError::InvalidCode => Self::bad_request("invalid_code", message),
            OtpError::RateLimited { retry_after_secs } => {
                let mut api = Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message);
                api.body.retry_after_secs = Some(retry_after_secs);
                api
            }
            OtpError::NoActiveCode => Self::new(StatusCode::NOT_FOUND, "no_active_code", message),
            OtpError::Expired => Self::new(StatusCode::GONE, "code_expired", message),
            OtpError::TooManyAttempts => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, "too_many_attempts", message)
            }
            OtpError::IncorrectCode { remaining_attempts } => {
                let mut api =
                    Self::new(StatusCode::UNPROCESSABLE_ENTITY, "incorrect_code", message);
                api.body.remaining_attempts = Some(remaining_attempts);
                api
            }
            OtpError::Delivery(cause) => {
                error!(error = %cause, "SMS delivery failed");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "delivery_failed",
                    "Could not send the verification code, please try again",
                )
            }
            OtpError::Store(cause) => Self::internal(cause),
        }
    }
}

impl From<HandoffError> for ApiError {
    fn from(err: HandoffError) -> Self {
        let message = err.to_string();
        match err {
            HandoffError::MissingUserId => Self::bad_request("invalid_user_id", message),
            HandoffError::InvalidCpf(_) => Self::bad_request("invalid_cpf", message),
            HandoffError::InvalidLink(_) => Self::invalid_link(message),
            HandoffError::NoBaseUrl
            | HandoffError::InvalidBaseUrl(_)
            | HandoffError::QrEncoding(_) => Self::internal(message),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        let retryable = err.is_retryable();
        let message = err.to_string();
        let api = match err {
            VerificationError::InvalidRequest(_) => Self::bad_request("invalid_request", message),
            VerificationError::InvalidArtifact(e) => e.into(),
            VerificationError::Upload { .. } => {
                error!(error = %message, "Artifact upload failed");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upload_failed",
                    "Could not store your photos, please try again",
                )
            }
            VerificationError::OracleUnavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "verification_unavailable",
                "The verification service is unavailable, please try again",
            ),
            VerificationError::OracleRequestRejected { .. } | VerificationError::OracleProtocol(_) => {
                error!(error = %message, "Verification oracle failure");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "verification_failed",
                    "The verification service could not process this request",
                )
            }
            VerificationError::Persistence(cause) => Self::internal(cause),
        };
        api.retryable(retryable)
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::TooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "artifact_too_large", err.to_string())
            }
            _ => Self::bad_request("invalid_artifact", err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("invalid_body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("invalid_query", rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request("invalid_multipart", err.body_text())
    }
}
