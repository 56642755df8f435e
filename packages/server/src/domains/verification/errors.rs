use thiserror::Error;

use crate::domains::capture::{CaptureFailure, CaptureStep, ImageError};

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Invalid verification request: {0}")]
    InvalidRequest(String),

    #[error("Invalid image: {0}")]
    InvalidArtifact(#[from] ImageError),

    #[error("Failed to upload {step}: {message}")]
    Upload { step: CaptureStep, message: String },

    #[error("Verification service unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Verification service rejected the request ({status}): {message}")]
    OracleRequestRejected { status: u16, message: String },

    #[error("Verification service returned an invalid response: {0}")]
    OracleProtocol(String),

    #[error("Failed to persist verification outcome: {0}")]
    Persistence(anyhow::Error),
}

impl VerificationError {
    /// Whether the same submission may succeed if tried again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VerificationError::Upload { .. } | VerificationError::OracleUnavailable(_)
        )
    }
}

impl From<VerificationError> for CaptureFailure {
    fn from(err: VerificationError) -> Self {
        if err.is_retryable() {
            CaptureFailure::Retryable {
                message: err.to_string(),
            }
        } else {
            CaptureFailure::Failed {
                message: err.to_string(),
            }
        }
    }
}
