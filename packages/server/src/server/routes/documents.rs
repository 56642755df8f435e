//! POST /api/documents/verify (multipart)
//!
//! Fields: `userId`, `sessionId`, `cpf`, and the three images
//! `documentFront`, `documentBack`, `selfie`. All six are required.

use axum::{
    extract::{Extension, Multipart},
    Json,
};
use serde::Serialize;

use crate::common::{Cpf, OutcomeId, SessionId};
use crate::domains::capture::{CaptureArtifactSet, CaptureStep, ImageBlob, SubmissionRequest};
use crate::domains::verification::{ReasonCode, VerificationOutcome};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDocumentsResponse {
    pub success: bool,
    pub outcome_id: OutcomeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_codes: Option<Vec<ReasonCode>>,
}

impl From<VerificationOutcome> for VerifyDocumentsResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        let success = outcome.is_approved();
        Self {
            success,
            outcome_id: outcome.id,
            trust_score: outcome.trust_score,
            reason_codes: (!success).then_some(outcome.reason_codes),
        }
    }
}

fn step_for_field(name: &str) -> Option<CaptureStep> {
    match name {
        "documentFront" => Some(CaptureStep::DocumentFront),
        "documentBack" => Some(CaptureStep::DocumentBack),
        "selfie" => Some(CaptureStep::Selfie),
        _ => None,
    }
}

pub async fn verify_documents_handler(
    Extension(state): Extension<AxumAppState>,
    mut multipart: Multipart,
) -> Result<Json<VerifyDocumentsResponse>, ApiError> {
    let mut user_id = None;
    let mut session_id = None;
    let mut cpf = None;
    let mut artifacts = CaptureArtifactSet::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(step) = step_for_field(&name) {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            artifacts.insert(step, ImageBlob::new(&content_type, bytes)?);
            continue;
        }

        match name.as_str() {
            "userId" => user_id = Some(field.text().await?),
            "sessionId" => {
                let raw = field.text().await?;
                session_id = Some(SessionId::parse(raw.trim()).map_err(|_| {
                    ApiError::bad_request("invalid_session", "sessionId is not a valid session id")
                })?);
            }
            "cpf" => {
                let raw = field.text().await?;
                cpf = Some(
                    Cpf::parse(&raw)
                        .map_err(|e| ApiError::bad_request("invalid_cpf", e.to_string()))?,
                );
            }
            // Unknown fields are drained and ignored
            _ => {
                field.bytes().await?;
            }
        }
    }

    let user_id = user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("invalid_user_id", "userId is required"))?;
    let session_id =
        session_id.ok_or_else(|| ApiError::bad_request("invalid_session", "sessionId is required"))?;
    let cpf = cpf.ok_or_else(|| ApiError::bad_request("invalid_cpf", "cpf is required"))?;

    let Some(complete) = artifacts.complete() else {
        let missing: Vec<&str> = CaptureStep::ALL
            .iter()
            .filter(|step| artifacts.get(**step).is_none())
            .map(|step| step.as_str())
            .collect();
        return Err(ApiError::bad_request(
            "missing_artifact",
            format!("Missing images: {}", missing.join(", ")),
        ));
    };

    let request = SubmissionRequest {
        user_id,
        session_id,
        cpf,
        artifacts: complete,
    };
    let outcome = state.orchestrator.verify(&request).await?;

    Ok(Json(outcome.into()))
}
