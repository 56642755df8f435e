//! Upload captured artifacts, ask the oracle, record the verdict

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::errors::VerificationError;
use super::models::{OutcomeStatus, ReasonCode, VerificationOutcome};
use crate::common::OutcomeId;
use crate::domains::capture::{CaptureFailure, DocumentSubmitter, SubmissionRequest};
use crate::kernel::{OracleError, OracleRequest, ServerDeps};

pub struct VerificationOrchestrator {
    deps: ServerDeps,
}

impl VerificationOrchestrator {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }

    /// Run one verification attempt end to end.
    ///
    /// Any failed upload stops the attempt before the oracle is called. Both
    /// approvals and rejections are persisted as new outcome rows.
    pub async fn verify(&self, request: &SubmissionRequest) -> Result<VerificationOutcome, VerificationError> {
        let user_id = request.user_id.trim();
        validate_path_segment(user_id)?;
        let session_id = request.session_id;

        let mut urls = Vec::with_capacity(3);
        for (step, blob) in request.artifacts.iter() {
            let path = format!(
                "verifications/{}/{}/{}.{}",
                user_id,
                session_id,
                step,
                blob.extension()
            );
            let url = self
                .deps
                .blob_store
                .put(&path, blob.content_type(), blob.bytes().clone())
                .await
                .map_err(|e| {
                    warn!(user_id, session_id = %session_id, %step, error = %e, "Artifact upload failed");
                    VerificationError::Upload {
                        step,
                        message: e.to_string(),
                    }
                })?;
            urls.push(url);
        }
        let [document_front_url, document_back_url, selfie_url]: [String; 3] = urls
            .try_into()
            .map_err(|_| VerificationError::InvalidRequest("expected three artifacts".into()))?;

        let oracle_request = OracleRequest {
            user_id: user_id.to_string(),
            cpf: request.cpf.digits().to_string(),
            document_front_url,
            document_back_url,
            selfie_url,
        };

        let response = match tokio::time::timeout(
            self.deps.oracle_timeout,
            self.deps.oracle.verify(&oracle_request),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(user_id, session_id = %session_id, error = %e, "Verification oracle call failed");
                return Err(match e {
                    OracleError::Unavailable(message) => VerificationError::OracleUnavailable(message),
                    OracleError::RequestRejected { status, message } => {
                        VerificationError::OracleRequestRejected { status, message }
                    }
                    OracleError::Protocol(message) => VerificationError::OracleProtocol(message),
                });
            }
            Err(_) => {
                warn!(
                    user_id,
                    session_id = %session_id,
                    timeout = ?self.deps.oracle_timeout,
                    "Verification oracle timed out"
                );
                return Err(VerificationError::OracleUnavailable(format!(
                    "no response within {}s",
                    self.deps.oracle_timeout.as_secs_f32()
                )));
            }
        };

        let (status, reason_codes) = if response.success {
            if response.trust_score.is_none() {
                return Err(VerificationError::OracleProtocol(
                    "approval without a trust score".into(),
                ));
            }
            (OutcomeStatus::Approved, Vec::new())
        } else {
            let mut codes: Vec<ReasonCode> = response
                .reason_codes
                .unwrap_or_default()
                .iter()
                .map(|raw| ReasonCode::from_wire(raw))
                .collect();
            // A set of reasons, in the order the oracle first gave them
            let mut seen = HashSet::new();
            codes.retain(|code| seen.insert(*code));
            if codes.is_empty() {
                codes.push(ReasonCode::Other);
            }
            (OutcomeStatus::Rejected, codes)
        };

        let outcome = VerificationOutcome {
            id: OutcomeId::new(),
            user_id: user_id.to_string(),
            session_id,
            status,
            trust_score: response.trust_score,
            reason_codes,
            created_at: self.deps.clock.now(),
        };

        self.deps.outcome_store.record(&outcome).await.map_err(|e| {
            error!(user_id, session_id = %session_id, error = %e, "Failed to record verification outcome");
            VerificationError::Persistence(e)
        })?;

        if let (OutcomeStatus::Approved, Some(trust_score)) = (outcome.status, outcome.trust_score) {
            self.deps
                .outcome_store
                .mark_user_verified(user_id, trust_score, outcome.created_at)
                .await
                .map_err(|e| {
                    error!(user_id, error = %e, "Failed to mark user verified");
                    VerificationError::Persistence(e)
                })?;
        }

        info!(
            user_id,
            session_id = %session_id,
            outcome_id = %outcome.id,
            status = outcome.status.as_str(),
            trust_score = ?outcome.trust_score,
            "Verification finished"
        );

        Ok(outcome)
    }
}

#[async_trait]
impl DocumentSubmitter for VerificationOrchestrator {
    async fn submit(&self, request: SubmissionRequest) -> Result<VerificationOutcome, CaptureFailure> {
        self.verify(&request).await.map_err(CaptureFailure::from)
    }
}

/// User ids become a storage path segment
fn validate_path_segment(user_id: &str) -> Result<(), VerificationError> {
    if user_id.is_empty() {
        return Err(VerificationError::InvalidRequest("user id is required".into()));
    }
    if user_id == "."
        || user_id == ".."
        || user_id.chars().any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(VerificationError::InvalidRequest(
            "user id contains characters that are not allowed".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Cpf, SessionId};
    use crate::domains::capture::{CaptureArtifactSet, CaptureStep, ImageBlob};
    use crate::kernel::{BaseOutcomeStore, TestDependencies};
    use bytes::Bytes;

    fn request(user_id: &str) -> SubmissionRequest {
        let mut set = CaptureArtifactSet::default();
        set.insert(
            CaptureStep::DocumentFront,
            ImageBlob::new("image/jpeg", Bytes::from_static(b"front")).unwrap(),
        );
        set.insert(
            CaptureStep::DocumentBack,
            ImageBlob::new("image/png", Bytes::from_static(b"back")).unwrap(),
        );
        set.insert(
            CaptureStep::Selfie,
            ImageBlob::new("image/webp", Bytes::from_static(b"selfie")).unwrap(),
        );
        SubmissionRequest {
            user_id: user_id.to_string(),
            session_id: SessionId::new(),
            cpf: Cpf::parse("52998224725").unwrap(),
            artifacts: set.complete().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_approval_uploads_records_and_marks_verified() {
        let test = TestDependencies::new();
        test.oracle.approve(87.0);
        let orchestrator = VerificationOrchestrator::new(test.server_deps());
        let request = request("user-1");

        let outcome = orchestrator.verify(&request).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Approved);
        assert_eq!(outcome.trust_score, Some(87.0));
        assert!(outcome.reason_codes.is_empty());

        let prefix = format!("verifications/user-1/{}", request.session_id);
        let mut paths = test.blob_store.paths().await;
        paths.sort();
        assert_eq!(
            paths,
            vec![
                format!("{}/document-back.png", prefix),
                format!("{}/document-front.jpg", prefix),
                format!("{}/selfie.webp", prefix),
            ]
        );

        let sent = &test.oracle.requests()[0];
        assert_eq!(sent.cpf, "52998224725");
        assert!(sent.document_front_url.ends_with("document-front.jpg"));
        assert!(sent.selfie_url.ends_with("selfie.webp"));

        assert_eq!(test.outcome_store.outcomes().await, vec![outcome.clone()]);
        assert_eq!(
            test.outcome_store.verified_user("user-1").await.unwrap().trust_score,
            87.0
        );
    }

    #[tokio::test]
    async fn test_rejection_is_recorded_without_marking_verified() {
        let test = TestDependencies::new();
        test.oracle.reject(&["cpf_mismatch", "selfie_mismatch", "glare"]);
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let outcome = orchestrator.verify(&request("user-1")).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Rejected);
        assert_eq!(
            outcome.reason_codes,
            vec![ReasonCode::CpfMismatch, ReasonCode::SelfieMismatch, ReasonCode::Other]
        );
        assert!(test.outcome_store.verified_user("user-1").await.is_none());
        assert_eq!(
            test.outcome_store.latest_for_user("user-1").await.unwrap(),
            Some(outcome)
        );
    }

    #[tokio::test]
    async fn test_repeated_reasons_are_collapsed() {
        let test = TestDependencies::new();
        test.oracle
            .reject(&["glare", "cpf_mismatch", "blurry", "CPF_MISMATCH"]);
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let outcome = orchestrator.verify(&request("user-1")).await.unwrap();
        assert_eq!(
            outcome.reason_codes,
            vec![ReasonCode::Other, ReasonCode::CpfMismatch]
        );
    }

    #[tokio::test]
    async fn test_each_attempt_writes_a_new_outcome() {
        let test = TestDependencies::new();
        test.oracle.reject(&["illegible_document"]).approve(91.0);
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let first = orchestrator.verify(&request("user-1")).await.unwrap();
        let second = orchestrator.verify(&request("user-1")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(test.outcome_store.outcomes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_skips_oracle() {
        let test = TestDependencies::new().with_failing_blob_store();
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let err = orchestrator.verify(&request("user-1")).await.unwrap_err();
        assert!(matches!(
            err,
            VerificationError::Upload {
                step: CaptureStep::DocumentFront,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert!(test.oracle.requests().is_empty());
        assert!(test.outcome_store.outcomes().await.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_unavailable_is_retryable_and_not_recorded() {
        let test = TestDependencies::new();
        test.oracle
            .fail_with(OracleError::Unavailable("503 Service Unavailable".into()));
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let err = orchestrator.verify(&request("user-1")).await.unwrap_err();
        assert!(matches!(err, VerificationError::OracleUnavailable(_)));
        assert!(matches!(
            CaptureFailure::from(err),
            CaptureFailure::Retryable { .. }
        ));
        assert!(test.outcome_store.outcomes().await.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_4xx_is_not_retryable() {
        let test = TestDependencies::new();
        test.oracle.fail_with(OracleError::RequestRejected {
            status: 422,
            message: "bad cpf".into(),
        });
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let err = orchestrator.verify(&request("user-1")).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(CaptureFailure::from(err), CaptureFailure::Failed { .. }));
    }

    #[tokio::test]
    async fn test_oracle_timeout() {
        let test = TestDependencies::new().with_oracle_timeout(std::time::Duration::from_millis(20));
        test.oracle.delay(std::time::Duration::from_millis(200));
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let err = orchestrator.verify(&request("user-1")).await.unwrap_err();
        assert!(matches!(err, VerificationError::OracleUnavailable(_)));
        assert!(test.outcome_store.outcomes().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_trust_score_still_approves() {
        let test = TestDependencies::new();
        test.oracle.approve(0.0);
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        let outcome = orchestrator.verify(&request("user-1")).await.unwrap();
        assert!(outcome.is_approved());
        assert_eq!(outcome.trust_score, Some(0.0));
    }

    #[tokio::test]
    async fn test_unsafe_user_ids_are_rejected_before_upload() {
        let test = TestDependencies::new();
        let orchestrator = VerificationOrchestrator::new(test.server_deps());

        for user_id in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                orchestrator.verify(&request(user_id)).await,
                Err(VerificationError::InvalidRequest(_))
            ));
        }
        assert!(test.blob_store.paths().await.is_empty());
    }
}
