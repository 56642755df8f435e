//! Verification outcome records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{OutcomeId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Approved,
    Rejected,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Approved => "approved",
            OutcomeStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(OutcomeStatus::Approved),
            "rejected" => Some(OutcomeStatus::Rejected),
            _ => None,
        }
    }
}

/// Why the oracle rejected an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    CpfMismatch,
    IllegibleDocument,
    SelfieMismatch,
    DocumentExpired,
    #[serde(other)]
    Other,
}

impl ReasonCode {
    /// Map an oracle reason string, tolerating case and dashes.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cpf_mismatch" => ReasonCode::CpfMismatch,
            "illegible_document" => ReasonCode::IllegibleDocument,
            "selfie_mismatch" => ReasonCode::SelfieMismatch,
            "document_expired" => ReasonCode::DocumentExpired,
            _ => ReasonCode::Other,
        }
    }
}

/// Result of one verification attempt. Never updated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub id: OutcomeId,
    pub user_id: String,
    pub session_id: SessionId,
    pub status: OutcomeStatus,
    pub trust_score: Option<f64>,
    pub reason_codes: Vec<ReasonCode>,
    pub created_at: DateTime<Utc>,
}

impl VerificationOutcome {
    pub fn is_approved(&self) -> bool {
        self.status == OutcomeStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_from_wire() {
        assert_eq!(ReasonCode::from_wire("CPF_MISMATCH"), ReasonCode::CpfMismatch);
        assert_eq!(ReasonCode::from_wire("selfie-mismatch"), ReasonCode::SelfieMismatch);
        assert_eq!(ReasonCode::from_wire("glare"), ReasonCode::Other);
    }

    #[test]
    fn test_unknown_reason_deserializes_as_other() {
        let codes: Vec<ReasonCode> =
            serde_json::from_str(r#"["document_expired", "blurry"]"#).unwrap();
        assert_eq!(codes, vec![ReasonCode::DocumentExpired, ReasonCode::Other]);
    }

    #[test]
    fn test_status_strings() {
        for status in [OutcomeStatus::Approved, OutcomeStatus::Rejected] {
            assert_eq!(OutcomeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OutcomeStatus::parse("pending"), None);
    }
}
