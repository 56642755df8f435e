// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Verification rules live in domains/* and reach the outside world through these seams.
//
// Naming convention: Base* for trait names (e.g., BaseKeyValueStore, BaseBlobStore)

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::verification::VerificationOutcome;

// =============================================================================
// Clock
// =============================================================================

/// Source of "now". Injected so expiry and rate windows can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Key-Value Store Trait (Infrastructure - TTL-aware)
// =============================================================================

#[async_trait]
pub trait BaseKeyValueStore: Send + Sync {
    /// Get a live value. Entries past their TTL are reported as absent.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Insert or overwrite a value that expires `ttl` from now.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;

    /// Remove a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

// =============================================================================
// Messaging Gateway Trait (Infrastructure - SMS)
// =============================================================================

/// What the gateway reports back after accepting a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub status: String,
}

#[async_trait]
pub trait BaseMessagingGateway: Send + Sync {
    /// Send a text message to a phone number
    async fn send_sms(&self, phone_number: &str, body: &str) -> Result<DeliveryReceipt>;
}

// =============================================================================
// Blob Store Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseBlobStore: Send + Sync {
    /// Store `bytes` under `path` and return a URL the oracle can fetch.
    ///
    /// The store enforces no business rules; callers validate type and size.
    async fn put(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<String>;
}

// =============================================================================
// Verification Oracle Trait (Infrastructure - document/face matching)
// =============================================================================

/// Payload sent to the matching oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub user_id: String,
    /// Digits only
    pub cpf: String,
    pub document_front_url: String,
    pub document_back_url: String,
    pub selfie_url: String,
}

/// Verdict returned by the matching oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleResponse {
    pub success: bool,
    #[serde(default)]
    pub trust_score: Option<f64>,
    #[serde(default)]
    pub reason_codes: Option<Vec<String>>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// Network failure, timeout or 5xx. Safe to retry.
    #[error("verification oracle unavailable: {0}")]
    Unavailable(String),

    /// The oracle refused the request itself (4xx).
    #[error("verification oracle rejected the request ({status}): {message}")]
    RequestRejected { status: u16, message: String },

    /// The oracle answered with something we could not decode.
    #[error("verification oracle returned an unreadable response: {0}")]
    Protocol(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Unavailable(_))
    }
}

#[async_trait]
pub trait BaseVerificationOracle: Send + Sync {
    async fn verify(&self, request: &OracleRequest) -> std::result::Result<OracleResponse, OracleError>;
}

// =============================================================================
// Outcome Store Trait (Infrastructure - verification records)
// =============================================================================

#[async_trait]
pub trait BaseOutcomeStore: Send + Sync {
    /// Insert an outcome. Outcomes are never updated in place.
    async fn record(&self, outcome: &VerificationOutcome) -> Result<()>;

    /// Flag the user's profile as identity-verified with the oracle's trust score.
    async fn mark_user_verified(
        &self,
        user_id: &str,
        trust_score: f64,
        verified_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Most recent outcome for a user, if any.
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<VerificationOutcome>>;
}
