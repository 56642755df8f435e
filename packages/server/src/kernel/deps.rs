//! Server dependencies for domain activities (using traits for testability)
//!
//! This module provides the central dependency container used by every domain.
//! All external services use trait abstractions so tests can swap them out.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use twilio::TwilioService;

use crate::domains::handoff::HandoffSettings;
use crate::domains::otp::OtpPolicy;
use crate::kernel::{
    BaseBlobStore, BaseKeyValueStore, BaseMessagingGateway, BaseOutcomeStore,
    BaseVerificationOracle, Clock, DeliveryReceipt,
};

// =============================================================================
// TwilioService Adapter (implements BaseMessagingGateway trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseMessagingGateway trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseMessagingGateway for TwilioAdapter {
    async fn send_sms(&self, phone_number: &str, body: &str) -> Result<DeliveryReceipt> {
        let message = self
            .0
            .send_sms(phone_number, body)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(DeliveryReceipt {
            message_id: message.sid,
            status: message.status,
        })
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to domain activities
#[derive(Clone)]
pub struct ServerDeps {
    /// One-time codes and issuance rate records
    pub kv_store: Arc<dyn BaseKeyValueStore>,
    pub messaging: Arc<dyn BaseMessagingGateway>,
    pub blob_store: Arc<dyn BaseBlobStore>,
    pub oracle: Arc<dyn BaseVerificationOracle>,
    pub outcome_store: Arc<dyn BaseOutcomeStore>,
    pub clock: Arc<dyn Clock>,
    pub otp_policy: OtpPolicy,
    pub handoff: HandoffSettings,
    /// Upper bound on a single oracle call, on top of the HTTP client's own timeout
    pub oracle_timeout: std::time::Duration,
}

impl ServerDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kv_store: Arc<dyn BaseKeyValueStore>,
        messaging: Arc<dyn BaseMessagingGateway>,
        blob_store: Arc<dyn BaseBlobStore>,
        oracle: Arc<dyn BaseVerificationOracle>,
        outcome_store: Arc<dyn BaseOutcomeStore>,
        clock: Arc<dyn Clock>,
        otp_policy: OtpPolicy,
        handoff: HandoffSettings,
        oracle_timeout: std::time::Duration,
    ) -> Self {
        Self {
            kv_store,
            messaging,
            blob_store,
            oracle,
            outcome_store,
            clock,
            otp_policy,
            handoff,
            oracle_timeout,
        }
    }
}
