//! HTTP client for the external document/face matching oracle.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::{BaseVerificationOracle, OracleError, OracleRequest, OracleResponse};

pub struct HttpVerificationOracle {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpVerificationOracle {
    /// `timeout` bounds the whole request; a slow oracle surfaces as `Unavailable`.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build oracle HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

/// Map an HTTP status to the oracle error taxonomy.
fn classify_status(status: StatusCode, body: String) -> OracleError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        OracleError::Unavailable(format!("oracle returned {}", status))
    } else {
        OracleError::RequestRejected {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[async_trait]
impl BaseVerificationOracle for HttpVerificationOracle {
    async fn verify(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        debug!(user_id = %request.user_id, "Calling verification oracle");

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Verification oracle request failed");
            OracleError::Unavailable(if e.is_timeout() {
                "request timed out".to_string()
            } else {
                "request failed".to_string()
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Verification oracle returned an error status");
            return Err(classify_status(status, body));
        }

        response
            .json::<OracleResponse>()
            .await
            .map_err(|e| OracleError::Protocol(e.to_string()))
    }
}
