// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{
    BaseBlobStore, BaseMessagingGateway, BaseVerificationOracle, Clock, DeliveryReceipt,
    InMemoryBlobStore, InMemoryKeyValueStore, InMemoryOutcomeStore, OracleError, OracleRequest,
    OracleResponse, ServerDeps,
};
use crate::domains::capture::{Camera, CameraError, CameraFacing, CameraStream, ImageBlob};
use crate::domains::handoff::HandoffSettings;
use crate::domains::otp::OtpPolicy;

// =============================================================================
// Manual Clock
// =============================================================================

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Mock Messaging Gateway
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct MockMessagingGateway {
    sent: Mutex<Vec<SentMessage>>,
    fail_next: Mutex<bool>,
}

impl MockMessagingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next send fail after recording it
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// The six-digit code in the most recent message to `phone`
    pub fn last_code_sent_to(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == phone)
            .and_then(|m| {
                m.body
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|chunk| chunk.len() == 6)
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl BaseMessagingGateway for MockMessagingGateway {
    async fn send_sms(&self, phone_number: &str, body: &str) -> Result<DeliveryReceipt> {
        let index = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                to: phone_number.to_string(),
                body: body.to_string(),
            });
            sent.len()
        };

        let should_fail = std::mem::take(&mut *self.fail_next.lock().unwrap());
        if should_fail {
            return Err(anyhow!("gateway unavailable"));
        }

        Ok(DeliveryReceipt {
            message_id: format!("SM{:032}", index),
            status: "queued".to_string(),
        })
    }
}

// =============================================================================
// Mock Verification Oracle
// =============================================================================

pub struct MockVerificationOracle {
    responses: Mutex<VecDeque<Result<OracleResponse, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
    delay: Mutex<Option<std::time::Duration>>,
}

impl MockVerificationOracle {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Queue an approval with the given trust score
    pub fn approve(&self, trust_score: f64) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(OracleResponse {
            success: true,
            trust_score: Some(trust_score),
            reason_codes: None,
        }));
        self
    }

    /// Queue a rejection with the given reason codes
    pub fn reject(&self, reason_codes: &[&str]) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(OracleResponse {
            success: false,
            trust_score: Some(12.0),
            reason_codes: Some(reason_codes.iter().map(|r| r.to_string()).collect()),
        }));
        self
    }

    pub fn fail_with(&self, error: OracleError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Sleep before answering (for timeout tests)
    pub fn delay(&self, by: std::time::Duration) -> &Self {
        *self.delay.lock().unwrap() = Some(by);
        self
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockVerificationOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseVerificationOracle for MockVerificationOracle {
    async fn verify(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(OracleResponse {
                success: true,
                trust_score: Some(90.0),
                reason_codes: None,
            })
        })
    }
}

// =============================================================================
// Failing Blob Store
// =============================================================================

/// Blob store that rejects every upload
#[derive(Default)]
pub struct FailingBlobStore;

#[async_trait]
impl BaseBlobStore for FailingBlobStore {
    async fn put(&self, path: &str, _content_type: &str, _bytes: Bytes) -> Result<String> {
        Err(anyhow!("storage unavailable for {}", path))
    }
}

// =============================================================================
// Mock Camera
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    Opened(CameraFacing),
    Closed(CameraFacing),
}

/// Camera that hands out fake JPEG frames and logs open/close calls
#[derive(Clone, Default)]
pub struct MockCamera {
    log: Arc<Mutex<Vec<CameraEvent>>>,
    open_streams: Arc<Mutex<usize>>,
    deny_next: Arc<Mutex<bool>>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `open` as if the user denied permission
    pub fn deny_next(&self) {
        *self.deny_next.lock().unwrap() = true;
    }

    pub fn events(&self) -> Vec<CameraEvent> {
        self.log.lock().unwrap().clone()
    }

    pub fn open_streams(&self) -> usize {
        *self.open_streams.lock().unwrap()
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn open(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>, CameraError> {
        if std::mem::take(&mut *self.deny_next.lock().unwrap()) {
            return Err(CameraError::PermissionDenied);
        }

        let mut open = self.open_streams.lock().unwrap();
        if *open > 0 {
            return Err(CameraError::Busy);
        }
        *open += 1;
        self.log.lock().unwrap().push(CameraEvent::Opened(facing));

        Ok(Box::new(MockStream {
            facing,
            camera: self.clone(),
            frames: 0,
            stopped: false,
        }))
    }
}

struct MockStream {
    facing: CameraFacing,
    camera: MockCamera,
    frames: u32,
    stopped: bool,
}

impl CameraStream for MockStream {
    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn grab_frame(&mut self) -> Result<ImageBlob, CameraError> {
        if self.stopped {
            return Err(CameraError::Stopped);
        }
        self.frames += 1;
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        jpeg.extend_from_slice(format!("{:?}-{}", self.facing, self.frames).as_bytes());
        ImageBlob::new("image/jpeg", Bytes::from(jpeg)).map_err(|e| CameraError::Device(e.to_string()))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            *self.camera.open_streams.lock().unwrap() -= 1;
            self.camera.log.lock().unwrap().push(CameraEvent::Closed(self.facing));
        }
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// In-memory ServerDeps with handles to every mock for assertions
pub struct TestDependencies {
    pub clock: Arc<ManualClock>,
    pub kv_store: InMemoryKeyValueStore,
    pub messaging: Arc<MockMessagingGateway>,
    pub blob_store: InMemoryBlobStore,
    pub oracle: Arc<MockVerificationOracle>,
    pub outcome_store: InMemoryOutcomeStore,
    pub otp_policy: OtpPolicy,
    pub handoff: HandoffSettings,
    pub oracle_timeout: std::time::Duration,
    blob_store_override: Option<Arc<dyn BaseBlobStore>>,
}

impl TestDependencies {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::default());
        Self {
            kv_store: InMemoryKeyValueStore::new(clock.clone()),
            clock,
            messaging: Arc::new(MockMessagingGateway::new()),
            blob_store: InMemoryBlobStore::default(),
            oracle: Arc::new(MockVerificationOracle::new()),
            outcome_store: InMemoryOutcomeStore::new(),
            otp_policy: OtpPolicy::default(),
            handoff: HandoffSettings {
                public_base_url: Some("https://app.example.com".to_string()),
                mobile_path: "/verify/mobile".to_string(),
            },
            oracle_timeout: std::time::Duration::from_secs(5),
            blob_store_override: None,
        }
    }

    /// Swap the blob store for one that fails every upload
    pub fn with_failing_blob_store(mut self) -> Self {
        self.blob_store_override = Some(Arc::new(FailingBlobStore));
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn server_deps(&self) -> ServerDeps {
        let blob_store = self
            .blob_store_override
            .clone()
            .unwrap_or_else(|| Arc::new(self.blob_store.clone()) as Arc<dyn BaseBlobStore>);

        ServerDeps::new(
            Arc::new(self.kv_store.clone()),
            self.messaging.clone(),
            blob_store,
            self.oracle.clone(),
            Arc::new(self.outcome_store.clone()),
            self.clock.clone(),
            self.otp_policy.clone(),
            self.handoff.clone(),
            self.oracle_timeout,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
