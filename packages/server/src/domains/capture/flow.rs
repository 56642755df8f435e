//! Drives a `CaptureMachine` against a real camera and submitter

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use super::camera::{Camera, CameraError, CameraFacing, CameraGuard};
use super::machine::{
    CaptureCommand, CaptureEvent, CaptureFailure, CaptureMachine, CaptureState, SubmissionRequest,
    TransitionError,
};
use crate::domains::verification::VerificationOutcome;

/// Default ceiling on one submission, upload and oracle call included
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends a finished capture off for verification
#[async_trait]
pub trait DocumentSubmitter: Send + Sync {
    async fn submit(&self, request: SubmissionRequest) -> Result<VerificationOutcome, CaptureFailure>;
}

#[derive(Error, Debug)]
pub enum CaptureFlowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// A navigation the UI should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub to: String,
    pub after: Duration,
}

pub struct CaptureFlow {
    machine: CaptureMachine,
    camera: Arc<dyn Camera>,
    submitter: Arc<dyn DocumentSubmitter>,
    guard: Option<CameraGuard>,
    submit_timeout: Duration,
    navigation: Option<Navigation>,
}

impl CaptureFlow {
    /// Open the flow for a handoff link's query string.
    pub fn open(query: &str, camera: Arc<dyn Camera>, submitter: Arc<dyn DocumentSubmitter>) -> Self {
        let (machine, commands) = CaptureMachine::open(query);
        let mut flow = Self {
            machine,
            camera,
            submitter,
            guard: None,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            navigation: None,
        };
        // Only navigation can come out of `open`
        for command in commands {
            if let CaptureCommand::Navigate { to, after } = command {
                flow.navigation = Some(Navigation { to, after });
            }
        }
        flow
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn state(&self) -> &CaptureState {
        self.machine.state()
    }

    pub fn machine(&self) -> &CaptureMachine {
        &self.machine
    }

    /// Most recent navigation request
    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    pub fn camera_facing(&self) -> Option<CameraFacing> {
        self.guard.as_ref().map(CameraGuard::facing)
    }

    pub async fn submit_cpf(&mut self, cpf: &str) -> Result<&CaptureState, CaptureFlowError> {
        self.dispatch(CaptureEvent::CpfSubmitted(cpf.to_string())).await
    }

    /// Grab a frame from the open camera and store it for the current step.
    pub async fn capture(&mut self) -> Result<&CaptureState, CaptureFlowError> {
        let guard = self.guard.as_mut().ok_or(TransitionError::CameraNotReady)?;
        let frame = guard.grab_frame()?;
        self.dispatch(CaptureEvent::FrameCaptured(frame)).await
    }

    pub async fn retry_camera(&mut self) -> Result<&CaptureState, CaptureFlowError> {
        self.dispatch(CaptureEvent::RetryCamera).await
    }

    pub async fn restart(&mut self) -> Result<&CaptureState, CaptureFlowError> {
        self.dispatch(CaptureEvent::Restart).await
    }

    pub async fn abort(&mut self) -> Result<&CaptureState, CaptureFlowError> {
        self.dispatch(CaptureEvent::Abort).await
    }

    /// Apply an event and run every command it produces, including the
    /// follow-up events those commands raise.
    pub async fn dispatch(&mut self, event: CaptureEvent) -> Result<&CaptureState, CaptureFlowError> {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let commands = self.machine.decide(event)?;
            for command in commands {
                if let Some(follow_up) = self.execute(command).await {
                    queue.push_back(follow_up);
                }
            }
        }

        Ok(self.machine.state())
    }

    async fn execute(&mut self, command: CaptureCommand) -> Option<CaptureEvent> {
        match command {
            CaptureCommand::AcquireCamera(facing) => {
                // The previous stream is stopped before the next one opens
                self.guard = None;
                match self.camera.open(facing).await {
                    Ok(stream) => {
                        self.guard = Some(CameraGuard::new(stream));
                        Some(CaptureEvent::CameraOpened)
                    }
                    Err(e) => {
                        warn!(?facing, error = %e, "Camera unavailable");
                        Some(CaptureEvent::CameraDenied(e.to_string()))
                    }
                }
            }
            CaptureCommand::ReleaseCamera => {
                self.guard = None;
                None
            }
            CaptureCommand::Submit(request) => {
                self.guard = None;
                let session_id = request.session_id;
                match tokio::time::timeout(self.submit_timeout, self.submitter.submit(request)).await {
                    Ok(Ok(outcome)) => {
                        info!(session_id = %session_id, status = ?outcome.status, "Capture submission finished");
                        Some(CaptureEvent::OutcomeReceived(outcome))
                    }
                    Ok(Err(failure)) => {
                        warn!(session_id = %session_id, ?failure, "Capture submission failed");
                        Some(CaptureEvent::SubmissionFailed(failure))
                    }
                    Err(_) => {
                        warn!(session_id = %session_id, timeout = ?self.submit_timeout, "Capture submission timed out");
                        Some(CaptureEvent::SubmissionFailed(CaptureFailure::Retryable {
                            message: "Verification timed out".to_string(),
                        }))
                    }
                }
            }
            CaptureCommand::Navigate { to, after } => {
                self.navigation = Some(Navigation { to, after });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{OutcomeId, SessionId};
    use crate::domains::capture::CameraStatus;
    use crate::domains::verification::{OutcomeStatus, ReasonCode};
    use crate::kernel::test_dependencies::{CameraEvent, MockCamera};
    use chrono::Utc;
    use std::sync::Mutex;

    const CPF: &str = "52998224725";

    /// Submitter that answers with a canned result, optionally after a delay
    struct StubSubmitter {
        result: Result<VerificationOutcome, CaptureFailure>,
        delay: Option<Duration>,
        calls: Mutex<usize>,
    }

    impl StubSubmitter {
        fn approving() -> Self {
            Self {
                result: Ok(VerificationOutcome {
                    id: OutcomeId::new(),
                    user_id: "user-1".into(),
                    session_id: SessionId::new(),
                    status: OutcomeStatus::Approved,
                    trust_score: Some(87.0),
                    reason_codes: vec![],
                    created_at: Utc::now(),
                }),
                delay: None,
                calls: Mutex::new(0),
            }
        }

        fn failing(failure: CaptureFailure) -> Self {
            Self {
                result: Err(failure),
                delay: None,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentSubmitter for StubSubmitter {
        async fn submit(&self, _request: SubmissionRequest) -> Result<VerificationOutcome, CaptureFailure> {
            *self.calls.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.clone()
        }
    }

    fn query() -> String {
        format!("userId=user-1&sessionId={}&cpf={}", SessionId::new(), CPF)
    }

    async fn capture_all(flow: &mut CaptureFlow) {
        flow.submit_cpf(CPF).await.unwrap();
        flow.capture().await.unwrap();
        flow.capture().await.unwrap();
        flow.capture().await.unwrap();
    }

    #[tokio::test]
    async fn test_streams_never_overlap() {
        let camera = MockCamera::new();
        let mut flow = CaptureFlow::open(
            &query(),
            Arc::new(camera.clone()),
            Arc::new(StubSubmitter::approving()),
        );

        capture_all(&mut flow).await;

        use CameraEvent::*;
        use CameraFacing::*;
        assert_eq!(
            camera.events(),
            vec![
                Opened(Environment),
                Closed(Environment),
                Opened(Environment),
                Closed(Environment),
                Opened(User),
                Closed(User),
            ]
        );
        assert_eq!(camera.open_streams(), 0);
        assert!(matches!(flow.state(), CaptureState::Success(_)));
        assert_eq!(
            flow.navigation(),
            Some(&Navigation {
                to: "/".into(),
                after: Duration::from_secs(3)
            })
        );
    }

    #[tokio::test]
    async fn test_denied_camera_then_retry() {
        let camera = MockCamera::new();
        camera.deny_next();
        let mut flow = CaptureFlow::open(
            &query(),
            Arc::new(camera.clone()),
            Arc::new(StubSubmitter::approving()),
        );

        flow.submit_cpf(CPF).await.unwrap();
        assert!(matches!(
            flow.state().capture_step(),
            Some((_, CameraStatus::Unavailable(_)))
        ));
        assert!(matches!(
            flow.capture().await,
            Err(CaptureFlowError::Transition(TransitionError::CameraNotReady))
        ));

        flow.retry_camera().await.unwrap();
        assert_eq!(flow.camera_facing(), Some(CameraFacing::Environment));
        flow.capture().await.unwrap();
        assert_eq!(flow.state().name(), "document-back");
    }

    #[tokio::test]
    async fn test_dropping_flow_releases_camera() {
        let camera = MockCamera::new();
        {
            let mut flow = CaptureFlow::open(
                &query(),
                Arc::new(camera.clone()),
                Arc::new(StubSubmitter::approving()),
            );
            flow.submit_cpf(CPF).await.unwrap();
            assert_eq!(camera.open_streams(), 1);
        }
        assert_eq!(camera.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_abort_mid_capture() {
        let camera = MockCamera::new();
        let mut flow = CaptureFlow::open(
            &query(),
            Arc::new(camera.clone()),
            Arc::new(StubSubmitter::approving()),
        );
        flow.submit_cpf(CPF).await.unwrap();
        flow.abort().await.unwrap();

        assert_eq!(camera.open_streams(), 0);
        assert_eq!(flow.state(), &CaptureState::Closed);
        assert_eq!(flow.navigation().unwrap().after, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_submit_timeout_is_retryable() {
        let mut submitter = StubSubmitter::approving();
        submitter.delay = Some(Duration::from_millis(200));
        let mut flow = CaptureFlow::open(&query(), Arc::new(MockCamera::new()), Arc::new(submitter))
            .with_submit_timeout(Duration::from_millis(20));

        capture_all(&mut flow).await;
        assert!(matches!(
            flow.state(),
            CaptureState::Error(CaptureFailure::Retryable { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejection_then_restart() {
        let submitter = Arc::new(StubSubmitter::failing(CaptureFailure::Rejected {
            reason_codes: vec![ReasonCode::CpfMismatch],
        }));
        let mut flow = CaptureFlow::open(&query(), Arc::new(MockCamera::new()), submitter.clone());

        capture_all(&mut flow).await;
        assert!(matches!(
            flow.state(),
            CaptureState::Error(CaptureFailure::Rejected { .. })
        ));

        flow.restart().await.unwrap();
        assert_eq!(flow.state(), &CaptureState::Cpf);
        assert_eq!(*submitter.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_link_redirects_without_camera() {
        let camera = MockCamera::new();
        let mut flow = CaptureFlow::open(
            "userId=user-1",
            Arc::new(camera.clone()),
            Arc::new(StubSubmitter::approving()),
        );

        assert_eq!(flow.state(), &CaptureState::InvalidLink);
        assert_eq!(flow.navigation().unwrap().after, Duration::from_secs(3));
        assert!(flow.submit_cpf(CPF).await.is_err());
        assert!(camera.events().is_empty());
    }
}
