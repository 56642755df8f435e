//! Capture state machine
//!
//! `decide` is the whole transition table. It never touches the camera or
//! the network; it returns commands for the driver to run.
//!
//! ```text
//! cpf -> document-front -> document-back -> selfie -> processing -> success
//!  ^            |                |             |            \
//!  +------------+----------------+-------------+<- restart -- error
//! ```

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::artifacts::{CaptureArtifactSet, CaptureStep, CompleteArtifacts, ImageBlob};
use super::camera::CameraFacing;
use crate::common::{Cpf, CpfError, SessionId};
use crate::domains::handoff::{parse_mobile_link, MobileLink};
use crate::domains::verification::{ReasonCode, VerificationOutcome};

/// How long the success and invalid-link screens stay up before going home
pub const REDIRECT_DELAY: Duration = Duration::from_secs(3);

/// Camera availability for the current capture step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum CameraStatus {
    Opening,
    Ready,
    /// Recoverable; the user can grant access and retry
    Unavailable(String),
}

/// Why a submission did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureFailure {
    /// The oracle looked at the images and said no
    Rejected { reason_codes: Vec<ReasonCode> },
    /// Network, storage or timeout trouble; the same photos may go through later
    Retryable { message: String },
    /// The request itself was refused; retrying the same data will not help
    Failed { message: String },
}

impl CaptureFailure {
    /// Copy shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureFailure::Rejected { .. } => {
                "We could not verify your identity with these photos. Check that your document is legible and try again."
            }
            CaptureFailure::Retryable { .. } => {
                "We could not reach the verification service. Your photos were not rejected, please try again in a moment."
            }
            CaptureFailure::Failed { .. } => {
                "Something went wrong while verifying your identity. Please contact support."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    /// Link lacked userId or sessionId; only a redirect home is possible
    InvalidLink,
    Cpf,
    DocumentFront { camera: CameraStatus },
    DocumentBack { camera: CameraStatus },
    Selfie { camera: CameraStatus },
    /// Submission in flight
    Processing,
    Success(VerificationOutcome),
    Error(CaptureFailure),
    /// Aborted by the user
    Closed,
}

impl CaptureState {
    fn capturing(step: CaptureStep, camera: CameraStatus) -> Self {
        match step {
            CaptureStep::DocumentFront => CaptureState::DocumentFront { camera },
            CaptureStep::DocumentBack => CaptureState::DocumentBack { camera },
            CaptureStep::Selfie => CaptureState::Selfie { camera },
        }
    }

    /// The capture step and its camera status, if this is a capture state
    pub fn capture_step(&self) -> Option<(CaptureStep, &CameraStatus)> {
        match self {
            CaptureState::DocumentFront { camera } => Some((CaptureStep::DocumentFront, camera)),
            CaptureState::DocumentBack { camera } => Some((CaptureStep::DocumentBack, camera)),
            CaptureState::Selfie { camera } => Some((CaptureStep::Selfie, camera)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::InvalidLink => "invalid-link",
            CaptureState::Cpf => "cpf",
            CaptureState::DocumentFront { .. } => "document-front",
            CaptureState::DocumentBack { .. } => "document-back",
            CaptureState::Selfie { .. } => "selfie",
            CaptureState::Processing => "processing",
            CaptureState::Success(_) => "success",
            CaptureState::Error(_) => "error",
            CaptureState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum CaptureEvent {
    CpfSubmitted(String),
    CameraOpened,
    CameraDenied(String),
    RetryCamera,
    FrameCaptured(ImageBlob),
    OutcomeReceived(VerificationOutcome),
    SubmissionFailed(CaptureFailure),
    Restart,
    Abort,
}

impl CaptureEvent {
    fn name(&self) -> &'static str {
        match self {
            CaptureEvent::CpfSubmitted(_) => "cpf_submitted",
            CaptureEvent::CameraOpened => "camera_opened",
            CaptureEvent::CameraDenied(_) => "camera_denied",
            CaptureEvent::RetryCamera => "retry_camera",
            CaptureEvent::FrameCaptured(_) => "frame_captured",
            CaptureEvent::OutcomeReceived(_) => "outcome_received",
            CaptureEvent::SubmissionFailed(_) => "submission_failed",
            CaptureEvent::Restart => "restart",
            CaptureEvent::Abort => "abort",
        }
    }
}

/// Everything the orchestrator needs for one verification attempt
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub user_id: String,
    pub session_id: SessionId,
    pub cpf: Cpf,
    pub artifacts: CompleteArtifacts,
}

#[derive(Debug, Clone)]
pub enum CaptureCommand {
    AcquireCamera(CameraFacing),
    ReleaseCamera,
    Submit(SubmissionRequest),
    Navigate { to: String, after: Duration },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid verification link")]
    InvalidLink,

    #[error("Invalid CPF: {0}")]
    InvalidCpf(#[from] CpfError),

    #[error("Camera is not ready")]
    CameraNotReady,

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("Event {event} is not allowed in state {state}")]
    NotAllowed {
        state: &'static str,
        event: &'static str,
    },
}

pub struct CaptureMachine {
    link: Option<MobileLink>,
    state: CaptureState,
    cpf: Option<Cpf>,
    artifacts: CaptureArtifactSet,
}

impl CaptureMachine {
    /// Start the mobile flow from a handoff link's query string.
    ///
    /// An unusable link yields the `InvalidLink` state and a delayed redirect home.
    pub fn open(query: &str) -> (Self, Vec<CaptureCommand>) {
        match parse_mobile_link(query) {
            Ok(link) => (Self::new(link), Vec::new()),
            Err(_) => (
                Self {
                    link: None,
                    state: CaptureState::InvalidLink,
                    cpf: None,
                    artifacts: CaptureArtifactSet::default(),
                },
                vec![go_home(REDIRECT_DELAY)],
            ),
        }
    }

    pub fn new(link: MobileLink) -> Self {
        Self {
            link: Some(link),
            state: CaptureState::Cpf,
            cpf: None,
            artifacts: CaptureArtifactSet::default(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn link(&self) -> Option<&MobileLink> {
        self.link.as_ref()
    }

    /// The validated CPF, once the CPF step has passed
    pub fn cpf(&self) -> Option<&Cpf> {
        self.cpf.as_ref()
    }

    /// CPF carried by a desktop handoff link, for the CPF step to prefill.
    /// Not validated until the user submits it.
    pub fn suggested_cpf(&self) -> Option<&str> {
        self.link.as_ref().and_then(|link| link.cpf.as_deref())
    }

    pub fn artifacts(&self) -> &CaptureArtifactSet {
        &self.artifacts
    }

    /// Apply one event. On error the machine is unchanged.
    pub fn decide(&mut self, event: CaptureEvent) -> Result<Vec<CaptureCommand>, TransitionError> {
        let from = self.state.name();
        let event_name = event.name();
        let commands = self.transition(event)?;
        debug!(from, to = self.state.name(), event = event_name, "Capture transition");
        Ok(commands)
    }

    fn transition(&mut self, event: CaptureEvent) -> Result<Vec<CaptureCommand>, TransitionError> {
        match self.state {
            CaptureState::InvalidLink => match event {
                CaptureEvent::Abort => Ok(self.close()),
                _ => Err(TransitionError::InvalidLink),
            },

            CaptureState::Cpf => match event {
                CaptureEvent::CpfSubmitted(input) => {
                    self.cpf = Some(Cpf::parse(&input)?);
                    Ok(self.enter_step(CaptureStep::DocumentFront))
                }
                CaptureEvent::Abort => Ok(self.close()),
                other => Err(self.not_allowed(&other)),
            },

            CaptureState::DocumentFront { .. }
            | CaptureState::DocumentBack { .. }
            | CaptureState::Selfie { .. } => self.on_capture_event(event),

            CaptureState::Processing => match event {
                CaptureEvent::OutcomeReceived(outcome) => {
                    self.artifacts.clear();
                    if outcome.is_approved() {
                        self.state = CaptureState::Success(outcome);
                        Ok(vec![go_home(REDIRECT_DELAY)])
                    } else {
                        self.state = CaptureState::Error(CaptureFailure::Rejected {
                            reason_codes: outcome.reason_codes,
                        });
                        Ok(Vec::new())
                    }
                }
                CaptureEvent::SubmissionFailed(failure) => {
                    self.artifacts.clear();
                    self.state = CaptureState::Error(failure);
                    Ok(Vec::new())
                }
                _ => Err(TransitionError::SubmissionInFlight),
            },

            CaptureState::Error(_) => match event {
                CaptureEvent::Restart => {
                    self.restart();
                    Ok(Vec::new())
                }
                CaptureEvent::Abort => Ok(self.close()),
                other => Err(self.not_allowed(&other)),
            },

            CaptureState::Success(_) => match event {
                CaptureEvent::Abort => Ok(self.close()),
                other => Err(self.not_allowed(&other)),
            },

            CaptureState::Closed => Err(self.not_allowed(&event)),
        }
    }

    fn on_capture_event(&mut self, event: CaptureEvent) -> Result<Vec<CaptureCommand>, TransitionError> {
        let Some((step, camera)) = self.state.capture_step().map(|(s, c)| (s, c.clone())) else {
            return Err(self.not_allowed(&event));
        };

        match event {
            CaptureEvent::CameraOpened => {
                self.state = CaptureState::capturing(step, CameraStatus::Ready);
                Ok(Vec::new())
            }
            CaptureEvent::CameraDenied(message) => {
                self.state = CaptureState::capturing(step, CameraStatus::Unavailable(message));
                Ok(vec![CaptureCommand::ReleaseCamera])
            }
            CaptureEvent::RetryCamera => {
                if camera == CameraStatus::Ready {
                    return Ok(Vec::new());
                }
                self.state = CaptureState::capturing(step, CameraStatus::Opening);
                Ok(vec![CaptureCommand::AcquireCamera(step.facing())])
            }
            CaptureEvent::FrameCaptured(blob) => {
                if camera != CameraStatus::Ready {
                    return Err(TransitionError::CameraNotReady);
                }
                self.artifacts.insert(step, blob);

                let mut commands = vec![CaptureCommand::ReleaseCamera];
                match step.next() {
                    Some(next) => commands.extend(self.enter_step(next)),
                    None => commands.push(self.enter_processing()?),
                }
                Ok(commands)
            }
            CaptureEvent::Restart => {
                self.restart();
                Ok(vec![CaptureCommand::ReleaseCamera])
            }
            CaptureEvent::Abort => {
                let mut commands = vec![CaptureCommand::ReleaseCamera];
                commands.extend(self.close());
                Ok(commands)
            }
            other => Err(self.not_allowed(&other)),
        }
    }

    fn enter_step(&mut self, step: CaptureStep) -> Vec<CaptureCommand> {
        self.artifacts.discard(step);
        self.state = CaptureState::capturing(step, CameraStatus::Opening);
        vec![CaptureCommand::AcquireCamera(step.facing())]
    }

    fn enter_processing(&mut self) -> Result<CaptureCommand, TransitionError> {
        let (Some(link), Some(cpf)) = (self.link.as_ref(), self.cpf.as_ref()) else {
            return Err(TransitionError::InvalidLink);
        };
        let Some(artifacts) = self.artifacts.complete() else {
            return Err(TransitionError::NotAllowed {
                state: self.state.name(),
                event: "submit",
            });
        };

        let request = SubmissionRequest {
            user_id: link.user_id.clone(),
            session_id: link.session_id,
            cpf: cpf.clone(),
            artifacts,
        };
        self.state = CaptureState::Processing;
        Ok(CaptureCommand::Submit(request))
    }

    fn close(&mut self) -> Vec<CaptureCommand> {
        self.artifacts.clear();
        self.state = CaptureState::Closed;
        vec![go_home(Duration::ZERO)]
    }

    fn not_allowed(&self, event: &CaptureEvent) -> TransitionError {
        TransitionError::NotAllowed {
            state: self.state.name(),
            event: event.name(),
        }
    }

    fn restart(&mut self) {
        self.artifacts.clear();
        self.cpf = None;
        self.state = CaptureState::Cpf;
    }
}

fn go_home(after: Duration) -> CaptureCommand {
    CaptureCommand::Navigate {
        to: "/".to_string(),
        after,
    }
}
