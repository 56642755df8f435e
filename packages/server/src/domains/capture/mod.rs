//! Capture domain - the mobile document and selfie capture flow
//!
//! `machine` holds the pure transition table, `flow` runs it against a
//! camera and a submitter, `camera` scopes hardware access to one step.

pub mod artifacts;
pub mod camera;
pub mod flow;
pub mod machine;

pub use artifacts::{
    CaptureArtifactSet, CaptureStep, CompleteArtifacts, ImageBlob, ImageError, MAX_IMAGE_BYTES,
};
pub use camera::{Camera, CameraError, CameraFacing, CameraGuard, CameraStream};
pub use flow::{CaptureFlow, CaptureFlowError, DocumentSubmitter, Navigation, DEFAULT_SUBMIT_TIMEOUT};
pub use machine::{
    CameraStatus, CaptureCommand, CaptureEvent, CaptureFailure, CaptureMachine, CaptureState,
    SubmissionRequest, TransitionError,
};
