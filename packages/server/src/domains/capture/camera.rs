//! Camera access scoped to a single capture step

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::artifacts::ImageBlob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    /// Rear camera
    Environment,
    /// Front camera
    User,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera is already in use")]
    Busy,

    #[error("Camera stream has been stopped")]
    Stopped,

    #[error("Camera failure: {0}")]
    Device(String),
}

/// Source of camera streams
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// An open camera. Must be stopped to release the hardware.
pub trait CameraStream: Send {
    fn facing(&self) -> CameraFacing;

    fn grab_frame(&mut self) -> Result<ImageBlob, CameraError>;

    /// Release the device. Calling twice is a no-op.
    fn stop(&mut self);
}

/// Owns a stream and stops it when dropped, on every exit path
pub struct CameraGuard {
    stream: Box<dyn CameraStream>,
}

impl CameraGuard {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        debug!(facing = ?stream.facing(), "Camera acquired");
        Self { stream }
    }

    pub fn facing(&self) -> CameraFacing {
        self.stream.facing()
    }

    pub fn grab_frame(&mut self) -> Result<ImageBlob, CameraError> {
        self.stream.grab_frame()
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.stream.stop();
        debug!(facing = ?self.stream.facing(), "Camera released");
    }
}
