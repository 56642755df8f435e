//! Captured images and the set they are collected into

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::camera::CameraFacing;

/// Largest accepted image, 10 MiB
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("Image is empty")]
    Empty,

    #[error("Image is {size} bytes, limit is {limit}", limit = MAX_IMAGE_BYTES)]
    TooLarge { size: usize },
}

/// A validated image ready for upload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    content_type: String,
    bytes: Bytes,
}

impl ImageBlob {
    pub fn new(content_type: &str, bytes: Bytes) -> Result<Self, ImageError> {
        // Drop parameters like "; charset=binary"
        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ImageError::UnsupportedType(content_type));
        }
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge { size: bytes.len() });
        }

        Ok(Self {
            content_type,
            bytes,
        })
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension for the content type
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            _ => "jpg",
        }
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlob")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The three photographs a verification needs, in capture order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureStep {
    DocumentFront,
    DocumentBack,
    Selfie,
}

impl CaptureStep {
    pub const ALL: [CaptureStep; 3] = [
        CaptureStep::DocumentFront,
        CaptureStep::DocumentBack,
        CaptureStep::Selfie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStep::DocumentFront => "document-front",
            CaptureStep::DocumentBack => "document-back",
            CaptureStep::Selfie => "selfie",
        }
    }

    /// Documents are shot with the rear camera, the selfie with the front one
    pub fn facing(&self) -> CameraFacing {
        match self {
            CaptureStep::Selfie => CameraFacing::User,
            _ => CameraFacing::Environment,
        }
    }

    pub fn next(&self) -> Option<CaptureStep> {
        match self {
            CaptureStep::DocumentFront => Some(CaptureStep::DocumentBack),
            CaptureStep::DocumentBack => Some(CaptureStep::Selfie),
            CaptureStep::Selfie => None,
        }
    }
}

impl fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Images collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureArtifactSet {
    pub document_front: Option<ImageBlob>,
    pub document_back: Option<ImageBlob>,
    pub selfie: Option<ImageBlob>,
}

impl CaptureArtifactSet {
    fn slot(&mut self, step: CaptureStep) -> &mut Option<ImageBlob> {
        match step {
            CaptureStep::DocumentFront => &mut self.document_front,
            CaptureStep::DocumentBack => &mut self.document_back,
            CaptureStep::Selfie => &mut self.selfie,
        }
    }

    pub fn get(&self, step: CaptureStep) -> Option<&ImageBlob> {
        match step {
            CaptureStep::DocumentFront => self.document_front.as_ref(),
            CaptureStep::DocumentBack => self.document_back.as_ref(),
            CaptureStep::Selfie => self.selfie.as_ref(),
        }
    }

    pub fn insert(&mut self, step: CaptureStep, blob: ImageBlob) {
        *self.slot(step) = Some(blob);
    }

    pub fn discard(&mut self, step: CaptureStep) {
        *self.slot(step) = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn captured(&self) -> usize {
        CaptureStep::ALL.iter().filter(|s| self.get(**s).is_some()).count()
    }

    /// All three images, or nothing
    pub fn complete(&self) -> Option<CompleteArtifacts> {
        Some(CompleteArtifacts {
            document_front: self.document_front.clone()?,
            document_back: self.document_back.clone()?,
            selfie: self.selfie.clone()?,
        })
    }
}

/// A full artifact set. Only this type can be submitted for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteArtifacts {
    document_front: ImageBlob,
    document_back: ImageBlob,
    selfie: ImageBlob,
}

impl CompleteArtifacts {
    pub fn get(&self, step: CaptureStep) -> &ImageBlob {
        match step {
            CaptureStep::DocumentFront => &self.document_front,
            CaptureStep::DocumentBack => &self.document_back,
            CaptureStep::Selfie => &self.selfie,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CaptureStep, &ImageBlob)> {
        CaptureStep::ALL.into_iter().map(move |step| (step, self.get(step)))
    }
}
