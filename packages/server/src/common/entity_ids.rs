//! Typed ID aliases for verification entities.

pub use super::id::Id;

/// Marker for a desktop→mobile verification session.
pub struct VerificationSession;

/// Marker for a persisted document-verification outcome.
pub struct VerificationOutcomeRecord;

/// Correlates the desktop-rendered QR code with the mobile capture page.
pub type SessionId = Id<VerificationSession>;

pub type OutcomeId = Id<VerificationOutcomeRecord>;
