//! Verification domain - document and selfie verification against the oracle
//!
//! The orchestrator uploads the three images, asks the matching oracle for a
//! verdict, and records every verdict as a new outcome.

pub mod errors;
pub mod models;
pub mod orchestrator;

pub use errors::VerificationError;
pub use models::{OutcomeStatus, ReasonCode, VerificationOutcome};
pub use orchestrator::VerificationOrchestrator;
