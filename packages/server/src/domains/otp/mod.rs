//! OTP domain - phone ownership via SMS one-time codes
//!
//! Responsibilities:
//! - Issue six-digit codes with a per (user, phone) rolling-hour rate limit
//! - Verify codes under expiry and attempt limits
//! - Keep phone numbers out of storage keys and logs (hashed)

pub mod activities;
pub mod errors;
pub mod store;
pub mod types;

pub use activities::{send_otp, verify_otp};
pub use errors::OtpError;
pub use types::{OneTimeCode, OtpPolicy, OtpSent, OtpVerified};
