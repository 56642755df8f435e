//! OTP domain data types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Limits for code issuance and verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpPolicy {
    /// A code is usable only while younger than this
    pub code_ttl: Duration,
    /// Wrong submissions allowed per code
    pub max_attempts: u32,
    /// Issuances allowed per (user, phone) inside `rate_window`
    pub max_issuances: usize,
    pub rate_window: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            code_ttl: Duration::minutes(10),
            max_attempts: 3,
            max_issuances: 3,
            rate_window: Duration::hours(1),
        }
    }
}

/// The active code for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub user_id: String,
    pub phone: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub attempts: u32,
}

impl OneTimeCode {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at >= ttl
    }
}

/// Issuance timestamps for one (user, phone) pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRecord {
    pub issued: Vec<DateTime<Utc>>,
}

impl IssuanceRecord {
    /// Drop entries that have left the trailing window.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        self.issued.retain(|at| now - *at < window);
    }

    /// How long until the oldest entry leaves the window.
    pub fn retry_after(&self, now: DateTime<Utc>, window: Duration) -> Duration {
        self.issued
            .iter()
            .min()
            .map(|oldest| (*oldest + window - now).max(Duration::zero()))
            .unwrap_or_else(Duration::zero)
    }
}

/// Result of sending an OTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
    pub message_id: String,
    pub status: String,
}

/// Result of verifying an OTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpVerified {
    /// The phone that now belongs to the user; the caller persists it on the profile
    pub phone: String,
}
