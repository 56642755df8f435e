//! Verify OTP activity

use tracing::{info, warn};

use crate::common::{hash_phone_number, is_well_formed_code};
use crate::domains::otp::errors::OtpError;
use crate::domains::otp::store::OtpStore;
use crate::domains::otp::types::OtpVerified;
use crate::kernel::ServerDeps;

/// Check a submitted code against the user's active code.
///
/// Checks run in a fixed order: presence, expiry, attempt budget, match.
/// Expired and exhausted codes are deleted when detected. A wrong code
/// burns one attempt; the right one consumes the code.
pub async fn verify_otp(code: &str, user_id: &str, deps: &ServerDeps) -> Result<OtpVerified, OtpError> {
    if !is_well_formed_code(code) {
        return Err(OtpError::InvalidCode);
    }

    let policy = &deps.otp_policy;
    let store = OtpStore::new(deps.kv_store.as_ref());
    let now = deps.clock.now();

    let Some(mut active) = store.load_code(user_id).await? else {
        return Err(OtpError::NoActiveCode);
    };

    if active.is_expired(now, policy.code_ttl) {
        store.delete_code(user_id).await?;
        info!(user_id, "OTP expired");
        return Err(OtpError::Expired);
    }

    if active.attempts >= policy.max_attempts {
        store.delete_code(user_id).await?;
        warn!(user_id, "OTP attempt budget exhausted");
        return Err(OtpError::TooManyAttempts);
    }

    if !constant_time_eq(active.code.as_bytes(), code.as_bytes()) {
        active.attempts += 1;
        store.save_code(&active, policy.rate_window).await?;
        let remaining_attempts = policy.max_attempts.saturating_sub(active.attempts);
        warn!(user_id, remaining_attempts, "Incorrect OTP submitted");
        return Err(OtpError::IncorrectCode { remaining_attempts });
    }

    store.delete_code(user_id).await?;
    info!(
        user_id,
        phone_hash = %hash_phone_number(&active.phone),
        "OTP verified"
    );

    Ok(OtpVerified {
        phone: active.phone,
    })
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
