//! Send OTP activity

use rand::Rng;
use tracing::{info, warn};

use crate::common::{hash_phone_number, is_valid_mobile_phone};
use crate::domains::otp::errors::OtpError;
use crate::domains::otp::store::OtpStore;
use crate::domains::otp::types::{OneTimeCode, OtpSent};
use crate::kernel::ServerDeps;

/// Issue a fresh code for `user_id` and text it to `phone`.
///
/// Validation happens before anything is written. A rate-limited request
/// leaves the active code untouched. If delivery fails the new code stays
/// stored and usable.
pub async fn send_otp(phone: &str, user_id: &str, deps: &ServerDeps) -> Result<OtpSent, OtpError> {
    if !is_valid_mobile_phone(phone) {
        return Err(OtpError::InvalidPhone);
    }
    if user_id.trim().is_empty() {
        return Err(OtpError::InvalidUserId);
    }

    let policy = &deps.otp_policy;
    let store = OtpStore::new(deps.kv_store.as_ref());
    let now = deps.clock.now();
    let phone_hash = hash_phone_number(phone);

    let mut issuances = store.load_issuances(user_id, phone).await?;
    issuances.prune(now, policy.rate_window);
    if issuances.issued.len() >= policy.max_issuances {
        let retry_after_secs = issuances.retry_after(now, policy.rate_window).num_seconds();
        warn!(user_id, phone_hash = %phone_hash, retry_after_secs, "OTP issuance rate limited");
        return Err(OtpError::RateLimited { retry_after_secs });
    }

    let code = OneTimeCode {
        user_id: user_id.to_string(),
        phone: phone.to_string(),
        code: generate_code(),
        issued_at: now,
        attempts: 0,
    };
    // Outlive the code itself so "expired" stays distinguishable from "no code"
    store.save_code(&code, policy.rate_window).await?;

    issuances.issued.push(now);
    store
        .save_issuances(user_id, phone, &issuances, policy.rate_window)
        .await?;

    let body = format!(
        "Your verification code is {}. It expires in {} minutes.",
        code.code,
        policy.code_ttl.num_minutes()
    );

    let receipt = deps.messaging.send_sms(phone, &body).await.map_err(|e| {
        warn!(user_id, phone_hash = %phone_hash, error = %e, "OTP delivery failed");
        OtpError::Delivery(e.to_string())
    })?;

    info!(
        user_id,
        phone_hash = %phone_hash,
        message_id = %receipt.message_id,
        "OTP sent"
    );

    Ok(OtpSent {
        message_id: receipt.message_id,
        status: receipt.status,
    })
}

/// Uniform over 000000..=999999
fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}
