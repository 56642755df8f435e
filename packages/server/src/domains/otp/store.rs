//! Typed access to OTP records in the key-value store.
//!
//! Keys:
//! - `otp:code:{user_id}` holds the user's single active [`OneTimeCode`]
//! - `otp:rate:{user_id}:{sha256(phone)}` holds the [`IssuanceRecord`] for the pair
//!
//! Rate checks read one bounded record per pair instead of scanning every code.

use anyhow::{Context, Result};
use chrono::Duration;

use super::types::{IssuanceRecord, OneTimeCode};
use crate::common::hash_phone_number;
use crate::kernel::BaseKeyValueStore;

pub struct OtpStore<'a> {
    kv: &'a dyn BaseKeyValueStore,
}

impl<'a> OtpStore<'a> {
    pub fn new(kv: &'a dyn BaseKeyValueStore) -> Self {
        Self { kv }
    }

    fn code_key(user_id: &str) -> String {
        format!("otp:code:{}", user_id)
    }

    fn rate_key(user_id: &str, phone: &str) -> String {
        format!("otp:rate:{}:{}", user_id, hash_phone_number(phone))
    }

    pub async fn load_code(&self, user_id: &str) -> Result<Option<OneTimeCode>> {
        match self.kv.get(&Self::code_key(user_id)).await? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).context("Corrupt one-time code record")?,
            )),
            None => Ok(None),
        }
    }

    pub async fn save_code(&self, code: &OneTimeCode, ttl: Duration) -> Result<()> {
        let value = serde_json::to_value(code)?;
        self.kv.set(&Self::code_key(&code.user_id), value, ttl).await
    }

    pub async fn delete_code(&self, user_id: &str) -> Result<()> {
        self.kv.delete(&Self::code_key(user_id)).await
    }

    pub async fn load_issuances(&self, user_id: &str, phone: &str) -> Result<IssuanceRecord> {
        match self.kv.get(&Self::rate_key(user_id, phone)).await? {
            Some(value) => serde_json::from_value(value).context("Corrupt issuance record"),
            None => Ok(IssuanceRecord::default()),
        }
    }

    pub async fn save_issuances(
        &self,
        user_id: &str,
        phone: &str,
        record: &IssuanceRecord,
        ttl: Duration,
    ) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.kv.set(&Self::rate_key(user_id, phone), value, ttl).await
    }
}
