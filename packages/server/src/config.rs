use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Externally reachable origin for handoff links; request origin is used when unset
    pub public_base_url: Option<String>,
    pub mobile_verify_path: String,
    /// Outcomes go to Postgres when set, memory otherwise
    pub database_url: Option<String>,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// Sender number or Messaging Service SID (`MG...`)
    pub twilio_from_number: String,
    pub oracle_url: String,
    pub oracle_api_key: Option<String>,
    pub oracle_timeout_secs: u64,
    pub blob_dir: String,
    pub blob_public_base_url: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid number")?;

        let blob_dir = env::var("BLOB_DIR").unwrap_or_else(|_| "./uploads".to_string());

        Ok(Self {
            port,
            public_base_url: optional("PUBLIC_BASE_URL"),
            mobile_verify_path: env::var("MOBILE_VERIFY_PATH")
                .unwrap_or_else(|_| "/verify/mobile".to_string()),
            database_url: optional("DATABASE_URL"),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID")
                .context("TWILIO_ACCOUNT_SID must be set")?,
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN")
                .context("TWILIO_AUTH_TOKEN must be set")?,
            twilio_from_number: env::var("TWILIO_FROM_NUMBER")
                .context("TWILIO_FROM_NUMBER must be set")?,
            oracle_url: env::var("ORACLE_URL").context("ORACLE_URL must be set")?,
            oracle_api_key: optional("ORACLE_API_KEY"),
            oracle_timeout_secs: env::var("ORACLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("ORACLE_TIMEOUT_SECS must be a whole number of seconds")?,
            // Uploads are never served by this process; without a bucket URL the
            // oracle must share the disk
            blob_public_base_url: env::var("BLOB_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("file://{}", blob_dir.trim_end_matches('/'))),
            blob_dir,
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
        })
    }
}

/// Unset and blank are the same thing
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example, https://b.example,,"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }
}
