// Minimal client for Twilio Programmable Messaging (SMS).
//
// Codes are generated and checked by the caller; Twilio only carries the text.

use std::collections::HashMap;

pub mod models;
use reqwest::{header, Client};

use crate::models::{MessageResponse, TwilioApiError};

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 format (or a messaging service SID starting with "MG")
    pub from: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TwilioError {
    #[error("request to Twilio failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Twilio returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse Twilio response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
    base_url: String,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host (local stubs, regional edges).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{base}/Accounts/{sid}/Messages.json",
            base = self.base_url,
            sid = self.options.account_sid
        )
    }

    fn message_form<'a>(&'a self, recipient: &'a str, body: &'a str) -> HashMap<&'static str, &'a str> {
        let mut form_body = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Body", body);

        // Messaging service SIDs use a different parameter than plain numbers
        if self.options.from.starts_with("MG") {
            form_body.insert("MessagingServiceSid", self.options.from.as_str());
        } else {
            form_body.insert("From", self.options.from.as_str());
        }
        form_body
    }

    /// Send a text message to `recipient`.
    pub async fn send_sms(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<MessageResponse, TwilioError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(headers)
            .form(&self.message_form(recipient, body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TwilioApiError>(&error_body)
                .map(|e| e.message)
                .unwrap_or(error_body);
            return Err(TwilioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<MessageResponse>()
            .await
            .map_err(|e| TwilioError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(from: &str) -> TwilioOptions {
        TwilioOptions {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from: from.to_string(),
        }
    }

    #[test]
    fn test_messages_url_uses_account_sid() {
        let service = TwilioService::new(options("+15550000000"));
        assert_eq!(
            service.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let service = TwilioService::new(options("+15550000000")).with_base_url("http://localhost:4010/");
        assert_eq!(
            service.messages_url(),
            "http://localhost:4010/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_form_uses_from_number() {
        let service = TwilioService::new(options("+15550000000"));
        let form = service.message_form("+5561999999999", "hello");
        assert_eq!(form.get("From"), Some(&"+15550000000"));
        assert_eq!(form.get("To"), Some(&"+5561999999999"));
        assert!(!form.contains_key("MessagingServiceSid"));
    }

    #[test]
    fn test_form_uses_messaging_service() {
        let service = TwilioService::new(options("MG0001"));
        let form = service.message_form("+5561999999999", "hello");
        assert_eq!(form.get("MessagingServiceSid"), Some(&"MG0001"));
        assert!(!form.contains_key("From"));
    }
}
