use serde::{Deserialize, Serialize};

/// Subset of the Message resource returned by `POST /Messages.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    pub status: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Error body Twilio sends with 4xx/5xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioApiError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_ignores_unknown_fields() {
        let json = r#"{
            "sid": "SM123",
            "status": "queued",
            "to": "+5561999999999",
            "num_segments": "1",
            "error_code": null
        }"#;
        let parsed: MessageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sid, "SM123");
        assert_eq!(parsed.status, "queued");
        assert!(parsed.error_code.is_none());
    }

    #[test]
    fn test_api_error_parses_message() {
        let json = r#"{"code": 21211, "message": "Invalid 'To' Phone Number", "status": 400}"#;
        let parsed: TwilioApiError = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.code, Some(21211));
        assert_eq!(parsed.message, "Invalid 'To' Phone Number");
    }
}
