//! Mobile side of the handoff: read the session back out of the URL

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::desktop::link_query;
use super::errors::HandoffError;
use crate::common::SessionId;

/// Delay before an invalid link sends the user home
pub const INVALID_LINK_REDIRECT_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileLink {
    pub user_id: String,
    pub session_id: SessionId,
    /// Unvalidated; the capture flow checks it at the CPF step
    pub cpf: Option<String>,
}

/// A capture session started directly on the phone, with no desktop handoff.
///
/// There is no CPF yet; the capture flow asks for it at its first step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileEntry {
    pub session_id: SessionId,
    /// Mobile capture path with its `userId` and `sessionId` query
    pub path: String,
}

impl MobileEntry {
    pub fn start(user_id: &str, mobile_path: &str) -> Result<Self, HandoffError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(HandoffError::MissingUserId);
        }
        let session_id = SessionId::new();
        let path = format!(
            "/{}?{}",
            mobile_path.trim_matches('/'),
            link_query(user_id, session_id, None)
        );

        debug!(user_id, session_id = %session_id, "Mobile capture session started");

        Ok(Self { session_id, path })
    }

    /// The query part of `path`
    pub fn query(&self) -> &str {
        self.path.split_once('?').map(|(_, q)| q).unwrap_or_default()
    }
}

/// Where an invalid link sends the user, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidLinkRedirect {
    pub redirect_to: String,
    pub redirect_after_ms: u64,
}

impl Default for InvalidLinkRedirect {
    fn default() -> Self {
        Self {
            redirect_to: "/".to_string(),
            redirect_after_ms: INVALID_LINK_REDIRECT_AFTER.as_millis() as u64,
        }
    }
}

/// Parse the query string of a mobile verification URL.
///
/// Both `userId` and `sessionId` must be present and non-empty.
pub fn parse_mobile_link(query: &str) -> Result<MobileLink, HandoffError> {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut user_id = None;
    let mut session_id = None;
    let mut cpf = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "userId" => user_id = Some(value),
            "sessionId" => session_id = Some(value),
            "cpf" => cpf = Some(value),
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| invalid("missing userId"))?;
    let session_id = session_id.ok_or_else(|| invalid("missing sessionId"))?;
    let session_id = SessionId::parse(&session_id).map_err(|_| invalid("malformed sessionId"))?;

    Ok(MobileLink {
        user_id,
        session_id,
        cpf,
    })
}

fn invalid(reason: &str) -> HandoffError {
    warn!(reason, "Rejected mobile verification link");
    HandoffError::InvalidLink(reason.to_string())
}
