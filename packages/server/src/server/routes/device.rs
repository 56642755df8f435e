//! GET /api/verification/entry?userId=U&viewportWidth=N
//!
//! Decides once, at flow entry, whether this client captures documents
//! itself or hands off to a phone. A phone gets a fresh session and a path
//! the capture page can open as is.

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::SessionId;
use crate::domains::device::{ClientCapabilities, DeviceClass, DeviceRouter, FlowEntry};
use crate::domains::handoff::MobileEntry;
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryQuery {
    pub user_id: Option<String>,
    pub viewport_width: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub device: DeviceClass,
    pub entry: FlowEntry,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

pub async fn entry_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
    query: Result<Query<EntryQuery>, QueryRejection>,
) -> Result<Json<EntryResponse>, ApiError> {
    let Query(query) = query?;
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let caps = ClientCapabilities::from_user_agent(user_agent, query.viewport_width);
    let device = DeviceRouter::classify(&caps);
    let entry = DeviceRouter::entry(device);

    let mobile_path = &state.deps.handoff.mobile_path;
    let (path, session_id) = match entry {
        FlowEntry::MobileCapture => {
            let user_id = query.user_id.as_deref().unwrap_or_default();
            let mobile = MobileEntry::start(user_id, mobile_path)?;
            (mobile.path, Some(mobile.session_id))
        }
        FlowEntry::DesktopHandoff => (entry.path(mobile_path), None),
    };

    Ok(Json(EntryResponse {
        device,
        entry,
        path,
        session_id,
    }))
}
