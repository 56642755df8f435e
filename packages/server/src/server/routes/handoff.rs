//! Desktop to mobile handoff endpoints.
//!
//! POST /api/handoff          {userId, cpf, sessionId?} -> {sessionId, url, qrSvg}
//! GET  /api/handoff/resolve  ?userId&sessionId&cpf     -> link or invalid_link

use axum::{
    extract::{rejection::JsonRejection, Extension, RawQuery},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::common::SessionId;
use crate::domains::handoff::{
    origin_from_headers, parse_mobile_link, DesktopHandoff, HandoffCode, MobileLink,
};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHandoffRequest {
    pub user_id: String,
    pub cpf: String,
    /// Present when the desktop asks to regenerate an existing session's code
    pub session_id: Option<SessionId>,
}

pub async fn create_handoff_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateHandoffRequest>, JsonRejection>,
) -> Result<Json<HandoffCode>, ApiError> {
    let Json(request) = payload?;
    let settings = &state.deps.handoff;

    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let origin = origin_from_headers(
        header_str(header::ORIGIN.as_str()),
        header_str("x-forwarded-proto"),
        header_str(header::HOST.as_str()),
    );
    let base = settings.resolve_base(origin.as_deref())?;

    let handoff = match request.session_id {
        Some(session_id) => DesktopHandoff::resume(
            session_id,
            &request.user_id,
            &request.cpf,
            &base,
            &settings.mobile_path,
        )?,
        None => DesktopHandoff::start(&request.user_id, &request.cpf, &base, &settings.mobile_path)?,
    };

    info!(
        user_id = %handoff.user_id,
        session_id = %handoff.session_id,
        regenerated = request.session_id.is_some(),
        "Handoff code issued"
    );

    Ok(Json(handoff.regenerate()?))
}

pub async fn resolve_handoff_handler(RawQuery(query): RawQuery) -> Result<Json<MobileLink>, ApiError> {
    let link = parse_mobile_link(query.as_deref().unwrap_or_default())?;
    Ok(Json(link))
}
