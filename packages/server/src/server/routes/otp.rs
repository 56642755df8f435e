//! Phone verification endpoints.
//!
//! POST /api/otp/send    {phone, userId} -> {messageId, status}
//! POST /api/otp/verify  {code, userId}  -> {phone}

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::domains::otp::{send_otp, verify_otp, OtpSent, OtpVerified};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;
use crate::server::middleware::ClientIp;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub phone: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub code: String,
    pub user_id: String,
}

pub async fn send_otp_handler(
    Extension(state): Extension<AxumAppState>,
    client_ip: Option<Extension<ClientIp>>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<OtpSent>, ApiError> {
    let Json(request) = payload?;
    if let Some(Extension(ClientIp(ip))) = client_ip {
        debug!(%ip, user_id = %request.user_id, "OTP requested");
    }

    let sent = send_otp(&request.phone, &request.user_id, &state.deps).await?;
    Ok(Json(sent))
}

pub async fn verify_otp_handler(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<OtpVerified>, ApiError> {
    let Json(request) = payload?;
    let verified = verify_otp(&request.code, &request.user_id, &state.deps).await?;
    Ok(Json(verified))
}
