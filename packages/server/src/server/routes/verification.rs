//! GET /api/users/:user_id/verification - latest outcome for a user

use axum::{
    extract::{Extension, Path},
    Json,
};

use crate::domains::verification::VerificationOutcome;
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

pub async fn latest_verification_handler(
    Extension(state): Extension<AxumAppState>,
    Path(user_id): Path<String>,
) -> Result<Json<VerificationOutcome>, ApiError> {
    let outcome = state
        .deps
        .outcome_store
        .latest_for_user(&user_id)
        .await
        .map_err(ApiError::internal)?;

    outcome
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No verification on record for this user"))
}
