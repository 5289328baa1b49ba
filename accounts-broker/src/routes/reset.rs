//! Password reset endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::BrokerError;
use crate::notifier::Notifier;
use crate::state::AppState;
use crate::store::AccountStore;

use super::account::{parse_confirmation_id, SuccessResponse};

#[derive(Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

/// POST /api/request_password_reset
/// Mail a password-reset link
pub async fn request_password_reset<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<RequestResetRequest>,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    state.request_password_reset(&req.email)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Deserialize)]
pub struct ConfirmResetRequest {
    pub id: String,
    pub pass: String,
}

/// POST /api/confirm_password_reset
pub async fn confirm_password_reset<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<ConfirmResetRequest>,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let request_id = parse_confirmation_id(&req.id)?;
    state.redeem_password_reset(&request_id, &req.pass)?;
    Ok(Json(SuccessResponse { success: true }))
}
