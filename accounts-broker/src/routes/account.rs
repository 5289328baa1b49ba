//! Account creation, confirmation and cancellation endpoints

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::BrokerError;
use crate::notifier::Notifier;
use crate::state::AppState;
use crate::store::{AccountStatus, AccountStore, ConfirmationId};

use super::session::{clear_token_cookie, require_session};

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub surname: String,
    pub pass: String,
}

/// POST /api/register
/// Create a pending account and mail its confirmation link
pub async fn register<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    state.register(&req.email, &req.name, &req.surname, &req.pass)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub id: String,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub email: String,
}

/// Parse a confirmation identifier taken from a link
pub(super) fn parse_confirmation_id(raw: &str) -> Result<ConfirmationId, BrokerError> {
    ConfirmationId::from_str(raw)
        .map_err(|_| BrokerError::InvalidInput("malformed confirmation id".into()))
}

/// POST /api/confirm_account
pub async fn confirm_account<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let request_id = parse_confirmation_id(&req.id)?;
    let email = state.redeem_confirmation(&request_id)?;
    Ok(Json(ConfirmResponse {
        success: true,
        email,
    }))
}

#[derive(Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

/// POST /api/resend_confirmation
pub async fn resend_confirmation<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<ResendRequest>,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    state.resend_confirmation(&req.email)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub status: AccountStatus,
    pub password_updated_at: i64,
    pub created_at: i64,
}

/// GET /api/account
/// Profile of the signed-in account
pub async fn get_account<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    cookies: Cookies,
) -> Result<Json<AccountResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let account_id = require_session(&state, &cookies)?;
    let account = state.account(&account_id)?;

    Ok(Json(AccountResponse {
        success: true,
        email: account.id,
        name: account.name,
        surname: account.surname,
        status: account.status,
        password_updated_at: account.password_updated_at.timestamp(),
        created_at: account.created_at.timestamp(),
    }))
}

#[derive(Deserialize)]
pub struct AccountCancelRequest {
    pub pass: String,
}

/// POST /api/account_cancel
/// Delete the signed-in account and end the session
pub async fn account_cancel<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    cookies: Cookies,
    Json(req): Json<AccountCancelRequest>,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let account_id = require_session(&state, &cookies)?;
    state.cancel_account(&account_id, &req.pass)?;

    let expired = state.logout()?;
    clear_token_cookie(&cookies, &expired);

    Ok(Json(SuccessResponse { success: true }))
}
