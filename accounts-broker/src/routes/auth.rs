//! Login, logout and password change endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::error::BrokerError;
use crate::notifier::Notifier;
use crate::state::AppState;
use crate::store::AccountStore;

use super::account::SuccessResponse;
use super::session::{clear_token_cookie, require_session, set_token_cookie};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub pass: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub email: String,
    pub expires_at: i64,
}

/// POST /api/login
pub async fn login<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let token = state.login(&req.email, &req.pass)?;
    set_token_cookie(&cookies, &token);

    Ok(Json(LoginResponse {
        success: true,
        email: req.email,
        expires_at: token.expires_at.timestamp(),
    }))
}

/// POST /api/logout
pub async fn logout<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    cookies: Cookies,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let expired = state.logout()?;
    clear_token_cookie(&cookies, &expired);
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub oldpass: String,
    pub newpass: String,
    pub newpass_confirm: String,
}

/// POST /api/change_password
pub async fn change_password<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    cookies: Cookies,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let account_id = require_session(&state, &cookies)?;
    state.change_password(&account_id, &req.oldpass, &req.newpass, &req.newpass_confirm)?;
    Ok(Json(SuccessResponse { success: true }))
}
