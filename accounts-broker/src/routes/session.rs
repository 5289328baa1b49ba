//! Session endpoint and `token` cookie transport

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tower_cookies::cookie::time::{Duration, OffsetDateTime};
use tower_cookies::{Cookie, Cookies};

use crate::error::BrokerError;
use crate::notifier::Notifier;
use crate::session::IssuedToken;
use crate::state::AppState;
use crate::store::AccountStore;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub email: String,
}

/// GET /api/session
/// Report who is calling and slide the session forward
pub async fn get_session<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    cookies: Cookies,
) -> Result<Json<SessionResponse>, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let subject = require_session(&state, &cookies)?;

    Ok(Json(SessionResponse {
        success: true,
        email: subject,
    }))
}

/// Read the raw token from the request cookie
pub fn current_token(cookies: &Cookies) -> Result<String, BrokerError> {
    cookies
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| BrokerError::MalformedToken("no session cookie".into()))
}

/// Gate for protected endpoints: validate the cookie token, reissue it with
/// a fresh expiry and return the account identifier.
pub fn require_session<S, N>(
    state: &AppState<S, N>,
    cookies: &Cookies,
) -> Result<String, BrokerError>
where
    S: AccountStore,
    N: Notifier,
{
    let token = current_token(cookies)?;
    let fresh = state.sessions.refresh(&token)?;
    set_token_cookie(cookies, &fresh);
    Ok(fresh.subject)
}

/// Helper to set the token cookie
pub fn set_token_cookie(cookies: &Cookies, token: &IssuedToken) {
    let mut cookie = Cookie::build((TOKEN_COOKIE, token.value.clone()))
        .path("/")
        .http_only(true);
    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(token.expires_at.timestamp()) {
        cookie = cookie.expires(expires);
    }
    cookies.add(cookie.build());
}

/// Helper to overwrite the token cookie with an expired token
pub fn clear_token_cookie(cookies: &Cookies, expired: &IssuedToken) {
    let cookie = Cookie::build((TOKEN_COOKIE, expired.value.clone()))
        .path("/")
        .http_only(true)
        .max_age(Duration::ZERO)
        .build();
    cookies.add(cookie);
}
