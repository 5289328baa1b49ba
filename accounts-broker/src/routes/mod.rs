//! HTTP routes for the broker

mod account;
mod auth;
mod reset;
mod session;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::notifier::Notifier;
use crate::state::AppState;
use crate::store::AccountStore;

pub use session::TOKEN_COOKIE;

/// Create the router with all routes
pub fn create_router<S, N>(state: Arc<AppState<S, N>>) -> Router
where
    S: AccountStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/register", post(account::register))
        .route("/api/confirm_account", post(account::confirm_account))
        .route("/api/resend_confirmation", post(account::resend_confirmation))
        .route("/api/account", get(account::get_account))
        .route("/api/account_cancel", post(account::account_cancel))
        .route("/api/request_password_reset", post(reset::request_password_reset))
        .route("/api/confirm_password_reset", post(reset::confirm_password_reset))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/change_password", post(auth::change_password))
        .route("/api/session", get(session::get_session))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
