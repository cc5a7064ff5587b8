pub mod app;
pub mod auth;
pub mod dashboard;
pub mod generate;
pub mod history;
pub mod meditation;
pub mod metrics;
pub mod preferences;
pub mod views;

use crate::models::user::{login_redirect, AuthContext, AuthUser, UiPreferences};
use crate::services::{ApiError, AuthFailure};
use crate::AppState;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;

/// Values every full page template needs.
pub struct PageContext {
    pub title: &'static str,
    pub current_page: &'static str,
    /// Empty when signed out.
    pub user_name: String,
    pub dark_mode: bool,
}

impl PageContext {
    pub async fn build(
        session: &Session,
        user: Option<&AuthContext>,
        title: &'static str,
        current_page: &'static str,
    ) -> Self {
        let preferences = UiPreferences::load(session).await;
        Self {
            title,
            current_page,
            user_name: user.map(AuthContext::display_name).unwrap_or_default(),
            dark_mode: preferences.dark_mode,
        }
    }

    pub fn signed_in(&self) -> bool {
        !self.user_name.is_empty()
    }
}

pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Client-side navigation for htmx requests, a 303 otherwise.
pub fn navigate(to: &str, htmx: bool) -> Response {
    if htmx {
        (StatusCode::OK, [("HX-Redirect", to)], "").into_response()
    } else {
        Redirect::to(to).into_response()
    }
}

/// Why a backend-backed action did not go through.
#[derive(Debug)]
pub enum CallError {
    /// No usable credentials; the user must log in again.
    SignedOut,
    /// Shown to the user as a banner.
    Failed(String),
}

impl From<AuthFailure> for CallError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::SessionExpired => CallError::SignedOut,
            other => CallError::Failed(other.to_string()),
        }
    }
}

impl From<ApiError> for CallError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthenticated => CallError::SignedOut,
            other => CallError::Failed(other.user_message()),
        }
    }
}

/// A bearer token for `user`, refreshed if close to expiry.
pub async fn bearer_token(user: &mut AuthUser, state: &AppState) -> Result<String, CallError> {
    Ok(user.bearer_token(&state.identity).await?)
}

/// End the browser session and send the user to the login page.
pub async fn signed_out(session: &Session, htmx: bool) -> Response {
    AuthContext::teardown(session).await;
    login_redirect(htmx)
}
