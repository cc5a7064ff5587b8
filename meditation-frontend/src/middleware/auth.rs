use crate::models::user::{login_redirect, AuthContext};
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tower_sessions::Session;

/// Gate for signed-in pages. Requests without an [`AuthContext`] in the
/// session are sent to the login page before any handler or backend call
/// runs.
pub async fn auth_middleware(session: Session, request: Request<Body>, next: Next) -> Response {
    match AuthContext::load(&session).await {
        Ok(Some(_)) => next.run(request).await,
        Ok(None) => {
            tracing::debug!(path = %request.uri().path(), "Unauthenticated request");
            login_redirect(request.headers().contains_key("hx-request"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read auth context");
            login_redirect(request.headers().contains_key("hx-request"))
        }
    }
}
