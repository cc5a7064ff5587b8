use super::PageContext;
use crate::models::AuthContext;
use askama::Template;
use axum::response::IntoResponse;
use tower_sessions::Session;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
}

pub async fn index(session: Session) -> impl IntoResponse {
    let user = AuthContext::load(&session).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read auth context");
        None
    });

    IndexTemplate {
        page: PageContext::build(&session, user.as_ref(), "SereNidra", "home").await,
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
