use crate::services::identity_client::{AuthFailure, IdentityClient, TokenGrant};
use crate::utils::jwt::decode_id_token_claims;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use meditation_core::error::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

pub const AUTH_SESSION_KEY: &str = "auth";
pub const PREFERENCES_SESSION_KEY: &str = "ui_preferences";

/// Refresh the ID token when it expires within this many seconds.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// The signed-in user's identity and tokens.
///
/// Created at login, stored in the server-side session, and torn down at
/// logout. Handlers receive it through [`AuthUser`]; nothing reads it from a
/// global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl AuthContext {
    /// Build a context from a fresh grant, preferring claims carried in the
    /// ID token itself.
    pub fn from_grant(grant: TokenGrant, login_email: &str) -> Self {
        let claims = decode_id_token_claims(&grant.id_token)
            .map_err(|e| tracing::debug!(error = %e, "ID token claims not readable"))
            .ok();

        let user_id = grant
            .user_id
            .clone()
            .or_else(|| claims.as_ref().map(|c| c.sub.clone()))
            .unwrap_or_default();
        let email = grant
            .email
            .clone()
            .or_else(|| claims.as_ref().and_then(|c| c.email.clone()))
            .unwrap_or_else(|| login_email.to_string());
        let expires_at = claims.as_ref().map(|c| c.exp).unwrap_or(grant.expires_at);

        Self {
            user_id,
            email,
            id_token: grant.id_token,
            refresh_token: grant.refresh_token,
            expires_at,
        }
    }

    /// Same user, new tokens.
    pub fn refreshed(&self, grant: TokenGrant) -> Self {
        let mut next = Self::from_grant(grant, &self.email);
        if next.user_id.is_empty() {
            next.user_id = self.user_id.clone();
        }
        next
    }

    pub fn needs_refresh(&self, now: i64) -> bool {
        self.expires_at - now <= REFRESH_MARGIN_SECS
    }

    /// Local part of the email address.
    pub fn display_name(&self) -> String {
        match self.email.split('@').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "User".to_string(),
        }
    }

    pub async fn load(session: &Session) -> Result<Option<Self>, AppError> {
        session
            .get::<AuthContext>(AUTH_SESSION_KEY)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))
    }

    pub async fn store(&self, session: &Session) -> Result<(), AppError> {
        session
            .insert(AUTH_SESSION_KEY, self)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))
    }

    /// End of the context's lifecycle: drop everything held for this browser,
    /// including form drafts and cached history.
    pub async fn teardown(session: &Session) {
        session.clear().await;
    }
}

/// Authenticated user extracted from the session.
///
/// Requests without a stored [`AuthContext`] never reach the handler: full
/// page loads are redirected to `/login`, htmx requests get a 401 with an
/// `HX-Redirect` header.
pub struct AuthUser {
    pub context: AuthContext,
    session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        let context = AuthContext::load(&session).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to read auth context");
            None
        });

        match context {
            Some(context) => Ok(AuthUser { context, session }),
            None => Err(login_redirect(parts.headers.contains_key("hx-request"))),
        }
    }
}

impl AuthUser {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A bearer token that is valid for at least [`REFRESH_MARGIN_SECS`].
    ///
    /// Refreshes through the identity provider when needed and writes the
    /// new tokens back to the session. A rejected refresh ends the session.
    pub async fn bearer_token(&mut self, identity: &IdentityClient) -> Result<String, AuthFailure> {
        if !self.context.needs_refresh(Utc::now().timestamp()) {
            return Ok(self.context.id_token.clone());
        }

        if self.context.refresh_token.is_empty() {
            AuthContext::teardown(&self.session).await;
            return Err(AuthFailure::SessionExpired);
        }

        match identity.refresh(&self.context.refresh_token).await {
            Ok(grant) => {
                self.context = self.context.refreshed(grant);
                if let Err(e) = self.context.store(&self.session).await {
                    tracing::error!(error = %e, "Failed to persist refreshed token");
                }
                tracing::debug!(user_id = %self.context.user_id, "ID token refreshed");
                Ok(self.context.id_token.clone())
            }
            Err(AuthFailure::SessionExpired) => {
                tracing::info!(user_id = %self.context.user_id, "Refresh token rejected, ending session");
                AuthContext::teardown(&self.session).await;
                Err(AuthFailure::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }
}

/// Redirect to the login page, htmx-aware.
pub fn login_redirect(is_htmx: bool) -> Response {
    if is_htmx {
        (StatusCode::UNAUTHORIZED, [("HX-Redirect", "/login")], "").into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

/// Per-browser display preferences.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiPreferences {
    pub dark_mode: bool,
}

impl UiPreferences {
    pub async fn load(session: &Session) -> Self {
        session
            .get::<UiPreferences>(PREFERENCES_SESSION_KEY)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read UI preferences");
                None
            })
            .unwrap_or_default()
    }

    pub async fn store(&self, session: &Session) -> Result<(), AppError> {
        session
            .insert(PREFERENCES_SESSION_KEY, self)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    fn grant(id_token: &str) -> TokenGrant {
        TokenGrant {
            id_token: id_token.to_string(),
            refresh_token: "refresh-1".to_string(),
            user_id: None,
            email: None,
            expires_at: 1_000,
        }
    }

    #[test]
    fn test_from_grant_prefers_token_claims() {
        let payload = general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"sub":"uid-7","email":"sam@example.com","exp":5000}"#);
        let token = format!("header.{}.sig", payload);

        let context = AuthContext::from_grant(grant(&token), "typed@example.com");
        assert_eq!(context.user_id, "uid-7");
        assert_eq!(context.email, "sam@example.com");
        assert_eq!(context.expires_at, 5000);
        assert_eq!(context.display_name(), "sam");
    }

    #[test]
    fn test_from_grant_falls_back_on_opaque_token() {
        let context = AuthContext::from_grant(grant("opaque"), "typed@example.com");
        assert_eq!(context.user_id, "");
        assert_eq!(context.email, "typed@example.com");
        assert_eq!(context.expires_at, 1_000);
    }

    #[test]
    fn test_refreshed_keeps_identity() {
        let original = AuthContext {
            user_id: "uid-1".to_string(),
            email: "sam@example.com".to_string(),
            id_token: "old".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 0,
        };

        let next = original.refreshed(grant("opaque-new"));
        assert_eq!(next.user_id, "uid-1");
        assert_eq!(next.email, "sam@example.com");
        assert_eq!(next.id_token, "opaque-new");
    }

    #[test]
    fn test_needs_refresh_margin() {
        let context = AuthContext {
            user_id: "u".to_string(),
            email: "e@x.io".to_string(),
            id_token: "t".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 1_000,
        };

        assert!(!context.needs_refresh(1_000 - REFRESH_MARGIN_SECS - 1));
        assert!(context.needs_refresh(1_000 - REFRESH_MARGIN_SECS));
        assert!(context.needs_refresh(2_000));
    }
}
