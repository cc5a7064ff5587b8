//! Identity provider client.
//!
//! Speaks the password-auth REST dialect used by hosted identity platforms:
//! `accounts:signInWithPassword` / `accounts:signUp` for credentials and
//! `token` for refresh-token exchange. The frontend never verifies tokens
//! itself; it only obtains them and forwards them to the backend.

use crate::config::IdentitySettings;
use chrono::Utc;
use meditation_core::observability::TracedClientExt;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Authentication failures, worded for display in the login banner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Too many failed attempts. Please try again later.")]
    TooManyAttempts,

    #[error("An account with this email already exists.")]
    EmailExists,

    #[error("Password should be at least 6 characters.")]
    WeakPassword,

    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    #[error("Authentication service is unavailable. Please try again.")]
    Unavailable,

    #[error("Authentication failed. Please try again.")]
    Other(String),
}

impl AuthFailure {
    /// Map a provider error code (e.g. `TOO_MANY_ATTEMPTS_TRY_LATER : ...`).
    pub fn from_provider_code(code: &str) -> Self {
        let code = code.trim();
        // Some codes carry a human-readable suffix after " : "
        let head = code.split(" : ").next().unwrap_or(code).trim();

        match head {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
            | "INVALID_EMAIL" => AuthFailure::InvalidCredentials,
            "EMAIL_EXISTS" => AuthFailure::EmailExists,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_DISABLED" | "USER_NOT_FOUND" => {
                AuthFailure::SessionExpired
            }
            _ if head.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER") => AuthFailure::TooManyAttempts,
            _ if head.starts_with("WEAK_PASSWORD") => AuthFailure::WeakPassword,
            other => AuthFailure::Other(other.to_string()),
        }
    }
}

/// Tokens issued by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub id_token: String,
    pub refresh_token: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    local_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
}

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

pub struct IdentityClient {
    client: Client,
    settings: IdentitySettings,
}

impl IdentityClient {
    pub fn new(settings: IdentitySettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenGrant, AuthFailure> {
        self.password_auth("accounts:signInWithPassword", email, password)
            .await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<TokenGrant, AuthFailure> {
        self.password_auth("accounts:signUp", email, password).await
    }

    /// Exchange a refresh token for a fresh ID token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthFailure> {
        let url = format!(
            "{}/v1/token?key={}",
            self.settings.token_url.trim_end_matches('/'),
            self.settings.api_key.expose_secret()
        );

        let response = self
            .client
            .traced_post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token refresh request failed");
                AuthFailure::Unavailable
            })?;

        if !response.status().is_success() {
            return Err(Self::failure_from_response(response).await);
        }

        let body: RefreshResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed token refresh response");
            AuthFailure::Unavailable
        })?;

        Ok(TokenGrant {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.user_id,
            email: None,
            expires_at: expires_at(body.expires_in.as_ref()),
        })
    }

    async fn password_auth(
        &self,
        operation: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, AuthFailure> {
        let url = format!(
            "{}/v1/{}?key={}",
            self.settings.url.trim_end_matches('/'),
            operation,
            self.settings.api_key.expose_secret()
        );

        let response = self
            .client
            .traced_post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(operation, error = %e, "Identity provider request failed");
                AuthFailure::Unavailable
            })?;

        if !response.status().is_success() {
            return Err(Self::failure_from_response(response).await);
        }

        let body: PasswordAuthResponse = response.json().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Malformed identity provider response");
            AuthFailure::Unavailable
        })?;

        Ok(TokenGrant {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.local_id,
            email: body.email,
            expires_at: expires_at(body.expires_in.as_ref()),
        })
    }

    async fn failure_from_response(response: reqwest::Response) -> AuthFailure {
        let status = response.status();
        match response.json::<ProviderErrorBody>().await {
            Ok(body) => {
                let failure = AuthFailure::from_provider_code(&body.error.message);
                tracing::warn!(
                    status = %status,
                    code = %body.error.message,
                    "Identity provider rejected request"
                );
                failure
            }
            Err(_) => {
                tracing::warn!(status = %status, "Identity provider returned an unreadable error");
                if status.is_server_error() {
                    AuthFailure::Unavailable
                } else {
                    AuthFailure::Other(status.to_string())
                }
            }
        }
    }
}

/// `expires_in` arrives as a string of seconds ("3600"), occasionally as a
/// number.
fn expires_at(expires_in: Option<&Value>) -> i64 {
    let seconds = match expires_in {
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    }
    .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    Utc::now().timestamp() + seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_codes() {
        assert_eq!(
            AuthFailure::from_provider_code("INVALID_LOGIN_CREDENTIALS"),
            AuthFailure::InvalidCredentials
        );
        assert_eq!(
            AuthFailure::from_provider_code("EMAIL_NOT_FOUND"),
            AuthFailure::InvalidCredentials
        );
        assert_eq!(
            AuthFailure::from_provider_code(
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"
            ),
            AuthFailure::TooManyAttempts
        );
        assert_eq!(
            AuthFailure::from_provider_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthFailure::WeakPassword
        );
        assert_eq!(
            AuthFailure::from_provider_code("TOKEN_EXPIRED"),
            AuthFailure::SessionExpired
        );
        assert!(matches!(
            AuthFailure::from_provider_code("OPERATION_NOT_ALLOWED"),
            AuthFailure::Other(_)
        ));
    }

    #[test]
    fn test_failure_wording() {
        assert_eq!(
            AuthFailure::InvalidCredentials.to_string(),
            "Invalid email or password."
        );
        assert_eq!(
            AuthFailure::TooManyAttempts.to_string(),
            "Too many failed attempts. Please try again later."
        );
        assert_eq!(
            AuthFailure::Other("X".into()).to_string(),
            "Authentication failed. Please try again."
        );
    }

    #[test]
    fn test_expires_at_parsing() {
        let now = Utc::now().timestamp();
        let from_string = expires_at(Some(&json!("120")));
        let from_number = expires_at(Some(&json!(60)));
        let fallback = expires_at(Some(&json!("soon")));

        assert!((from_string - now - 120).abs() <= 2);
        assert!((from_number - now - 60).abs() <= 2);
        assert!((fallback - now - DEFAULT_EXPIRES_IN_SECS).abs() <= 2);
    }
}
