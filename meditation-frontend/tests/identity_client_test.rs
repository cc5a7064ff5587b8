mod common;

use common::identity_settings;
use meditation_frontend::services::{AuthFailure, IdentityClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_error(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": { "code": 400, "message": message }
    }))
}

#[tokio::test]
async fn sign_in_returns_tokens() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "id-1",
            "refreshToken": "refresh-1",
            "expiresIn": "3600",
            "localId": "user-1",
            "email": "sam@example.com",
        })))
        .mount(&provider)
        .await;

    let client = IdentityClient::new(identity_settings(&provider.uri()));
    let grant = client.sign_in("sam@example.com", "secret1").await.unwrap();

    assert_eq!(grant.id_token, "id-1");
    assert_eq!(grant.refresh_token, "refresh-1");
    assert_eq!(grant.user_id.as_deref(), Some("user-1"));
    assert!(grant.expires_at > chrono::Utc::now().timestamp());
}

#[tokio::test]
async fn provider_error_codes_become_failures() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(provider_error(
            "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled",
        ))
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(provider_error("EMAIL_EXISTS"))
        .mount(&provider)
        .await;

    let client = IdentityClient::new(identity_settings(&provider.uri()));

    assert_eq!(
        client.sign_in("sam@example.com", "secret1").await,
        Err(AuthFailure::TooManyAttempts)
    );
    assert_eq!(
        client.sign_up("sam@example.com", "secret1").await,
        Err(AuthFailure::EmailExists)
    );
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() {
    let client = IdentityClient::new(identity_settings("http://127.0.0.1:9"));

    assert_eq!(
        client.sign_in("sam@example.com", "secret1").await,
        Err(AuthFailure::Unavailable)
    );
}

#[tokio::test]
async fn refresh_exchanges_token() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "id-2",
            "refresh_token": "refresh-2",
            "expires_in": "3600",
            "user_id": "user-1",
        })))
        .mount(&provider)
        .await;

    let client = IdentityClient::new(identity_settings(&provider.uri()));
    let grant = client.refresh("refresh-1").await.unwrap();

    assert_eq!(grant.id_token, "id-2");
    assert_eq!(grant.refresh_token, "refresh-2");
}

#[tokio::test]
async fn rejected_refresh_token_expires_the_session() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(provider_error("INVALID_REFRESH_TOKEN"))
        .mount(&provider)
        .await;

    let client = IdentityClient::new(identity_settings(&provider.uri()));

    assert_eq!(
        client.refresh("stale").await,
        Err(AuthFailure::SessionExpired)
    );
}
