#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use meditation_frontend::config::{BackendSettings, IdentitySettings, ServerSettings};
use meditation_frontend::services::{ApiClient, IdentityClient};
use meditation_frontend::startup::build_router;
use meditation_frontend::AppState;
use secrecy::Secret;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ID_TOKEN: &str = "test-id-token";

pub fn backend_settings(url: &str) -> BackendSettings {
    BackendSettings {
        url: url.to_string(),
        public_url: Some("https://media.example.com".to_string()),
        generation_timeout_secs: 5,
        request_timeout_secs: 5,
    }
}

pub fn identity_settings(url: &str) -> IdentitySettings {
    IdentitySettings {
        url: url.to_string(),
        token_url: url.to_string(),
        api_key: Secret::new("test-key".to_string()),
    }
}

pub fn server_settings() -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        secure_cookies: false,
        static_dir: "static".to_string(),
    }
}

/// Router wired to the given backend and identity provider.
pub fn test_app(backend_url: &str, identity_url: &str) -> Router {
    let api = Arc::new(ApiClient::new(backend_settings(backend_url)));
    let identity = Arc::new(IdentityClient::new(identity_settings(identity_url)));
    build_router(AppState::new(api, identity), &server_settings())
}

pub async fn mock_sign_in(identity: &MockServer) {
    mock_sign_in_expiring(identity, "3600").await;
}

/// Sign-in whose ID token expires after `expires_in` seconds.
pub async fn mock_sign_in_expiring(identity: &MockServer, expires_in: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": ID_TOKEN,
            "refreshToken": "test-refresh-token",
            "expiresIn": expires_in,
            "localId": "user-1",
            "email": "sam@example.com",
        })))
        .mount(identity)
        .await;
}

/// Log in through the real form handler and return the session cookie.
pub async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=sam%40example.com&password=secret1"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 303, "login should redirect");
    session_cookie(&response).expect("login should set a session cookie")
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or_default().to_string())
        .next()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: &str, body: &str, htmx: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if htmx {
        builder = builder.header("HX-Request", "true");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
