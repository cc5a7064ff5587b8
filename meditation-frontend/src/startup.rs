use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use meditation_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    app::{health_check, index},
    auth::{login_handler, login_page, logout_handler, signup_handler, signup_page},
    dashboard::dashboard_handler,
    generate::{
        generate_autofill, generate_page, generate_reset, generate_submit, generate_toggle,
        personalize_autofill, personalize_page, personalize_reset, personalize_submit,
        personalize_toggle,
    },
    history::history_page,
    meditation::{delete_meditation, generate_audio, meditation_page, record_mood_after},
    metrics::metrics,
    preferences::toggle_theme,
};
use crate::middleware::auth_middleware;
use crate::AppState;

pub fn build_router(state: AppState, server: &ServerSettings) -> Router {
    // Session setup
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    let protected = Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/generate", get(generate_page).post(generate_submit))
        .route("/generate/toggle", post(generate_toggle))
        .route("/generate/autofill", post(generate_autofill))
        .route("/generate/reset", post(generate_reset))
        .route("/personalize", get(personalize_page).post(personalize_submit))
        .route("/personalize/toggle", post(personalize_toggle))
        .route("/personalize/autofill", post(personalize_autofill))
        .route("/personalize/reset", post(personalize_reset))
        .route("/history", get(history_page))
        .route("/meditations/:id", get(meditation_page))
        .route("/meditations/:id/delete", post(delete_meditation))
        .route("/meditations/:id/audio", post(generate_audio))
        .route("/meditations/:id/mood-after", post(record_mood_after))
        .route_layer(from_fn(auth_middleware));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", get(login_page).post(login_handler))
        .route("/signup", get(signup_page).post(signup_handler))
        .route("/logout", post(logout_handler))
        .route("/preferences/theme", post(toggle_theme))
        .merge(protected)
        .nest_service("/static", ServeDir::new(&server.static_dir))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
