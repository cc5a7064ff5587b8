use crate::models::UiPreferences;
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Flip dark mode for this browser and reload the current page.
pub async fn toggle_theme(session: Session, headers: HeaderMap) -> Response {
    let mut preferences = UiPreferences::load(&session).await;
    preferences.dark_mode = !preferences.dark_mode;

    if let Err(e) = preferences.store(&session).await {
        tracing::warn!(error = %e, "Failed to store UI preferences");
        return e.into_response();
    }

    if super::is_htmx(&headers) {
        return (StatusCode::OK, [("HX-Refresh", "true")], "").into_response();
    }

    // Only same-site paths are followed back
    let back = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(same_site_path)
        .unwrap_or_else(|| "/".to_string());
    Redirect::to(&back).into_response()
}

fn same_site_path(referer: &str) -> Option<String> {
    let path = match referer.find("://") {
        Some(scheme_end) => {
            let rest = &referer[scheme_end + 3..];
            &rest[rest.find('/')?..]
        }
        None => referer,
    };

    if path.starts_with('/') && !path.starts_with("//") {
        Some(path.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_path() {
        assert_eq!(
            same_site_path("http://localhost:3000/history?query=x").as_deref(),
            Some("/history?query=x")
        );
        assert_eq!(same_site_path("/dashboard").as_deref(), Some("/dashboard"));
        assert_eq!(same_site_path("http://localhost:3000").as_deref(), None);
        assert_eq!(same_site_path("//evil.example.com/x").as_deref(), None);
    }
}
