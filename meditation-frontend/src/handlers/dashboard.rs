use super::history::load_history;
use super::views::SessionCard;
use super::{is_htmx, signed_out, PageContext};
use crate::models::{AuthUser, SessionRecord};
use crate::services::streak::current_streak;
use crate::AppState;
use askama::Template;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};

const RECENT_SESSIONS: usize = 3;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub streak: u32,
    pub total_sessions: usize,
    pub recent: Vec<SessionCard>,
    pub banner: String,
}

pub async fn dashboard_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut user: AuthUser,
) -> Response {
    let (sessions, banner) = match load_history(&mut user, &state).await {
        Ok(loaded) => loaded,
        Err(_) => return signed_out(user.session(), is_htmx(&headers)).await,
    };

    let streak = current_streak(sessions.iter().filter_map(|s| s.created_at.as_deref()));

    DashboardTemplate {
        page: PageContext::build(user.session(), Some(&user.context), "Dashboard", "dashboard")
            .await,
        streak,
        total_sessions: sessions.len(),
        recent: most_recent(&sessions, RECENT_SESSIONS)
            .into_iter()
            .map(SessionCard::from)
            .collect(),
        banner,
    }
    .into_response()
}

/// Newest first; sessions without a readable timestamp sort last.
pub fn most_recent(sessions: &[SessionRecord], count: usize) -> Vec<&SessionRecord> {
    let mut ordered: Vec<&SessionRecord> = sessions.iter().collect();
    ordered.sort_by(|a, b| b.created_at_utc().cmp(&a.created_at_utc()));
    ordered.truncate(count);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionId;

    fn record(id: &str, created_at: Option<&str>) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(id),
            created_at: created_at.map(str::to_string),
            meditation_type: "sleep".to_string(),
            duration: 5,
            tone: None,
            script: None,
            audio_url: None,
            preferences: None,
            mood_before: None,
            mood_after: None,
            health_conditions: None,
        }
    }

    #[test]
    fn test_most_recent_orders_by_creation() {
        let sessions = vec![
            record("old", Some("2024-01-01T08:00:00")),
            record("broken", Some("yesterday")),
            record("new", Some("2024-01-03T08:00:00Z")),
            record("mid", Some("2024-01-02T08:00:00")),
        ];

        let ids: Vec<&str> = most_recent(&sessions, 3)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
