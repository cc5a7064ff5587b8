use super::views::{type_options, SelectOption, SessionCard};
use super::{bearer_token, is_htmx, signed_out, CallError, PageContext};
use crate::models::search::SearchQuery;
use crate::models::{AuthUser, SessionRecord};
use crate::services::SessionCache;
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};

#[derive(Template)]
#[template(path = "history.html")]
pub struct HistoryTemplate {
    pub page: PageContext,
    pub query: String,
    pub types: Vec<SelectOption>,
    pub cards: Vec<SessionCard>,
    pub searching: bool,
    pub banner: String,
}

#[derive(Template)]
#[template(path = "partials/history_list.html")]
pub struct HistoryListPartial {
    pub query: String,
    pub cards: Vec<SessionCard>,
    pub searching: bool,
    pub banner: String,
}

/// The user's sessions, refreshed from the backend and cached in the
/// browser session.
///
/// When the backend cannot be reached the cached copy is returned together
/// with a banner message. Fails only when the user has to sign in again.
pub async fn load_history(
    user: &mut AuthUser,
    state: &AppState,
) -> Result<(Vec<SessionRecord>, String), CallError> {
    let fetched = match bearer_token(user, state).await {
        Ok(token) => state.api.list_sessions(&token).await.map_err(CallError::from),
        Err(e) => Err(e),
    };

    match fetched {
        Ok(sessions) => {
            let cache = SessionCache::new(sessions);
            if let Err(e) = cache.store(user.session()).await {
                tracing::warn!(error = %e, "Failed to cache history");
            }
            Ok((cache.sessions().to_vec(), String::new()))
        }
        Err(CallError::SignedOut) => Err(CallError::SignedOut),
        Err(CallError::Failed(message)) => {
            let cache = SessionCache::load(user.session()).await;
            tracing::warn!(
                cached = cache.sessions().len(),
                "History unavailable, showing cached sessions"
            );
            Ok((cache.sessions().to_vec(), message))
        }
    }
}

pub async fn history_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
    mut user: AuthUser,
) -> Response {
    let htmx = is_htmx(&headers);
    let query = query.normalized();
    let searching = !query.is_empty();

    let outcome = if searching {
        search(&mut user, &state, &query).await
    } else {
        load_history(&mut user, &state)
            .await
            .map(|(sessions, banner)| (sessions.iter().map(SessionCard::from).collect(), banner))
    };

    let (cards, banner) = match outcome {
        Ok(loaded) => loaded,
        Err(_) => return signed_out(user.session(), htmx).await,
    };

    let text = query.query.clone().unwrap_or_default();

    if htmx {
        return HistoryListPartial {
            query: text,
            cards,
            searching,
            banner,
        }
        .into_response();
    }

    HistoryTemplate {
        page: PageContext::build(user.session(), Some(&user.context), "History", "history").await,
        query: text,
        types: type_options(query.meditation_type.as_deref().unwrap_or_default()),
        cards,
        searching,
        banner,
    }
    .into_response()
}

async fn search(
    user: &mut AuthUser,
    state: &AppState,
    query: &SearchQuery,
) -> Result<(Vec<SessionCard>, String), CallError> {
    let found = match bearer_token(user, state).await {
        Ok(token) => state
            .api
            .search_sessions(&token, query)
            .await
            .map_err(CallError::from),
        Err(e) => Err(e),
    };

    match found {
        Ok(results) => {
            tracing::debug!(hits = results.len(), "History search completed");
            Ok((results.iter().map(SessionCard::from).collect(), String::new()))
        }
        Err(CallError::SignedOut) => Err(CallError::SignedOut),
        Err(CallError::Failed(message)) => Ok((Vec::new(), message)),
    }
}
