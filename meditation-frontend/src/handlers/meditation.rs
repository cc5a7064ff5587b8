use super::views::{mood_after_options, AudioView, SelectOption, SessionCard};
use super::{bearer_token, is_htmx, navigate, signed_out, CallError, PageContext};
use crate::dtos::generation::MOOD_AFTER_OPTIONS;
use crate::models::{AudioSource, AuthUser, SessionId, SessionRecord, VoiceGender};
use crate::services::{ApiError, SessionCache};
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;

#[derive(Template)]
#[template(path = "meditation.html")]
pub struct MeditationTemplate {
    pub page: PageContext,
    pub found: bool,
    pub session_id: String,
    pub card: SessionCard,
    pub created: String,
    pub script: String,
    pub preferences: String,
    pub mood_before: String,
    pub health_conditions: String,
    pub audio: AudioView,
    pub moods: Vec<SelectOption>,
    pub mood_notice: String,
    pub mood_banner: String,
    pub banner: String,
}

#[derive(Template)]
#[template(path = "partials/banner.html")]
pub struct BannerPartial {
    pub banner: String,
}

#[derive(Template)]
#[template(path = "partials/audio_player.html")]
pub struct AudioPartial {
    pub session_id: String,
    pub audio: AudioView,
}

#[derive(Template)]
#[template(path = "partials/mood_after.html")]
pub struct MoodAfterPartial {
    pub session_id: String,
    pub moods: Vec<SelectOption>,
    pub mood_notice: String,
    pub mood_banner: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioForm {
    #[serde(default)]
    pub voice_gender: String,
}

#[derive(Debug, Deserialize)]
pub struct MoodAfterForm {
    #[serde(default)]
    pub mood_after: String,
}

const NOT_FOUND_MESSAGE: &str = "Meditation not found.";

pub async fn meditation_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    mut user: AuthUser,
) -> Response {
    let Some(id) = SessionId::from_path(&raw_id) else {
        tracing::warn!(raw_id = %raw_id, "Rejected meditation id");
        let page = PageContext::build(user.session(), Some(&user.context), "Meditation", "history").await;
        let detail = render_detail(
            page,
            SessionId::new(raw_id),
            None,
            NOT_FOUND_MESSAGE.to_string(),
            state.api.public_url(),
        );
        return (StatusCode::NOT_FOUND, detail).into_response();
    };

    let fetched = match bearer_token(&mut user, &state).await {
        Ok(token) => state.api.get_session(&token, &id).await.map_err(|e| match e {
            ApiError::NotFound => None,
            other => Some(CallError::from(other)),
        }),
        Err(e) => Err(Some(e)),
    };

    let (record, banner, status) = match fetched {
        Ok(record) => (Some(record), String::new(), StatusCode::OK),
        Err(None) => (None, NOT_FOUND_MESSAGE.to_string(), StatusCode::NOT_FOUND),
        Err(Some(CallError::SignedOut)) => {
            return signed_out(user.session(), is_htmx(&headers)).await
        }
        Err(Some(CallError::Failed(message))) => {
            // Fall back to the copy from the last history listing
            let cached = SessionCache::load(user.session())
                .await
                .sessions()
                .iter()
                .find(|s| s.id == id)
                .cloned();
            (cached, message, StatusCode::OK)
        }
    };

    let page = PageContext::build(user.session(), Some(&user.context), "Meditation", "history").await;
    (status, render_detail(page, id, record, banner, state.api.public_url())).into_response()
}

fn render_detail(
    page: PageContext,
    id: SessionId,
    record: Option<SessionRecord>,
    banner: String,
    public_url: &str,
) -> MeditationTemplate {
    let found = record.is_some();
    let record = record.unwrap_or_else(|| SessionRecord {
        id: id.clone(),
        created_at: None,
        meditation_type: String::new(),
        duration: 0,
        tone: None,
        script: None,
        audio_url: None,
        preferences: None,
        mood_before: None,
        mood_after: None,
        health_conditions: None,
    });

    MeditationTemplate {
        page,
        found,
        session_id: id.to_string(),
        card: SessionCard::from(&record),
        created: record.created_timestamp(),
        script: record.script_text().to_string(),
        preferences: record.preferences.clone().unwrap_or_default(),
        mood_before: record.mood_before.clone().unwrap_or_default(),
        health_conditions: record.health_conditions.clone().unwrap_or_default(),
        audio: AudioSource::for_session(&record, public_url, VoiceGender::default()).into(),
        moods: mood_after_options(record.mood_after.as_deref()),
        mood_notice: String::new(),
        mood_banner: String::new(),
        banner,
    }
}

/// Failure fragment. htmx only swaps 2xx responses, so those get a 200 and
/// are redirected into the page banner.
fn banner_response(message: String, status: StatusCode, htmx: bool) -> Response {
    let banner = BannerPartial { banner: message };
    if htmx {
        (
            StatusCode::OK,
            [("HX-Retarget", "#banner"), ("HX-Reswap", "outerHTML")],
            banner,
        )
            .into_response()
    } else {
        (status, banner).into_response()
    }
}

pub async fn delete_meditation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    mut user: AuthUser,
) -> Response {
    let htmx = is_htmx(&headers);
    let Some(id) = SessionId::from_path(&raw_id) else {
        return banner_response(NOT_FOUND_MESSAGE.to_string(), StatusCode::NOT_FOUND, htmx);
    };

    let deleted = match bearer_token(&mut user, &state).await {
        Ok(token) => match state.api.delete_session(&token, &id).await {
            // Already gone on the backend
            Ok(()) | Err(ApiError::NotFound) => Ok(()),
            Err(e) => Err(CallError::from(e)),
        },
        Err(e) => Err(e),
    };

    match deleted {
        Ok(()) => {
            let mut cache = SessionCache::load(user.session()).await;
            if cache.remove(&id) {
                if let Err(e) = cache.store(user.session()).await {
                    tracing::warn!(error = %e, "Failed to update history cache");
                }
            }
            navigate("/history", htmx)
        }
        Err(CallError::SignedOut) => signed_out(user.session(), htmx).await,
        Err(CallError::Failed(message)) => {
            tracing::warn!(session_id = %id, "Delete failed");
            banner_response(message, StatusCode::BAD_GATEWAY, htmx)
        }
    }
}

pub async fn generate_audio(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    mut user: AuthUser,
    Form(form): Form<AudioForm>,
) -> Response {
    let htmx = is_htmx(&headers);
    let Some(id) = SessionId::from_path(&raw_id) else {
        return banner_response(NOT_FOUND_MESSAGE.to_string(), StatusCode::NOT_FOUND, htmx);
    };
    let voice = VoiceGender::from_form(&form.voice_gender);

    let rendered = match bearer_token(&mut user, &state).await {
        Ok(token) => state
            .api
            .generate_audio(&token, &id, voice)
            .await
            .map_err(CallError::from),
        Err(e) => Err(e),
    };

    match rendered {
        Ok(url) => {
            tracing::info!(session_id = %id, voice = voice.as_str(), "Audio generated");
            AudioPartial {
                session_id: id.to_string(),
                audio: AudioSource::Rendered { url }.into(),
            }
            .into_response()
        }
        Err(CallError::SignedOut) => signed_out(user.session(), htmx).await,
        Err(CallError::Failed(message)) => banner_response(message, StatusCode::BAD_GATEWAY, htmx),
    }
}

pub async fn record_mood_after(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    mut user: AuthUser,
    Form(form): Form<MoodAfterForm>,
) -> Response {
    let htmx = is_htmx(&headers);
    let Some(id) = SessionId::from_path(&raw_id) else {
        return banner_response(NOT_FOUND_MESSAGE.to_string(), StatusCode::NOT_FOUND, htmx);
    };
    let mood = form.mood_after.trim();

    if !MOOD_AFTER_OPTIONS.contains(&mood) {
        return MoodAfterPartial {
            session_id: id.to_string(),
            moods: mood_after_options(None),
            mood_notice: String::new(),
            mood_banner: "Please select how you feel.".to_string(),
        }
        .into_response();
    }

    let recorded = match bearer_token(&mut user, &state).await {
        Ok(token) => state
            .api
            .record_mood_after(&token, &id, mood)
            .await
            .map_err(CallError::from),
        Err(e) => Err(e),
    };

    match recorded {
        Ok(record) => {
            let mut cache = SessionCache::load(user.session()).await;
            cache.upsert(record);
            if let Err(e) = cache.store(user.session()).await {
                tracing::warn!(error = %e, "Failed to update history cache");
            }
            MoodAfterPartial {
                session_id: id.to_string(),
                moods: mood_after_options(Some(mood)),
                mood_notice: "Thanks for sharing how you feel.".to_string(),
                mood_banner: String::new(),
            }
            .into_response()
        }
        Err(CallError::SignedOut) => signed_out(user.session(), htmx).await,
        Err(CallError::Failed(message)) => MoodAfterPartial {
            session_id: id.to_string(),
            moods: mood_after_options(Some(mood)),
            mood_notice: String::new(),
            mood_banner: message,
        }
        .into_response(),
    }
}
