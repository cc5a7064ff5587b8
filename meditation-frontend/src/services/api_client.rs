//! Meditation backend client.
//!
//! Every call carries the caller's bearer token plus W3C trace context.
//! Calls without a token are refused locally, before any request is made.

use crate::config::BackendSettings;
use crate::dtos::generation::GenerationRequest;
use crate::models::search::{normalize_search_payload, normalize_session_list, SearchQuery};
use crate::models::{GeneratedMeditation, SearchResult, SessionId, SessionRecord, VoiceGender};
use crate::services::autofill::{MoodSuggestRequest, MoodSuggestion};
use meditation_core::observability::{TracedClientExt, TracedRequest};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not found")]
    NotFound,

    #[error("Backend returned {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Text for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthenticated => "Your session has expired. Please log in again.".to_string(),
            ApiError::NotFound => "Meditation not found.".to_string(),
            ApiError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            ApiError::Transport(_) => {
                "Could not reach the meditation service. Please try again.".to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AudioResponse {
    #[serde(default)]
    audio_url: Option<String>,
}

pub struct ApiClient {
    client: Client,
    settings: BackendSettings,
}

impl ApiClient {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    /// Browser-facing base URL for media links.
    pub fn public_url(&self) -> &str {
        self.settings.public_url()
    }

    pub fn generation_timeout(&self) -> Duration {
        self.settings.generation_timeout()
    }

    pub async fn generate(
        &self,
        token: &str,
        request: &GenerationRequest,
    ) -> Result<GeneratedMeditation, ApiError> {
        let payload = self
            .call(
                "generate",
                token,
                self.client
                    .traced_post(self.url(&["api", "meditations", "generate"])?.as_str())
                    .json(request),
                self.settings.generation_timeout(),
            )
            .await?;

        GeneratedMeditation::from_payload(payload)
            .ok_or_else(|| ApiError::Decode("generate response has no session or script".to_string()))
    }

    pub async fn list_sessions(&self, token: &str) -> Result<Vec<SessionRecord>, ApiError> {
        let payload = self
            .call(
                "list_sessions",
                token,
                self.client.traced_get(self.url(&["api", "meditations"])?.as_str()),
                self.settings.request_timeout(),
            )
            .await?;

        Ok(normalize_session_list(payload))
    }

    pub async fn search_sessions(
        &self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let payload = self
            .call(
                "search_sessions",
                token,
                self.client
                    .traced_get(self.url(&["api", "meditations", "search"])?.as_str())
                    .query(query),
                self.settings.request_timeout(),
            )
            .await?;

        Ok(normalize_search_payload(payload))
    }

    pub async fn get_session(&self, token: &str, id: &SessionId) -> Result<SessionRecord, ApiError> {
        let payload = self
            .call(
                "get_session",
                token,
                self.client
                    .traced_get(self.url(&["api", "meditations", id.as_str()])?.as_str()),
                self.settings.request_timeout(),
            )
            .await?;

        serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn delete_session(&self, token: &str, id: &SessionId) -> Result<(), ApiError> {
        self.send(
            "delete_session",
            token,
            self.client
                .traced_delete(self.url(&["api", "meditations", id.as_str()])?.as_str()),
            self.settings.request_timeout(),
        )
        .await?;

        tracing::info!(session_id = %id, "Meditation deleted");
        Ok(())
    }

    /// Ask the backend to render audio for a session. Returns the audio URL,
    /// resolved against the public base URL.
    pub async fn generate_audio(
        &self,
        token: &str,
        id: &SessionId,
        voice: VoiceGender,
    ) -> Result<String, ApiError> {
        let payload = self
            .call(
                "generate_audio",
                token,
                self.client
                    .traced_post(self.url(&["api", "meditations", id.as_str(), "audio"])?.as_str())
                    .json(&json!({ "voice_gender": voice })),
                self.settings.generation_timeout(),
            )
            .await?;

        let body: AudioResponse =
            serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;

        match body.audio_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => Ok(crate::models::audio::resolve_media_url(&url, self.public_url())),
            None => Err(ApiError::Decode("audio response has no audio_url".to_string())),
        }
    }

    pub async fn record_mood_after(
        &self,
        token: &str,
        id: &SessionId,
        mood_after: &str,
    ) -> Result<SessionRecord, ApiError> {
        let payload = self
            .call(
                "record_mood_after",
                token,
                self.client
                    .traced_post(self.url(&["api", "meditations", id.as_str(), "mood-after"])?.as_str())
                    .json(&json!({ "mood_after": mood_after })),
                self.settings.request_timeout(),
            )
            .await?;

        serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn suggest(&self, token: &str, mood_text: &str) -> Result<MoodSuggestion, ApiError> {
        let payload = self
            .call(
                "suggest",
                token,
                self.client
                    .traced_post(self.url(&["api", "mood", "suggest"])?.as_str())
                    .json(&MoodSuggestRequest {
                        mood_text: mood_text.to_string(),
                    }),
                self.settings.generation_timeout(),
            )
            .await?;

        serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Backend URL for `segments`. Each segment is percent-encoded on its
    /// own, so an id can never add path levels.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidUrl(self.settings.url.clone());
        let mut url = Url::parse(&self.settings.url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send and decode a JSON body.
    async fn call(
        &self,
        operation: &'static str,
        token: &str,
        request: TracedRequest,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let response = self.send(operation, token, request, timeout).await?;
        response.json::<Value>().await.map_err(|e| {
            tracing::warn!(operation, error = %e, "Backend response is not JSON");
            ApiError::Decode(e.to_string())
        })
    }

    async fn send(
        &self,
        operation: &'static str,
        token: &str,
        request: TracedRequest,
        timeout: Duration,
    ) -> Result<reqwest::Response, ApiError> {
        if token.trim().is_empty() {
            tracing::warn!(operation, "Refusing backend call without a bearer token");
            return Err(ApiError::Unauthenticated);
        }

        let response = request
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(operation, error = %e, "Backend request failed");
                ApiError::Transport(e)
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(operation, status = %status, "Backend call succeeded");
            return Ok(response);
        }

        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string));

        tracing::warn!(operation, status = %status, detail = ?detail, "Backend call rejected");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthenticated,
            StatusCode::NOT_FOUND => ApiError::NotFound,
            other => ApiError::Status {
                status: other.as_u16(),
                detail,
            },
        })
    }
}
