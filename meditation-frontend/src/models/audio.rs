use super::session::SessionRecord;
use serde::{Deserialize, Serialize};

/// Voice preference for generated or synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

impl VoiceGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceGender::Female => "female",
            VoiceGender::Male => "male",
        }
    }

    /// Lenient parse for form input; anything unrecognised is `Female`.
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("male") {
            VoiceGender::Male
        } else {
            VoiceGender::Female
        }
    }
}

/// Browser speech-synthesis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechParams {
    pub rate: f32,
    pub pitch: f32,
}

impl SpeechParams {
    pub fn for_tone(tone: Option<&str>) -> Self {
        let tone = tone.map(str::to_lowercase).unwrap_or_default();
        match tone.as_str() {
            "energetic" | "focus" => SpeechParams {
                rate: 1.0,
                pitch: 1.1,
            },
            "anxious" | "stress" => SpeechParams {
                rate: 0.8,
                pitch: 0.9,
            },
            _ => SpeechParams {
                rate: 0.85,
                pitch: 0.95,
            },
        }
    }
}

/// How a session's script is played back.
///
/// Server-rendered audio wins whenever the backend has produced a file;
/// otherwise the page falls back to in-browser speech synthesis of the
/// script text.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    Rendered {
        url: String,
    },
    Synthesized {
        text: String,
        params: SpeechParams,
        voice: VoiceGender,
    },
}

impl AudioSource {
    pub fn for_session(session: &SessionRecord, public_base_url: &str, voice: VoiceGender) -> Self {
        match session.audio_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => AudioSource::Rendered {
                url: resolve_media_url(url, public_base_url),
            },
            _ => AudioSource::Synthesized {
                text: session.script_text().to_string(),
                params: SpeechParams::for_tone(session.tone.as_deref()),
                voice,
            },
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, AudioSource::Rendered { .. })
    }
}

/// Absolute URLs pass through; relative paths are joined onto the backend's
/// browser-facing base URL.
pub fn resolve_media_url(url: &str, public_base_url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    let base = public_base_url.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}
