//! Flat view models for templates. Everything optional is resolved to a
//! display string or a flag before rendering.

use crate::dtos::generation::{
    FlowVariant, HEALTH_OPTIONS, MOOD_AFTER_OPTIONS, MOOD_OPTIONS, PREFERENCES_MAX_CHARS,
    TONE_OPTIONS, TYPE_OPTIONS,
};
use crate::models::{AudioSource, GeneratedMeditation, SearchResult, SessionRecord, VoiceGender};
use crate::services::GenerationFlow;

pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: &str, label: &str, current: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected: value == current,
        }
    }
}

pub fn type_options(current: &str) -> Vec<SelectOption> {
    TYPE_OPTIONS
        .iter()
        .map(|(value, label)| SelectOption::new(value, label, current))
        .collect()
}

pub struct SessionCard {
    pub id: String,
    pub type_label: String,
    pub tone_label: String,
    pub duration: u32,
    pub date: String,
    pub preview: String,
    pub mood_after: String,
    /// Search match location and snippet; empty outside search results.
    pub matched_in: String,
    pub snippet: String,
}

impl From<&SessionRecord> for SessionCard {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            type_label: record.type_label(),
            tone_label: record.tone_label(),
            duration: record.duration,
            date: record.created_date(),
            preview: record.preview(),
            mood_after: record.mood_after.clone().unwrap_or_default(),
            matched_in: String::new(),
            snippet: String::new(),
        }
    }
}

impl From<&SearchResult> for SessionCard {
    fn from(result: &SearchResult) -> Self {
        let mut card = SessionCard::from(&result.session);
        if let Some(info) = &result.match_info {
            card.matched_in = info
                .matched_in
                .clone()
                .filter(|m| m != "none")
                .unwrap_or_default();
            card.snippet = info.snippet.clone().unwrap_or_default();
        }
        card
    }
}

/// Playback data for the audio partial.
pub struct AudioView {
    pub rendered: bool,
    pub url: String,
    pub text: String,
    pub rate: String,
    pub pitch: String,
    pub voice: &'static str,
}

impl From<AudioSource> for AudioView {
    fn from(source: AudioSource) -> Self {
        match source {
            AudioSource::Rendered { url } => Self {
                rendered: true,
                url,
                text: String::new(),
                rate: String::new(),
                pitch: String::new(),
                voice: VoiceGender::default().as_str(),
            },
            AudioSource::Synthesized {
                text,
                params,
                voice,
            } => Self {
                rendered: false,
                url: String::new(),
                text,
                rate: format!("{:.2}", params.rate),
                pitch: format!("{:.2}", params.pitch),
                voice: voice.as_str(),
            },
        }
    }
}

pub struct ResultView {
    pub script: String,
    /// Empty when the backend did not return a stored session.
    pub session_id: String,
    pub type_label: String,
    pub duration: u32,
    pub audio: AudioView,
}

impl ResultView {
    fn new(result: &GeneratedMeditation, public_url: &str, voice: VoiceGender) -> Self {
        match &result.session {
            Some(session) => Self {
                script: result.script_text().to_string(),
                session_id: session.id.to_string(),
                type_label: session.type_label(),
                duration: session.duration,
                audio: AudioSource::for_session(session, public_url, voice).into(),
            },
            None => Self {
                script: result.script_text().to_string(),
                session_id: String::new(),
                type_label: String::new(),
                duration: 0,
                audio: AudioSource::Synthesized {
                    text: result.script_text().to_string(),
                    params: crate::models::SpeechParams::for_tone(None),
                    voice,
                }
                .into(),
            },
        }
    }
}

pub struct FlowView {
    pub slug: &'static str,
    pub heading: &'static str,
    pub personalized: bool,
    pub max_duration: u32,
    pub duration: u32,
    pub preferences: String,
    pub preferences_max: u64,
    pub voice_male: bool,
    pub types: Vec<SelectOption>,
    pub tones: Vec<SelectOption>,
    pub moods: Vec<SelectOption>,
    pub health: Vec<SelectOption>,
    pub banner: String,
    pub notice: String,
    pub submitting: bool,
    pub has_result: bool,
    pub result: ResultView,
    pub type_error: String,
    pub duration_error: String,
    pub tone_error: String,
    pub mood_error: String,
    pub preferences_error: String,
}

impl FlowView {
    pub fn new(flow: &GenerationFlow, public_url: &str) -> Self {
        let form = &flow.form;
        let error = |field: &str| flow.field_errors.get(field).cloned().unwrap_or_default();
        let chips = |options: &[&str], selected: &[String]| {
            options
                .iter()
                .map(|option| SelectOption {
                    value: option.to_string(),
                    label: option.to_string(),
                    selected: selected.iter().any(|s| s == option),
                })
                .collect::<Vec<_>>()
        };

        let (has_result, result) = match flow.result() {
            Some(result) => (true, ResultView::new(result, public_url, form.voice_gender)),
            None => (
                false,
                ResultView::new(
                    &GeneratedMeditation {
                        session: None,
                        script: String::new(),
                    },
                    public_url,
                    form.voice_gender,
                ),
            ),
        };

        Self {
            slug: flow.variant.slug(),
            heading: match flow.variant {
                FlowVariant::Standard => "Create a meditation",
                FlowVariant::Personalized => "Personalized quick session",
            },
            personalized: flow.variant == FlowVariant::Personalized,
            max_duration: flow.variant.max_duration(),
            duration: form.duration,
            preferences: form.preferences.clone(),
            preferences_max: PREFERENCES_MAX_CHARS,
            voice_male: form.voice_gender == VoiceGender::Male,
            types: type_options(&form.meditation_type),
            tones: TONE_OPTIONS
                .iter()
                .map(|(value, label)| SelectOption::new(value, label, &form.tone))
                .collect(),
            moods: chips(&MOOD_OPTIONS, &form.mood_before),
            health: chips(&HEALTH_OPTIONS, &form.health_conditions),
            banner: flow.error_message().unwrap_or_default().to_string(),
            notice: String::new(),
            submitting: flow.is_submitting(),
            has_result,
            result,
            type_error: error("type"),
            duration_error: error("duration"),
            tone_error: error("tone"),
            mood_error: error("mood_before"),
            preferences_error: error("preferences"),
        }
    }
}

pub fn mood_after_options(current: Option<&str>) -> Vec<SelectOption> {
    let current = current.unwrap_or_default();
    MOOD_AFTER_OPTIONS
        .iter()
        .map(|mood| SelectOption::new(mood, mood, current))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::search::MatchInfo;
    use crate::models::SessionId;

    fn record() -> SessionRecord {
        SessionRecord {
            id: SessionId::new("12"),
            created_at: Some("2024-01-05T10:30:00".to_string()),
            meditation_type: "stress-relief".to_string(),
            duration: 10,
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
    fn test_session_card_placeholders() {
        let card = SessionCard::from(&record());
        assert_eq!(card.type_label, "Stress Relief");
        assert_eq!(card.tone_label, "Standard");
        assert_eq!(card.date, "Jan 5, 2024");
        assert_eq!(card.preview, "Script unavailable.");
    }

    #[test]
    fn test_search_card_hides_none_match() {
        let card = SessionCard::from(&SearchResult {
            session: record(),
            match_info: Some(MatchInfo {
                matched_in: Some("none".to_string()),
                snippet: None,
            }),
        });
        assert!(card.matched_in.is_empty());
        assert!(card.snippet.is_empty());
    }

    #[test]
    fn test_flow_view_marks_selections_and_errors() {
        let mut flow = GenerationFlow::new(FlowVariant::Personalized);
        flow.edit().unwrap().toggle_health_condition("Insomnia");
        flow.submit().unwrap();

        let view = FlowView::new(&flow, "http://localhost:8000");
        assert_eq!(view.slug, "personalize");
        assert_eq!(view.max_duration, 5);
        assert_eq!(view.mood_error, "Please select at least one mood");
        assert!(view
            .health
            .iter()
            .any(|option| option.value == "Insomnia" && option.selected));
        assert!(view.types.iter().any(|t| t.value == "stress-relief" && t.selected));
        assert!(!view.has_result);
    }

    #[test]
    fn test_synthesized_audio_view() {
        let view = AudioView::from(AudioSource::for_session(
            &record(),
            "http://localhost:8000",
            VoiceGender::Female,
        ));
        assert!(!view.rendered);
        assert_eq!(view.rate, "0.85");
        assert_eq!(view.pitch, "0.95");
        assert_eq!(view.voice, "female");
    }
}
