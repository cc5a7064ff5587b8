//! Meditation generation form state and request construction.

use crate::models::audio::VoiceGender;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

pub const TYPE_OPTIONS: [(&str, &str); 3] = [
    ("stress-relief", "Stress Relief"),
    ("sleep", "Deep Sleep"),
    ("focus", "Better Focus"),
];

pub const TONE_OPTIONS: [(&str, &str); 4] = [
    ("calm-soothing", "Calm, soothing whisper"),
    ("clear-steady", "Clear, steady voice"),
    ("relaxed-tone", "Calm, relaxed tone"),
    ("gentle-peaceful", "Gentle, peaceful voice"),
];

pub const MOOD_OPTIONS: [&str; 10] = [
    "Anxious",
    "Stressed",
    "Tired",
    "Restless",
    "Sad",
    "Overwhelmed",
    "Calm",
    "Hopeful",
    "Distracted",
    "Irritable",
];

pub const PREFER_NOT_TO_SAY: &str = "Prefer not to say";

pub const HEALTH_OPTIONS: [&str; 7] = [
    "Insomnia",
    "Anxiety",
    "Chronic pain",
    "High blood pressure",
    "Headaches",
    "Breathing difficulties",
    PREFER_NOT_TO_SAY,
];

pub const MOOD_AFTER_OPTIONS: [&str; 10] = [
    "Calm",
    "Peaceful",
    "Hopeful",
    "Numb",
    "Slightly stressed",
    "Tired",
    "Refreshed",
    "Centered",
    "Sleepy",
    "Grateful",
];

pub const DEFAULT_TYPE: &str = "stress-relief";
pub const DEFAULT_TONE: &str = "calm-soothing";
pub const PREFERENCES_MAX_CHARS: u64 = 500;

/// The two generation forms: the open-ended one and the short,
/// mood-driven personalized one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowVariant {
    Standard,
    Personalized,
}

impl FlowVariant {
    pub fn max_duration(&self) -> u32 {
        match self {
            FlowVariant::Standard => 60,
            FlowVariant::Personalized => 5,
        }
    }

    pub fn default_duration(&self) -> u32 {
        match self {
            FlowVariant::Standard => 10,
            FlowVariant::Personalized => 5,
        }
    }

    pub fn requires_mood(&self) -> bool {
        matches!(self, FlowVariant::Personalized)
    }

    /// URL path segment (`/generate`, `/personalize`).
    pub fn slug(&self) -> &'static str {
        match self {
            FlowVariant::Standard => "generate",
            FlowVariant::Personalized => "personalize",
        }
    }

    pub fn session_key(&self) -> &'static str {
        match self {
            FlowVariant::Standard => "generation:standard",
            FlowVariant::Personalized => "generation:personalized",
        }
    }
}

/// Ephemeral form state, owned by one browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationForm {
    pub meditation_type: String,
    pub duration: u32,
    pub tone: String,
    pub voice_gender: VoiceGender,
    /// Selection order is kept for display; entries are unique.
    pub mood_before: Vec<String>,
    pub health_conditions: Vec<String>,
    #[validate(length(
        max = PREFERENCES_MAX_CHARS,
        message = "Focus areas must be 500 characters or fewer"
    ))]
    pub preferences: String,
}

/// Scalar fields as posted by the browser. Multi-selects are changed through
/// the toggle endpoint instead. `None` means the field was not sent; an
/// empty string means it was cleared.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFormInput {
    #[serde(rename = "type", default)]
    pub meditation_type: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub voice_gender: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
}

fn posted(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or_default()
}

impl GenerationForm {
    pub fn with_defaults(variant: FlowVariant) -> Self {
        Self {
            meditation_type: DEFAULT_TYPE.to_string(),
            duration: variant.default_duration(),
            tone: DEFAULT_TONE.to_string(),
            voice_gender: VoiceGender::default(),
            mood_before: Vec::new(),
            health_conditions: Vec::new(),
            preferences: String::new(),
        }
    }

    /// Copy submitted scalar fields onto the form. A duration that is not a
    /// whole number becomes 0 so validation reports it.
    pub fn apply_input(&mut self, input: GenerationFormInput) {
        self.meditation_type = posted(&input.meditation_type).to_string();
        self.duration = posted(&input.duration).parse().unwrap_or(0);
        self.tone = posted(&input.tone).to_string();
        self.voice_gender = VoiceGender::from_form(posted(&input.voice_gender));
        self.preferences = posted(&input.preferences).to_string();
    }

    /// Like [`Self::apply_input`], but only for fields that were actually
    /// sent. Used to keep unsaved edits when a toggle or auto-fill posts
    /// the draft along. Selects never post an empty value, so an empty one
    /// is ignored; a cleared preferences box is kept cleared.
    pub fn merge_input(&mut self, input: GenerationFormInput) {
        let meditation_type = posted(&input.meditation_type);
        if !meditation_type.is_empty() {
            self.meditation_type = meditation_type.to_string();
        }
        if let Ok(duration) = posted(&input.duration).parse() {
            self.duration = duration;
        }
        let tone = posted(&input.tone);
        if !tone.is_empty() {
            self.tone = tone.to_string();
        }
        let voice_gender = posted(&input.voice_gender);
        if !voice_gender.is_empty() {
            self.voice_gender = VoiceGender::from_form(voice_gender);
        }
        if let Some(preferences) = input.preferences.as_deref() {
            self.preferences = preferences.trim().to_string();
        }
    }

    pub fn toggle_mood(&mut self, mood: &str) {
        if let Some(index) = self.mood_before.iter().position(|m| m == mood) {
            self.mood_before.remove(index);
        } else {
            self.mood_before.push(mood.to_string());
        }
    }

    /// Toggle a health condition. "Prefer not to say" excludes every other
    /// choice: picking it clears the rest, picking anything else drops it.
    pub fn toggle_health_condition(&mut self, condition: &str) {
        if let Some(index) = self.health_conditions.iter().position(|c| c == condition) {
            self.health_conditions.remove(index);
            return;
        }

        if condition == PREFER_NOT_TO_SAY {
            self.health_conditions.clear();
        } else {
            self.health_conditions.retain(|c| c != PREFER_NOT_TO_SAY);
        }
        self.health_conditions.push(condition.to_string());
    }
}

/// Payload for `POST /api/meditations/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    #[serde(rename = "type")]
    pub meditation_type: String,
    pub duration: u32,
    pub tone: String,
    pub voice_gender: VoiceGender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_conditions: Option<String>,
}

/// Validates a [`GenerationForm`] against a flow's rules and produces the
/// backend payload.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequestBuilder {
    variant: FlowVariant,
}

impl GenerationRequestBuilder {
    pub fn new(variant: FlowVariant) -> Self {
        Self { variant }
    }

    pub fn build(&self, form: &GenerationForm) -> Result<GenerationRequest, ValidationErrors> {
        let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);

        if form.meditation_type.trim().is_empty() {
            errors.add(
                "type",
                field_error("required", "Please select a meditation type".to_string()),
            );
        }

        let max = self.variant.max_duration();
        if form.duration < 1 || form.duration > max {
            errors.add(
                "duration",
                field_error(
                    "range",
                    format!("Duration must be between 1 and {} minutes", max),
                ),
            );
        }

        if form.tone.trim().is_empty() {
            errors.add(
                "tone",
                field_error("required", "Please select a voice tone".to_string()),
            );
        }

        if self.variant.requires_mood() && form.mood_before.is_empty() {
            errors.add(
                "mood_before",
                field_error("required", "Please select at least one mood".to_string()),
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(GenerationRequest {
            meditation_type: form.meditation_type.trim().to_string(),
            duration: form.duration,
            tone: form.tone.trim().to_string(),
            voice_gender: form.voice_gender,
            preferences: non_empty(form.preferences.trim().to_string()),
            mood_before: non_empty(form.mood_before.join(", ")),
            health_conditions: non_empty(form.health_conditions.join(", ")),
        })
    }
}

fn field_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// First message per field, keyed by field name, for rendering next to
/// inputs.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, field_errors)| {
            field_errors.first().map(|error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                (field.to_string(), message)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn personalized_form() -> GenerationForm {
        let mut form = GenerationForm::with_defaults(FlowVariant::Personalized);
        form.toggle_mood("Anxious");
        form
    }

    #[test]
    fn test_defaults_are_valid_for_standard() {
        let form = GenerationForm::with_defaults(FlowVariant::Standard);
        let request = GenerationRequestBuilder::new(FlowVariant::Standard)
            .build(&form)
            .unwrap();
        assert_eq!(request.duration, 10);
        assert_eq!(request.meditation_type, "stress-relief");
        assert!(request.mood_before.is_none());
    }

    #[test]
    fn test_standard_duration_bounds() {
        let builder = GenerationRequestBuilder::new(FlowVariant::Standard);
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);

        for rejected in [0, 61] {
            form.duration = rejected;
            let errors = field_messages(&builder.build(&form).unwrap_err());
            assert_eq!(
                errors.get("duration").map(String::as_str),
                Some("Duration must be between 1 and 60 minutes")
            );
        }

        for accepted in [1, 60] {
            form.duration = accepted;
            assert!(builder.build(&form).is_ok());
        }
    }

    #[test]
    fn test_personalized_duration_is_capped_at_five() {
        let builder = GenerationRequestBuilder::new(FlowVariant::Personalized);
        let mut form = personalized_form();

        form.duration = 6;
        let errors = field_messages(&builder.build(&form).unwrap_err());
        assert!(errors.contains_key("duration"));

        form.duration = 5;
        assert!(builder.build(&form).is_ok());
    }

    #[test]
    fn test_personalized_requires_mood() {
        let builder = GenerationRequestBuilder::new(FlowVariant::Personalized);
        let form = GenerationForm::with_defaults(FlowVariant::Personalized);

        let errors = field_messages(&builder.build(&form).unwrap_err());
        assert_eq!(
            errors.get("mood_before").map(String::as_str),
            Some("Please select at least one mood")
        );

        // The standard flow does not require a mood
        assert!(GenerationRequestBuilder::new(FlowVariant::Standard)
            .build(&GenerationForm::with_defaults(FlowVariant::Standard))
            .is_ok());
    }

    #[test]
    fn test_every_failing_field_is_reported() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Personalized);
        form.meditation_type = " ".to_string();
        form.tone = String::new();
        form.duration = 0;
        form.preferences = "x".repeat(501);

        let errors = field_messages(
            &GenerationRequestBuilder::new(FlowVariant::Personalized)
                .build(&form)
                .unwrap_err(),
        );
        let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec!["duration", "mood_before", "preferences", "tone", "type"]
        );
    }

    #[test]
    fn test_payload_joins_multi_selects() {
        let mut form = personalized_form();
        form.toggle_mood("Tired");
        form.toggle_health_condition("Insomnia");
        form.toggle_health_condition("Headaches");
        form.preferences = "  shoulder tension ".to_string();
        form.voice_gender = VoiceGender::Male;

        let request = GenerationRequestBuilder::new(FlowVariant::Personalized)
            .build(&form)
            .unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "type": "stress-relief",
                "duration": 5,
                "tone": "calm-soothing",
                "voice_gender": "male",
                "preferences": "shoulder tension",
                "mood_before": "Anxious, Tired",
                "health_conditions": "Insomnia, Headaches"
            })
        );
    }

    #[test]
    fn test_prefer_not_to_say_clears_other_conditions() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Personalized);
        form.toggle_health_condition("Insomnia");
        form.toggle_health_condition("Anxiety");
        form.toggle_health_condition(PREFER_NOT_TO_SAY);

        assert_eq!(form.health_conditions, vec![PREFER_NOT_TO_SAY.to_string()]);
    }

    #[test]
    fn test_other_condition_removes_prefer_not_to_say() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Personalized);
        form.toggle_health_condition(PREFER_NOT_TO_SAY);
        form.toggle_health_condition("Headaches");

        assert_eq!(form.health_conditions, vec!["Headaches".to_string()]);

        // Toggling a selected condition again deselects it
        form.toggle_health_condition("Headaches");
        assert!(form.health_conditions.is_empty());
    }

    #[test]
    fn test_toggle_mood_is_a_set() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        form.toggle_mood("Calm");
        form.toggle_mood("Sad");
        form.toggle_mood("Calm");
        assert_eq!(form.mood_before, vec!["Sad".to_string()]);
    }

    #[test]
    fn test_merge_input_ignores_missing_fields() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        form.preferences = "jaw".to_string();
        form.merge_input(GenerationFormInput {
            duration: Some("25".to_string()),
            ..GenerationFormInput::default()
        });

        assert_eq!(form.duration, 25);
        assert_eq!(form.meditation_type, "stress-relief");
        assert_eq!(form.preferences, "jaw");
    }

    #[test]
    fn test_merge_input_keeps_cleared_preferences() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        form.preferences = "jaw".to_string();
        form.merge_input(GenerationFormInput {
            preferences: Some("  ".to_string()),
            ..GenerationFormInput::default()
        });

        assert_eq!(form.preferences, "");
    }

    #[test]
    fn test_preferences_limit_matches_constant() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        form.preferences = "a".repeat(PREFERENCES_MAX_CHARS as usize);
        assert!(form.validate().is_ok());

        form.preferences.push('a');
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("preferences"));
    }

    #[test]
    fn test_form_body_distinguishes_cleared_from_missing() {
        let input: GenerationFormInput =
            serde_urlencoded::from_str("type=sleep&preferences=").unwrap();
        assert_eq!(input.preferences.as_deref(), Some(""));
        assert_eq!(input.tone, None);
    }

    #[test]
    fn test_apply_input_keeps_multi_selects() {
        let mut form = personalized_form();
        form.apply_input(GenerationFormInput {
            meditation_type: Some("sleep".to_string()),
            duration: Some("abc".to_string()),
            tone: Some("clear-steady".to_string()),
            voice_gender: Some("MALE".to_string()),
            preferences: None,
        });

        assert_eq!(form.meditation_type, "sleep");
        assert_eq!(form.duration, 0);
        assert_eq!(form.voice_gender, VoiceGender::Male);
        assert_eq!(form.mood_before, vec!["Anxious".to_string()]);
    }
}
