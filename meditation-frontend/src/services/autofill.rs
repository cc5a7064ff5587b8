//! Mood-based auto-fill.
//!
//! Turns the current selections into a sentence for the suggestion endpoint
//! and maps its free-text answer back onto the enumerated form fields.

use crate::dtos::generation::{FlowVariant, GenerationForm, PREFER_NOT_TO_SAY};
use crate::models::session::type_label;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoodSuggestRequest {
    pub mood_text: String,
}

/// Raw suggestion. Every field is free-form; the endpoint may answer with a
/// number or a sentence for duration, a string or list for focus areas.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MoodSuggestion {
    #[serde(default)]
    pub suggested_type: Option<Value>,
    #[serde(default)]
    pub suggested_tone: Option<Value>,
    #[serde(default)]
    pub suggested_duration: Option<Value>,
    #[serde(default)]
    pub suggested_focus_areas: Option<Value>,
}

/// Natural-language summary of the form's selections.
pub fn summarize_selections(form: &GenerationForm) -> String {
    let mut parts = Vec::new();

    if form.mood_before.is_empty() {
        parts.push("I'd like to relax.".to_string());
    } else {
        let moods: Vec<String> = form.mood_before.iter().map(|m| m.to_lowercase()).collect();
        parts.push(format!("I'm feeling {}.", join_natural(&moods)));
    }

    let conditions: Vec<String> = form
        .health_conditions
        .iter()
        .filter(|c| c.as_str() != PREFER_NOT_TO_SAY)
        .map(|c| c.to_lowercase())
        .collect();
    if !conditions.is_empty() {
        parts.push(format!("I'm dealing with {}.", join_natural(&conditions)));
    }

    if !form.meditation_type.trim().is_empty() {
        parts.push(format!(
            "I'm interested in a {} meditation.",
            type_label(&form.meditation_type).to_lowercase()
        ));
    }

    parts.join(" ")
}

fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Overwrite type, tone, duration and preferences from a suggestion.
/// Anything unrecognised leaves the current value alone.
pub fn apply_suggestion(form: &mut GenerationForm, suggestion: &MoodSuggestion, variant: FlowVariant) {
    if let Some(kind) = suggestion.suggested_type.as_ref().and_then(text_of).and_then(|t| match_type(&t)) {
        form.meditation_type = kind.to_string();
    }

    if let Some(tone) = suggestion.suggested_tone.as_ref().and_then(text_of).and_then(|t| match_tone(&t)) {
        form.tone = tone.to_string();
    }

    if let Some(minutes) = suggestion.suggested_duration.as_ref().and_then(first_integer) {
        form.duration = minutes.clamp(1, u64::from(variant.max_duration())) as u32;
    }

    if let Some(areas) = suggestion.suggested_focus_areas.as_ref().and_then(focus_areas) {
        form.preferences = areas;
    }
}

pub fn match_type(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    if text.contains("sleep") {
        Some("sleep")
    } else if text.contains("focus") || text.contains("concentrat") {
        Some("focus")
    } else if ["stress", "anxi", "relax", "calm"].iter().any(|k| text.contains(k)) {
        Some("stress-relief")
    } else {
        None
    }
}

pub fn match_tone(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    if text.contains("steady") || text.contains("clear") {
        Some("clear-steady")
    } else if text.contains("whisper") || text.contains("sooth") {
        Some("calm-soothing")
    } else if text.contains("relax") {
        Some("relaxed-tone")
    } else if text.contains("gentle") || text.contains("peace") {
        Some("gentle-peaceful")
    } else {
        None
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn first_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn focus_areas(value: &Value) -> Option<String> {
    let joined = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suggestion(value: Value) -> MoodSuggestion {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_summary_mentions_selections() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Personalized);
        form.toggle_mood("Anxious");
        form.toggle_mood("Tired");
        form.toggle_mood("Sad");
        form.toggle_health_condition("Insomnia");
        form.meditation_type = "sleep".to_string();

        assert_eq!(
            summarize_selections(&form),
            "I'm feeling anxious, tired and sad. I'm dealing with insomnia. \
             I'm interested in a deep sleep meditation."
        );
    }

    #[test]
    fn test_summary_skips_prefer_not_to_say() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        form.toggle_health_condition(PREFER_NOT_TO_SAY);

        let summary = summarize_selections(&form);
        assert!(summary.starts_with("I'd like to relax."));
        assert!(!summary.to_lowercase().contains("prefer"));
    }

    #[test]
    fn test_type_keywords() {
        assert_eq!(match_type("A Sleep Story"), Some("sleep"));
        assert_eq!(match_type("improve concentration"), Some("focus"));
        assert_eq!(match_type("Anxiety relief"), Some("stress-relief"));
        assert_eq!(match_type("body scan"), None);
    }

    #[test]
    fn test_tone_keywords() {
        assert_eq!(match_tone("Clear and steady"), Some("clear-steady"));
        assert_eq!(match_tone("soft whisper"), Some("calm-soothing"));
        assert_eq!(match_tone("relaxing"), Some("relaxed-tone"));
        assert_eq!(match_tone("peaceful"), Some("gentle-peaceful"));
        assert_eq!(match_tone("booming"), None);
    }

    #[test]
    fn test_apply_full_suggestion() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        apply_suggestion(
            &mut form,
            &suggestion(json!({
                "suggested_type": "Deep sleep",
                "suggested_tone": "Gentle and peaceful",
                "suggested_duration": "about 15 minutes",
                "suggested_focus_areas": ["breathing", " letting go ", ""]
            })),
            FlowVariant::Standard,
        );

        assert_eq!(form.meditation_type, "sleep");
        assert_eq!(form.tone, "gentle-peaceful");
        assert_eq!(form.duration, 15);
        assert_eq!(form.preferences, "breathing, letting go");
    }

    #[test]
    fn test_duration_is_clamped_to_variant() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Personalized);
        apply_suggestion(
            &mut form,
            &suggestion(json!({ "suggested_duration": 20 })),
            FlowVariant::Personalized,
        );
        assert_eq!(form.duration, 5);

        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        apply_suggestion(
            &mut form,
            &suggestion(json!({ "suggested_duration": "0 minutes" })),
            FlowVariant::Standard,
        );
        assert_eq!(form.duration, 1);
    }

    #[test]
    fn test_unrecognised_text_keeps_current_values() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        form.preferences = "neck".to_string();
        let before = form.clone();

        apply_suggestion(
            &mut form,
            &suggestion(json!({
                "suggested_type": "something new",
                "suggested_tone": null,
                "suggested_duration": "a while",
                "suggested_focus_areas": []
            })),
            FlowVariant::Standard,
        );

        assert_eq!(form, before);
    }

    #[test]
    fn test_empty_suggestion_is_harmless() {
        let mut form = GenerationForm::with_defaults(FlowVariant::Standard);
        let before = form.clone();
        apply_suggestion(&mut form, &MoodSuggestion::default(), FlowVariant::Standard);
        assert_eq!(form, before);
    }
}
