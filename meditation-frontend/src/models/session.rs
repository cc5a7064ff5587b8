//! Meditation session records as returned by the backend.
//!
//! The backend owns these records; the frontend only reads them. Every field
//! except `id` is tolerated missing so a partially populated record still
//! renders with placeholder text.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PREVIEW_CHARS: usize = 150;
pub const MISSING_SCRIPT: &str = "Script unavailable.";
pub const DEFAULT_TONE_LABEL: &str = "Standard";

/// Opaque session identifier. The backend sends integers; older payloads
/// used strings. Both are normalised to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawSessionId", into = "String")]
pub struct SessionId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSessionId {
    Text(String),
    Number(i64),
}

impl From<RawSessionId> for SessionId {
    fn from(raw: RawSessionId) -> Self {
        match raw {
            RawSessionId::Text(text) => SessionId(text),
            RawSessionId::Number(n) => SessionId(n.to_string()),
        }
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    /// Id taken from a request path. Rejects values that would change the
    /// shape of a backend path once forwarded.
    pub fn from_path(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let unsafe_char = |c: char| matches!(c, '/' | '\\' | '%' | '?' | '#') || c.is_control();
        if raw.is_empty() || raw == "." || raw == ".." || raw.chars().any(unsafe_char) {
            return None;
        }
        Some(SessionId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(rename = "type", default)]
    pub meditation_type: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub mood_before: Option<String>,
    #[serde(default)]
    pub mood_after: Option<String>,
    #[serde(default)]
    pub health_conditions: Option<String>,
}

impl SessionRecord {
    /// Creation instant, normalised to UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn type_label(&self) -> String {
        type_label(&self.meditation_type)
    }

    pub fn tone_label(&self) -> String {
        match self.tone.as_deref().map(str::trim) {
            Some(tone) if !tone.is_empty() => tone.to_string(),
            _ => DEFAULT_TONE_LABEL.to_string(),
        }
    }

    pub fn script_text(&self) -> &str {
        match self.script.as_deref() {
            Some(script) if !script.trim().is_empty() => script,
            _ => MISSING_SCRIPT,
        }
    }

    /// First [`PREVIEW_CHARS`] characters of the script, with an ellipsis
    /// when truncated.
    pub fn preview(&self) -> String {
        let script = self.script_text();
        if script.chars().count() > PREVIEW_CHARS {
            let truncated: String = script.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", truncated)
        } else {
            script.to_string()
        }
    }

    /// Short date such as `Jan 5, 2024`.
    pub fn created_date(&self) -> String {
        self.created_at_utc()
            .map(|at| at.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| "Unknown date".to_string())
    }

    /// Long form such as `Friday, January 5, 2024 at 10:30 UTC`.
    pub fn created_timestamp(&self) -> String {
        self.created_at_utc()
            .map(|at| at.format("%A, %B %-d, %Y at %H:%M UTC").to_string())
            .unwrap_or_else(|| "Unknown date".to_string())
    }
}

/// Parse a backend timestamp into a UTC instant.
///
/// The backend serialises naive UTC datetimes without a `Z` suffix. Such
/// values are read as UTC, never as local time. Values that carry an explicit
/// offset keep it. Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }

    // Naive values, with either `T` or a space between date and time
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Display label for a meditation type. Unknown types are title-cased
/// rather than rejected.
pub fn type_label(meditation_type: &str) -> String {
    match meditation_type {
        "stress-relief" => "Stress Relief".to_string(),
        "sleep" => "Deep Sleep".to_string(),
        "focus" => "Better Focus".to_string(),
        "" => "Meditation".to_string(),
        other => other
            .split(['-', '_', ' '])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}
