use super::search::json_kind;
use super::session::{SessionRecord, MISSING_SCRIPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a generation request, as shown on the result view.
///
/// Normally the backend returns the persisted session. A bare `{script}`
/// answer still renders, without history links or server audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedMeditation {
    pub session: Option<SessionRecord>,
    pub script: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Envelope { session: SessionRecord },
    Record(SessionRecord),
    ScriptOnly { script: String },
}

impl GeneratedMeditation {
    /// Normalise the generate response. `None` when the payload has none of
    /// the accepted shapes.
    pub fn from_payload(payload: Value) -> Option<Self> {
        let kind = json_kind(&payload);
        match serde_json::from_value::<GenerateResponse>(payload) {
            Ok(GenerateResponse::Envelope { session }) | Ok(GenerateResponse::Record(session)) => {
                Some(Self::from(session))
            }
            Ok(GenerateResponse::ScriptOnly { script }) => Some(Self {
                session: None,
                script,
            }),
            Err(_) => {
                tracing::warn!(kind, "Unexpected generate response shape");
                None
            }
        }
    }

    pub fn script_text(&self) -> &str {
        if self.script.trim().is_empty() {
            MISSING_SCRIPT
        } else {
            &self.script
        }
    }
}

impl From<SessionRecord> for GeneratedMeditation {
    fn from(session: SessionRecord) -> Self {
        Self {
            script: session.script_text().to_string(),
            session: Some(session),
        }
    }
}
