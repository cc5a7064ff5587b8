//! Submit lifecycle of a generation form.
//!
//! ```text
//! idle ──submit──> validating ──ok──> submitting ──> showing-result
//!   ^                  │                   │
//!   │               invalid             failure
//!   │                  v                   v
//!   └─────reset──── idle (field errors) / idle-with-error
//! ```
//!
//! The flow, form fields included, lives in the browser's server-side
//! session under one key per [`FlowVariant`].

use crate::dtos::generation::{
    field_messages, FlowVariant, GenerationForm, GenerationRequest, GenerationRequestBuilder,
};
use crate::models::GeneratedMeditation;
use chrono::Utc;
use meditation_core::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tower_sessions::Session;

pub const INTERRUPTED_MESSAGE: &str = "The previous request did not complete. Please try again.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Validating,
    Submitting { since: i64 },
    ShowingResult { result: GeneratedMeditation },
    IdleWithError { message: String },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Validating => "validating",
            FlowState::Submitting { .. } => "submitting",
            FlowState::ShowingResult { .. } => "showing_result",
            FlowState::IdleWithError { .. } => "idle_with_error",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationFlow {
    pub variant: FlowVariant,
    pub form: GenerationForm,
    pub state: FlowState,
    #[serde(default)]
    pub field_errors: BTreeMap<String, String>,
}

impl GenerationFlow {
    pub fn new(variant: FlowVariant) -> Self {
        Self {
            variant,
            form: GenerationForm::with_defaults(variant),
            state: FlowState::Idle,
            field_errors: BTreeMap::new(),
        }
    }

    /// The flow stored for `variant`, or a fresh one.
    ///
    /// A submission older than `stale_after_secs` belongs to a request that
    /// never finished (client went away mid-call) and is surfaced as an
    /// error instead of blocking the form forever.
    pub async fn load(
        session: &Session,
        variant: FlowVariant,
        stale_after_secs: i64,
    ) -> Result<Self, AppError> {
        let stored = session
            .get::<GenerationFlow>(variant.session_key())
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))?;

        let mut flow = stored.unwrap_or_else(|| Self::new(variant));
        if let FlowState::Submitting { since } = flow.state {
            if Utc::now().timestamp() - since > stale_after_secs {
                tracing::warn!(variant = ?variant, "Abandoning stale submission");
                flow.state = FlowState::IdleWithError {
                    message: INTERRUPTED_MESSAGE.to_string(),
                };
            }
        }
        Ok(flow)
    }

    pub async fn store(&self, session: &Session) -> Result<(), AppError> {
        session
            .insert(self.variant.session_key(), self)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, FlowState::Submitting { .. })
    }

    pub fn result(&self) -> Option<&GeneratedMeditation> {
        match &self.state {
            FlowState::ShowingResult { result } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            FlowState::IdleWithError { message } => Some(message),
            _ => None,
        }
    }

    /// Form fields may change only while the form is shown.
    pub fn edit(&mut self) -> Result<&mut GenerationForm, FlowError> {
        match self.state {
            FlowState::Idle | FlowState::IdleWithError { .. } => Ok(&mut self.form),
            _ => Err(self.reject("edit the form")),
        }
    }

    /// Validate the form and, if it passes, enter `submitting`.
    ///
    /// `Ok(None)` means validation failed; the flow is back to idle with
    /// [`Self::field_errors`] filled in.
    pub fn submit(&mut self) -> Result<Option<GenerationRequest>, FlowError> {
        match self.state {
            FlowState::Idle | FlowState::IdleWithError { .. } => {}
            _ => return Err(self.reject("submit")),
        }

        self.state = FlowState::Validating;
        self.field_errors.clear();

        match GenerationRequestBuilder::new(self.variant).build(&self.form) {
            Ok(request) => {
                self.state = FlowState::Submitting {
                    since: Utc::now().timestamp(),
                };
                Ok(Some(request))
            }
            Err(errors) => {
                self.field_errors = field_messages(&errors);
                self.state = FlowState::Idle;
                Ok(None)
            }
        }
    }

    pub fn complete(&mut self, result: GeneratedMeditation) -> Result<(), FlowError> {
        if !self.is_submitting() {
            return Err(self.reject("show a result"));
        }
        self.state = FlowState::ShowingResult { result };
        Ok(())
    }

    /// Leave `submitting` with an error banner. Form fields are kept.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), FlowError> {
        if !self.is_submitting() {
            return Err(self.reject("record a failure"));
        }
        self.state = FlowState::IdleWithError {
            message: message.into(),
        };
        Ok(())
    }

    /// Back to idle from any state. Clears result and errors, keeps fields.
    pub fn reset(&mut self) {
        self.state = FlowState::Idle;
        self.field_errors.clear();
    }

    fn reject(&self, action: &'static str) -> FlowError {
        let error = FlowError::InvalidTransition {
            action,
            state: self.state.name(),
        };
        tracing::warn!(variant = ?self.variant, error = %error, "Rejected flow transition");
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionId, SessionRecord};

    fn result() -> GeneratedMeditation {
        GeneratedMeditation::from(SessionRecord {
            id: SessionId::new("1"),
            created_at: None,
            meditation_type: "sleep".to_string(),
            duration: 5,
            tone: None,
            script: Some("Rest.".to_string()),
            audio_url: None,
            preferences: None,
            mood_before: None,
            mood_after: None,
            health_conditions: None,
        })
    }

    #[test]
    fn test_happy_path() {
        let mut flow = GenerationFlow::new(FlowVariant::Standard);
        let request = flow.submit().unwrap().unwrap();
        assert_eq!(request.duration, 10);
        assert!(flow.is_submitting());

        flow.complete(result()).unwrap();
        assert_eq!(flow.result().map(|r| r.script.as_str()), Some("Rest."));
    }

    #[test]
    fn test_invalid_form_returns_to_idle_with_field_errors() {
        let mut flow = GenerationFlow::new(FlowVariant::Personalized);
        assert_eq!(flow.submit().unwrap(), None);
        assert_eq!(flow.state, FlowState::Idle);
        assert!(flow.field_errors.contains_key("mood_before"));

        flow.edit().unwrap().toggle_mood("Calm");
        assert!(flow.submit().unwrap().is_some());
        assert!(flow.field_errors.is_empty());
    }

    #[test]
    fn test_double_submit_is_rejected() {
        let mut flow = GenerationFlow::new(FlowVariant::Standard);
        flow.submit().unwrap();

        assert_eq!(
            flow.submit(),
            Err(FlowError::InvalidTransition {
                action: "submit",
                state: "submitting"
            })
        );
        assert!(flow.edit().is_err());
    }

    #[test]
    fn test_failure_keeps_fields() {
        let mut flow = GenerationFlow::new(FlowVariant::Standard);
        flow.edit().unwrap().preferences = "lower back".to_string();
        flow.submit().unwrap();
        flow.fail("Backend unavailable").unwrap();

        assert_eq!(flow.error_message(), Some("Backend unavailable"));
        assert_eq!(flow.form.preferences, "lower back");
        // Retry is allowed straight from the error state
        assert!(flow.submit().unwrap().is_some());
    }

    #[test]
    fn test_submit_from_result_requires_reset() {
        let mut flow = GenerationFlow::new(FlowVariant::Standard);
        flow.submit().unwrap();
        flow.complete(result()).unwrap();

        assert!(flow.submit().is_err());

        flow.reset();
        assert_eq!(flow.state, FlowState::Idle);
        assert!(flow.result().is_none());
        assert_eq!(flow.form.duration, 10);
        assert!(flow.submit().unwrap().is_some());
    }

    #[test]
    fn test_complete_outside_submitting_is_rejected() {
        let mut flow = GenerationFlow::new(FlowVariant::Standard);
        assert!(flow.complete(result()).is_err());
        assert!(flow.fail("x").is_err());
    }

    #[test]
    fn test_state_serialises_with_tag() {
        let mut flow = GenerationFlow::new(FlowVariant::Standard);
        flow.submit().unwrap();
        flow.fail("oops").unwrap();

        let value = serde_json::to_value(&flow).unwrap();
        assert_eq!(value["state"]["state"], "idle_with_error");
        assert_eq!(value["variant"], "standard");

        let back: GenerationFlow = serde_json::from_value(value).unwrap();
        assert_eq!(back, flow);
    }
}
