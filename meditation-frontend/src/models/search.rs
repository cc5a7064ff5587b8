//! Search results and the response shapes the backend has used for them.
//!
//! Current backends wrap every hit as `{session, match_info}`; older ones
//! returned bare session objects. Both are accepted at the boundary and
//! normalised to [`SearchResult`] before anything else sees them.

use super::session::SessionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchInfo {
    /// `script`, `audio_script`, `type`, `filter` or `none`.
    #[serde(default)]
    pub matched_in: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub session: SessionRecord,
    pub match_info: Option<MatchInfo>,
}

/// One element of a search response, as sent on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchHit {
    Wrapped {
        session: SessionRecord,
        #[serde(default)]
        match_info: Option<MatchInfo>,
    },
    Bare(SessionRecord),
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        match hit {
            SearchHit::Wrapped {
                session,
                match_info,
            } => SearchResult {
                session,
                match_info,
            },
            SearchHit::Bare(session) => SearchResult {
                session,
                match_info: None,
            },
        }
    }
}

/// History filters, as taken from the page URL and forwarded to the
/// backend search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub meditation_type: Option<String>,
}

impl SearchQuery {
    /// Blank values, and the `all` type filter, count as absent.
    pub fn normalized(self) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            query: clean(self.query),
            meditation_type: clean(self.meditation_type).filter(|t| t != "all"),
        }
    }

    /// No filter at all: the plain list endpoint is enough.
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.meditation_type.is_none()
    }
}

/// Normalise a raw search payload.
///
/// Anything other than a JSON array is logged and treated as no results.
/// Elements that match neither shape are skipped individually.
pub fn normalize_search_payload(payload: Value) -> Vec<SearchResult> {
    let Value::Array(items) = payload else {
        tracing::warn!(
            payload_kind = json_kind(&payload),
            "Unexpected search response envelope, treating as empty"
        );
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<SearchHit>(item) {
            Ok(hit) => Some(SearchResult::from(hit)),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed search result");
                None
            }
        })
        .collect()
}

/// Normalise a raw session-list payload, with the same tolerance rules as
/// [`normalize_search_payload`].
pub fn normalize_session_list(payload: Value) -> Vec<SessionRecord> {
    let Value::Array(items) = payload else {
        tracing::warn!(
            payload_kind = json_kind(&payload),
            "Unexpected session list envelope, treating as empty"
        );
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<SessionRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed session record");
                None
            }
        })
        .collect()
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
