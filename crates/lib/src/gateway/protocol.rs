//! Gateway HTTP request/response bodies (camelCase JSON).

use crate::chat::{ChatSnapshot, Outcome};
use serde::{Deserialize, Serialize};

/// Body for `POST /sessions`. Unknown or missing template falls back to the configured default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionParams {
    #[serde(default)]
    pub template_id: Option<String>,
}

/// Body for `POST /sessions/{id}/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    pub input: String,
}

/// Body for `POST /sessions/{id}/regenerate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateParams {
    pub index: usize,
}

/// Body for `POST /sessions/{id}/reset`. Without a template the session keeps its current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetParams {
    #[serde(default)]
    pub template_id: Option<String>,
}

/// Body for `PUT /sessions/{id}/client`. A null/absent id clears the scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A session as returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    #[serde(flatten)]
    pub snapshot: ChatSnapshot,
}

/// Result of send/regenerate: what happened plus the updated session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub outcome: Outcome,
    pub session: SessionView,
}
