use std::future::Future;

use crate::{
    foundation::error::ReelResult,
    jobs::kind::JobKind,
    model::layer::{Layer, LayerId},
    model::timeline::SessionDocument,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Identity of one logical job: at most one may be pending per key.
pub struct JobKey {
    /// Session the job belongs to.
    pub session_id: String,
    /// Job kind.
    pub kind: JobKind,
    /// Owning layer, `None` for session-scoped kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.layer_id {
            Some(layer) => write!(f, "{}/{}/{}", self.session_id, self.kind, layer),
            None => write!(f, "{}/{}", self.session_id, self.kind),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Create-request body.
pub struct SubmitRequest {
    /// Session id.
    pub session_id: String,
    /// Owning layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
    /// Kind-specific request fields (prompt, model, voice, ...).
    pub payload: serde_json::Value,
    /// Flattened layer as a PNG data URI, for kinds that need one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Create-response body. Either part may carry an authoritative replacement.
pub struct SubmitAck {
    /// Full session document.
    #[serde(default)]
    pub session: Option<SessionDocument>,
    /// Updated owning layer.
    #[serde(default)]
    pub layer: Option<Layer>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
/// Status-response body.
pub struct PollResponse {
    /// Server status string; the source of truth for the job state.
    pub status: String,
    /// Result payload on completion.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Failure reason.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
/// Classified poll response.
pub enum PollOutcome {
    /// Any non-terminal status.
    InProgress,
    /// Terminal success with its result (empty object when absent).
    Completed(serde_json::Value),
    /// Terminal failure with a human-readable reason.
    Failed(String),
}

impl PollResponse {
    /// Response with a bare status.
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            result: None,
            error: None,
        }
    }

    /// `COMPLETED` response carrying `result`.
    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            ..Self::status("COMPLETED")
        }
    }

    /// `FAILED` response carrying `error`.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::status("FAILED")
        }
    }

    /// Classify the status string, case-insensitively.
    pub fn outcome(&self) -> PollOutcome {
        let status = self.status.trim();
        if status.eq_ignore_ascii_case("COMPLETED") {
            PollOutcome::Completed(
                self.result
                    .clone()
                    .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            )
        } else if status.eq_ignore_ascii_case("FAILED") {
            PollOutcome::Failed(
                self.error
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "generation failed".to_string()),
            )
        } else {
            PollOutcome::InProgress
        }
    }
}

/// HTTP collaborator for generation endpoints.
///
/// Implementations return `ReelError::Transport` for network failures and non-2xx replies
/// obtained before a status payload.
pub trait JobTransport: Send + Sync + 'static {
    /// Issue the create request for `kind`.
    fn submit(
        &self,
        kind: JobKind,
        endpoint: &str,
        request: &SubmitRequest,
    ) -> impl Future<Output = ReelResult<SubmitAck>> + Send;

    /// Fetch the current status of the job identified by `key`.
    fn poll(
        &self,
        kind: JobKind,
        endpoint: &str,
        key: &JobKey,
    ) -> impl Future<Output = ReelResult<PollResponse>> + Send;
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/transport.rs"]
mod tests;
