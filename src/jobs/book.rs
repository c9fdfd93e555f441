use std::collections::HashMap;

use crate::jobs::transport::JobKey;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Dismissible error recorded for one job key.
pub struct JobError {
    /// Human-readable reason.
    pub message: String,
    /// Whether re-submitting may succeed (transport failures) or the server rejected the job.
    pub retryable: bool,
}

/// Pending flags and last errors per job key.
///
/// Every `begin` hands out a fresh monotonic token. Responses are applied only while their token
/// is still the pending one, which discards stale and cancelled responses.
#[derive(Debug, Default)]
pub struct JobBook {
    next_token: u64,
    pending: HashMap<JobKey, u64>,
    errors: HashMap<JobKey, JobError>,
}

impl JobBook {
    /// Mark `key` pending and clear its previous error. Returns `None` when already pending.
    pub fn begin(&mut self, key: &JobKey) -> Option<u64> {
        if self.pending.contains_key(key) {
            return None;
        }
        self.next_token += 1;
        let token = self.next_token;
        self.pending.insert(key.clone(), token);
        self.errors.remove(key);
        Some(token)
    }

    /// Whether `token` is still the pending request for `key`.
    pub fn is_current(&self, key: &JobKey, token: u64) -> bool {
        self.pending.get(key) == Some(&token)
    }

    /// Clear the pending flag if `token` is current. Returns whether it was.
    pub fn finish(&mut self, key: &JobKey, token: u64) -> bool {
        if !self.is_current(key, token) {
            return false;
        }
        self.pending.remove(key);
        true
    }

    /// Clear the pending flag (if `token` is current) and store an error.
    pub fn fail(&mut self, key: &JobKey, token: u64, error: JobError) -> bool {
        if !self.finish(key, token) {
            return false;
        }
        self.errors.insert(key.clone(), error);
        true
    }

    /// Drop the pending flag regardless of token.
    pub fn cancel(&mut self, key: &JobKey) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Drop every pending flag.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Whether a job for `key` is pending.
    pub fn is_pending(&self, key: &JobKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of pending jobs.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Last error for `key`.
    pub fn error(&self, key: &JobKey) -> Option<&JobError> {
        self.errors.get(key)
    }

    /// Dismiss the error for `key`.
    pub fn dismiss_error(&mut self, key: &JobKey) -> Option<JobError> {
        self.errors.remove(key)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/book.rs"]
mod tests;
