use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crate::{
    compositor::raster::Raster,
    foundation::error::{ReelError, ReelResult},
    jobs::kind::{JobKind, JobScope},
    jobs::task::ScheduledTask,
    jobs::transport::{JobKey, JobTransport, PollOutcome, SubmitRequest},
    model::layer::LayerId,
    timeline::session::{SharedSession, lock_session},
};

type TaskMap = Arc<Mutex<HashMap<JobKey, ScheduledTask>>>;

/// Generic submit/poll/merge state machine shared by every [`JobKind`].
///
/// Each job is `SUBMITTED -> POLLING -> {COMPLETED | FAILED}`. Poll loops reschedule themselves
/// one interval after the previous response, so slow replies never overlap.
pub struct JobOrchestrator<T: JobTransport> {
    transport: Arc<T>,
    session: SharedSession,
    tasks: TaskMap,
}

enum PollStep {
    Continue,
    Stop,
}

impl<T: JobTransport> JobOrchestrator<T> {
    /// Orchestrator over `session` talking to `transport`.
    pub fn new(transport: Arc<T>, session: SharedSession) -> Self {
        Self {
            transport,
            session,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Shared editor state this orchestrator merges into.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Submit a job and start polling it.
    ///
    /// Preconditions are checked before any network call: layer-scoped kinds need an existing
    /// layer, artifact kinds need a flattened raster, and only one job may be pending per
    /// `(session, kind, layer)`. A transport failure on submit is recorded as a retryable error
    /// and returned.
    #[tracing::instrument(level = "info", skip(self, payload, artifact), fields(kind = %kind))]
    pub async fn submit(
        &self,
        kind: JobKind,
        layer_id: Option<LayerId>,
        payload: serde_json::Value,
        artifact: Option<&Raster>,
    ) -> ReelResult<JobKey> {
        let desc = kind.descriptor();
        if desc.requires_artifact && artifact.is_none() {
            return Err(ReelError::validation(format!(
                "{kind} requires a flattened layer artifact"
            )));
        }
        let artifact = artifact.map(Raster::to_data_uri).transpose()?;

        let (key, token, interval) = {
            let mut s = lock_session(&self.session);
            if desc.scope == JobScope::Layer {
                let Some(id) = layer_id.as_ref() else {
                    return Err(ReelError::validation(format!("{kind} requires a layer")));
                };
                if s.timeline().layer(id).is_none() {
                    return Err(ReelError::validation(format!(
                        "{kind} target layer '{id}' does not exist"
                    )));
                }
            }
            let key = s.job_key(kind, layer_id);
            let token = s
                .jobs
                .begin(&key)
                .ok_or_else(|| ReelError::JobAlreadyPending(key.to_string()))?;
            (key, token, s.config().poll_interval(kind))
        };

        let request = SubmitRequest {
            session_id: key.session_id.clone(),
            layer_id: key.layer_id.clone(),
            payload,
            artifact,
        };
        let ack = match self.transport.submit(kind, desc.endpoint, &request).await {
            Ok(ack) => ack,
            Err(err) => {
                tracing::warn!(job = %key, error = %err, "submit failed");
                lock_session(&self.session).transport_failure(&key, token, err.to_string());
                return Err(err);
            }
        };

        {
            let mut s = lock_session(&self.session);
            if !s.jobs.is_current(&key, token) {
                tracing::debug!(job = %key, "job cancelled during submit");
                return Ok(key);
            }
            if let Some(doc) = ack.session {
                if let Err(err) = s.apply_server_document(doc) {
                    tracing::warn!(job = %key, error = %err, "ignoring invalid submit document");
                }
            } else if let Some(layer) = ack.layer
                && let Err(err) = s.replace_layer(layer)
            {
                tracing::warn!(job = %key, error = %err, "ignoring invalid submit layer");
            }
        }

        self.spawn_poll(key.clone(), token, interval);
        tracing::info!(job = %key, "job submitted");
        Ok(key)
    }

    fn spawn_poll(&self, key: JobKey, token: u64, interval: Duration) {
        let task = ScheduledTask::spawn(poll_loop(
            self.transport.clone(),
            self.session.clone(),
            key.clone(),
            token,
            interval,
        ));
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, t| !t.is_finished());
        if let Some(previous) = tasks.insert(key, task) {
            previous.cancel();
        }
    }

    /// Stop polling `kind` on `layer` and drop its pending flag. The server job may still run.
    pub fn cancel(&self, kind: JobKind, layer: Option<&LayerId>) -> bool {
        let key = {
            let mut s = lock_session(&self.session);
            let key = s.job_key(kind, layer.cloned());
            if !s.jobs.cancel(&key) {
                return false;
            }
            key
        };
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        if let Some(task) = task {
            task.cancel();
        }
        tracing::debug!(job = %key, "job cancelled");
        true
    }

    /// Stop every poll loop and drop all pending flags.
    pub fn cancel_all(&self) {
        self.abort_tasks();
        lock_session(&self.session).jobs.cancel_all();
    }

    fn abort_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.cancel();
        }
    }

    /// Wait until every running poll loop has reached a terminal state.
    pub async fn wait_all(&self) {
        let tasks: Vec<ScheduledTask> = {
            let mut map = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            map.drain().map(|(_, t)| t).collect()
        };
        for task in tasks {
            task.join().await;
        }
    }
}

impl<T: JobTransport> Drop for JobOrchestrator<T> {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn poll_loop<T: JobTransport>(
    transport: Arc<T>,
    session: SharedSession,
    key: JobKey,
    token: u64,
    interval: Duration,
) {
    let endpoint = key.kind.descriptor().endpoint;
    loop {
        tokio::time::sleep(interval).await;
        let current = lock_session(&session).jobs.is_current(&key, token);
        if !current {
            tracing::debug!(job = %key, "poll loop ends, job no longer pending");
            return;
        }

        let response = transport.poll(key.kind, endpoint, &key).await;
        let step = {
            let mut s = lock_session(&session);
            if !s.jobs.is_current(&key, token) {
                tracing::debug!(job = %key, "discarding stale poll response");
                PollStep::Stop
            } else {
                match response {
                    Err(err) => {
                        tracing::warn!(job = %key, error = %err, "poll transport failure");
                        s.transport_failure(&key, token, err.to_string());
                        PollStep::Stop
                    }
                    Ok(resp) => match resp.outcome() {
                        PollOutcome::InProgress => {
                            tracing::trace!(job = %key, status = %resp.status, "still running");
                            PollStep::Continue
                        }
                        PollOutcome::Completed(result) => {
                            let outcome = s.complete_job(&key, token, &result);
                            tracing::info!(job = %key, ?outcome, "job completed");
                            PollStep::Stop
                        }
                        PollOutcome::Failed(reason) => {
                            tracing::info!(job = %key, %reason, "job failed");
                            s.fail_job(&key, token, reason);
                            PollStep::Stop
                        }
                    },
                }
            }
        };
        if let PollStep::Stop = step {
            return;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/orchestrator.rs"]
mod tests;
