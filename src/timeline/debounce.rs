use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crate::{
    jobs::task::ScheduledTask,
    timeline::mutate::{CoalesceKey, Mutation},
    timeline::session::{SharedSession, lock_session},
    timeline::store::SessionStore,
};

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<Mutation>,
    task: Option<ScheduledTask>,
    last_error: Option<String>,
}

type Slots = Arc<Mutex<HashMap<CoalesceKey, Slot>>>;

/// Coalesces high-frequency edits to the latest payload per [`CoalesceKey`].
///
/// Each push restarts the quiet window; only the newest payload is persisted once the window
/// passes. A server answer that arrives after a newer push is discarded.
pub struct Debouncer<S: SessionStore> {
    store: Arc<S>,
    session: SharedSession,
    window: Duration,
    slots: Slots,
}

impl<S: SessionStore> Debouncer<S> {
    /// Debouncer persisting to `store` after `window` of quiet.
    pub fn new(store: Arc<S>, session: SharedSession, window: Duration) -> Self {
        Self {
            store,
            session,
            window,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Quiet window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Queue `mutation` under `key`, replacing any payload still waiting there.
    pub fn push(&self, key: CoalesceKey, mutation: Mutation) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.clone()).or_default();
        slot.generation += 1;
        slot.pending = Some(mutation);
        let generation = slot.generation;
        tracing::trace!(?key, generation, "edit queued");
        slot.task = Some(ScheduledTask::spawn(flush_after(
            self.window,
            self.store.clone(),
            self.session.clone(),
            self.slots.clone(),
            key,
            generation,
        )));
    }

    /// Number of payloads still waiting for their window.
    pub fn pending_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.pending.is_some())
            .count()
    }

    /// Last persistence error for `key`, if the latest flush failed.
    pub fn last_error(&self, key: &CoalesceKey) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|s| s.last_error.clone())
    }

    /// Persist every waiting payload now, without waiting for the window.
    pub async fn flush(&self) {
        let due: Vec<(CoalesceKey, u64, Mutation)> = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots
                .iter_mut()
                .filter_map(|(key, slot)| {
                    let mutation = slot.pending.take()?;
                    slot.generation += 1;
                    if let Some(task) = slot.task.take() {
                        task.cancel();
                    }
                    Some((key.clone(), slot.generation, mutation))
                })
                .collect()
        };
        for (key, generation, mutation) in due {
            persist_latest(
                self.store.as_ref(),
                &self.session,
                &self.slots,
                &key,
                generation,
                mutation,
            )
            .await;
        }
    }

    /// Wait for every scheduled flush to finish.
    pub async fn settle(&self) {
        let tasks: Vec<ScheduledTask> = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.values_mut().filter_map(|s| s.task.take()).collect()
        };
        for task in tasks {
            task.join().await;
        }
    }
}

async fn flush_after<S: SessionStore>(
    window: Duration,
    store: Arc<S>,
    session: SharedSession,
    slots: Slots,
    key: CoalesceKey,
    generation: u64,
) {
    tokio::time::sleep(window).await;
    let mutation = {
        let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get_mut(&key) {
            Some(slot) if slot.generation == generation => slot.pending.take(),
            _ => None,
        }
    };
    let Some(mutation) = mutation else {
        return;
    };
    persist_latest(store.as_ref(), &session, &slots, &key, generation, mutation).await;
}

async fn persist_latest<S: SessionStore>(
    store: &S,
    session: &SharedSession,
    slots: &Slots,
    key: &CoalesceKey,
    generation: u64,
    mutation: Mutation,
) {
    let session_id = lock_session(session).config().session_id.clone();
    let result = store.persist(&session_id, &mutation).await;

    let answer = {
        let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        if slot.generation != generation {
            tracing::debug!(?key, "newer edit queued, discarding persist answer");
            return;
        }
        match result {
            Ok(answer) => {
                slot.last_error = None;
                answer
            }
            Err(err) => {
                tracing::warn!(?key, op = mutation.op_name(), error = %err, "persist failed");
                slot.last_error = Some(err.to_string());
                None
            }
        }
    };
    if let Some(doc) = answer
        && let Err(err) = lock_session(session).apply_server_document(doc)
    {
        tracing::warn!(?key, error = %err, "ignoring invalid persisted document");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/debounce.rs"]
mod tests;
