use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    config::EditorConfig,
    foundation::core::FrameIndex,
    foundation::error::ReelResult,
    jobs::book::{JobBook, JobError},
    jobs::kind::{JobKind, JobScope, JobStatus, MergeContext, MergeOutcome},
    jobs::transport::JobKey,
    model::item::{ItemList, ItemUid},
    model::layer::{GenerationState, Layer, LayerId},
    model::timeline::{SessionDocument, Timeline},
    playhead::seek::{Playhead, SeekOutcome},
};

/// Editor state shared between the UI thread and background tasks.
pub type SharedSession = Arc<Mutex<EditorSession>>;

/// Lock a shared session, recovering the state if a previous holder panicked.
///
/// Guards must never be held across an `.await`.
pub fn lock_session(session: &Mutex<EditorSession>) -> MutexGuard<'_, EditorSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Current layer / current item, held as identities rather than copies.
pub struct Selection {
    /// Selected layer.
    pub layer_id: Option<LayerId>,
    /// Selected item inside the selected layer.
    pub item_uid: Option<ItemUid>,
}

/// Synchronous editor state: the timeline root, selection, playhead and job flags.
#[derive(Debug)]
pub struct EditorSession {
    pub(crate) config: EditorConfig,
    pub(crate) timeline: Timeline,
    pub(crate) selection: Selection,
    pub(crate) playhead: Playhead,
    pub(crate) jobs: JobBook,
}

impl EditorSession {
    /// New session over `timeline`, selecting the first layer.
    pub fn new(config: EditorConfig, mut timeline: Timeline) -> Self {
        timeline.normalize();
        let playhead = Playhead::new(config.fps());
        let mut session = Self {
            config,
            timeline,
            selection: Selection::default(),
            playhead,
            jobs: JobBook::default(),
        };
        session.resolve_selection(0);
        session
    }

    /// New session from a persisted document.
    pub fn from_document(config: EditorConfig, doc: SessionDocument) -> ReelResult<Self> {
        Ok(Self::new(config, doc.into_timeline()?))
    }

    /// Wrap into a [`SharedSession`].
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Editor configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The timeline root.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Playhead state.
    pub fn playhead(&self) -> &Playhead {
        &self.playhead
    }

    /// Index of the selected layer.
    pub fn current_layer_index(&self) -> Option<usize> {
        let id = self.selection.layer_id.as_ref()?;
        self.timeline.layer_index(id)
    }

    /// The selected layer.
    pub fn current_layer(&self) -> Option<&Layer> {
        let id = self.selection.layer_id.as_ref()?;
        self.timeline.layer(id)
    }

    /// Items of the selected layer.
    pub fn active_item_list(&self) -> Option<&ItemList> {
        self.current_layer().map(Layer::items)
    }

    /// Current playhead frame.
    pub fn current_frame(&self) -> FrameIndex {
        self.playhead.current_frame()
    }

    /// Select a layer by id and jump the playhead to its start. Unknown ids are a no-op.
    pub fn select_layer(&mut self, id: &LayerId) -> Option<SeekOutcome> {
        let idx = self.timeline.layer_index(id)?;
        let out = self.playhead.select_layer(idx, &self.timeline)?;
        self.follow_playhead(&out);
        Some(out)
    }

    /// Select an item of the current layer. Returns `false` when it is not there.
    pub fn select_item(&mut self, uid: Option<ItemUid>) -> bool {
        match uid {
            None => {
                self.selection.item_uid = None;
                true
            }
            Some(uid) => {
                let present = self
                    .active_item_list()
                    .is_some_and(|items| items.find(uid).is_some());
                if present {
                    self.selection.item_uid = Some(uid);
                }
                present
            }
        }
    }

    /// Move the playhead; the selection follows a layer switch.
    pub fn seek(&mut self, frame: FrameIndex) -> SeekOutcome {
        let out = self.playhead.set_frame(frame, &self.timeline);
        self.follow_playhead(&out);
        out
    }

    /// Advance one frame.
    pub fn tick(&mut self) -> SeekOutcome {
        let out = self.playhead.tick(&self.timeline);
        self.follow_playhead(&out);
        out
    }

    /// Start a playhead drag.
    pub fn begin_seek(&mut self) {
        self.playhead.begin_seek();
    }

    /// End a playhead drag.
    pub fn end_seek(&mut self) {
        self.playhead.end_seek();
    }

    fn follow_playhead(&mut self, out: &SeekOutcome) {
        let Some(idx) = out.layer_index else {
            self.selection = Selection::default();
            return;
        };
        let id = &self.timeline.layers[idx].id;
        if self.selection.layer_id.as_ref() != Some(id) {
            self.selection = Selection {
                layer_id: Some(id.clone()),
                item_uid: None,
            };
        }
    }

    /// Keep the selection valid after the layer list changed.
    ///
    /// A surviving layer stays selected by id; otherwise the layer now at `fallback_index`
    /// (clamped) is selected. An item selection that no longer resolves is cleared.
    pub(crate) fn resolve_selection(&mut self, fallback_index: usize) {
        let keep = self
            .selection
            .layer_id
            .as_ref()
            .is_some_and(|id| self.timeline.layer_index(id).is_some());
        if !keep {
            self.selection.layer_id = self
                .timeline
                .layers
                .get(fallback_index.min(self.timeline.layers.len().saturating_sub(1)))
                .map(|l| l.id.clone());
            self.selection.item_uid = None;
        }
        if let Some(uid) = self.selection.item_uid
            && self.active_item_list().is_none_or(|items| items.find(uid).is_none())
        {
            self.selection.item_uid = None;
        }
    }

    /// Recompute derived state after a local structural change.
    ///
    /// A frame kept while seeking may now fall in another layer; the selection follows it.
    pub(crate) fn resync(&mut self, fallback_index: usize) -> SeekOutcome {
        self.timeline.normalize();
        self.resolve_selection(fallback_index);
        let out = self
            .playhead
            .reconcile(&self.timeline, self.selection.layer_id.as_ref());
        self.follow_playhead(&out);
        out
    }

    /// Replace layers and audio layers with the server's authoritative document.
    ///
    /// Offsets are recomputed, the selection is re-resolved by id and the playhead reconciled
    /// (left in place while seeking).
    #[tracing::instrument(level = "debug", skip(self, doc), fields(layers = doc.layers.len()))]
    pub fn apply_server_document(&mut self, doc: SessionDocument) -> ReelResult<SeekOutcome> {
        let fallback = self.current_layer_index().unwrap_or(0);
        self.timeline = doc.into_timeline()?;
        Ok(self.resync(fallback))
    }

    /// Replace one layer by id with a server copy. Unknown ids are a stale no-op.
    pub fn replace_layer(&mut self, layer: Layer) -> ReelResult<bool> {
        layer.validate()?;
        let Some(idx) = self.timeline.layer_index(&layer.id) else {
            tracing::debug!(layer = %layer.id, "replacement for unknown layer ignored");
            return Ok(false);
        };
        self.timeline.layers[idx] = layer;
        let fallback = self.current_layer_index().unwrap_or(0);
        self.resync(fallback);
        Ok(true)
    }

    /// Snapshot as a persisted document.
    pub fn document(&self) -> SessionDocument {
        SessionDocument::from_timeline(
            &self.config.session_id,
            self.config.aspect_ratio,
            &self.timeline,
        )
    }

    /// Job key for `kind`; session-scoped kinds ignore `layer`.
    pub fn job_key(&self, kind: JobKind, layer: Option<LayerId>) -> JobKey {
        let layer_id = match kind.descriptor().scope {
            JobScope::Layer => layer,
            JobScope::Session => None,
        };
        JobKey {
            session_id: self.config.session_id.clone(),
            kind,
            layer_id,
        }
    }

    /// Whether a job is pending for `kind` on `layer`.
    pub fn is_pending(&self, kind: JobKind, layer: Option<&LayerId>) -> bool {
        self.jobs.is_pending(&self.job_key(kind, layer.cloned()))
    }

    /// Number of jobs still waiting for a terminal poll.
    pub fn pending_job_count(&self) -> usize {
        self.jobs.pending_count()
    }

    /// Last error for `kind` on `layer`.
    pub fn job_error(&self, kind: JobKind, layer: Option<&LayerId>) -> Option<&JobError> {
        self.jobs.error(&self.job_key(kind, layer.cloned()))
    }

    /// Dismiss the error notification for `kind` on `layer`.
    pub fn dismiss_job_error(
        &mut self,
        kind: JobKind,
        layer: Option<&LayerId>,
    ) -> Option<JobError> {
        let key = self.job_key(kind, layer.cloned());
        self.jobs.dismiss_error(&key)
    }

    pub(crate) fn merge_context(&self) -> MergeContext {
        MergeContext {
            media_base_url: self.config.media_base_url.clone(),
            canvas: self.config.working_canvas(),
        }
    }

    fn set_generation(&mut self, key: &JobKey, status: JobStatus, error: Option<String>) {
        if let Some(slot) = self.timeline.generation_slot_mut(key.layer_id.as_ref()) {
            slot.insert(key.kind, GenerationState { status, error });
        }
    }

    /// Apply a `COMPLETED` result. `None` when the response is stale.
    pub(crate) fn complete_job(
        &mut self,
        key: &JobKey,
        token: u64,
        result: &serde_json::Value,
    ) -> Option<MergeOutcome> {
        if !self.jobs.is_current(key, token) {
            return None;
        }
        let ctx = self.merge_context();
        let merge = key.kind.descriptor().merge;
        let outcome = merge(&mut self.timeline, key.layer_id.as_ref(), result, &ctx);
        match outcome {
            MergeOutcome::Applied => {
                self.jobs.finish(key, token);
                self.set_generation(key, JobStatus::Completed, None);
            }
            MergeOutcome::StaleTarget => {
                tracing::debug!(job = %key, "owning layer gone, result dropped");
                self.jobs.finish(key, token);
            }
            MergeOutcome::MissingField(field) => {
                let message = format!("{} completed without '{field}'", key.kind);
                tracing::warn!(job = %key, %message, "malformed job result");
                self.set_generation(key, JobStatus::Failed, Some(message.clone()));
                self.jobs.fail(
                    key,
                    token,
                    JobError {
                        message,
                        retryable: false,
                    },
                );
            }
        }
        Some(outcome)
    }

    /// Apply a server `FAILED`. Returns `false` when the response is stale.
    pub(crate) fn fail_job(&mut self, key: &JobKey, token: u64, message: String) -> bool {
        if !self.jobs.is_current(key, token) {
            return false;
        }
        self.set_generation(key, JobStatus::Failed, Some(message.clone()));
        self.jobs.fail(
            key,
            token,
            JobError {
                message,
                retryable: false,
            },
        )
    }

    /// Record a transport failure. The layer's job state is left untouched.
    pub(crate) fn transport_failure(&mut self, key: &JobKey, token: u64, message: String) -> bool {
        self.jobs.fail(
            key,
            token,
            JobError {
                message,
                retryable: true,
            },
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/session.rs"]
mod tests;
