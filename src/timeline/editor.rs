use std::sync::Arc;

use crate::{
    compositor::assets::MemoryAssetResolver,
    compositor::clip::copy_shape_region,
    compositor::erase::EraseSession,
    compositor::flatten::{flatten_items, flatten_layer, flatten_layer_at},
    compositor::mask::{MaskConvention, extract_mask},
    compositor::raster::Raster,
    compositor::scene::{SceneRasterizer, Stroke},
    foundation::core::FrameIndex,
    foundation::error::{ReelError, ReelResult},
    jobs::kind::JobKind,
    jobs::orchestrator::JobOrchestrator,
    jobs::transport::{JobKey, JobTransport},
    model::animation::Animation,
    model::item::{Geometry, Item, ItemList, ItemUid},
    model::layer::{Layer, LayerId},
    playhead::seek::SeekOutcome,
    timeline::debounce::Debouncer,
    timeline::mutate::{DurationEdit, InsertPosition, Mutation},
    timeline::preload::{MediaFetcher, Preloader, adjacent_layers, remote_sources},
    timeline::session::{EditorSession, SharedSession, lock_session},
    timeline::store::{SessionStore, persist_and_reconcile},
};

/// Async editor facade over a shared [`EditorSession`].
///
/// Edits apply to local state first. Structural layer edits persist immediately; item edits and
/// duration drags go through the [`Debouncer`]. Seeking schedules preloading of adjacent layers.
pub struct Editor<T: JobTransport, S: SessionStore, F: MediaFetcher> {
    session: SharedSession,
    store: Arc<S>,
    debouncer: Debouncer<S>,
    jobs: JobOrchestrator<T>,
    preloader: Preloader<F>,
    rasterizer: Arc<dyn SceneRasterizer>,
}

impl<T: JobTransport, S: SessionStore, F: MediaFetcher> Editor<T, S, F> {
    /// Wire an editor. `assets` is the cache the preloader fills; `rasterizer` should read from it.
    pub fn new(
        session: EditorSession,
        transport: Arc<T>,
        store: Arc<S>,
        fetcher: Arc<F>,
        assets: Arc<MemoryAssetResolver>,
        rasterizer: Arc<dyn SceneRasterizer>,
    ) -> Self {
        let window = session.config().debounce();
        let session = session.into_shared();
        Self {
            debouncer: Debouncer::new(store.clone(), session.clone(), window),
            jobs: JobOrchestrator::new(transport, session.clone()),
            preloader: Preloader::new(fetcher, assets),
            session,
            store,
            rasterizer,
        }
    }

    /// Shared editor state.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Job orchestrator.
    pub fn jobs(&self) -> &JobOrchestrator<T> {
        &self.jobs
    }

    /// Edit debouncer.
    pub fn debouncer(&self) -> &Debouncer<S> {
        &self.debouncer
    }

    /// Media preloader.
    pub fn preloader(&self) -> &Preloader<F> {
        &self.preloader
    }

    /// Run `f` against the locked session.
    pub fn read<R>(&self, f: impl FnOnce(&EditorSession) -> R) -> R {
        f(&lock_session(&self.session))
    }

    async fn commit(&self, mutation: Option<Mutation>) -> ReelResult<bool> {
        let Some(mutation) = mutation else {
            return Ok(false);
        };
        match mutation.coalesce_key() {
            Some(key) => self.debouncer.push(key, mutation),
            None => persist_and_reconcile(self.store.as_ref(), &self.session, &mutation).await?,
        }
        Ok(true)
    }

    fn preload_around(&self) {
        let queued: Vec<(LayerId, Vec<String>)> = {
            let s = lock_session(&self.session);
            let Some(idx) = s.current_layer_index() else {
                return;
            };
            adjacent_layers(s.timeline(), idx)
                .into_iter()
                .map(|l| (l.id.clone(), remote_sources(l)))
                .collect()
        };
        self.preloader.schedule(queued);
    }

    /// Move the playhead and preload media around the active layer.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn seek(&self, frame: FrameIndex) -> SeekOutcome {
        let out = lock_session(&self.session).seek(frame);
        self.preload_around();
        out
    }

    /// Advance playback by one frame.
    pub fn tick(&self) -> SeekOutcome {
        let out = lock_session(&self.session).tick();
        if out.layer_switched {
            self.preload_around();
        }
        out
    }

    /// Select a layer by id.
    pub fn select_layer(&self, id: &LayerId) -> Option<SeekOutcome> {
        let out = lock_session(&self.session).select_layer(id);
        if out.is_some() {
            self.preload_around();
        }
        out
    }

    /// See [`EditorSession::reorder`].
    pub async fn reorder(&self, order: &[LayerId]) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).reorder(order)?;
        self.commit(mutation).await
    }

    /// See [`EditorSession::insert_layer`].
    pub async fn insert_layer(&self, position: InsertPosition) -> ReelResult<LayerId> {
        let mutation = lock_session(&self.session).insert_layer(position);
        let id = match &mutation {
            Mutation::InsertLayer { layer, .. } => layer.id.clone(),
            _ => return Err(ReelError::evaluation("insert produced an unexpected mutation")),
        };
        self.commit(Some(mutation)).await?;
        Ok(id)
    }

    /// See [`EditorSession::duplicate_layer`].
    pub async fn duplicate_layer(&self, id: &LayerId) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).duplicate_layer(id);
        self.commit(mutation).await
    }

    /// See [`EditorSession::set_layer_duration`]. Debounced.
    pub async fn set_layer_duration(
        &self,
        id: &LayerId,
        secs: f64,
        edit: DurationEdit,
    ) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).set_layer_duration(id, secs, edit)?;
        self.commit(mutation).await
    }

    /// See [`EditorSession::remove_layer`]. Poll loops of the layer's jobs stop.
    pub async fn remove_layer(&self, id: &LayerId) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).remove_layer(id);
        self.commit(mutation).await
    }

    /// See [`EditorSession::add_item`]. Debounced.
    pub async fn add_item(&self, layer_id: &LayerId, item: Item) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).add_item(layer_id, item)?;
        self.commit(mutation).await
    }

    /// See [`EditorSession::remove_item`]. Debounced.
    pub async fn remove_item(&self, layer_id: &LayerId, uid: ItemUid) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).remove_item(layer_id, uid);
        self.commit(mutation).await
    }

    /// See [`EditorSession::move_item`]. Debounced.
    pub async fn move_item(
        &self,
        layer_id: &LayerId,
        uid: ItemUid,
        index: usize,
    ) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).move_item(layer_id, uid, index);
        self.commit(mutation).await
    }

    /// See [`EditorSession::update_item_geometry`]. Debounced; meant for drag events.
    pub async fn update_item_geometry(
        &self,
        layer_id: &LayerId,
        uid: ItemUid,
        geometry: Geometry,
    ) -> ReelResult<bool> {
        let mutation =
            lock_session(&self.session).update_item_geometry(layer_id, uid, geometry)?;
        self.commit(mutation).await
    }

    /// See [`EditorSession::toggle_item_hidden`]. Debounced.
    pub async fn toggle_item_hidden(
        &self,
        layer_id: &LayerId,
        uid: ItemUid,
    ) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).toggle_item_hidden(layer_id, uid);
        self.commit(mutation).await
    }

    /// See [`EditorSession::add_animation`]. Debounced.
    pub async fn add_animation(
        &self,
        layer_id: &LayerId,
        uid: ItemUid,
        animation: Animation,
    ) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).add_animation(layer_id, uid, animation)?;
        self.commit(mutation).await
    }

    /// See [`EditorSession::remove_animation`]. Debounced.
    pub async fn remove_animation(
        &self,
        layer_id: &LayerId,
        uid: ItemUid,
        animation_id: &str,
    ) -> ReelResult<bool> {
        let mutation = lock_session(&self.session).remove_animation(layer_id, uid, animation_id);
        self.commit(mutation).await
    }

    fn layer_snapshot(&self, id: &LayerId) -> ReelResult<Layer> {
        lock_session(&self.session)
            .timeline()
            .layer(id)
            .cloned()
            .ok_or_else(|| ReelError::validation(format!("layer '{id}' does not exist")))
    }

    /// Flatten a layer's static items off the async runtime.
    pub async fn flatten(&self, id: &LayerId) -> ReelResult<Raster> {
        let layer = self.layer_snapshot(id)?;
        let canvas = lock_session(&self.session).config().working_canvas();
        let rasterizer = self.rasterizer.clone();
        run_blocking(move || flatten_layer(&layer, canvas, rasterizer.as_ref())).await
    }

    /// Flatten the active layer as it appears at the current frame.
    pub async fn flatten_current_frame(&self) -> ReelResult<Raster> {
        let (layer, frame, fps, canvas) = {
            let s = lock_session(&self.session);
            let layer = s
                .current_layer()
                .cloned()
                .ok_or_else(|| ReelError::validation("timeline has no layers"))?;
            (layer, s.current_frame(), s.config().fps(), s.config().working_canvas())
        };
        let rasterizer = self.rasterizer.clone();
        run_blocking(move || flatten_layer_at(&layer, frame, fps, canvas, rasterizer.as_ref()))
            .await
    }

    /// Inpaint mask for a layer in the given convention.
    pub async fn extract_mask(
        &self,
        id: &LayerId,
        strokes: Vec<Stroke>,
        convention: MaskConvention,
    ) -> ReelResult<Raster> {
        let base = self.flatten(id).await?;
        let rasterizer = self.rasterizer.clone();
        run_blocking(move || extract_mask(&base, &strokes, convention, rasterizer.as_ref())).await
    }

    /// Submit a generation job, flattening the layer first when the kind needs an artifact.
    ///
    /// Artifact kinds on a layer with no visible item fail with a validation error and no
    /// network call.
    pub async fn submit_job(
        &self,
        kind: JobKind,
        layer_id: Option<LayerId>,
        payload: serde_json::Value,
    ) -> ReelResult<JobKey> {
        if !kind.descriptor().requires_artifact {
            return self.jobs.submit(kind, layer_id, payload, None).await;
        }
        let Some(id) = layer_id.as_ref() else {
            return Err(ReelError::validation(format!("{kind} requires a layer")));
        };
        let layer = self.layer_snapshot(id)?;
        if layer.items().visible().next().is_none() {
            return Err(ReelError::validation(format!(
                "{kind} needs a flattenable image but layer '{id}' has no visible items"
            )));
        }
        let artifact = self.flatten(id).await?;
        self.jobs.submit(kind, layer_id, payload, Some(&artifact)).await
    }

    /// Stop polling a job.
    pub fn cancel_job(&self, kind: JobKind, layer: Option<&LayerId>) -> bool {
        self.jobs.cancel(kind, layer)
    }

    /// Start an erase/paint session on an item.
    pub fn begin_erase(&self, layer_id: &LayerId, target: ItemUid) -> Option<EraseSession> {
        EraseSession::begin(&lock_session(&self.session), layer_id, target)
    }

    /// Merge an erase session into its target and persist the new item list.
    pub async fn commit_erase(&self, erase: EraseSession) -> ReelResult<bool> {
        let mutation = erase.commit(&mut lock_session(&self.session), self.rasterizer.as_ref())?;
        self.commit(mutation).await
    }

    /// Copy the flattened pixels under a shape into a new image item on top of the layer.
    ///
    /// The shape itself is left out of the copied pixels.
    pub async fn copy_shape_region(
        &self,
        layer_id: &LayerId,
        shape: ItemUid,
    ) -> ReelResult<bool> {
        let layer = self.layer_snapshot(layer_id)?;
        let Some(shape_item) = layer.items().find(shape).cloned() else {
            return Ok(false);
        };
        let origin = (shape_item.geometry.x.floor(), shape_item.geometry.y.floor());
        let canvas = lock_session(&self.session).config().working_canvas();
        let rasterizer = self.rasterizer.clone();
        let region = run_blocking(move || {
            let others: Vec<Item> = layer
                .items()
                .iter()
                .filter(|i| i.uid != shape)
                .cloned()
                .collect();
            let base = flatten_items(&ItemList::from_items(others), canvas, rasterizer.as_ref())?;
            copy_shape_region(&base, &shape_item, rasterizer.as_ref())
        })
        .await?;

        let geometry = Geometry::new(
            origin.0,
            origin.1,
            f64::from(region.width),
            f64::from(region.height),
        );
        let item = Item::image(region.to_data_uri()?, geometry);
        self.add_item(layer_id, item).await
    }

    /// Stop background work and persist anything still debounced.
    pub async fn shutdown(&self) {
        let pending = lock_session(&self.session).pending_job_count();
        if pending > 0 {
            tracing::info!(pending, "abandoning pending jobs on shutdown");
        }
        self.jobs.cancel_all();
        self.preloader.cancel();
        self.debouncer.flush().await;
        self.debouncer.settle().await;
    }
}

async fn run_blocking<R, Op>(op: Op) -> ReelResult<R>
where
    R: Send + 'static,
    Op: FnOnce() -> ReelResult<R> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ReelError::Other(anyhow::anyhow!("raster task failed: {e}")))?
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/editor.rs"]
mod tests;
