use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    compositor::assets::{MemoryAssetResolver, is_remote},
    compositor::raster::Raster,
    foundation::error::ReelResult,
    jobs::task::ScheduledTask,
    model::layer::{Layer, LayerId},
    model::timeline::Timeline,
};

/// Downloads remote media (the CDN collaborator).
pub trait MediaFetcher: Send + Sync + 'static {
    /// Fetch the raw bytes behind `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = ReelResult<Vec<u8>>> + Send;
}

#[derive(Debug, Default)]
struct PreloadState {
    done: HashSet<LayerId>,
    in_flight: HashSet<LayerId>,
}

/// Remote image sources of one layer, in item order, without duplicates.
pub fn remote_sources(layer: &Layer) -> Vec<String> {
    let mut seen = HashSet::new();
    layer
        .items()
        .iter()
        .filter_map(|item| item.src())
        .filter(|src| is_remote(src) && seen.insert(*src))
        .map(str::to_owned)
        .collect()
}

/// Layers next to `index` (previous, then next).
pub fn adjacent_layers(timeline: &Timeline, index: usize) -> Vec<&Layer> {
    let mut out = Vec::with_capacity(2);
    if let Some(prev) = index.checked_sub(1).and_then(|i| timeline.layers.get(i)) {
        out.push(prev);
    }
    if let Some(next) = timeline.layers.get(index + 1) {
        out.push(next);
    }
    out
}

/// Low-priority background media preloader.
///
/// Work is keyed by layer id: a layer that preloaded successfully is never fetched again, and a
/// layer already in flight is not queued twice. The task yields to the runtime between items.
pub struct Preloader<F: MediaFetcher> {
    fetcher: Arc<F>,
    cache: Arc<MemoryAssetResolver>,
    state: Arc<Mutex<PreloadState>>,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl<F: MediaFetcher> Preloader<F> {
    /// Preloader filling `cache` through `fetcher`.
    pub fn new(fetcher: Arc<F>, cache: Arc<MemoryAssetResolver>) -> Self {
        Self {
            fetcher,
            cache,
            state: Arc::new(Mutex::new(PreloadState::default())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Whether `layer` finished preloading.
    pub fn is_done(&self, layer: &LayerId) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .done
            .contains(layer)
    }

    /// Queue layers for preloading. Returns how many were newly scheduled.
    pub fn schedule(&self, layers: Vec<(LayerId, Vec<String>)>) -> usize {
        let mut queued = Vec::new();
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            for (id, srcs) in layers {
                if state.done.contains(&id) || !state.in_flight.insert(id.clone()) {
                    continue;
                }
                queued.push((id, srcs));
            }
        }
        if queued.is_empty() {
            return 0;
        }
        let count = queued.len();
        tracing::debug!(layers = count, "preload scheduled");
        let task = ScheduledTask::spawn(preload_layers(
            self.fetcher.clone(),
            self.cache.clone(),
            self.state.clone(),
            queued,
        ));
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
        count
    }

    /// Stop all preloading. Interrupted layers may be scheduled again.
    pub fn cancel(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.cancel();
        }
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .clear();
    }

    /// Wait for every scheduled preload to finish.
    pub async fn wait_idle(&self) {
        let tasks: Vec<ScheduledTask> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.drain(..).collect()
        };
        for task in tasks {
            task.join().await;
        }
    }
}

impl<F: MediaFetcher> Drop for Preloader<F> {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.cancel();
        }
    }
}

async fn preload_layers<F: MediaFetcher>(
    fetcher: Arc<F>,
    cache: Arc<MemoryAssetResolver>,
    state: Arc<Mutex<PreloadState>>,
    layers: Vec<(LayerId, Vec<String>)>,
) {
    for (id, srcs) in layers {
        let mut ok = true;
        for src in srcs {
            tokio::task::yield_now().await;
            if cache.contains(&src) {
                continue;
            }
            match fetch_one(fetcher.as_ref(), &src).await {
                Ok(raster) => cache.insert(src, raster),
                Err(err) => {
                    tracing::warn!(layer = %id, %src, error = %err, "preload failed");
                    ok = false;
                }
            }
        }
        {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight.remove(&id);
            if ok {
                state.done.insert(id);
            }
        }
    }
}

async fn fetch_one<F: MediaFetcher>(fetcher: &F, src: &str) -> ReelResult<Raster> {
    let bytes = fetcher.fetch(src).await?;
    Raster::decode(&bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/preload.rs"]
mod tests;
