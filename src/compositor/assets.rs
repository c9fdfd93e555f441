use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::{
    compositor::raster::Raster,
    foundation::error::{ReelError, ReelResult},
};

/// Source of decoded image pixels for image items.
pub trait AssetResolver: Send + Sync {
    /// Decode the image behind `src` into a premultiplied raster.
    fn load(&self, src: &str) -> ReelResult<Arc<Raster>>;
}

/// Whether `src` points at a remote resource that must be prefetched.
pub fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> ReelResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ReelError::validation("data uri must start with 'data:'"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ReelError::validation("data uri has no ',' separator"))?;
    if !meta.ends_with(";base64") {
        return Err(ReelError::validation(
            "only base64-encoded data uris are supported",
        ));
    }
    let bytes = BASE64
        .decode(payload.trim())
        .context("decode data uri payload")?;
    Ok(bytes)
}

/// Normalize a relative asset path: forward slashes, no `.`/`..`, never absolute.
pub(crate) fn normalize_rel_path(source: &str) -> ReelResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }
    if out.is_empty() {
        return Err(ReelError::validation("asset path must contain a file name"));
    }
    Ok(out.join("/"))
}

#[derive(Clone, Debug)]
/// Resolves `data:` URIs and paths relative to a project root.
///
/// Remote URLs are rejected; wrap this in a [`MemoryAssetResolver`] to serve prefetched media.
pub struct FsAssetResolver {
    root: PathBuf,
}

impl FsAssetResolver {
    /// Resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for FsAssetResolver {
    fn load(&self, src: &str) -> ReelResult<Arc<Raster>> {
        if src.starts_with("data:") {
            return Ok(Arc::new(Raster::decode(&decode_data_uri(src)?)?));
        }
        if is_remote(src) {
            return Err(ReelError::validation(format!(
                "remote asset '{src}' has not been prefetched"
            )));
        }
        let rel = normalize_rel_path(src)?;
        let path = self.root.join(&rel);
        let bytes = std::fs::read(&path).with_context(|| format!("read asset {}", path.display()))?;
        Ok(Arc::new(Raster::decode(&bytes)?))
    }
}

/// In-memory cache of decoded media keyed by source string.
///
/// Filled by the preloader with remote media; misses fall through to an optional inner resolver.
#[derive(Default)]
pub struct MemoryAssetResolver {
    entries: RwLock<HashMap<String, Arc<Raster>>>,
    fallback: Option<Box<dyn AssetResolver>>,
}

impl std::fmt::Debug for MemoryAssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAssetResolver")
            .field("entries", &self.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl MemoryAssetResolver {
    /// Empty cache without a fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache falling back to `inner` on misses.
    pub fn with_fallback(inner: impl AssetResolver + 'static) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            fallback: Some(Box::new(inner)),
        }
    }

    /// Store decoded media for `src`.
    pub fn insert(&self, src: impl Into<String>, raster: Raster) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(src.into(), Arc::new(raster));
    }

    /// Whether `src` is cached.
    pub fn contains(&self, src: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(src)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetResolver for MemoryAssetResolver {
    fn load(&self, src: &str) -> ReelResult<Arc<Raster>> {
        let hit = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(src)
            .cloned();
        if let Some(raster) = hit {
            return Ok(raster);
        }
        if src.starts_with("data:") {
            return Ok(Arc::new(Raster::decode(&decode_data_uri(src)?)?));
        }
        match &self.fallback {
            Some(inner) => inner.load(src),
            None => Err(ReelError::validation(format!("asset '{src}' is not loaded"))),
        }
    }
}

impl<R: AssetResolver + ?Sized> AssetResolver for Arc<R> {
    fn load(&self, src: &str) -> ReelResult<Arc<Raster>> {
        (**self).load(src)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/assets.rs"]
mod tests;
