use std::{collections::BTreeMap, path::Path, time::Duration};

use anyhow::Context;

use crate::{
    foundation::core::{AspectRatio, Canvas, Fps},
    foundation::error::{ReelError, ReelResult},
    jobs::kind::JobKind,
};

/// UI color scheme carried through to generated thumbnails and previews.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorMode {
    /// Light UI chrome.
    #[default]
    Light,
    /// Dark UI chrome.
    Dark,
}

/// Explicit editor configuration.
///
/// Everything the engine would otherwise look up from surrounding UI state (active session, aspect
/// ratio, zoom, color mode) is passed in through this struct at construction time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Identifier of the session document being edited.
    pub session_id: String,
    /// Session aspect ratio; selects the working canvas.
    pub aspect_ratio: AspectRatio,
    /// Timeline frame rate numerator (frames per second).
    pub fps: u32,
    /// Duration in seconds for newly inserted layers.
    pub default_layer_duration: f64,
    /// Base URL that relative generated media names are resolved against.
    pub media_base_url: String,
    /// Per-kind poll interval overrides in milliseconds.
    pub poll_interval_overrides_ms: BTreeMap<JobKind, u64>,
    /// Quiet window before high-frequency item edits are persisted.
    pub debounce_ms: u64,
    /// Canvas zoom factor of the hosting view.
    pub zoom: f64,
    /// UI color scheme.
    pub color_mode: ColorMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            session_id: "local".to_string(),
            aspect_ratio: AspectRatio::Square,
            fps: crate::foundation::core::TIMELINE_FPS,
            default_layer_duration: 2.0,
            media_base_url: String::new(),
            poll_interval_overrides_ms: BTreeMap::new(),
            debounce_ms: 5,
            zoom: 1.0,
            color_mode: ColorMode::Light,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> ReelResult<()> {
        if self.session_id.trim().is_empty() {
            return Err(ReelError::validation("sessionId must be non-empty"));
        }
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be > 0"));
        }
        if !self.default_layer_duration.is_finite() || self.default_layer_duration <= 0.0 {
            return Err(ReelError::validation(
                "defaultLayerDuration must be finite and > 0",
            ));
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(ReelError::validation("zoom must be finite and > 0"));
        }
        for (kind, ms) in &self.poll_interval_overrides_ms {
            if *ms == 0 {
                return Err(ReelError::validation(format!(
                    "poll interval override for {kind} must be > 0"
                )));
            }
        }
        Ok(())
    }

    /// Timeline frame rate.
    pub fn fps(&self) -> Fps {
        Fps {
            num: self.fps.max(1),
            den: 1,
        }
    }

    /// Working canvas derived from the aspect ratio.
    pub fn working_canvas(&self) -> Canvas {
        self.aspect_ratio.working_canvas()
    }

    /// Poll interval for `kind`, honoring overrides.
    pub fn poll_interval(&self, kind: JobKind) -> Duration {
        match self.poll_interval_overrides_ms.get(&kind) {
            Some(ms) => Duration::from_millis(*ms),
            None => kind.descriptor().interval,
        }
    }

    /// Debounce window for persisted item edits.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
