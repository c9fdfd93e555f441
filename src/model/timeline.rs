use std::collections::BTreeMap;

use crate::{
    foundation::core::{AspectRatio, Fps},
    foundation::error::{ReelError, ReelResult},
    jobs::kind::JobKind,
    model::audio::AudioLayer,
    model::layer::{GenerationState, Layer, LayerId},
};

#[derive(Clone, Debug, Default, PartialEq)]
/// The single mutable root: ordered layers plus audio overlays.
pub struct Timeline {
    /// Layers in playback order.
    pub layers: Vec<Layer>,
    /// Audio overlays in global time.
    pub audio_layers: Vec<AudioLayer>,
    /// Job state for session-scoped jobs (no owning layer).
    pub generation: BTreeMap<JobKind, GenerationState>,
}

impl Timeline {
    /// Build from layers, normalizing offsets and item numbering.
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        let mut tl = Self {
            layers,
            ..Self::default()
        };
        tl.normalize();
        tl
    }

    /// Recompute every `duration_offset` as the running sum of preceding durations.
    pub fn recompute_offsets(&mut self) {
        let mut acc = 0.0;
        for layer in &mut self.layers {
            layer.duration_offset = acc;
            acc += layer.duration.max(0.0);
        }
    }

    /// Recompute offsets and renumber every item list.
    pub fn normalize(&mut self) {
        self.recompute_offsets();
        for layer in &mut self.layers {
            layer.items_mut().renumber();
        }
    }

    /// Sum of all layer durations, seconds.
    pub fn total_duration(&self) -> f64 {
        self.layers.iter().map(|l| l.duration.max(0.0)).sum()
    }

    /// Total length on the frame axis.
    pub fn total_frames(&self, fps: Fps) -> u64 {
        self.layers
            .last()
            .map(|l| l.frame_range(fps).end.0)
            .unwrap_or(0)
    }

    /// Index of the layer with `id`.
    pub fn layer_index(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    /// Layer by id.
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// Mutable layer by id.
    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    /// Job state slot for `kind` on a layer, or on the session when `layer` is `None`.
    ///
    /// Returns `None` when the layer no longer exists.
    pub(crate) fn generation_slot_mut(
        &mut self,
        layer: Option<&LayerId>,
    ) -> Option<&mut BTreeMap<JobKind, GenerationState>> {
        match layer {
            Some(id) => self.layer_mut(id).map(|l| &mut l.generation),
            None => Some(&mut self.generation),
        }
    }

    /// Validate layer and audio invariants, including unique layer ids.
    pub fn validate(&self) -> ReelResult<()> {
        let mut seen = std::collections::HashSet::new();
        for layer in &self.layers {
            if !seen.insert(&layer.id) {
                return Err(ReelError::validation(format!(
                    "duplicate layer _id '{}'",
                    layer.id
                )));
            }
            layer.validate()?;
        }
        for audio in &self.audio_layers {
            audio.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Persisted session document, mirrored 1:1 with the server representation.
pub struct SessionDocument {
    /// Session id.
    #[serde(default)]
    pub session_id: String,
    /// Session aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Layers in playback order.
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Audio overlays.
    #[serde(default)]
    pub audio_layers: Vec<AudioLayer>,
    /// Session-scoped job state.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub generation: BTreeMap<JobKind, GenerationState>,
}

impl SessionDocument {
    /// Parse a session document from JSON.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Convert into a normalized, validated timeline.
    pub fn into_timeline(self) -> ReelResult<Timeline> {
        let mut tl = Timeline {
            layers: self.layers,
            audio_layers: self.audio_layers,
            generation: self.generation,
        };
        tl.normalize();
        tl.validate()?;
        Ok(tl)
    }

    /// Snapshot a timeline into a document.
    pub fn from_timeline(session_id: &str, aspect_ratio: AspectRatio, tl: &Timeline) -> Self {
        Self {
            session_id: session_id.to_string(),
            aspect_ratio,
            layers: tl.layers.clone(),
            audio_layers: tl.audio_layers.clone(),
            generation: tl.generation.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/timeline.rs"]
mod tests;
