use std::collections::BTreeMap;

use crate::{
    foundation::core::{Fps, FrameIndex, FrameRange},
    foundation::error::{ReelError, ReelResult},
    jobs::kind::{JobKind, JobStatus},
    model::item::{Item, ItemList},
};

/// Stable layer identity (`_id` on the wire).
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Live editing session of a layer.
pub struct ImageSession {
    /// Items in composition order.
    #[serde(default)]
    pub active_item_list: ItemList,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Server-visible status of one job kind on a layer or session.
pub struct GenerationState {
    /// Last known status.
    pub status: JobStatus,
    /// Human-readable failure reason when `status` is `FAILED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Cached mask regions produced by a segmentation job.
pub struct Segmentation {
    /// Detected regions.
    #[serde(default)]
    pub regions: Vec<MaskRegion>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// One segmented region.
pub struct MaskRegion {
    /// Region label (e.g. `person`).
    #[serde(default)]
    pub label: String,
    /// Mask image source.
    pub mask_src: String,
    /// Detector confidence.
    #[serde(default)]
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// One timeline segment ("scene").
pub struct Layer {
    /// Stable identity.
    #[serde(rename = "_id")]
    pub id: LayerId,
    /// Length in seconds.
    pub duration: f64,
    /// Start time in seconds. Derived: the sum of all preceding durations.
    #[serde(default)]
    pub duration_offset: f64,
    /// Item list.
    #[serde(default)]
    pub image_session: ImageSession,
    /// Per-kind job state.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub generation: BTreeMap<JobKind, GenerationState>,
    /// Cached segmentation result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Segmentation>,
    /// Generated AI video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_video_url: Option<String>,
    /// Lip-synced video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lip_sync_video_url: Option<String>,
    /// Generated sound effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_effect_url: Option<String>,
    /// Leading trim in source frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_start_frame: Option<u64>,
    /// Trailing trim end in source frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_end_frame: Option<u64>,
}

impl Layer {
    /// Empty layer with a fresh id.
    pub fn new(duration: f64) -> Self {
        Self::with_id(LayerId::generate(), duration)
    }

    /// Empty layer with a caller-chosen id.
    pub fn with_id(id: LayerId, duration: f64) -> Self {
        Self {
            id,
            duration,
            duration_offset: 0.0,
            image_session: ImageSession::default(),
            generation: BTreeMap::new(),
            segmentation: None,
            ai_video_url: None,
            lip_sync_video_url: None,
            sound_effect_url: None,
            clip_start_frame: None,
            clip_end_frame: None,
        }
    }

    /// Builder-style item setter.
    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.image_session.active_item_list = ItemList::from_items(items);
        self
    }

    /// Items in composition order.
    pub fn items(&self) -> &ItemList {
        &self.image_session.active_item_list
    }

    /// Mutable item list.
    pub fn items_mut(&mut self) -> &mut ItemList {
        &mut self.image_session.active_item_list
    }

    /// Length in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration * 1000.0
    }

    /// Start in milliseconds.
    pub fn offset_ms(&self) -> f64 {
        self.duration_offset * 1000.0
    }

    /// `[start, end)` on the global frame axis.
    pub fn frame_range(&self, fps: Fps) -> FrameRange {
        let start = fps.secs_to_frames_round(self.duration_offset);
        let end = fps
            .secs_to_frames_round(self.duration_offset + self.duration.max(0.0))
            .max(start);
        FrameRange {
            start: FrameIndex(start),
            end: FrameIndex(end),
        }
    }

    /// Job state for `kind`, if any.
    pub fn generation_state(&self, kind: JobKind) -> Option<&GenerationState> {
        self.generation.get(&kind)
    }

    /// Deep copy with a new id, fresh item identities and no job state.
    pub(crate) fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = LayerId::generate();
        copy.image_session.active_item_list = self.items().fresh_copy();
        copy.generation.clear();
        copy
    }

    pub(crate) fn validate(&self) -> ReelResult<()> {
        if self.id.0.trim().is_empty() {
            return Err(ReelError::validation("layer _id must be non-empty"));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ReelError::validation(format!(
                "layer '{}' duration must be finite and >= 0",
                self.id
            )));
        }
        if let (Some(start), Some(end)) = (self.clip_start_frame, self.clip_end_frame)
            && start > end
        {
            return Err(ReelError::validation(format!(
                "layer '{}' clipStartFrame must be <= clipEndFrame",
                self.id
            )));
        }
        self.items().validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/layer.rs"]
mod tests;
