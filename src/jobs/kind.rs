use std::time::Duration;

use crate::{
    foundation::core::Canvas,
    model::audio::{AudioKind, AudioLayer},
    model::item::{Geometry, Item},
    model::layer::{LayerId, Segmentation},
    model::timeline::Timeline,
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
/// The generation job kinds the orchestrator drives.
pub enum JobKind {
    /// Text-to-image generation into a layer.
    ImageGeneration,
    /// Extend a flattened layer beyond its borders.
    Outpaint,
    /// Background/object segmentation of a flattened layer.
    Segmentation,
    /// Background music for the session.
    Audio,
    /// Image-to-video for a layer.
    AiVideo,
    /// Lip-synced video for a layer.
    LipSync,
    /// Sound effect attached to a layer.
    SoundEffect,
    /// Multi-speaker narration for the session.
    LayeredSpeech,
}

impl JobKind {
    /// Every kind, in declaration order.
    pub const ALL: [JobKind; 8] = [
        JobKind::ImageGeneration,
        JobKind::Outpaint,
        JobKind::Segmentation,
        JobKind::Audio,
        JobKind::AiVideo,
        JobKind::LipSync,
        JobKind::SoundEffect,
        JobKind::LayeredSpeech,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        self.descriptor().endpoint
    }

    /// Static descriptor for this kind.
    pub fn descriptor(self) -> &'static JobDescriptor {
        &DESCRIPTORS[self as usize]
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Server-visible job status.
pub enum JobStatus {
    /// Submitted, not yet terminal.
    Pending,
    /// Finished successfully; the result has been merged.
    Completed,
    /// Finished with a server-reported failure.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// What a job is attached to.
pub enum JobScope {
    /// Requires an owning layer.
    Layer,
    /// Belongs to the session; results land in the audio overlay list.
    Session,
}

#[derive(Clone, Debug, PartialEq)]
/// Ambient inputs a merge strategy needs besides the result payload.
pub struct MergeContext {
    /// Base URL relative media names are joined onto.
    pub media_base_url: String,
    /// Working canvas new image items are sized to.
    pub canvas: Canvas,
}

impl MergeContext {
    /// Resolve a media name against the base URL. Absolute URLs and data URIs pass through.
    pub fn media_url(&self, name: &str) -> String {
        let absolute = ["http://", "https://", "data:"]
            .iter()
            .any(|p| name.starts_with(p));
        if absolute || self.media_base_url.is_empty() {
            return name.to_string();
        }
        format!(
            "{}/{}",
            self.media_base_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Result of applying a completed job to the timeline.
pub enum MergeOutcome {
    /// The timeline changed.
    Applied,
    /// The owning layer no longer exists; nothing changed.
    StaleTarget,
    /// The result payload lacked the expected field; nothing changed.
    MissingField(&'static str),
}

/// Merge strategy: apply a completed result into the current timeline.
pub type MergeFn =
    fn(&mut Timeline, Option<&LayerId>, &serde_json::Value, &MergeContext) -> MergeOutcome;

/// Per-kind parameters of the generic job state machine.
pub struct JobDescriptor {
    /// Kind described.
    pub kind: JobKind,
    /// Endpoint name passed to the transport.
    pub endpoint: &'static str,
    /// Default delay between polls.
    pub interval: Duration,
    /// Layer or session scope.
    pub scope: JobScope,
    /// Whether submit needs a flattened raster of the layer.
    pub requires_artifact: bool,
    /// Result merge strategy.
    pub merge: MergeFn,
}

impl std::fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("interval", &self.interval)
            .field("scope", &self.scope)
            .field("requires_artifact", &self.requires_artifact)
            .finish_non_exhaustive()
    }
}

const VISUAL_POLL: Duration = Duration::from_secs(1);
const AUDIO_POLL: Duration = Duration::from_secs(2);
const VIDEO_POLL: Duration = Duration::from_secs(5);

static DESCRIPTORS: [JobDescriptor; 8] = [
    JobDescriptor {
        kind: JobKind::ImageGeneration,
        endpoint: "imageGeneration",
        interval: VISUAL_POLL,
        scope: JobScope::Layer,
        requires_artifact: false,
        merge: merge_generated_image,
    },
    JobDescriptor {
        kind: JobKind::Outpaint,
        endpoint: "outpaint",
        interval: VISUAL_POLL,
        scope: JobScope::Layer,
        requires_artifact: true,
        merge: merge_generated_image,
    },
    JobDescriptor {
        kind: JobKind::Segmentation,
        endpoint: "segmentation",
        interval: VISUAL_POLL,
        scope: JobScope::Layer,
        requires_artifact: true,
        merge: merge_segmentation,
    },
    JobDescriptor {
        kind: JobKind::Audio,
        endpoint: "audio",
        interval: AUDIO_POLL,
        scope: JobScope::Session,
        requires_artifact: false,
        merge: merge_music,
    },
    JobDescriptor {
        kind: JobKind::AiVideo,
        endpoint: "aiVideo",
        interval: VIDEO_POLL,
        scope: JobScope::Layer,
        requires_artifact: true,
        merge: merge_ai_video,
    },
    JobDescriptor {
        kind: JobKind::LipSync,
        endpoint: "lipSync",
        interval: VIDEO_POLL,
        scope: JobScope::Layer,
        requires_artifact: false,
        merge: merge_lip_sync,
    },
    JobDescriptor {
        kind: JobKind::SoundEffect,
        endpoint: "soundEffect",
        interval: AUDIO_POLL,
        scope: JobScope::Layer,
        requires_artifact: false,
        merge: merge_sound_effect,
    },
    JobDescriptor {
        kind: JobKind::LayeredSpeech,
        endpoint: "layeredSpeech",
        interval: AUDIO_POLL,
        scope: JobScope::Session,
        requires_artifact: false,
        merge: merge_layered_speech,
    },
];

fn str_field<'a>(result: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    result
        .get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn f64_field(result: &serde_json::Value, key: &str) -> Option<f64> {
    result
        .get(key)
        .and_then(serde_json::Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn merge_generated_image(
    tl: &mut Timeline,
    layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
) -> MergeOutcome {
    let Some(name) = str_field(result, "activeGeneratedImage") else {
        return MergeOutcome::MissingField("activeGeneratedImage");
    };
    let Some(layer) = layer.and_then(|id| tl.layer_mut(id)) else {
        return MergeOutcome::StaleTarget;
    };
    let item = Item::image(ctx.media_url(name), Geometry::covering(ctx.canvas));
    layer.items_mut().push(item);
    MergeOutcome::Applied
}

fn merge_segmentation(
    tl: &mut Timeline,
    layer: Option<&LayerId>,
    result: &serde_json::Value,
    _ctx: &MergeContext,
) -> MergeOutcome {
    let Some(raw) = result.get("segmentation") else {
        return MergeOutcome::MissingField("segmentation");
    };
    let Ok(segmentation) = serde_json::from_value::<Segmentation>(raw.clone()) else {
        return MergeOutcome::MissingField("segmentation");
    };
    let Some(layer) = layer.and_then(|id| tl.layer_mut(id)) else {
        return MergeOutcome::StaleTarget;
    };
    layer.segmentation = Some(segmentation);
    MergeOutcome::Applied
}

fn merge_video_url(
    tl: &mut Timeline,
    layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
    lip_sync: bool,
) -> MergeOutcome {
    let Some(url) = str_field(result, "videoUrl") else {
        return MergeOutcome::MissingField("videoUrl");
    };
    let Some(layer) = layer.and_then(|id| tl.layer_mut(id)) else {
        return MergeOutcome::StaleTarget;
    };
    let url = Some(ctx.media_url(url));
    if lip_sync {
        layer.lip_sync_video_url = url;
    } else {
        layer.ai_video_url = url;
    }
    MergeOutcome::Applied
}

fn merge_ai_video(
    tl: &mut Timeline,
    layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
) -> MergeOutcome {
    merge_video_url(tl, layer, result, ctx, false)
}

fn merge_lip_sync(
    tl: &mut Timeline,
    layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
) -> MergeOutcome {
    merge_video_url(tl, layer, result, ctx, true)
}

fn merge_sound_effect(
    tl: &mut Timeline,
    layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
) -> MergeOutcome {
    let Some(url) = str_field(result, "audioUrl") else {
        return MergeOutcome::MissingField("audioUrl");
    };
    let url = ctx.media_url(url);
    let Some(layer) = layer.and_then(|id| tl.layer_mut(id)) else {
        return MergeOutcome::StaleTarget;
    };
    layer.sound_effect_url = Some(url.clone());
    let start = layer.duration_offset;
    let duration = f64_field(result, "duration").unwrap_or(layer.duration);
    tl.audio_layers
        .push(AudioLayer::new(AudioKind::Sound, url, start, duration));
    MergeOutcome::Applied
}

fn merge_music(
    tl: &mut Timeline,
    _layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
) -> MergeOutcome {
    let Some(url) = str_field(result, "audioUrl") else {
        return MergeOutcome::MissingField("audioUrl");
    };
    let start = f64_field(result, "startTime").unwrap_or(0.0);
    let duration = f64_field(result, "duration").unwrap_or_else(|| tl.total_duration() - start);
    tl.audio_layers.push(AudioLayer::new(
        AudioKind::Music,
        ctx.media_url(url),
        start,
        duration,
    ));
    MergeOutcome::Applied
}

fn merge_layered_speech(
    tl: &mut Timeline,
    _layer: Option<&LayerId>,
    result: &serde_json::Value,
    ctx: &MergeContext,
) -> MergeOutcome {
    let Some(segments) = result.get("segments").and_then(serde_json::Value::as_array) else {
        return MergeOutcome::MissingField("segments");
    };
    let tracks: Vec<AudioLayer> = segments
        .iter()
        .filter_map(|seg| {
            let url = str_field(seg, "audioUrl")?;
            let start = f64_field(seg, "startTime").unwrap_or(0.0);
            let duration = f64_field(seg, "duration").unwrap_or(0.0);
            Some(AudioLayer::new(
                AudioKind::Speech,
                ctx.media_url(url),
                start,
                duration,
            ))
        })
        .collect();
    if tracks.is_empty() {
        return MergeOutcome::MissingField("segments");
    }
    tl.audio_layers.extend(tracks);
    MergeOutcome::Applied
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/kind.rs"]
mod tests;
