//! scenereel is the timeline and composition engine behind a layered scene editor.
//!
//! A session is an ordered list of layers, each a timed segment holding positioned items. The
//! engine covers:
//!
//! - the [`Timeline`] model with derived layer offsets and stable item identities
//! - the animation [`interpolate`] function and pixel filters
//! - the frame-accurate [`Playhead`]
//! - a generic submit/poll/merge [`JobOrchestrator`] for server-side generation jobs
//! - raster compositing: [`flatten_layer`], [`extract_mask`], [`extract_shape_clip`] and the
//!   non-destructive [`EraseSession`]
//! - the [`EditorSession`] mutation layer and the async [`Editor`] facade
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod compositor;
pub(crate) mod config;
pub(crate) mod jobs;
pub(crate) mod model;
pub(crate) mod playhead;
pub(crate) mod timeline;

pub use crate::foundation::core::{
    Affine, AspectRatio, Canvas, Fps, FrameIndex, FrameRange, Point, Rect, TIMELINE_FPS, Vec2,
};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::config::{ColorMode, EditorConfig};

pub use crate::model::animation::{
    Animation, AnimationKind, CustomEffect, FadeParams, OrbitParams, RotateParams, SlideParams,
    ZoomParams,
};
pub use crate::model::audio::{AudioKind, AudioLayer};
pub use crate::model::item::{
    Geometry, Item, ItemKind, ItemList, ItemUid, ShapeKind, StyleConfig,
};
pub use crate::model::layer::{
    GenerationState, ImageSession, Layer, LayerId, MaskRegion, Segmentation,
};
pub use crate::model::timeline::{SessionDocument, Timeline};

pub use crate::animation::ease::Ease;
pub use crate::animation::filters::{BloomParams, GlitchParams, apply_filter};
pub use crate::animation::interpolate::{
    AnimationWindow, FilterSample, InterpolatedState, ResolvedTransform, TransformPatch,
    WindowProgress, interpolate,
};

pub use crate::playhead::seek::{
    ItemFrameState, Playhead, SeekOutcome, interpolate_layer, layer_frame_ranges,
};

pub use crate::jobs::book::JobError;
pub use crate::jobs::kind::{
    JobDescriptor, JobKind, JobScope, JobStatus, MergeContext, MergeFn, MergeOutcome,
};
pub use crate::jobs::orchestrator::JobOrchestrator;
pub use crate::jobs::task::ScheduledTask;
pub use crate::jobs::transport::{
    JobKey, JobTransport, PollOutcome, PollResponse, SubmitAck, SubmitRequest,
};

pub use crate::compositor::assets::{
    AssetResolver, FsAssetResolver, MemoryAssetResolver, decode_data_uri, is_remote,
};
pub use crate::compositor::blur::blur_premul;
pub use crate::compositor::clip::{clip_circle_in_place, copy_shape_region, extract_shape_clip};
pub use crate::compositor::erase::{BrushMode, BrushStroke, EraseSession};
pub use crate::compositor::flatten::{
    flatten_items, flatten_layer, flatten_layer_at, flatten_with_states,
};
pub use crate::compositor::mask::{
    MaskConvention, extract_mask, is_binary_mask, region_mask, segmentation_mask,
};
pub use crate::compositor::raster::{PremulRgba8, Raster};
pub use crate::compositor::scene::{SceneRasterizer, Stroke, SvgSceneRasterizer};

pub use crate::timeline::debounce::Debouncer;
pub use crate::timeline::editor::Editor;
pub use crate::timeline::mutate::{CoalesceKey, DurationEdit, InsertPosition, Mutation};
pub use crate::timeline::preload::{MediaFetcher, Preloader, adjacent_layers, remote_sources};
pub use crate::timeline::session::{EditorSession, Selection, SharedSession, lock_session};
pub use crate::timeline::store::{SessionStore, persist_and_reconcile};
