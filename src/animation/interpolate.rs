use crate::{
    foundation::core::{Affine, TIMELINE_FPS},
    foundation::math::lerp,
    model::animation::{Animation, AnimationKind},
    model::item::{Item, local_affine},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Partial transform produced by an item's animations.
///
/// Only properties touched by at least one animation are `Some`.
pub struct TransformPatch {
    /// Horizontal scale factor.
    pub scale_x: Option<f64>,
    /// Vertical scale factor.
    pub scale_y: Option<f64>,
    /// Left edge.
    pub x: Option<f64>,
    /// Top edge.
    pub y: Option<f64>,
    /// Rotation about the box center, degrees.
    pub rotation: Option<f64>,
    /// Opacity in `[0, 1]`.
    pub opacity: Option<f64>,
}

impl TransformPatch {
    /// Whether no property was touched.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this patch over the item's static geometry.
    pub fn apply(&self, item: &Item) -> ResolvedTransform {
        let base = ResolvedTransform::from_item(item);
        ResolvedTransform {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            rotation: self.rotation.unwrap_or(base.rotation),
            scale_x: self.scale_x.unwrap_or(base.scale_x),
            scale_y: self.scale_y.unwrap_or(base.scale_y),
            opacity: self.opacity.unwrap_or(base.opacity),
            ..base
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Fully resolved per-frame transform of one item.
pub struct ResolvedTransform {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// Rotation about the box center, degrees.
    pub rotation: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

impl ResolvedTransform {
    /// Static transform of an item with no animation applied.
    pub fn from_item(item: &Item) -> Self {
        let g = &item.geometry;
        Self {
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
            rotation: g.rotation.unwrap_or(0.0),
            scale_x: g.scale_x.unwrap_or(1.0),
            scale_y: g.scale_y.unwrap_or(1.0),
            opacity: 1.0,
        }
    }

    /// Local-to-canvas transform: translate, rotate about the box center, then scale.
    pub fn to_affine(&self) -> Affine {
        local_affine(
            self.x,
            self.y,
            self.width,
            self.height,
            self.rotation,
            self.scale_x,
            self.scale_y,
        )
    }

    /// Opacity clamped to `[0, 1]`.
    pub fn clamped_opacity(&self) -> f32 {
        self.opacity.clamp(0.0, 1.0) as f32
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
/// A pixel-filter animation sampled at one instant.
pub struct FilterSample {
    /// Filter name.
    pub name: String,
    /// Filter parameters, passed through untouched.
    pub params: serde_json::Value,
    /// Raw window progress. Not clamped: may be negative before the window and above 1 after it.
    pub progress: f64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
/// Interpolator output for one item at one instant.
pub struct InterpolatedState {
    /// Transform properties set by parametric animations.
    pub patch: TransformPatch,
    /// Pixel filters to run on the item's raster, in list order.
    pub filters: Vec<FilterSample>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Absolute `[start_ms, end_ms)` window of one animation on the global timeline.
pub struct AnimationWindow {
    /// Inclusive start.
    pub start_ms: f64,
    /// Exclusive end.
    pub end_ms: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Where an instant falls relative to an [`AnimationWindow`].
pub enum WindowProgress {
    /// Before the window starts.
    Before,
    /// Inside the window, with linear progress in `[0, 1)`.
    Inside(f64),
    /// At or after the window end, or the window is empty.
    After,
}

impl WindowProgress {
    /// Clamped linear progress.
    pub fn clamped(self) -> f64 {
        match self {
            Self::Before => 0.0,
            Self::Inside(t) => t,
            Self::After => 1.0,
        }
    }
}

impl AnimationWindow {
    /// Resolve an animation's frame window against its layer.
    pub fn resolve(anim: &Animation, layer_duration_ms: f64, layer_start_ms: f64) -> Self {
        let frame_ms = 1000.0 / f64::from(TIMELINE_FPS);
        let layer_end_ms = layer_start_ms + layer_duration_ms.max(0.0);
        let start_ms = match anim.frame_offset {
            Some(off) => layer_start_ms + off as f64 * frame_ms,
            None => layer_start_ms,
        };
        let end_ms = match anim.frame_duration {
            Some(dur) => start_ms + dur as f64 * frame_ms,
            None => layer_end_ms.max(start_ms),
        };
        Self { start_ms, end_ms }
    }

    /// Length in milliseconds.
    pub fn len_ms(&self) -> f64 {
        (self.end_ms - self.start_ms).max(0.0)
    }

    /// Classify `elapsed_ms` against this window. Empty windows are always [`WindowProgress::After`].
    pub fn progress(&self, elapsed_ms: f64) -> WindowProgress {
        let len = self.len_ms();
        if len <= 0.0 || elapsed_ms >= self.end_ms {
            WindowProgress::After
        } else if elapsed_ms < self.start_ms {
            WindowProgress::Before
        } else {
            WindowProgress::Inside((elapsed_ms - self.start_ms) / len)
        }
    }

    /// Unclamped progress used by pixel filters. Empty windows report `1.0`.
    pub fn raw_progress(&self, elapsed_ms: f64) -> f64 {
        let len = self.len_ms();
        if len <= 0.0 {
            return 1.0;
        }
        (elapsed_ms - self.start_ms) / len
    }
}

/// Compute the animated state of `item` at `global_elapsed_ms`.
///
/// Parametric animations clamp outside their window: before the start they hold the `t = 0`
/// value, at or after the end the `t = 1` value. Custom filter animations are always emitted with
/// their raw progress. When several animations set the same property the last one in list order
/// wins.
pub fn interpolate(
    item: &Item,
    global_elapsed_ms: f64,
    layer_duration_ms: f64,
    layer_start_offset_ms: f64,
) -> InterpolatedState {
    let mut out = InterpolatedState::default();
    for anim in &item.animations {
        let window = AnimationWindow::resolve(anim, layer_duration_ms, layer_start_offset_ms);
        if let AnimationKind::Custom(effect) = &anim.effect {
            out.filters.push(FilterSample {
                name: effect.name.clone(),
                params: effect.params.clone(),
                progress: window.raw_progress(global_elapsed_ms),
            });
            continue;
        }

        let t = anim.ease.apply(window.progress(global_elapsed_ms).clamped());
        apply_parametric(&mut out.patch, &anim.effect, t);
    }
    out
}

fn apply_parametric(patch: &mut TransformPatch, effect: &AnimationKind, t: f64) {
    match effect {
        AnimationKind::Zoom(p) => {
            let scale = lerp(p.start_scale, p.end_scale, t) / 100.0;
            patch.scale_x = Some(scale);
            patch.scale_y = Some(scale);
        }
        AnimationKind::Slide(p) => {
            patch.x = Some(lerp(p.start_x, p.end_x, t));
            if let (Some(sy), Some(ey)) = (p.start_y, p.end_y) {
                patch.y = Some(lerp(sy, ey, t));
            }
        }
        AnimationKind::Rotate(p) => {
            let angle = match p.rotation_speed {
                Some(speed) => t * speed * 360.0,
                None => lerp(p.start_angle, p.end_angle, t),
            };
            patch.rotation = Some(angle);
        }
        AnimationKind::Fade(p) => {
            patch.opacity = Some(lerp(p.start_fade, p.end_fade, t) / 100.0);
        }
        AnimationKind::Orbit(p) => {
            let angle = lerp(p.start_angle, p.end_angle, t).to_radians();
            patch.x = Some(p.center_x + p.radius * angle.cos());
            patch.y = Some(p.center_y + p.radius * angle.sin());
        }
        AnimationKind::Custom(_) => {}
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/interpolate.rs"]
mod tests;
