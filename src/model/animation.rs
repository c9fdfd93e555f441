use crate::{
    animation::ease::Ease,
    foundation::error::{ReelError, ReelResult},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A time-bounded effect applied to one item.
pub struct Animation {
    /// `animation_<n>`, densely renumbered within the owning item.
    #[serde(default)]
    pub id: String,
    /// Effect kind and its parameters, inlined as `type` / `params`.
    #[serde(flatten)]
    pub effect: AnimationKind,
    /// Window start in frames, relative to the owning layer's start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_offset: Option<u64>,
    /// Window length in frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_duration: Option<u64>,
    /// Easing applied to window progress for parametric kinds.
    #[serde(default)]
    pub ease: Ease,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "camelCase")]
/// Animation effect kinds.
pub enum AnimationKind {
    /// Uniform scale, in percent.
    Zoom(ZoomParams),
    /// Translation along x (and optionally y).
    Slide(SlideParams),
    /// Rotation in degrees, either between two angles or at a continuous speed.
    Rotate(RotateParams),
    /// Opacity, in percent.
    Fade(FadeParams),
    /// Movement along a circle.
    Orbit(OrbitParams),
    /// Pixel-level filter (glitch, bloom, ...) applied to the item's cached raster.
    Custom(CustomEffect),
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Zoom parameters.
pub struct ZoomParams {
    /// Scale at window start, percent.
    pub start_scale: f64,
    /// Scale at window end, percent.
    pub end_scale: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Slide parameters.
pub struct SlideParams {
    /// X at window start.
    pub start_x: f64,
    /// X at window end.
    pub end_x: f64,
    /// Y at window start; y is left untouched when either bound is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<f64>,
    /// Y at window end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Rotate parameters.
pub struct RotateParams {
    /// Angle at window start, degrees.
    #[serde(default)]
    pub start_angle: f64,
    /// Angle at window end, degrees.
    #[serde(default)]
    pub end_angle: f64,
    /// Full turns over the window. Takes precedence over the angle pair when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_speed: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Fade parameters.
pub struct FadeParams {
    /// Opacity at window start, percent.
    pub start_fade: f64,
    /// Opacity at window end, percent.
    pub end_fade: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Orbit parameters.
pub struct OrbitParams {
    /// Circle center x.
    pub center_x: f64,
    /// Circle center y.
    pub center_y: f64,
    /// Circle radius.
    pub radius: f64,
    /// Angle at window start, degrees.
    #[serde(default)]
    pub start_angle: f64,
    /// Angle at window end, degrees.
    #[serde(default = "full_turn_degrees")]
    pub end_angle: f64,
}

fn full_turn_degrees() -> f64 {
    360.0
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Named pixel filter with free-form parameters.
pub struct CustomEffect {
    /// Filter name, e.g. `glitch` or `bloom`.
    pub name: String,
    /// Filter parameter object.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Animation {
    /// Build an animation spanning its owning layer. The id is assigned on insertion.
    pub fn spanning(effect: AnimationKind) -> Self {
        Self {
            id: String::new(),
            effect,
            frame_offset: None,
            frame_duration: None,
            ease: Ease::Linear,
        }
    }

    /// Build an animation over an explicit frame window.
    pub fn windowed(effect: AnimationKind, frame_offset: u64, frame_duration: u64) -> Self {
        Self {
            frame_offset: Some(frame_offset),
            frame_duration: Some(frame_duration),
            ..Self::spanning(effect)
        }
    }

    /// Whether this animation is a pixel filter rather than a transform.
    pub fn is_filter(&self) -> bool {
        matches!(self.effect, AnimationKind::Custom(_))
    }

    /// Validate parameter invariants.
    pub fn validate(&self) -> ReelResult<()> {
        fn finite(name: &str, v: f64) -> ReelResult<()> {
            if !v.is_finite() {
                return Err(ReelError::animation(format!("{name} must be finite")));
            }
            Ok(())
        }

        match &self.effect {
            AnimationKind::Zoom(p) => {
                finite("zoom startScale", p.start_scale)?;
                finite("zoom endScale", p.end_scale)?;
            }
            AnimationKind::Slide(p) => {
                finite("slide startX", p.start_x)?;
                finite("slide endX", p.end_x)?;
                for v in [p.start_y, p.end_y].into_iter().flatten() {
                    finite("slide y", v)?;
                }
            }
            AnimationKind::Rotate(p) => {
                finite("rotate startAngle", p.start_angle)?;
                finite("rotate endAngle", p.end_angle)?;
                if let Some(speed) = p.rotation_speed {
                    finite("rotate rotationSpeed", speed)?;
                }
            }
            AnimationKind::Fade(p) => {
                finite("fade startFade", p.start_fade)?;
                finite("fade endFade", p.end_fade)?;
            }
            AnimationKind::Orbit(p) => {
                finite("orbit centerX", p.center_x)?;
                finite("orbit centerY", p.center_y)?;
                finite("orbit startAngle", p.start_angle)?;
                finite("orbit endAngle", p.end_angle)?;
                if !p.radius.is_finite() || p.radius < 0.0 {
                    return Err(ReelError::animation(
                        "orbit radius must be finite and >= 0",
                    ));
                }
            }
            AnimationKind::Custom(c) => {
                if c.name.trim().is_empty() {
                    return Err(ReelError::animation("custom effect name must be non-empty"));
                }
                if !(c.params.is_null() || c.params.is_object()) {
                    return Err(ReelError::animation(
                        "custom effect params must be an object when set",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Reassign `animation_0..animation_{n-1}` in list order.
pub(crate) fn renumber_animations(animations: &mut [Animation]) {
    for (i, anim) in animations.iter_mut().enumerate() {
        anim.id = format!("animation_{i}");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/animation.rs"]
mod tests;
