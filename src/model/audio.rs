use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Audio overlay categories.
pub enum AudioKind {
    /// Background music.
    Music,
    /// Sound effect.
    Sound,
    /// Narration / speech.
    Speech,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Independent audio track placed in global timeline seconds (not layer-relative).
pub struct AudioLayer {
    /// Stable identity.
    #[serde(rename = "_id")]
    pub id: String,
    /// Category.
    pub kind: AudioKind,
    /// Audio source.
    pub src: String,
    /// Start in global seconds.
    pub start_time: f64,
    /// End in global seconds.
    pub end_time: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Gain multiplier.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Disabled tracks are kept but muted.
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_volume() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl AudioLayer {
    /// New enabled track at unit volume.
    pub fn new(kind: AudioKind, src: impl Into<String>, start_time: f64, duration: f64) -> Self {
        let duration = duration.max(0.0);
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            kind,
            src: src.into(),
            start_time,
            end_time: start_time + duration,
            duration,
            volume: default_volume(),
            is_enabled: true,
        }
    }

    /// Whether this track contributes sound at global time `secs`.
    pub fn is_audible_at(&self, secs: f64) -> bool {
        self.is_enabled && self.volume > 0.0 && self.start_time <= secs && secs < self.end_time
    }

    pub(crate) fn validate(&self) -> ReelResult<()> {
        if self.src.trim().is_empty() {
            return Err(ReelError::validation(format!(
                "audio layer '{}' src must be non-empty",
                self.id
            )));
        }
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(ReelError::validation(format!(
                "audio layer '{}' startTime must be finite and >= 0",
                self.id
            )));
        }
        if !self.end_time.is_finite() || self.end_time < self.start_time {
            return Err(ReelError::validation(format!(
                "audio layer '{}' endTime must be >= startTime",
                self.id
            )));
        }
        if !self.volume.is_finite() || !(0.0..=2.0).contains(&self.volume) {
            return Err(ReelError::validation(format!(
                "audio layer '{}' volume must be within [0, 2]",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/audio.rs"]
mod tests;
