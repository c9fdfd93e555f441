use crate::{
    animation::interpolate::{FilterSample, ResolvedTransform, interpolate},
    foundation::core::{Fps, FrameIndex, FrameRange},
    model::item::ItemUid,
    model::layer::{Layer, LayerId},
    model::timeline::Timeline,
};

/// `[start, end)` frame range of every layer, in order.
pub fn layer_frame_ranges(timeline: &Timeline, fps: Fps) -> Vec<FrameRange> {
    timeline.layers.iter().map(|l| l.frame_range(fps)).collect()
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Resolved state of one item at the current frame.
pub struct ItemFrameState {
    /// Stable identity.
    pub uid: ItemUid,
    /// Positional id.
    pub id: String,
    /// Transform with animations applied.
    pub transform: ResolvedTransform,
    /// Pixel filters active on this frame.
    pub filters: Vec<FilterSample>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
/// Result of moving the playhead.
pub struct SeekOutcome {
    /// Frame after clamping.
    pub frame: FrameIndex,
    /// Active layer index, `None` on an empty timeline.
    pub layer_index: Option<usize>,
    /// Whether the active layer changed.
    pub layer_switched: bool,
    /// Interpolated items of the active layer only.
    pub items: Vec<ItemFrameState>,
}

/// Interpolate every item of `layer` at global `frame`.
pub fn interpolate_layer(layer: &Layer, frame: FrameIndex, fps: Fps) -> Vec<ItemFrameState> {
    let elapsed_ms = fps.frames_to_ms(frame.0);
    layer
        .items()
        .iter()
        .map(|item| {
            let state = interpolate(item, elapsed_ms, layer.duration_ms(), layer.offset_ms());
            ItemFrameState {
                uid: item.uid,
                id: item.id.clone(),
                transform: state.patch.apply(item),
                filters: state.filters,
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
/// Frame-accurate playhead bound to one active layer.
///
/// The active layer is cached as an index and only moves one neighbour at a time, so advancing the
/// frame by one visits every layer in order with no skips at boundaries.
pub struct Playhead {
    current_frame: FrameIndex,
    current_layer_index: usize,
    seeking: bool,
    fps: Fps,
}

impl Default for Playhead {
    fn default() -> Self {
        Self::new(Fps::default())
    }
}

impl Playhead {
    /// Playhead at frame 0 on the first layer.
    pub fn new(fps: Fps) -> Self {
        Self {
            current_frame: FrameIndex(0),
            current_layer_index: 0,
            seeking: false,
            fps,
        }
    }

    /// Current global frame.
    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame
    }

    /// Cached active layer index. Only meaningful when the timeline is non-empty.
    pub fn current_layer_index(&self) -> usize {
        self.current_layer_index
    }

    /// Whether the user is actively dragging the playhead.
    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Frame rate this playhead counts in.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Enter drag mode; server reconciliation leaves the frame alone until [`Self::end_seek`].
    pub fn begin_seek(&mut self) {
        self.seeking = true;
    }

    /// Leave drag mode.
    pub fn end_seek(&mut self) {
        self.seeking = false;
    }

    /// Move to `frame`, switching layers as needed, and interpolate the active layer.
    #[tracing::instrument(level = "debug", skip(self, timeline), fields(frame = frame.0))]
    pub fn set_frame(&mut self, frame: FrameIndex, timeline: &Timeline) -> SeekOutcome {
        let total = timeline.total_frames(self.fps);
        self.current_frame = FrameIndex(frame.0.min(total));

        if timeline.layers.is_empty() {
            self.current_layer_index = 0;
            return SeekOutcome {
                frame: self.current_frame,
                layer_index: None,
                layer_switched: false,
                items: Vec::new(),
            };
        }

        let before = self.current_layer_index;
        let last = timeline.layers.len() - 1;
        let mut idx = before.min(last);
        let ranges = layer_frame_ranges(timeline, self.fps);
        while idx < last && self.current_frame >= ranges[idx].end {
            idx += 1;
        }
        while idx > 0 && self.current_frame < ranges[idx].start {
            idx -= 1;
        }
        self.current_layer_index = idx;

        let switched = idx != before;
        if switched {
            tracing::debug!(from = before, to = idx, "active layer switched");
        }
        SeekOutcome {
            frame: self.current_frame,
            layer_index: Some(idx),
            layer_switched: switched,
            items: interpolate_layer(&timeline.layers[idx], self.current_frame, self.fps),
        }
    }

    /// Advance one frame (playback tick).
    pub fn tick(&mut self, timeline: &Timeline) -> SeekOutcome {
        self.step(1, timeline)
    }

    /// Move by a signed number of frames, saturating at 0.
    pub fn step(&mut self, delta: i64, timeline: &Timeline) -> SeekOutcome {
        let target = self.current_frame.0.saturating_add_signed(delta);
        self.set_frame(FrameIndex(target), timeline)
    }

    /// Jump to the start frame of layer `index`. Out-of-range indices are a no-op.
    pub fn select_layer(&mut self, index: usize, timeline: &Timeline) -> Option<SeekOutcome> {
        let layer = timeline.layers.get(index)?;
        let start = layer.frame_range(self.fps).start;
        self.current_layer_index = index;
        Some(self.set_frame(start, timeline))
    }

    /// Re-resolve the active layer after the layer list was replaced.
    ///
    /// `active` is the layer that was selected before the replacement. When it still exists the
    /// playhead follows it by id. While not seeking, a frame that no longer falls inside the active
    /// layer snaps to that layer's start; while seeking the frame is only clamped to the new total.
    pub fn reconcile(&mut self, timeline: &Timeline, active: Option<&LayerId>) -> SeekOutcome {
        let last = timeline.layers.len().saturating_sub(1);
        let idx = active
            .and_then(|id| timeline.layer_index(id))
            .unwrap_or(self.current_layer_index.min(last));
        self.current_layer_index = idx;

        if self.seeking {
            let frame = self.current_frame;
            return self.set_frame(frame, timeline);
        }

        let frame = match timeline.layers.get(idx) {
            Some(layer) => {
                let range = layer.frame_range(self.fps);
                if range.contains(self.current_frame) {
                    self.current_frame
                } else {
                    range.start
                }
            }
            None => FrameIndex(0),
        };
        self.set_frame(frame, timeline)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playhead/seek.rs"]
mod tests;
