use std::collections::HashSet;

use crate::{
    foundation::error::{ReelError, ReelResult},
    jobs::kind::JobKind,
    model::animation::Animation,
    model::item::{Geometry, Item, ItemList, ItemUid},
    model::layer::{Layer, LayerId},
    timeline::session::EditorSession,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Where [`EditorSession::insert_layer`] puts the new layer.
pub enum InsertPosition {
    /// Directly after the selected layer (at the end when nothing is selected).
    #[default]
    BelowCurrent,
    /// After the last layer.
    AtEnd,
    /// Before the first layer.
    AtBeginning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
/// How a duration change treats the layer's source media.
pub enum DurationEdit {
    /// Retime the whole source to the new length.
    Stretch,
    /// Play only `[clip_start_frame, clip_end_frame)` of the source.
    #[serde(rename_all = "camelCase")]
    Trim {
        /// First source frame kept.
        clip_start_frame: u64,
        /// End of the kept source range.
        clip_end_frame: u64,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
/// Persistence payload describing one applied edit.
pub enum Mutation {
    /// New layer order.
    Reorder {
        /// Every layer id, in the new order.
        order: Vec<LayerId>,
    },
    /// A fresh layer was inserted.
    #[serde(rename_all = "camelCase")]
    InsertLayer {
        /// Position in the new list.
        index: usize,
        /// The inserted layer.
        layer: Layer,
    },
    /// A layer was deep-copied directly below its source.
    #[serde(rename_all = "camelCase")]
    DuplicateLayer {
        /// Copied layer.
        source_id: LayerId,
        /// The copy.
        layer: Layer,
    },
    /// A layer's length changed.
    #[serde(rename_all = "camelCase")]
    SetDuration {
        /// Edited layer.
        layer_id: LayerId,
        /// New length in seconds.
        duration: f64,
        /// Trim or stretch.
        edit: DurationEdit,
    },
    /// A layer was removed.
    #[serde(rename_all = "camelCase")]
    RemoveLayer {
        /// Removed layer.
        layer_id: LayerId,
    },
    /// A layer's item list changed.
    #[serde(rename_all = "camelCase")]
    UpdateItems {
        /// Edited layer.
        layer_id: LayerId,
        /// The full list after the edit.
        items: ItemList,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Identity under which consecutive edits replace each other before persisting.
pub enum CoalesceKey {
    /// Item list of one layer.
    Items(LayerId),
    /// Duration of one layer.
    Duration(LayerId),
}

impl Mutation {
    /// Key for debounced persistence. `None` for structural edits that persist immediately.
    pub fn coalesce_key(&self) -> Option<CoalesceKey> {
        match self {
            Self::UpdateItems { layer_id, .. } => Some(CoalesceKey::Items(layer_id.clone())),
            Self::SetDuration { layer_id, .. } => Some(CoalesceKey::Duration(layer_id.clone())),
            Self::Reorder { .. }
            | Self::InsertLayer { .. }
            | Self::DuplicateLayer { .. }
            | Self::RemoveLayer { .. } => None,
        }
    }

    /// Short operation name for logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::Reorder { .. } => "reorder",
            Self::InsertLayer { .. } => "insertLayer",
            Self::DuplicateLayer { .. } => "duplicateLayer",
            Self::SetDuration { .. } => "setDuration",
            Self::RemoveLayer { .. } => "removeLayer",
            Self::UpdateItems { .. } => "updateItems",
        }
    }
}

impl EditorSession {
    /// Reorder layers. `order` must be a permutation of the current ids.
    ///
    /// The selected layer stays selected by id. Returns `Ok(None)` when the order is unchanged.
    #[tracing::instrument(level = "debug", skip(self, order), fields(layers = order.len()))]
    pub fn reorder(&mut self, order: &[LayerId]) -> ReelResult<Option<Mutation>> {
        let current: Vec<&LayerId> = self.timeline.layers.iter().map(|l| &l.id).collect();
        let unique: HashSet<&LayerId> = order.iter().collect();
        if order.len() != current.len()
            || unique.len() != order.len()
            || !order.iter().all(|id| self.timeline.layer_index(id).is_some())
        {
            return Err(ReelError::validation(
                "reorder must list every layer id exactly once",
            ));
        }
        if current.iter().copied().eq(order.iter()) {
            return Ok(None);
        }

        let mut pool = std::mem::take(&mut self.timeline.layers);
        for id in order {
            if let Some(pos) = pool.iter().position(|l| &l.id == id) {
                self.timeline.layers.push(pool.swap_remove(pos));
            }
        }

        let fallback = self.current_layer_index().unwrap_or(0);
        self.resync(fallback);
        Ok(Some(Mutation::Reorder {
            order: order.to_vec(),
        }))
    }

    /// Insert an empty layer of the configured default duration and select it.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn insert_layer(&mut self, position: InsertPosition) -> Mutation {
        let len = self.timeline.layers.len();
        let index = match position {
            InsertPosition::BelowCurrent => self.current_layer_index().map_or(len, |i| i + 1),
            InsertPosition::AtEnd => len,
            InsertPosition::AtBeginning => 0,
        };
        let layer = Layer::new(self.config.default_layer_duration);
        let id = layer.id.clone();
        self.timeline.layers.insert(index, layer);
        self.resync(index);
        self.select_layer(&id);
        Mutation::InsertLayer {
            index,
            layer: self.timeline.layers[index].clone(),
        }
    }

    /// Deep-copy a layer directly below itself with a new id and fresh item identities.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Option<Mutation> {
        let idx = self.timeline.layer_index(id)?;
        let copy = self.timeline.layers[idx].duplicate();
        self.timeline.layers.insert(idx + 1, copy);
        let fallback = self.current_layer_index().unwrap_or(0);
        self.resync(fallback);
        Some(Mutation::DuplicateLayer {
            source_id: id.clone(),
            layer: self.timeline.layers[idx + 1].clone(),
        })
    }

    /// Change a layer's length. Every later offset shifts.
    ///
    /// A trim range must be non-empty and end within the layer's current length in frames.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_layer_duration(
        &mut self,
        id: &LayerId,
        secs: f64,
        edit: DurationEdit,
    ) -> ReelResult<Option<Mutation>> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ReelError::validation("layer duration must be finite and > 0"));
        }
        if let DurationEdit::Trim {
            clip_start_frame,
            clip_end_frame,
        } = edit
            && clip_start_frame >= clip_end_frame
        {
            return Err(ReelError::validation(
                "trim clipStartFrame must be < clipEndFrame",
            ));
        }
        let fps = self.config.fps();
        let Some(layer) = self.timeline.layer_mut(id) else {
            return Ok(None);
        };
        if let DurationEdit::Trim { clip_end_frame, .. } = edit {
            let available = layer.frame_range(fps).len_frames();
            if clip_end_frame > available {
                return Err(ReelError::validation(format!(
                    "trim clipEndFrame {clip_end_frame} is past the end of layer '{id}' ({available} frames)"
                )));
            }
        }
        layer.duration = secs;
        if let DurationEdit::Trim {
            clip_start_frame,
            clip_end_frame,
        } = edit
        {
            layer.clip_start_frame = Some(clip_start_frame);
            layer.clip_end_frame = Some(clip_end_frame);
        }
        let fallback = self.current_layer_index().unwrap_or(0);
        self.resync(fallback);
        Ok(Some(Mutation::SetDuration {
            layer_id: id.clone(),
            duration: secs,
            edit,
        }))
    }

    /// Remove a layer. A removed selection moves to the preceding layer (or the first one).
    ///
    /// Pending jobs owned by the layer are dropped so their poll loops stop.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove_layer(&mut self, id: &LayerId) -> Option<Mutation> {
        let idx = self.timeline.layer_index(id)?;
        self.timeline.layers.remove(idx);
        for kind in JobKind::ALL {
            let key = self.job_key(kind, Some(id.clone()));
            if key.layer_id.is_some() {
                self.jobs.cancel(&key);
            }
        }
        let fallback = match self.current_layer_index() {
            Some(i) => i,
            None => idx.saturating_sub(1),
        };
        self.resync(fallback);
        Some(Mutation::RemoveLayer {
            layer_id: id.clone(),
        })
    }

    fn edit_items<T>(
        &mut self,
        layer_id: &LayerId,
        edit: impl FnOnce(&mut ItemList) -> Option<T>,
    ) -> Option<Mutation> {
        let layer = self.timeline.layer_mut(layer_id)?;
        edit(layer.items_mut())?;
        let items = layer.items().clone();
        self.resolve_selection(self.current_layer_index().unwrap_or(0));
        Some(Mutation::UpdateItems {
            layer_id: layer_id.clone(),
            items,
        })
    }

    /// Append an item on top of a layer.
    pub fn add_item(&mut self, layer_id: &LayerId, item: Item) -> ReelResult<Option<Mutation>> {
        item.validate()?;
        Ok(self.edit_items(layer_id, |items| Some(items.push(item))))
    }

    /// Remove an item. A selected item is deselected.
    pub fn remove_item(&mut self, layer_id: &LayerId, uid: ItemUid) -> Option<Mutation> {
        self.edit_items(layer_id, |items| items.remove(uid))
    }

    /// Move an item to z position `index`.
    pub fn move_item(
        &mut self,
        layer_id: &LayerId,
        uid: ItemUid,
        index: usize,
    ) -> Option<Mutation> {
        self.edit_items(layer_id, |items| items.move_to(uid, index).then_some(()))
    }

    /// Replace an item's placement.
    pub fn update_item_geometry(
        &mut self,
        layer_id: &LayerId,
        uid: ItemUid,
        geometry: Geometry,
    ) -> ReelResult<Option<Mutation>> {
        geometry.validate()?;
        Ok(self.edit_items(layer_id, |items| {
            items.find_mut(uid).map(|item| item.geometry = geometry)
        }))
    }

    /// Flip an item's soft visibility.
    pub fn toggle_item_hidden(&mut self, layer_id: &LayerId, uid: ItemUid) -> Option<Mutation> {
        self.edit_items(layer_id, |items| {
            items.find_mut(uid).map(|item| item.is_hidden = !item.is_hidden)
        })
    }

    /// Append an animation to an item.
    pub fn add_animation(
        &mut self,
        layer_id: &LayerId,
        uid: ItemUid,
        animation: Animation,
    ) -> ReelResult<Option<Mutation>> {
        animation.validate()?;
        Ok(self.edit_items(layer_id, |items| {
            items
                .find_mut(uid)
                .and_then(|item| item.add_animation(animation).ok().map(|_| ()))
        }))
    }

    /// Remove an animation from an item by its `animation_<n>` id.
    pub fn remove_animation(
        &mut self,
        layer_id: &LayerId,
        uid: ItemUid,
        animation_id: &str,
    ) -> Option<Mutation> {
        self.edit_items(layer_id, |items| {
            items.find_mut(uid)?.remove_animation(animation_id)
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/mutate.rs"]
mod tests;
