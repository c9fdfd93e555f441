use crate::{
    animation::interpolate::ResolvedTransform,
    compositor::raster::Raster,
    compositor::scene::{SceneRasterizer, Stroke},
    foundation::core::Canvas,
    foundation::error::{ReelError, ReelResult},
    model::item::{Item, ItemUid},
    model::layer::{Layer, LayerId},
    timeline::mutate::Mutation,
    timeline::session::EditorSession,
};

const ERASE_COLOR: [u8; 4] = [255, 255, 255, 255];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
/// What a brush stroke does to the target item.
pub enum BrushMode {
    /// Destination-out: remove pixels under the stroke.
    #[default]
    Erase,
    /// Source-over with a straight-alpha color.
    Paint {
        /// RGBA brush color.
        color: [u8; 4],
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One recorded stroke, in canvas pixels.
pub struct BrushStroke {
    /// Stroke geometry.
    pub stroke: Stroke,
    /// Brush mode active when the stroke was drawn.
    pub mode: BrushMode,
}

/// Non-destructive erase/paint session over one item.
///
/// Strokes live on a transient overlay; nothing touches the item list until [`commit`].
///
/// [`commit`]: EraseSession::commit
#[derive(Clone, Debug)]
pub struct EraseSession {
    layer_id: LayerId,
    target: ItemUid,
    mode: BrushMode,
    strokes: Vec<BrushStroke>,
}

impl EraseSession {
    /// Start a session on `target` inside `layer_id`. `None` when the item is not there.
    pub fn begin(session: &EditorSession, layer_id: &LayerId, target: ItemUid) -> Option<Self> {
        session.timeline().layer(layer_id)?.items().find(target)?;
        Some(Self {
            layer_id: layer_id.clone(),
            target,
            mode: BrushMode::Erase,
            strokes: Vec::new(),
        })
    }

    /// Layer holding the target.
    pub fn layer_id(&self) -> &LayerId {
        &self.layer_id
    }

    /// Target item.
    pub fn target(&self) -> ItemUid {
        self.target
    }

    /// Brush mode for subsequent strokes.
    pub fn set_mode(&mut self, mode: BrushMode) {
        self.mode = mode;
    }

    /// Current brush mode.
    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    /// Record a stroke with the current brush mode.
    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(BrushStroke {
            stroke,
            mode: self.mode,
        });
    }

    /// Drop the most recent stroke.
    pub fn undo_last(&mut self) -> Option<BrushStroke> {
        self.strokes.pop()
    }

    /// Recorded strokes, oldest first.
    pub fn strokes(&self) -> &[BrushStroke] {
        &self.strokes
    }

    /// Whether no stroke was recorded.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Flatten `layer` with the overlay applied to the target. Visual only.
    pub fn preview<R>(&self, layer: &Layer, canvas: Canvas, rasterizer: &R) -> ReelResult<Raster>
    where
        R: SceneRasterizer + ?Sized,
    {
        let mut out = Raster::new(canvas);
        for item in layer.items().visible() {
            let transform = ResolvedTransform::from_item(item);
            let mut drawn = rasterizer.rasterize_item(item, &transform, canvas)?;
            if item.uid == self.target {
                apply_strokes(&mut drawn, self.strokes.iter().cloned(), rasterizer)?;
            }
            out.over_in_place(&drawn, 1.0)?;
        }
        Ok(out)
    }

    /// Merge the overlay into `item`'s own pixels, in its local box.
    ///
    /// Strokes are mapped from canvas space through the inverse of the item's transform.
    pub fn merge<R>(&self, item: &Item, rasterizer: &R) -> ReelResult<Raster>
    where
        R: SceneRasterizer + ?Sized,
    {
        let affine = item.geometry.to_affine();
        if affine.determinant().abs() < f64::EPSILON {
            return Err(ReelError::evaluation(format!(
                "item '{}' has a degenerate transform",
                item.id
            )));
        }
        let to_local = affine.inverse();
        let mut local = rasterizer.rasterize_local(item)?;
        let strokes = self.strokes.iter().map(|s| BrushStroke {
            stroke: s.stroke.transformed(to_local),
            mode: s.mode,
        });
        apply_strokes(&mut local, strokes, rasterizer)?;
        Ok(local)
    }

    /// Replace the target with a flattened image item at the same position, `id` and `uid`.
    ///
    /// Geometry, animations and visibility carry over. Returns `Ok(None)` when the target is gone
    /// or no stroke was recorded.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(layer = %self.layer_id, strokes = self.strokes.len())
    )]
    pub fn commit<R>(
        self,
        session: &mut EditorSession,
        rasterizer: &R,
    ) -> ReelResult<Option<Mutation>>
    where
        R: SceneRasterizer + ?Sized,
    {
        if self.strokes.is_empty() {
            return Ok(None);
        }
        let Some(item) = session
            .timeline()
            .layer(&self.layer_id)
            .and_then(|l| l.items().find(self.target))
        else {
            tracing::debug!("erase target gone, commit dropped");
            return Ok(None);
        };

        let merged = self.merge(item, rasterizer)?;
        let mut replacement = Item::image(merged.to_data_uri()?, item.geometry);
        replacement.animations = item.animations.clone();
        replacement.is_hidden = item.is_hidden;

        let Some(layer) = session.timeline.layer_mut(&self.layer_id) else {
            return Ok(None);
        };
        if !layer.items_mut().replace(self.target, replacement) {
            return Ok(None);
        }
        Ok(Some(Mutation::UpdateItems {
            layer_id: self.layer_id.clone(),
            items: layer.items().clone(),
        }))
    }
}

fn apply_strokes<R>(
    raster: &mut Raster,
    strokes: impl IntoIterator<Item = BrushStroke>,
    rasterizer: &R,
) -> ReelResult<()>
where
    R: SceneRasterizer + ?Sized,
{
    let canvas = raster.canvas();
    for s in strokes {
        let stroke = std::slice::from_ref(&s.stroke);
        match s.mode {
            BrushMode::Erase => {
                let overlay = rasterizer.rasterize_strokes(stroke, canvas, ERASE_COLOR)?;
                raster.destination_out_in_place(&overlay)?;
            }
            BrushMode::Paint { color } => {
                let overlay = rasterizer.rasterize_strokes(stroke, canvas, color)?;
                raster.over_in_place(&overlay, 1.0)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/erase.rs"]
mod tests;
