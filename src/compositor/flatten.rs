use rayon::prelude::*;

use crate::{
    animation::filters::apply_filter,
    animation::interpolate::{FilterSample, ResolvedTransform},
    compositor::raster::Raster,
    compositor::scene::SceneRasterizer,
    foundation::core::{Canvas, Fps, FrameIndex},
    foundation::error::ReelResult,
    model::item::{Item, ItemList},
    model::layer::Layer,
    playhead::seek::{ItemFrameState, interpolate_layer},
};

struct DrawCall<'a> {
    item: &'a Item,
    transform: ResolvedTransform,
    filters: &'a [FilterSample],
}

/// Flatten a layer's items with their static geometry (no animation sampled).
///
/// This is the artifact submitted to generation jobs and used for thumbnails.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(layer = %layer.id, items = layer.items().len())
)]
pub fn flatten_layer<R>(layer: &Layer, canvas: Canvas, rasterizer: &R) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    flatten_items(layer.items(), canvas, rasterizer)
}

/// Flatten a layer as it appears at global `frame`, animations and pixel filters applied.
#[tracing::instrument(level = "debug", skip_all, fields(layer = %layer.id, frame = frame.0))]
pub fn flatten_layer_at<R>(
    layer: &Layer,
    frame: FrameIndex,
    fps: Fps,
    canvas: Canvas,
    rasterizer: &R,
) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let states = interpolate_layer(layer, frame, fps);
    flatten_with_states(layer.items(), &states, canvas, rasterizer)
}

/// Composite visible `items` in list order onto a transparent canvas.
pub fn flatten_items<R>(items: &ItemList, canvas: Canvas, rasterizer: &R) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let calls: Vec<DrawCall<'_>> = items
        .visible()
        .map(|item| DrawCall {
            item,
            transform: ResolvedTransform::from_item(item),
            filters: &[],
        })
        .collect();
    composite(&calls, canvas, rasterizer)
}

/// Composite visible `items` with per-item frame state from the playhead.
///
/// Items without a matching state (by uid) are drawn with their static geometry.
pub fn flatten_with_states<R>(
    items: &ItemList,
    states: &[ItemFrameState],
    canvas: Canvas,
    rasterizer: &R,
) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let calls: Vec<DrawCall<'_>> = items
        .visible()
        .map(|item| match states.iter().find(|s| s.uid == item.uid) {
            Some(state) => DrawCall {
                item,
                transform: state.transform,
                filters: &state.filters,
            },
            None => DrawCall {
                item,
                transform: ResolvedTransform::from_item(item),
                filters: &[],
            },
        })
        .collect();
    composite(&calls, canvas, rasterizer)
}

fn composite<R>(calls: &[DrawCall<'_>], canvas: Canvas, rasterizer: &R) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let visible: Vec<&DrawCall<'_>> = calls
        .iter()
        .filter(|call| call.transform.clamped_opacity() > 0.0)
        .collect();

    // At most one canvas-sized raster per worker is alive at a time.
    let chunk_size = rayon::current_num_threads().max(1);
    let mut out = Raster::new(canvas);
    for chunk in visible.chunks(chunk_size) {
        let rendered = chunk
            .par_iter()
            .map(|call| -> ReelResult<(Raster, f32)> {
                let mut layer = rasterizer.rasterize_item(call.item, &call.transform, canvas)?;
                for filter in call.filters {
                    apply_filter(&mut layer, filter)?;
                }
                Ok((layer, call.transform.clamped_opacity()))
            })
            .collect::<Vec<_>>();
        for item in rendered {
            let (layer, opacity) = item?;
            out.over_in_place(&layer, opacity)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/flatten.rs"]
mod tests;
