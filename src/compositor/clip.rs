use crate::{
    compositor::raster::Raster,
    compositor::scene::SceneRasterizer,
    foundation::core::Point,
    foundation::error::{ReelError, ReelResult},
    foundation::math::mul_div255,
    model::item::{Item, ShapeKind},
};

/// Zero every pixel whose center lies farther than `radius` from `center`.
pub fn clip_circle_in_place(raster: &mut Raster, center: Point, radius: f64) {
    let w = raster.width as usize;
    let r2 = radius * radius;
    for (i, px) in raster.pixels_mut().enumerate() {
        let x = (i % w) as f64 + 0.5;
        let y = (i / w) as f64 + 0.5;
        let (dx, dy) = (x - center.x, y - center.y);
        if dx * dx + dy * dy > r2 {
            px.copy_from_slice(&[0, 0, 0, 0]);
        }
    }
}

/// Rasterize a shape item alone in its bounding box.
///
/// Circles get an exact circular clip of radius `min(w, h) / 2` around the box center rather
/// than relying on the box.
pub fn extract_shape_clip<R>(item: &Item, rasterizer: &R) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let Some(shape) = item.shape_kind() else {
        return Err(ReelError::validation(format!(
            "item '{}' is not a shape",
            item.id
        )));
    };
    let mut out = rasterizer.rasterize_local(item)?;
    if shape == ShapeKind::Circle {
        let g = &item.geometry;
        let center = Point::new(g.width / 2.0, g.height / 2.0);
        clip_circle_in_place(&mut out, center, g.width.min(g.height) / 2.0);
    }
    Ok(out)
}

/// Copy the pixels of `base` covered by `shape`'s clip, cropped to the shape's box.
///
/// Pixels outside `base` are transparent.
pub fn copy_shape_region<R>(base: &Raster, shape: &Item, rasterizer: &R) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let clip = extract_shape_clip(shape, rasterizer)?;
    let x0 = shape.geometry.x.floor() as i64;
    let y0 = shape.geometry.y.floor() as i64;
    let mut out = Raster::new(clip.canvas());
    for y in 0..clip.height {
        for x in 0..clip.width {
            let (bx, by) = (x0 + i64::from(x), y0 + i64::from(y));
            if bx < 0 || by < 0 {
                continue;
            }
            let (Some(src), Some(mask)) = (base.pixel(bx as u32, by as u32), clip.pixel(x, y))
            else {
                continue;
            };
            let a = u16::from(mask[3]);
            out.set_pixel(
                x,
                y,
                [
                    mul_div255(u16::from(src[0]), a),
                    mul_div255(u16::from(src[1]), a),
                    mul_div255(u16::from(src[2]), a),
                    mul_div255(u16::from(src[3]), a),
                ],
            );
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/clip.rs"]
mod tests;
