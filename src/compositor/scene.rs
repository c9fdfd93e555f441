use std::{fmt::Write as _, sync::Arc};

use resvg::tiny_skia;

use crate::{
    animation::interpolate::ResolvedTransform,
    compositor::assets::AssetResolver,
    compositor::raster::Raster,
    foundation::core::{Affine, Canvas, Point},
    foundation::error::{ReelError, ReelResult},
    model::item::{Item, ItemKind, ShapeKind, StyleConfig},
};

const DEFAULT_SHAPE_FILL: &str = "#000000";
const DEFAULT_TEXT_FILL: &str = "#000000";
const DEFAULT_FONT_FAMILY: &str = "sans-serif";
const DEFAULT_FONT_SIZE: f64 = 32.0;
const MAX_DIM: u32 = 16_384;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A freehand brush stroke in canvas pixels.
pub struct Stroke {
    /// Polyline through the pointer positions. A single point draws a dot.
    pub points: Vec<Point>,
    /// Brush diameter.
    pub width: f64,
}

impl Stroke {
    /// Stroke through `points` with brush diameter `width`.
    pub fn new(points: impl IntoIterator<Item = Point>, width: f64) -> Self {
        Self {
            points: points.into_iter().collect(),
            width,
        }
    }

    /// Same stroke with every point mapped through `affine`; the width follows the mean scale.
    pub fn transformed(&self, affine: Affine) -> Self {
        let [a, b, c, d, _, _] = affine.as_coeffs();
        let sx = (a * a + b * b).sqrt();
        let sy = (c * c + d * d).sqrt();
        Self {
            points: self.points.iter().map(|p| affine * *p).collect(),
            width: self.width * (sx + sy) / 2.0,
        }
    }
}

/// Scene-graph rasterizer the compositor draws items through.
pub trait SceneRasterizer: Send + Sync {
    /// Draw `item` with `transform` onto a transparent canvas-sized raster.
    ///
    /// Opacity is not applied here; the compositor applies it while blending.
    fn rasterize_item(
        &self,
        item: &Item,
        transform: &ResolvedTransform,
        canvas: Canvas,
    ) -> ReelResult<Raster>;

    /// Draw `item` alone in its own unrotated, unscaled bounding box.
    fn rasterize_local(&self, item: &Item) -> ReelResult<Raster>;

    /// Draw round-capped strokes in a straight-alpha `color` onto a transparent canvas.
    fn rasterize_strokes(
        &self,
        strokes: &[Stroke],
        canvas: Canvas,
        color: [u8; 4],
    ) -> ReelResult<Raster>;
}

/// [`SceneRasterizer`] backed by `usvg`/`resvg`.
///
/// Shapes and text become a small SVG document in the item's local box, rendered with the item's
/// affine. Images are decoded through an [`AssetResolver`] and drawn as pixmaps.
pub struct SvgSceneRasterizer<R> {
    assets: R,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl<R> std::fmt::Debug for SvgSceneRasterizer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgSceneRasterizer")
            .field("faces", &self.fontdb.len())
            .finish_non_exhaustive()
    }
}

impl<R: AssetResolver> SvgSceneRasterizer<R> {
    /// Rasterizer using system fonts.
    pub fn new(assets: R) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self::with_fontdb(assets, Arc::new(db))
    }

    /// Rasterizer with a caller-built font database.
    pub fn with_fontdb(assets: R, fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { assets, fontdb }
    }

    /// Asset resolver used for image items.
    pub fn assets(&self) -> &R {
        &self.assets
    }

    fn draw(
        &self,
        item: &Item,
        width: f64,
        height: f64,
        affine: Affine,
        pixmap: &mut tiny_skia::Pixmap,
    ) -> ReelResult<()> {
        if width <= 0.0 || height <= 0.0 {
            return Ok(());
        }
        match &item.kind {
            ItemKind::Image { src } => {
                let img = self.assets.load(src)?;
                let src_pixmap = pixmap_from_raster(&img)?;
                let fit = Affine::scale_non_uniform(
                    width / f64::from(img.width),
                    height / f64::from(img.height),
                );
                pixmap.draw_pixmap(
                    0,
                    0,
                    src_pixmap.as_ref(),
                    &tiny_skia::PixmapPaint {
                        quality: tiny_skia::FilterQuality::Bilinear,
                        ..Default::default()
                    },
                    to_skia(affine * fit),
                    None,
                );
                Ok(())
            }
            ItemKind::Shape { shape, config } => {
                let body = shape_svg(*shape, config, width, height);
                self.render_svg(&wrap_svg(width, height, &body), affine, pixmap)
            }
            ItemKind::Text { config } => {
                let body = text_svg(config);
                self.render_svg(&wrap_svg(width, height, &body), affine, pixmap)
            }
        }
    }

    fn render_svg(
        &self,
        svg: &str,
        affine: Affine,
        pixmap: &mut tiny_skia::Pixmap,
    ) -> ReelResult<()> {
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts)
            .map_err(|e| ReelError::evaluation(format!("svg parse failed: {e}")))?;
        resvg::render(&tree, to_skia(affine), &mut pixmap.as_mut());
        Ok(())
    }
}

impl<R: AssetResolver> SceneRasterizer for SvgSceneRasterizer<R> {
    #[tracing::instrument(level = "trace", skip_all, fields(item = %item.id))]
    fn rasterize_item(
        &self,
        item: &Item,
        transform: &ResolvedTransform,
        canvas: Canvas,
    ) -> ReelResult<Raster> {
        let mut pixmap = new_pixmap(canvas.width, canvas.height)?;
        self.draw(
            item,
            transform.width,
            transform.height,
            transform.to_affine(),
            &mut pixmap,
        )?;
        Raster::from_premul(canvas.width, canvas.height, pixmap.take())
    }

    fn rasterize_local(&self, item: &Item) -> ReelResult<Raster> {
        let g = &item.geometry;
        let w = box_px(g.width)?;
        let h = box_px(g.height)?;
        let mut pixmap = new_pixmap(w, h)?;
        self.draw(item, g.width, g.height, Affine::IDENTITY, &mut pixmap)?;
        Raster::from_premul(w, h, pixmap.take())
    }

    fn rasterize_strokes(
        &self,
        strokes: &[Stroke],
        canvas: Canvas,
        color: [u8; 4],
    ) -> ReelResult<Raster> {
        let mut pixmap = new_pixmap(canvas.width, canvas.height)?;
        if !strokes.is_empty() {
            let body = strokes_svg(strokes, color);
            let svg = wrap_svg(f64::from(canvas.width), f64::from(canvas.height), &body);
            self.render_svg(&svg, Affine::IDENTITY, &mut pixmap)?;
        }
        Raster::from_premul(canvas.width, canvas.height, pixmap.take())
    }
}

fn box_px(v: f64) -> ReelResult<u32> {
    if !v.is_finite() || v < 0.0 {
        return Err(ReelError::evaluation("item box has invalid width/height"));
    }
    let px = (v.ceil() as u32).max(1);
    if px > MAX_DIM {
        return Err(ReelError::evaluation(format!(
            "item box too large: {px}px (max {MAX_DIM})"
        )));
    }
    Ok(px)
}

fn new_pixmap(width: u32, height: u32) -> ReelResult<tiny_skia::Pixmap> {
    tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ReelError::evaluation("failed to allocate pixmap"))
}

fn pixmap_from_raster(raster: &Raster) -> ReelResult<tiny_skia::Pixmap> {
    let size = tiny_skia::IntSize::from_wh(raster.width, raster.height)
        .ok_or_else(|| ReelError::evaluation("image asset has zero size"))?;
    tiny_skia::Pixmap::from_vec(raster.data.clone(), size)
        .ok_or_else(|| ReelError::evaluation("image asset buffer does not match its size"))
}

fn to_skia(affine: Affine) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    tiny_skia::Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn wrap_svg(width: f64, height: f64, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">{body}</svg>"#
    )
}

fn paint_attrs(config: &StyleConfig, default_fill: &str) -> String {
    let mut out = format!(
        r#" fill="{}""#,
        escape_xml(config.fill.as_deref().unwrap_or(default_fill))
    );
    if let Some(stroke) = &config.stroke {
        let _ = write!(
            out,
            r#" stroke="{}" stroke-width="{}""#,
            escape_xml(stroke),
            config.stroke_width.unwrap_or(1.0)
        );
    }
    out
}

fn shape_svg(shape: ShapeKind, config: &StyleConfig, w: f64, h: f64) -> String {
    let paint = paint_attrs(config, DEFAULT_SHAPE_FILL);
    let r = config.corner_radius.unwrap_or(0.0).max(0.0);
    match shape {
        ShapeKind::Rectangle => {
            format!(r#"<rect x="0" y="0" width="{w}" height="{h}" rx="{r}"{paint}/>"#)
        }
        ShapeKind::Circle => {
            let (rx, ry) = (w / 2.0, h / 2.0);
            format!(r#"<ellipse cx="{rx}" cy="{ry}" rx="{rx}" ry="{ry}"{paint}/>"#)
        }
        ShapeKind::Dialog => {
            let body_h = h * 0.8;
            let r = r.min(w / 2.0).min(body_h / 2.0);
            let d = format!(
                "M{r},0 H{} Q{w},0 {w},{r} V{} Q{w},{body_h} {},{body_h} H{} L{},{h} L{},{body_h} H{r} Q0,{body_h} 0,{} V{r} Q0,0 {r},0 Z",
                w - r,
                body_h - r,
                w - r,
                w * 0.35,
                w * 0.1,
                w * 0.15,
                body_h - r,
            );
            format!(r#"<path d="{d}"{paint}/>"#)
        }
    }
}

fn text_svg(config: &StyleConfig) -> String {
    let size = config.font_size.unwrap_or(DEFAULT_FONT_SIZE);
    let family = config.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY);
    let paint = paint_attrs(config, DEFAULT_TEXT_FILL);
    let mut out = format!(
        r#"<text font-family="{}" font-size="{size}"{paint}>"#,
        escape_xml(family)
    );
    let text = config.text.as_deref().unwrap_or_default();
    for (i, line) in text.lines().enumerate() {
        let y = size * (i as f64 + 1.0);
        let _ = write!(out, r#"<tspan x="0" y="{y}">{}</tspan>"#, escape_xml(line));
    }
    out.push_str("</text>");
    out
}

fn strokes_svg(strokes: &[Stroke], color: [u8; 4]) -> String {
    let [r, g, b, a] = color;
    let fill = format!("rgb({r},{g},{b})");
    let opacity = f64::from(a) / 255.0;
    let mut out = String::new();
    for stroke in strokes {
        let Some(first) = stroke.points.first() else {
            continue;
        };
        if stroke.points.len() == 1 {
            let _ = write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{fill}" fill-opacity="{opacity}"/>"#,
                first.x,
                first.y,
                stroke.width / 2.0
            );
            continue;
        }
        let mut d = format!("M{},{}", first.x, first.y);
        for p in &stroke.points[1..] {
            let _ = write!(d, " L{},{}", p.x, p.y);
        }
        let _ = write!(
            out,
            r#"<path d="{d}" fill="none" stroke="{fill}" stroke-opacity="{opacity}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            stroke.width
        );
    }
    out
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/scene.rs"]
mod tests;
