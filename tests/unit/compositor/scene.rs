use super::*;
use crate::compositor::assets::MemoryAssetResolver;
use crate::model::item::Geometry;

fn rasterizer() -> SvgSceneRasterizer<MemoryAssetResolver> {
    SvgSceneRasterizer::with_fontdb(
        MemoryAssetResolver::new(),
        Arc::new(usvg::fontdb::Database::new()),
    )
}

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(w, h).unwrap()
}

fn fill(color: &str) -> StyleConfig {
    StyleConfig {
        fill: Some(color.to_string()),
        ..StyleConfig::default()
    }
}

fn draw(r: &SvgSceneRasterizer<MemoryAssetResolver>, item: &Item, c: Canvas) -> Raster {
    r.rasterize_item(item, &ResolvedTransform::from_item(item), c)
        .unwrap()
}

#[test]
fn rectangle_fills_its_box_only() {
    let r = rasterizer();
    let item = Item::shape(
        ShapeKind::Rectangle,
        Geometry::new(10.0, 10.0, 20.0, 20.0),
        fill("#ff0000"),
    );
    let out = draw(&r, &item, canvas(40, 40));
    assert_eq!(out.pixel(20, 20), Some([255, 0, 0, 255]));
    assert_eq!(out.pixel(5, 5), Some([0, 0, 0, 0]));
    assert_eq!(out.pixel(35, 35), Some([0, 0, 0, 0]));
}

#[test]
fn rotation_turns_about_box_center() {
    let r = rasterizer();
    let mut item = Item::shape(
        ShapeKind::Rectangle,
        Geometry::new(40.0, 0.0, 20.0, 100.0),
        fill("#00ff00"),
    );
    item.geometry.rotation = Some(90.0);
    let out = draw(&r, &item, canvas(100, 100));
    assert_eq!(out.pixel(5, 50).unwrap()[3], 255);
    assert_eq!(out.pixel(50, 5).unwrap()[3], 0);
}

#[test]
fn circle_leaves_box_corners_empty() {
    let r = rasterizer();
    let item = Item::shape(
        ShapeKind::Circle,
        Geometry::new(0.0, 0.0, 40.0, 40.0),
        fill("#0000ff"),
    );
    let out = draw(&r, &item, canvas(40, 40));
    assert_eq!(out.pixel(20, 20), Some([0, 0, 255, 255]));
    assert_eq!(out.pixel(1, 1).unwrap()[3], 0);
}

#[test]
fn image_item_is_fit_to_its_box() {
    let r = rasterizer();
    r.assets()
        .insert("https://cdn.test/red.png", Raster::filled(canvas(4, 4), [255, 0, 0, 255]));
    let item = Item::image("https://cdn.test/red.png", Geometry::new(10.0, 10.0, 20.0, 20.0));
    let out = draw(&r, &item, canvas(40, 40));
    assert_eq!(out.pixel(20, 20), Some([255, 0, 0, 255]));
    assert_eq!(out.pixel(5, 5).unwrap()[3], 0);
}

#[test]
fn missing_image_is_an_error() {
    let r = rasterizer();
    let item = Item::image("https://cdn.test/none.png", Geometry::new(0.0, 0.0, 4.0, 4.0));
    assert!(
        r.rasterize_item(&item, &ResolvedTransform::from_item(&item), canvas(8, 8))
            .is_err()
    );
}

#[test]
fn local_raster_matches_box_size() {
    let r = rasterizer();
    let item = Item::shape(
        ShapeKind::Rectangle,
        Geometry::new(300.0, 300.0, 10.5, 7.0),
        fill("#ffffff"),
    );
    let out = r.rasterize_local(&item).unwrap();
    assert_eq!((out.width, out.height), (11, 7));
    assert_eq!(out.pixel(5, 3).unwrap()[3], 255);
}

#[test]
fn single_point_stroke_draws_a_dot() {
    let r = rasterizer();
    let out = r
        .rasterize_strokes(
            &[Stroke::new([Point::new(20.0, 20.0)], 10.0)],
            canvas(40, 40),
            [255, 255, 255, 255],
        )
        .unwrap();
    assert_eq!(out.pixel(20, 20), Some([255, 255, 255, 255]));
    assert_eq!(out.pixel(30, 30).unwrap()[3], 0);
}

#[test]
fn polyline_stroke_covers_its_path() {
    let r = rasterizer();
    let out = r
        .rasterize_strokes(
            &[Stroke::new([Point::new(0.0, 20.0), Point::new(40.0, 20.0)], 6.0)],
            canvas(40, 40),
            [255, 255, 255, 255],
        )
        .unwrap();
    assert_eq!(out.pixel(10, 20).unwrap()[3], 255);
    assert_eq!(out.pixel(10, 30).unwrap()[3], 0);
}

#[test]
fn stroke_transform_scales_width() {
    let s = Stroke::new([Point::new(1.0, 2.0)], 4.0);
    let t = s.transformed(Affine::translate((10.0, 0.0)) * Affine::scale(0.5));
    assert_eq!(t.points, vec![Point::new(10.5, 1.0)]);
    assert!((t.width - 2.0).abs() < 1e-9);
}

#[test]
fn text_content_is_escaped() {
    assert_eq!(escape_xml("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    let svg = text_svg(&StyleConfig {
        text: Some("one\ntwo".to_string()),
        ..StyleConfig::default()
    });
    assert_eq!(svg.matches("<tspan").count(), 2);
}
