use std::sync::Arc;

use super::*;
use crate::compositor::assets::MemoryAssetResolver;
use crate::compositor::scene::SvgSceneRasterizer;
use crate::foundation::core::Canvas;
use crate::model::item::{Geometry, StyleConfig};

fn rasterizer() -> SvgSceneRasterizer<MemoryAssetResolver> {
    SvgSceneRasterizer::with_fontdb(
        MemoryAssetResolver::new(),
        Arc::new(usvg::fontdb::Database::new()),
    )
}

fn white() -> StyleConfig {
    StyleConfig {
        fill: Some("#ffffff".to_string()),
        ..StyleConfig::default()
    }
}

#[test]
fn circle_clip_zeroes_pixels_outside_radius() {
    let mut r = Raster::filled(Canvas::new(10, 10).unwrap(), [9, 9, 9, 255]);
    clip_circle_in_place(&mut r, Point::new(5.0, 5.0), 3.0);
    assert_eq!(r.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(r.pixel(9, 5), Some([0, 0, 0, 0]));
    assert_eq!(r.pixel(5, 5), Some([9, 9, 9, 255]));
    assert_eq!(r.pixel(6, 4), Some([9, 9, 9, 255]));
}

#[test]
fn circle_shape_clip_is_exact_not_bounding_box() {
    let item = Item::shape(ShapeKind::Circle, Geometry::new(50.0, 50.0, 20.0, 20.0), white());
    let clip = extract_shape_clip(&item, &rasterizer()).unwrap();
    assert_eq!((clip.width, clip.height), (20, 20));
    assert_eq!(clip.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(clip.pixel(19, 19), Some([0, 0, 0, 0]));
    assert_eq!(clip.pixel(10, 10).unwrap()[3], 255);
}

#[test]
fn non_shape_items_are_rejected() {
    let item = Item::image("a.png", Geometry::new(0.0, 0.0, 4.0, 4.0));
    assert!(matches!(
        extract_shape_clip(&item, &rasterizer()),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn shape_region_copies_base_pixels_under_the_shape() {
    let mut base = Raster::filled(Canvas::new(64, 64).unwrap(), [255, 0, 0, 255]);
    base.set_pixel(12, 12, [0, 255, 0, 255]);
    let shape = Item::shape(
        ShapeKind::Rectangle,
        Geometry::new(10.0, 10.0, 20.0, 20.0),
        white(),
    );
    let region = copy_shape_region(&base, &shape, &rasterizer()).unwrap();
    assert_eq!((region.width, region.height), (20, 20));
    assert_eq!(region.pixel(2, 2), Some([0, 255, 0, 255]));
    assert_eq!(region.pixel(10, 10), Some([255, 0, 0, 255]));
}

#[test]
fn shape_region_outside_base_is_transparent() {
    let base = Raster::filled(Canvas::new(8, 8).unwrap(), [255, 0, 0, 255]);
    let shape = Item::shape(
        ShapeKind::Rectangle,
        Geometry::new(-4.0, -4.0, 8.0, 8.0),
        white(),
    );
    let region = copy_shape_region(&base, &shape, &rasterizer()).unwrap();
    assert_eq!(region.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(region.pixel(6, 6), Some([255, 0, 0, 255]));
}
