use super::*;
use crate::foundation::core::Canvas;

#[test]
fn radius_zero_is_identity() {
    let src = Raster::from_premul(1, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    assert_eq!(blur_premul(&src, 0, 1.0).unwrap(), src);
}

#[test]
fn constant_image_is_unchanged() {
    let src = Raster::filled(Canvas::new(4, 3).unwrap(), [10, 20, 30, 40]);
    assert_eq!(blur_premul(&src, 3, 2.0).unwrap(), src);
}

#[test]
fn single_pixel_spreads_energy() {
    let mut src = Raster::new(Canvas::new(5, 5).unwrap());
    src.set_pixel(2, 2, [255, 255, 255, 255]);
    let out = blur_premul(&src, 2, 1.2).unwrap();
    let nonzero = out.data.chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);
    let sum_a: u32 = out.data.chunks_exact(4).map(|px| u32::from(px[3])).sum();
    assert!((sum_a as i32 - 255).abs() <= 4);
}

#[test]
fn bad_sigma_is_rejected() {
    let src = Raster::new(Canvas::new(2, 2).unwrap());
    assert!(blur_premul(&src, 1, 0.0).is_err());
}
