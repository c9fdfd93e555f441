use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
}

#[test]
fn frame_range_clamp_handles_empty() {
    let empty = FrameRange::new(FrameIndex(7), FrameIndex(7)).unwrap();
    assert_eq!(empty.clamp(FrameIndex(100)), FrameIndex(7));
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert_eq!(r.clamp(FrameIndex(9)), FrameIndex(4));
}

#[test]
fn fps_frames_secs_roundtrip_floor() {
    let fps = Fps::new(30000, 1001).unwrap();
    let secs = fps.frames_to_secs(123);
    assert_eq!(fps.secs_to_frames_floor(secs), 123);
}

#[test]
fn fps_rounding_absorbs_float_noise() {
    let fps = Fps::default();
    assert_eq!(fps.secs_to_frames_round(0.1 + 0.2 + 1.7), 60);
    assert_eq!(fps.frames_to_ms(30), 1000.0);
}

#[test]
fn aspect_ratio_working_resolutions() {
    assert_eq!(
        AspectRatio::Square.working_canvas(),
        Canvas {
            width: 1024,
            height: 1024
        }
    );
    assert_eq!(AspectRatio::parse("16:9").unwrap().working_canvas().width, 1792);
    assert_eq!(AspectRatio::parse("9:16").unwrap().working_canvas().height, 1792);
    assert!(AspectRatio::parse("4:3").is_err());
}

#[test]
fn aspect_ratio_serializes_as_ratio_string() {
    let s = serde_json::to_string(&AspectRatio::Landscape).unwrap();
    assert_eq!(s, "\"16:9\"");
}
