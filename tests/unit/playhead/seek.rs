use super::*;
use crate::model::animation::{Animation, AnimationKind, SlideParams};
use crate::model::item::{Geometry, Item};

fn timeline(durations: &[f64]) -> Timeline {
    Timeline::from_layers(
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| Layer::with_id(LayerId(format!("L{i}")), *d))
            .collect(),
    )
}

#[test]
fn frame_100_resolves_to_second_layer() {
    let tl = timeline(&[2.0, 3.0, 1.0]);
    let mut ph = Playhead::default();
    let out = ph.set_frame(FrameIndex(100), &tl);
    assert_eq!(out.layer_index, Some(1));
    assert!(out.layer_switched);
    assert_eq!(ph.current_frame(), FrameIndex(100));
}

#[test]
fn stepping_visits_each_layer_once_in_order() {
    let tl = timeline(&[2.0, 3.0, 1.0]);
    let mut ph = Playhead::default();
    let mut visited = vec![ph.set_frame(FrameIndex(0), &tl).layer_index.unwrap()];
    for _ in 0..179 {
        let idx = ph.tick(&tl).layer_index.unwrap();
        if *visited.last().unwrap() != idx {
            visited.push(idx);
        }
    }
    assert_eq!(visited, [0, 1, 2]);
    assert_eq!(ph.current_frame(), FrameIndex(179));
}

#[test]
fn boundary_frames_belong_to_next_layer() {
    let tl = timeline(&[2.0, 3.0, 1.0]);
    let mut ph = Playhead::default();
    assert_eq!(ph.set_frame(FrameIndex(59), &tl).layer_index, Some(0));
    assert_eq!(ph.set_frame(FrameIndex(60), &tl).layer_index, Some(1));
    assert_eq!(ph.set_frame(FrameIndex(149), &tl).layer_index, Some(1));
    assert_eq!(ph.set_frame(FrameIndex(150), &tl).layer_index, Some(2));
    assert_eq!(ph.step(-1, &tl).layer_index, Some(1));
}

#[test]
fn playhead_clamps_at_timeline_ends() {
    let tl = timeline(&[1.0, 1.0]);
    let mut ph = Playhead::default();
    let out = ph.set_frame(FrameIndex(10_000), &tl);
    assert_eq!(out.frame, FrameIndex(60));
    assert_eq!(out.layer_index, Some(1));
    let out = ph.step(-1_000, &tl);
    assert_eq!(out.frame, FrameIndex(0));
    assert_eq!(out.layer_index, Some(0));
}

#[test]
fn empty_timeline_has_no_active_layer() {
    let mut ph = Playhead::default();
    let out = ph.set_frame(FrameIndex(12), &Timeline::default());
    assert_eq!(out.frame, FrameIndex(0));
    assert_eq!(out.layer_index, None);
    assert!(out.items.is_empty());
}

#[test]
fn only_active_layer_items_are_interpolated() {
    let mut tl = timeline(&[1.0, 1.0]);
    let mut moving = Item::image("a.png", Geometry::new(0.0, 0.0, 10.0, 10.0));
    moving
        .add_animation(Animation::spanning(AnimationKind::Slide(SlideParams {
            start_x: 0.0,
            end_x: 300.0,
            start_y: None,
            end_y: None,
        })))
        .unwrap();
    tl.layers[1].items_mut().push(moving);
    tl.layers[0]
        .items_mut()
        .push(Item::image("b.png", Geometry::new(0.0, 0.0, 1.0, 1.0)));

    let mut ph = Playhead::default();
    let out = ph.set_frame(FrameIndex(45), &tl);
    assert_eq!(out.items.len(), 1);
    assert!((out.items[0].transform.x - 150.0).abs() < 1e-9);
    assert_eq!(out.items[0].id, "item_0");
}

#[test]
fn reconcile_follows_layer_by_id() {
    let mut tl = timeline(&[2.0, 3.0, 1.0]);
    let mut ph = Playhead::default();
    ph.set_frame(FrameIndex(10), &tl);
    let active = LayerId::from("L0");

    // L0 moves to the end: [L1, L2, L0] -> L0 spans frames 120..180.
    let first = tl.layers.remove(0);
    tl.layers.push(first);
    tl.recompute_offsets();

    let out = ph.reconcile(&tl, Some(&active));
    assert_eq!(out.layer_index, Some(2));
    assert_eq!(out.frame, FrameIndex(120));
}

#[test]
fn reconcile_while_seeking_keeps_frame() {
    let mut tl = timeline(&[2.0, 3.0, 1.0]);
    let mut ph = Playhead::default();
    ph.set_frame(FrameIndex(70), &tl);
    ph.begin_seek();
    assert!(ph.is_seeking());

    tl.layers.swap(0, 1);
    tl.recompute_offsets();
    let out = ph.reconcile(&tl, Some(&LayerId::from("L1")));
    assert_eq!(out.frame, FrameIndex(70));
    ph.end_seek();
    assert!(!ph.is_seeking());
}

#[test]
fn reconcile_keeps_frame_inside_active_layer() {
    let tl = timeline(&[2.0, 3.0]);
    let mut ph = Playhead::default();
    ph.set_frame(FrameIndex(70), &tl);
    let out = ph.reconcile(&tl, Some(&LayerId::from("L1")));
    assert_eq!(out.frame, FrameIndex(70));
    assert!(!out.layer_switched);
}

#[test]
fn select_layer_jumps_to_start() {
    let tl = timeline(&[2.0, 3.0, 1.0]);
    let mut ph = Playhead::default();
    let out = ph.select_layer(2, &tl).unwrap();
    assert_eq!(out.frame, FrameIndex(150));
    assert_eq!(ph.current_layer_index(), 2);
    assert!(ph.select_layer(9, &tl).is_none());
    assert_eq!(layer_frame_ranges(&tl, Fps::default())[1].start, FrameIndex(60));
}
