use super::*;
use crate::config::EditorConfig;
use crate::foundation::core::FrameIndex;
use crate::model::animation::{AnimationKind, FadeParams};
use crate::model::timeline::Timeline;

fn id(s: &str) -> LayerId {
    LayerId::from(s)
}

fn abc() -> EditorSession {
    EditorSession::new(
        EditorConfig::default(),
        Timeline::from_layers(vec![
            Layer::with_id(id("A"), 2.0),
            Layer::with_id(id("B"), 3.0),
            Layer::with_id(id("C"), 1.0),
        ]),
    )
}

fn order(s: &EditorSession) -> Vec<&str> {
    s.timeline().layers.iter().map(|l| l.id.as_str()).collect()
}

fn offsets(s: &EditorSession) -> Vec<f64> {
    s.timeline().layers.iter().map(|l| l.duration_offset).collect()
}

fn image() -> Item {
    Item::image("a.png", Geometry::new(0.0, 0.0, 10.0, 10.0))
}

#[test]
fn reorder_keeps_selection_by_id() {
    let mut s = abc();
    let m = s.reorder(&[id("B"), id("A"), id("C")]).unwrap().unwrap();
    assert_eq!(m.coalesce_key(), None);
    assert_eq!(order(&s), ["B", "A", "C"]);
    assert_eq!(offsets(&s), [0.0, 3.0, 5.0]);
    assert_eq!(s.selection().layer_id, Some(id("A")));
    assert_eq!(s.current_frame(), FrameIndex(90));
}

#[test]
fn reorder_rejects_non_permutations() {
    let mut s = abc();
    assert!(s.reorder(&[id("A"), id("B")]).is_err());
    assert!(s.reorder(&[id("A"), id("A"), id("C")]).is_err());
    assert!(s.reorder(&[id("A"), id("B"), id("Z")]).is_err());
    assert_eq!(order(&s), ["A", "B", "C"]);
    assert!(s.reorder(&[id("A"), id("B"), id("C")]).unwrap().is_none());
}

#[test]
fn insert_below_current_selects_new_layer() {
    let mut s = abc();
    s.select_layer(&id("B"));
    let Mutation::InsertLayer { index, layer } = s.insert_layer(InsertPosition::BelowCurrent)
    else {
        panic!("expected an insert");
    };
    assert_eq!(index, 2);
    assert_eq!(layer.duration, 2.0);
    assert_eq!(layer.duration_offset, 5.0);
    assert_eq!(s.selection().layer_id, Some(layer.id.clone()));
    assert_eq!(s.current_frame(), FrameIndex(150));
    assert_eq!(s.timeline().layers[3].duration_offset, 7.0);

    s.insert_layer(InsertPosition::AtBeginning);
    assert_eq!(s.current_layer_index(), Some(0));
    s.insert_layer(InsertPosition::AtEnd);
    assert_eq!(s.current_layer_index(), Some(5));
}

#[test]
fn insert_into_empty_timeline() {
    let mut s = EditorSession::new(EditorConfig::default(), Timeline::default());
    let m = s.insert_layer(InsertPosition::BelowCurrent);
    assert!(matches!(m, Mutation::InsertLayer { index: 0, .. }));
    assert_eq!(s.current_layer_index(), Some(0));
}

#[test]
fn duplicate_copies_items_with_fresh_identities() {
    let mut s = abc();
    assert!(s.add_item(&id("A"), image()).unwrap().is_some());
    let key = s.job_key(JobKind::AiVideo, Some(id("A")));
    let token = s.jobs.begin(&key).unwrap();
    s.complete_job(&key, token, &serde_json::json!({ "videoUrl": "v.mp4" }));

    let Some(Mutation::DuplicateLayer { source_id, layer }) = s.duplicate_layer(&id("A")) else {
        panic!("expected a duplicate");
    };
    assert_eq!(source_id, id("A"));
    assert_ne!(layer.id, id("A"));
    assert_eq!(order(&s)[0], "A");
    assert_eq!(s.timeline().layers[1].id, layer.id);
    assert_eq!(offsets(&s), [0.0, 2.0, 4.0, 7.0]);

    let original = s.timeline().layer(&id("A")).unwrap();
    assert_ne!(
        original.items().get(0).unwrap().uid,
        layer.items().get(0).unwrap().uid
    );
    assert!(layer.generation.is_empty());
    assert_eq!(s.selection().layer_id, Some(id("A")));
    assert!(s.duplicate_layer(&id("nope")).is_none());
}

#[test]
fn stretch_shifts_later_offsets() {
    let mut s = abc();
    let m = s
        .set_layer_duration(&id("A"), 4.0, DurationEdit::Stretch)
        .unwrap()
        .unwrap();
    assert_eq!(m.coalesce_key(), Some(CoalesceKey::Duration(id("A"))));
    assert_eq!(offsets(&s), [0.0, 4.0, 7.0]);
    assert_eq!(s.timeline().layers[0].clip_start_frame, None);
}

#[test]
fn trim_records_clip_frames() {
    let mut s = abc();
    let edit = DurationEdit::Trim {
        clip_start_frame: 10,
        clip_end_frame: 40,
    };
    s.set_layer_duration(&id("B"), 1.0, edit).unwrap();
    let b = s.timeline().layer(&id("B")).unwrap();
    assert_eq!((b.clip_start_frame, b.clip_end_frame), (Some(10), Some(40)));
    assert_eq!(s.timeline().layers[2].duration_offset, 3.0);

    let bad = DurationEdit::Trim {
        clip_start_frame: 40,
        clip_end_frame: 40,
    };
    assert!(s.set_layer_duration(&id("B"), 1.0, bad).is_err());
    assert!(s.set_layer_duration(&id("B"), 0.0, DurationEdit::Stretch).is_err());
    assert!(
        s.set_layer_duration(&id("Z"), 1.0, DurationEdit::Stretch)
            .unwrap()
            .is_none()
    );
}

#[test]
fn trim_past_the_layer_end_is_rejected() {
    let mut s = abc();
    // B is 3s long: 90 frames at 30 fps.
    let past = DurationEdit::Trim {
        clip_start_frame: 10,
        clip_end_frame: 91,
    };
    let err = s.set_layer_duration(&id("B"), 2.0, past).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    let b = s.timeline().layer(&id("B")).unwrap();
    assert_eq!(b.duration, 3.0);
    assert_eq!(b.clip_end_frame, None);

    let whole = DurationEdit::Trim {
        clip_start_frame: 0,
        clip_end_frame: 90,
    };
    assert!(s.set_layer_duration(&id("B"), 3.0, whole).unwrap().is_some());
}

#[test]
fn removing_selected_layer_selects_previous() {
    let mut s = abc();
    s.select_layer(&id("B"));
    s.remove_layer(&id("B")).unwrap();
    assert_eq!(order(&s), ["A", "C"]);
    assert_eq!(offsets(&s), [0.0, 2.0]);
    assert_eq!(s.selection().layer_id, Some(id("A")));

    s.remove_layer(&id("A")).unwrap();
    assert_eq!(s.selection().layer_id, Some(id("C")));
    s.remove_layer(&id("C")).unwrap();
    assert_eq!(s.selection().layer_id, None);
    assert!(s.remove_layer(&id("C")).is_none());
}

#[test]
fn removing_a_layer_drops_its_pending_jobs() {
    let mut s = abc();
    let layer_key = s.job_key(JobKind::LipSync, Some(id("C")));
    let session_key = s.job_key(JobKind::Audio, None);
    s.jobs.begin(&layer_key).unwrap();
    s.jobs.begin(&session_key).unwrap();
    s.remove_layer(&id("C"));
    assert!(!s.jobs.is_pending(&layer_key));
    assert!(s.jobs.is_pending(&session_key));
}

#[test]
fn item_edits_report_the_full_list() {
    let mut s = abc();
    let a = id("A");
    let first = image();
    let second = image();
    let (u1, u2) = (first.uid, second.uid);
    s.add_item(&a, first).unwrap();
    let Some(Mutation::UpdateItems { layer_id, items }) = s.add_item(&a, second).unwrap() else {
        panic!("expected an item update");
    };
    assert_eq!(layer_id, a);
    assert_eq!(items.len(), 2);
    assert_eq!(items.get(1).unwrap().id, "item_1");

    let m = s.move_item(&a, u2, 0).unwrap();
    assert_eq!(m.coalesce_key(), Some(CoalesceKey::Items(a.clone())));
    let items = s.timeline().layer(&a).unwrap().items();
    assert_eq!(items.get(0).unwrap().uid, u2);
    assert_eq!(items.get(1).unwrap().z_index, 1);
    assert!(s.move_item(&a, ItemUid::new(), 0).is_none());

    s.toggle_item_hidden(&a, u1).unwrap();
    assert!(s.timeline().layer(&a).unwrap().items().find(u1).unwrap().is_hidden);
}

#[test]
fn invalid_item_edits_are_rejected() {
    let mut s = abc();
    let a = id("A");
    let item = image();
    let uid = item.uid;
    s.add_item(&a, item).unwrap();

    let mut bad = image();
    bad.geometry.width = -1.0;
    assert!(s.add_item(&a, bad).is_err());
    assert!(
        s.update_item_geometry(&a, uid, Geometry::new(0.0, 0.0, f64::NAN, 1.0))
            .is_err()
    );
    let moved = s
        .update_item_geometry(&a, uid, Geometry::new(5.0, 6.0, 7.0, 8.0))
        .unwrap();
    assert!(moved.is_some());
    assert_eq!(s.timeline().layer(&a).unwrap().items().find(uid).unwrap().geometry.x, 5.0);
    assert!(s.add_item(&id("Z"), image()).unwrap().is_none());
}

#[test]
fn removing_selected_item_clears_selection() {
    let mut s = abc();
    let a = id("A");
    let item = image();
    let uid = item.uid;
    s.add_item(&a, item).unwrap();
    assert!(s.select_item(Some(uid)));
    s.remove_item(&a, uid).unwrap();
    assert_eq!(s.selection().item_uid, None);
    assert!(s.remove_item(&a, uid).is_none());
}

#[test]
fn animations_are_added_and_removed_by_id() {
    let mut s = abc();
    let a = id("A");
    let item = image();
    let uid = item.uid;
    s.add_item(&a, item).unwrap();
    let fade = Animation::spanning(AnimationKind::Fade(FadeParams {
        start_fade: 0.0,
        end_fade: 100.0,
    }));
    assert!(s.add_animation(&a, uid, fade).unwrap().is_some());
    let item = s.timeline().layer(&a).unwrap().items().find(uid).unwrap();
    assert_eq!(item.animations[0].id, "animation_0");

    assert!(s.remove_animation(&a, uid, "animation_7").is_none());
    assert!(s.remove_animation(&a, uid, "animation_0").is_some());
}

#[test]
fn mutations_serialize_with_op_tags() {
    let m = Mutation::SetDuration {
        layer_id: id("A"),
        duration: 2.5,
        edit: DurationEdit::Trim {
            clip_start_frame: 1,
            clip_end_frame: 9,
        },
    };
    let v = serde_json::to_value(&m).unwrap();
    assert_eq!(v["op"], "setDuration");
    assert_eq!(v["layerId"], "A");
    assert_eq!(v["edit"]["kind"], "trim");
    assert_eq!(v["edit"]["clipEndFrame"], 9);
    assert_eq!(m.op_name(), "setDuration");
}
