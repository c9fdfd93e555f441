use super::*;
use crate::model::layer::Layer;

fn ctx() -> MergeContext {
    MergeContext {
        media_base_url: "https://cdn.example/media/".to_string(),
        canvas: Canvas::new(1024, 1024).unwrap(),
    }
}

fn tl() -> Timeline {
    Timeline::from_layers(vec![
        Layer::with_id(LayerId::from("a"), 2.0),
        Layer::with_id(LayerId::from("b"), 3.0),
    ])
}

#[test]
fn descriptor_table_matches_kinds() {
    for kind in JobKind::ALL {
        assert_eq!(kind.descriptor().kind, kind);
        let wire = serde_json::to_value(kind).unwrap();
        assert_eq!(wire, kind.as_str());
    }
    assert_eq!(JobKind::ImageGeneration.descriptor().interval, Duration::from_secs(1));
    assert_eq!(JobKind::Audio.descriptor().interval, Duration::from_secs(2));
    assert_eq!(JobKind::AiVideo.descriptor().interval, Duration::from_secs(5));
    assert_eq!(JobKind::Audio.descriptor().scope, JobScope::Session);
    assert!(JobKind::Outpaint.descriptor().requires_artifact);
    assert_eq!(JobKind::LipSync.to_string(), "lipSync");
}

#[test]
fn status_uses_screaming_case() {
    let s: JobStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
    assert_eq!(s, JobStatus::Completed);
}

#[test]
fn media_url_joins_relative_names() {
    let c = ctx();
    assert_eq!(c.media_url("foo.png"), "https://cdn.example/media/foo.png");
    assert_eq!(c.media_url("/foo.png"), "https://cdn.example/media/foo.png");
    assert_eq!(c.media_url("https://x/y.png"), "https://x/y.png");
    assert_eq!(c.media_url("data:image/png;base64,AA"), "data:image/png;base64,AA");
    let bare = MergeContext {
        media_base_url: String::new(),
        ..c
    };
    assert_eq!(bare.media_url("foo.png"), "foo.png");
}

#[test]
fn generated_image_appends_item() {
    let mut t = tl();
    let id = LayerId::from("b");
    let merge = JobKind::ImageGeneration.descriptor().merge;
    let out = merge(
        &mut t,
        Some(&id),
        &serde_json::json!({ "activeGeneratedImage": "foo.png" }),
        &ctx(),
    );
    assert_eq!(out, MergeOutcome::Applied);
    let items = t.layer(&id).unwrap().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items.get(0).unwrap().src(), Some("https://cdn.example/media/foo.png"));
    assert_eq!(items.get(0).unwrap().geometry.width, 1024.0);
}

#[test]
fn missing_layer_is_stale_not_error() {
    let mut t = tl();
    let before = t.clone();
    let merge = JobKind::AiVideo.descriptor().merge;
    let out = merge(
        &mut t,
        Some(&LayerId::from("gone")),
        &serde_json::json!({ "videoUrl": "v.mp4" }),
        &ctx(),
    );
    assert_eq!(out, MergeOutcome::StaleTarget);
    assert_eq!(t, before);
}

#[test]
fn missing_field_changes_nothing() {
    let mut t = tl();
    let merge = JobKind::LipSync.descriptor().merge;
    let out = merge(&mut t, Some(&LayerId::from("a")), &serde_json::json!({}), &ctx());
    assert_eq!(out, MergeOutcome::MissingField("videoUrl"));
}

#[test]
fn video_kinds_fill_distinct_fields() {
    let mut t = tl();
    let id = LayerId::from("a");
    (JobKind::AiVideo.descriptor().merge)(
        &mut t,
        Some(&id),
        &serde_json::json!({ "videoUrl": "ai.mp4" }),
        &ctx(),
    );
    (JobKind::LipSync.descriptor().merge)(
        &mut t,
        Some(&id),
        &serde_json::json!({ "videoUrl": "https://other/lip.mp4" }),
        &ctx(),
    );
    let layer = t.layer(&id).unwrap();
    assert_eq!(
        layer.ai_video_url.as_deref(),
        Some("https://cdn.example/media/ai.mp4")
    );
    assert_eq!(layer.lip_sync_video_url.as_deref(), Some("https://other/lip.mp4"));
}

#[test]
fn sound_effect_adds_track_at_layer_offset() {
    let mut t = tl();
    let id = LayerId::from("b");
    let out = (JobKind::SoundEffect.descriptor().merge)(
        &mut t,
        Some(&id),
        &serde_json::json!({ "audioUrl": "boom.wav", "duration": 1.5 }),
        &ctx(),
    );
    assert_eq!(out, MergeOutcome::Applied);
    assert_eq!(t.audio_layers.len(), 1);
    let track = &t.audio_layers[0];
    assert_eq!(track.kind, AudioKind::Sound);
    assert_eq!(track.start_time, 2.0);
    assert_eq!(track.end_time, 3.5);
    assert!(t.layer(&id).unwrap().sound_effect_url.is_some());
}

#[test]
fn music_defaults_to_full_session() {
    let mut t = tl();
    (JobKind::Audio.descriptor().merge)(
        &mut t,
        None,
        &serde_json::json!({ "audioUrl": "song.mp3" }),
        &ctx(),
    );
    assert_eq!(t.audio_layers[0].duration, 5.0);
    assert_eq!(t.audio_layers[0].kind, AudioKind::Music);
}

#[test]
fn layered_speech_skips_malformed_segments() {
    let mut t = tl();
    let out = (JobKind::LayeredSpeech.descriptor().merge)(
        &mut t,
        None,
        &serde_json::json!({ "segments": [
            { "audioUrl": "one.mp3", "startTime": 0.0, "duration": 1.0 },
            { "startTime": 1.0 },
            { "audioUrl": "two.mp3", "startTime": 2.0, "duration": 1.0 }
        ] }),
        &ctx(),
    );
    assert_eq!(out, MergeOutcome::Applied);
    assert_eq!(t.audio_layers.len(), 2);
    assert!(t.audio_layers.iter().all(|a| a.kind == AudioKind::Speech));

    let out = (JobKind::LayeredSpeech.descriptor().merge)(
        &mut t,
        None,
        &serde_json::json!({ "segments": [] }),
        &ctx(),
    );
    assert_eq!(out, MergeOutcome::MissingField("segments"));
}

#[test]
fn segmentation_replaces_cached_regions() {
    let mut t = tl();
    let id = LayerId::from("a");
    let out = (JobKind::Segmentation.descriptor().merge)(
        &mut t,
        Some(&id),
        &serde_json::json!({ "segmentation": { "regions": [
            { "label": "person", "maskSrc": "m.png", "score": 0.9 }
        ] } }),
        &ctx(),
    );
    assert_eq!(out, MergeOutcome::Applied);
    let seg = t.layer(&id).unwrap().segmentation.as_ref().unwrap();
    assert_eq!(seg.regions[0].label, "person");
}
