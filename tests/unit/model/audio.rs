use super::*;

#[test]
fn audible_window_is_half_open() {
    let track = AudioLayer::new(AudioKind::Music, "song.mp3", 2.0, 3.0);
    assert_eq!(track.end_time, 5.0);
    assert!(!track.is_audible_at(1.99));
    assert!(track.is_audible_at(2.0));
    assert!(!track.is_audible_at(5.0));

    let mut muted = track.clone();
    muted.is_enabled = false;
    assert!(!muted.is_audible_at(3.0));
}

#[test]
fn wire_defaults_volume_and_enabled() {
    let json = r#"{ "_id": "a1", "kind": "speech", "src": "v.mp3", "startTime": 0, "endTime": 1, "duration": 1 }"#;
    let track: AudioLayer = serde_json::from_str(json).unwrap();
    assert_eq!(track.volume, 1.0);
    assert!(track.is_enabled);
    track.validate().unwrap();
}

#[test]
fn validate_rejects_inverted_or_loud_tracks() {
    let mut track = AudioLayer::new(AudioKind::Sound, "fx.wav", 1.0, 1.0);
    track.end_time = 0.5;
    assert!(track.validate().is_err());

    let mut track = AudioLayer::new(AudioKind::Sound, "fx.wav", 1.0, 1.0);
    track.volume = 3.0;
    assert!(track.validate().is_err());

    assert!(AudioLayer::new(AudioKind::Sound, "", 0.0, 1.0).validate().is_err());
    assert!(AudioLayer::new(AudioKind::Sound, "x", -1.0, 1.0).validate().is_err());
}
