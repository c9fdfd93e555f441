use super::*;

#[test]
fn defaults_validate() {
    let cfg = EditorConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.fps().as_f64(), 30.0);
    assert_eq!(cfg.working_canvas().width, 1024);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = EditorConfig::from_json_str(
        r#"{ "sessionId": "s-42", "aspectRatio": "9:16", "pollIntervalOverridesMs": { "audio": 500 } }"#,
    )
    .unwrap();
    assert_eq!(cfg.session_id, "s-42");
    assert_eq!(cfg.working_canvas().height, 1792);
    assert_eq!(cfg.default_layer_duration, 2.0);
    assert_eq!(cfg.poll_interval(JobKind::Audio), Duration::from_millis(500));
    assert_eq!(
        cfg.poll_interval(JobKind::ImageGeneration),
        Duration::from_secs(1)
    );
}

#[test]
fn invalid_values_are_rejected() {
    assert!(EditorConfig::from_json_str(r#"{ "sessionId": "  " }"#).is_err());
    assert!(EditorConfig::from_json_str(r#"{ "defaultLayerDuration": 0 }"#).is_err());
    assert!(EditorConfig::from_json_str(r#"{ "zoom": -1 }"#).is_err());
    assert!(
        EditorConfig::from_json_str(r#"{ "pollIntervalOverridesMs": { "lipSync": 0 } }"#).is_err()
    );
}
