// tests/loading_and_pacing.rs
use choreo_timeline::{
    BodyState, CommandFrame, Compositor, ControlFlags, EngineConfig, MoveCatalog, MoveKind,
    MoveParams, Pace, Pacer, Sequence, ValidationMode, Validator,
};
use glam::{Vec2, Vec3};

const SEQUENCE_JSON: &str = r#"{
    "name": "demo",
    "slices_per_minute": 240.0,
    "moves": [
        {
            "move_type": "sway",
            "start_slice": 0,
            "requested_slices": 8,
            "params": { "kind": "sway", "horizontal": 0.1, "easing": "cubic_in_out" }
        },
        {
            "move_type": "set_color",
            "start_slice": 0,
            "requested_slices": 4,
            "params": { "kind": "set_color", "color": [1.0, 0.0, 0.0], "fade": true }
        },
        {
            "move_type": "jump",
            "start_slice": 8,
            "requested_slices": 4,
            "params": {
                "kind": "jump",
                "translation": [0.1, 0.0],
                "translation_frame": "absolute",
                "lead_leg_pair": "hind"
            }
        }
    ]
}"#;

#[test]
fn test_sequence_loads_from_json() {
    let sequence: Sequence = serde_json::from_str(SEQUENCE_JSON).unwrap();
    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.initial_state, BodyState::Stand);

    match &sequence.moves[0].params {
        MoveParams::Sway(params) => {
            assert_eq!(params.horizontal, Some(0.1));
            // Unspecified stays unspecified rather than becoming zero.
            assert_eq!(params.vertical, None);
        }
        other => panic!("unexpected params {other:?}"),
    }
    match &sequence.moves[2].params {
        MoveParams::Jump(params) => {
            assert_eq!(params.translation, Some(Vec2::new(0.1, 0.0)));
            assert_eq!(params.yaw, None);
        }
        other => panic!("unexpected params {other:?}"),
    }

    let catalog = MoveCatalog::standard();
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let composition = Compositor::new(&validated, &catalog, CommandFrame::default(), 20.0)
        .unwrap()
        .compose();
    assert_eq!(composition.frames.len(), 60);

    // The fade has finished by slice 4 and the color holds.
    let red = Vec3::new(1.0, 0.0, 0.0);
    assert!(composition.frames[30].lights.0.abs_diff_eq(red, 1e-6));
}

#[test]
fn test_catalog_survives_json() {
    let catalog = MoveCatalog::standard();
    let json = serde_json::to_string(&catalog).unwrap();
    let loaded: MoveCatalog = serde_json::from_str(&json).unwrap();

    assert_eq!(loaded.len(), catalog.len());
    let jump = loaded.get("jump").unwrap();
    assert_eq!(jump.kind, MoveKind::Jump);
    assert_eq!(jump.default_slices, 4);
    assert!(!jump.extendable);
    assert_eq!(jump.controls, ControlFlags::BODY_AND_LEGS);
    assert_eq!(loaded.get("sit").unwrap().exit_state, Some(BodyState::Sit));
}

#[test]
fn test_config_defaults_fill_missing_fields() {
    let config: EngineConfig = serde_json::from_str(r#"{ "mode": "lenient" }"#).unwrap();
    assert_eq!(config.mode, ValidationMode::Lenient);
    assert_eq!(config.ticks_per_second, 50.0);
    assert_eq!(config.latency_tolerance_seconds, 0.005);
}

#[test]
fn test_pacer_reports_missed_deadlines() {
    let sequence: Sequence = serde_json::from_str(SEQUENCE_JSON).unwrap();
    let catalog = MoveCatalog::standard();
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let compositor = Compositor::new(&validated, &catalog, CommandFrame::default(), 10.0).unwrap();
    let mut pacer = Pacer::new(compositor.frames(), 0.01);

    assert!(matches!(pacer.poll(0.0), Pace::Ready(frame) if frame.tick == 0));
    assert!(matches!(pacer.poll(0.05), Pace::Wait(_)));
    assert!(matches!(pacer.poll(0.1), Pace::Ready(frame) if frame.tick == 1));

    // A stall: frame 2 was due at 0.2 s.
    match pacer.poll(0.45) {
        Pace::Late { frame, fault } => {
            assert_eq!(frame.tick, 2);
            assert_eq!(fault.tick, 2);
            assert!((fault.lateness() - 0.25).abs() < 1e-9);
        }
        other => panic!("expected a late frame, got {other:?}"),
    }

    let mut delivered = 3;
    loop {
        match pacer.poll(f64::MAX) {
            Pace::Finished => break,
            Pace::Late { .. } | Pace::Ready(_) => delivered += 1,
            Pace::Wait(_) => unreachable!("everything is due"),
        }
    }
    assert_eq!(delivered, 30, "late frames are delivered, not dropped");
    assert_eq!(pacer.fault_count(), 28);
}
