// tests/timeline_scenarios.rs
use choreo_timeline::{
    BodyHeightParams, BodyState, ButtCircleParams, CommandFrame, Compositor, Easing,
    EngineConfig, Error, JumpParams, LeadLegPair, MoveCatalog, MoveInstance, MoveParams,
    NOMINAL_BODY_HEIGHT, RotateBodyParams, Sequence, SetColorParams, SwayParams,
    ValidationMode, Validator,
};
use glam::{EulerRot, Vec2, Vec3};

fn sway(start: u32, slices: u32) -> MoveInstance {
    MoveInstance::new("sway", start, slices, MoveParams::Sway(SwayParams::default()))
}

#[test]
fn test_sway_at_240_spm_yields_twenty_frames() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("sway", 240.0);
    sequence.push(sway(0, 8));

    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    assert_eq!(validated.duration_seconds(), 2.0);

    let compositor = Compositor::new(&validated, &catalog, CommandFrame::default(), 10.0).unwrap();
    let composition = compositor.compose();

    assert_eq!(composition.frames.len(), 20, "8 slices at 4 slices/s is 2 s");
    assert!(composition.faults.is_empty());
    for (k, frame) in composition.frames.iter().enumerate() {
        assert_eq!(frame.tick, k as u64);
        assert!((frame.time - k as f64 / 10.0).abs() < 1e-12);
    }
    assert_eq!(composition.frames[0].time, 0.0);
    assert!(composition.frames.last().unwrap().time < 2.0);
}

#[test]
fn test_streaming_matches_compose() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("stream", 240.0);
    sequence.push(sway(0, 8)).push(sway(8, 8));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();

    let config = EngineConfig {
        ticks_per_second: 25.0,
        ..Default::default()
    };
    let compositor =
        Compositor::with_config(&validated, &catalog, CommandFrame::default(), &config).unwrap();
    let streamed: Vec<CommandFrame> = compositor.frames().collect();
    assert_eq!(streamed.len() as u64, compositor.tick_count());
    assert_eq!(streamed, compositor.compose().frames);
}

#[test]
fn test_body_overlap_rejected_in_both_modes() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("overlap", 240.0);
    sequence.push(sway(0, 8)).push(sway(4, 8));

    for mode in [ValidationMode::Strict, ValidationMode::Lenient] {
        let errors = Validator::new(&catalog, mode)
            .validate(&sequence)
            .unwrap_err();
        assert_eq!(errors.len(), 1, "{mode:?}: {errors}");
        match &errors.errors()[0] {
            Error::MoveOverlap {
                first,
                second,
                channels,
            } => {
                assert_eq!((*first, *second), (0, 1));
                assert_eq!(channels, "body");
            }
            other => panic!("{mode:?}: unexpected error {other}"),
        }
    }
}

#[test]
fn test_disjoint_channels_may_stack() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("stack", 240.0);
    sequence.push(sway(0, 8)).push(MoveInstance::new(
        "set_color",
        2,
        4,
        MoveParams::defaults(choreo_timeline::MoveKind::SetColor),
    ));
    assert!(
        Validator::new(&catalog, ValidationMode::Strict)
            .validate(&sequence)
            .is_ok()
    );
}

#[test]
fn test_non_extendable_jump_strict_vs_lenient() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("jump", 240.0);
    sequence.push(MoveInstance::new(
        "jump",
        0,
        6,
        MoveParams::Jump(JumpParams::default()),
    ));

    let errors = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap_err();
    assert!(errors.any(|e| matches!(e, Error::InvalidDuration { index: 0, requested: 6, .. })));

    let validated = Validator::new(&catalog, ValidationMode::Lenient)
        .validate(&sequence)
        .unwrap();
    assert_eq!(validated.moves()[0].instance.requested_slices, 4);
    assert_eq!(validated.warnings().len(), 1);
    assert!(matches!(
        validated.warnings()[0].error,
        Error::InvalidDuration { index: 0, .. }
    ));
}

fn compose_single(instance: MoveInstance) -> Vec<CommandFrame> {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("single", 240.0);
    sequence.push(instance);
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    Compositor::new(&validated, &catalog, CommandFrame::default(), 10.0)
        .unwrap()
        .compose()
        .frames
}

#[test]
fn test_number_of_circles_wins_deterministically() {
    let both = MoveInstance::new(
        "butt_circle",
        0,
        16,
        MoveParams::ButtCircle(ButtCircleParams {
            radius: Some(0.05),
            number_of_circles: Some(1),
            beats_per_circle: Some(8.0),
            ..Default::default()
        }),
    );
    let first = compose_single(both.clone());
    for _ in 0..5 {
        assert_eq!(compose_single(both.clone()), first);
    }

    // Halfway through one full circle the hips sit opposite the start point.
    let start = CommandFrame::default().body.position;
    let halfway = first[20].body.position;
    assert_eq!(first[20].slice, 8.0);
    assert!((halfway.x - (start.x - 0.1)).abs() < 1e-5, "{halfway:?}");
    assert!((halfway.y - start.y).abs() < 1e-5, "{halfway:?}");
}

#[test]
fn test_lead_leg_pair_ignored_without_split() {
    let jump = |lead_leg_pair| {
        MoveInstance::new(
            "jump",
            0,
            4,
            MoveParams::Jump(JumpParams {
                translation: Some(Vec2::new(0.2, 0.0)),
                split_fraction: Some(0.0),
                lead_leg_pair,
                ..Default::default()
            }),
        )
    };
    let front = compose_single(jump(LeadLegPair::Front));
    let hind = compose_single(jump(LeadLegPair::Hind));
    assert_eq!(front, hind);

    let split = |lead_leg_pair| {
        MoveInstance::new(
            "jump",
            0,
            4,
            MoveParams::Jump(JumpParams {
                split_fraction: Some(0.2),
                lead_leg_pair,
                ..Default::default()
            }),
        )
    };
    assert_ne!(
        compose_single(split(LeadLegPair::Front)),
        compose_single(split(LeadLegPair::Hind))
    );
}

#[test]
fn test_channels_hold_last_state_between_moves() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("hold", 240.0);
    sequence
        .push(MoveInstance::new(
            "body_height",
            0,
            4,
            MoveParams::BodyHeight(choreo_timeline::BodyHeightParams {
                height: Some(-0.1),
                easing: None,
            }),
        ))
        .push(MoveInstance::new(
            "set_color",
            8,
            4,
            MoveParams::defaults(choreo_timeline::MoveKind::SetColor),
        ));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let frames = Compositor::new(&validated, &catalog, CommandFrame::default(), 4.0)
        .unwrap()
        .compose()
        .frames;

    assert_eq!(frames.len(), 12);
    let target = NOMINAL_BODY_HEIGHT - 0.1;
    let halfway = NOMINAL_BODY_HEIGHT - 0.05;
    assert!((frames[2].body.position.z - halfway).abs() < 1e-6);
    // Settled at slice 4 and held while no body move is active.
    for frame in &frames[4..] {
        assert!((frame.body.position.z - target).abs() < 1e-6, "{frame:?}");
    }
    assert_eq!(validated.final_state(), BodyState::Stand);
}

#[test]
fn test_rejects_bad_tick_rate() {
    let catalog = MoveCatalog::standard();
    let mut sequence = Sequence::new("rate", 240.0);
    sequence.push(sway(0, 8));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    for rate in [0.0, -5.0, f64::INFINITY] {
        assert!(matches!(
            Compositor::new(&validated, &catalog, CommandFrame::default(), rate),
            Err(Error::InvalidTickRate { .. })
        ));
    }
}

fn compose_sequence(sequence: &Sequence, ticks_per_second: f64) -> Vec<CommandFrame> {
    let catalog = MoveCatalog::standard();
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(sequence)
        .unwrap();
    Compositor::new(&validated, &catalog, CommandFrame::default(), ticks_per_second)
        .unwrap()
        .compose()
        .frames
}

fn set_color(start: u32, slices: u32, color: Vec3) -> MoveInstance {
    MoveInstance::new(
        "set_color",
        start,
        slices,
        MoveParams::SetColor(SetColorParams {
            color: Some(color),
            ..Default::default()
        }),
    )
}

#[test]
fn test_moves_start_on_exact_slice_boundaries() {
    // 100 spm at 30 ticks/s: tick 306 is exactly slice 17.
    let red = Vec3::new(1.0, 0.0, 0.0);
    let blue = Vec3::new(0.0, 0.0, 1.0);
    let mut sequence = Sequence::new("boundary", 100.0);
    sequence.push(set_color(0, 17, red)).push(set_color(17, 4, blue));

    let frames = compose_sequence(&sequence, 30.0);
    assert_eq!(frames.len(), 378);
    assert_eq!(frames[306].slice, 17.0);
    assert_eq!(frames[305].lights.0, red);
    assert_eq!(frames[306].lights.0, blue, "blue starts on its first slice");
    // Every tick that lands on a whole slice reports it exactly.
    for frame in &frames {
        let exact = frame.tick * 100;
        if exact % (60 * 30) == 0 {
            assert_eq!(frame.slice, (exact / (60 * 30)) as f64, "tick {}", frame.tick);
        }
    }
}

#[test]
fn test_easing_shapes_composed_frames() {
    let height = |easing| {
        MoveInstance::new(
            "body_height",
            0,
            4,
            MoveParams::BodyHeight(BodyHeightParams {
                height: Some(-0.1),
                easing,
            }),
        )
    };
    let mut linear = Sequence::new("linear", 240.0);
    linear.push(height(None));
    let mut eased = Sequence::new("eased", 240.0);
    eased.push(height(Some(Easing::QuadraticIn)));

    let linear = compose_sequence(&linear, 4.0);
    let eased = compose_sequence(&eased, 4.0);
    // Quadratic-in covers a quarter of the distance by the halfway point.
    assert!((linear[2].body.position.z - (NOMINAL_BODY_HEIGHT - 0.05)).abs() < 1e-6);
    assert!((eased[2].body.position.z - (NOMINAL_BODY_HEIGHT - 0.025)).abs() < 1e-6);
    assert!((eased[1].body.position.z - (NOMINAL_BODY_HEIGHT - 0.00625)).abs() < 1e-6);
    assert_eq!(eased[0].body, CommandFrame::default().body);
}

#[test]
fn test_rotate_body_blends_in_and_back_out() {
    let mut sequence = Sequence::new("rotate", 240.0);
    sequence
        .push(MoveInstance::new(
            "rotate_body",
            0,
            8,
            MoveParams::RotateBody(RotateBodyParams {
                rotation: Some(Vec3::new(0.4, 0.0, 0.0)),
                entry_slices: Some(4.0),
                exit_slices: Some(4.0),
                ..Default::default()
            }),
        ))
        .push(set_color(8, 4, Vec3::ONE));

    let frames = compose_sequence(&sequence, 4.0);
    assert_eq!(frames.len(), 12);
    let yaw = |k: usize| frames[k].body.rotation.to_euler(EulerRot::ZYX).0;

    // Move yaw is 0.4 * p, scaled by the entry or exit weight.
    assert!(yaw(0).abs() < 1e-4);
    assert!((yaw(2) - 0.05).abs() < 1e-4, "entry half way: {}", yaw(2));
    assert!((yaw(4) - 0.2).abs() < 1e-4, "fully blended: {}", yaw(4));
    assert!((yaw(6) - 0.15).abs() < 1e-4, "exit half way: {}", yaw(6));
    // Back on the snapshot from the move's first tick, and held there.
    for k in 8..12 {
        assert!(yaw(k).abs() < 1e-4, "tick {k}: {}", yaw(k));
        assert_eq!(frames[k].body.position, CommandFrame::default().body.position);
    }
}
