// tests/animation_blending.rs
use choreo_timeline::{
    AnimateParams, Animation, AnimationBlender, AnimationKeyframe, ArmJointTargets, CommandFrame,
    Compositor, ControlFlags, Error, GripperParams, MoveCatalog, MoveInstance, MoveKind,
    MoveParams, MoveType, NOMINAL_BODY_HEIGHT, Sequence, ValidationMode, Validator,
};
use glam::{EulerRot, Quat, Vec3};

fn gripper_key(time: f64, gripper: f32) -> AnimationKeyframe {
    AnimationKeyframe {
        gripper: Some(gripper),
        ..AnimationKeyframe::at(time)
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn test_unset_field_interpolates_between_set_points() {
    let keyframes = vec![
        AnimationKeyframe {
            body_position: Some(Vec3::ZERO),
            ..gripper_key(0.0, 0.0)
        },
        // Sets only the body; the gripper track skips this keyframe.
        AnimationKeyframe {
            body_position: Some(Vec3::new(0.0, 0.0, 0.1)),
            ..AnimationKeyframe::at(1.0)
        },
        gripper_key(2.0, 10.0),
    ];
    let animation = Animation::new("reach", 120.0, keyframes);
    let blender = AnimationBlender::new(&animation).unwrap();

    let pose = blender.sample(1.5);
    assert_eq!(pose.gripper, Some(7.5));
    // Body track holds its last set-point after t = 1.
    assert_eq!(pose.body_position, Some(Vec3::new(0.0, 0.0, 0.1)));
    // Fields no keyframe sets stay undriven.
    assert_eq!(pose.body_rotation, None);
    assert!(pose.arm.iter().all(Option::is_none));
}

#[test]
fn test_tracks_hold_outside_their_range() {
    let animation = Animation::new(
        "late",
        120.0,
        vec![
            AnimationKeyframe::at(0.0),
            gripper_key(1.0, 0.4),
            gripper_key(2.0, 0.8),
        ],
    );
    let blender = AnimationBlender::new(&animation).unwrap();
    assert_eq!(blender.sample(0.0).gripper, Some(0.4));
    assert_eq!(blender.sample(5.0).gripper, Some(0.8));
}

#[test]
fn test_keyframe_order_strict_and_lenient() {
    let shuffled = || {
        Animation::new(
            "shuffled",
            120.0,
            vec![gripper_key(0.0, 0.0), gripper_key(2.0, 1.0), gripper_key(1.0, 0.5)],
        )
    };

    let mut catalog = MoveCatalog::standard();
    let err = catalog
        .register_animation(shuffled(), ValidationMode::Strict)
        .unwrap_err();
    assert_eq!(
        err,
        Error::UnorderedKeyframe {
            animation: "shuffled".into(),
            index: 2
        }
    );
    assert!(!catalog.contains("shuffled"));

    catalog
        .register_animation(shuffled(), ValidationMode::Lenient)
        .unwrap();
    let times: Vec<f64> = catalog
        .animation("shuffled")
        .unwrap()
        .keyframes
        .iter()
        .map(|k| k.time)
        .collect();
    assert_eq!(times, [0.0, 1.0, 2.0]);
}

#[test]
fn test_equal_times_merge_in_lenient_mode() {
    let mut arm = AnimationKeyframe::at(1.0);
    arm.arm = ArmJointTargets {
        elbow_0: Some(0.3),
        ..Default::default()
    };
    let mut animation = Animation::new(
        "merge",
        120.0,
        vec![gripper_key(0.0, 0.0), gripper_key(1.0, 0.5), arm],
    );
    assert!(animation.normalize(ValidationMode::Strict).is_err());
    animation.normalize(ValidationMode::Lenient).unwrap();
    assert_eq!(animation.keyframes.len(), 2);
    assert_eq!(animation.keyframes[1].gripper, Some(0.5));
    assert_eq!(animation.keyframes[1].arm.elbow_0, Some(0.3));
}

#[test]
fn test_empty_animation_rejected() {
    let mut catalog = MoveCatalog::new();
    let nothing = Animation::new("nothing", 120.0, Vec::new());
    let err = catalog
        .register_animation(nothing, ValidationMode::Lenient)
        .unwrap_err();
    assert_eq!(err, Error::EmptyAnimation("nothing".into()));
}

#[test]
fn test_registration_derives_length_and_controls() {
    // 1.9 s at 120 bpm is 15.2 slices.
    let mut retimed = Animation::new(
        "retimed",
        120.0,
        vec![gripper_key(0.0, 0.0), gripper_key(1.9, 1.0)],
    );
    let mut nominal = retimed.clone();
    nominal.name = "nominal".into();
    nominal.retime_to_integer_slices = false;
    retimed.extendable = true;

    let mut catalog = MoveCatalog::new();
    let move_type = catalog
        .register_animation(retimed, ValidationMode::Strict)
        .unwrap();
    assert_eq!(move_type.kind, MoveKind::Animate);
    assert_eq!(move_type.default_slices, 15);
    assert!(move_type.extendable);
    assert_eq!(move_type.controls, ControlFlags::GRIPPER);

    let move_type = catalog
        .register_animation(nominal, ValidationMode::Strict)
        .unwrap();
    assert_eq!(move_type.default_slices, 16);
    assert!(!move_type.extendable);

    let duplicate = Animation::new("nominal", 120.0, vec![gripper_key(0.0, 0.0)]);
    assert_eq!(
        catalog
            .register_animation(duplicate, ValidationMode::Strict)
            .unwrap_err(),
        Error::DuplicateMoveType("nominal".into())
    );
}

#[test]
fn test_retiming_policy_maps_time() {
    let mut animation = Animation::new(
        "two",
        120.0,
        vec![gripper_key(0.0, 0.0), gripper_key(2.0, 1.0)],
    );
    let retimed = AnimationBlender::new(&animation).unwrap();
    // Stretched to fill a 4 s move.
    assert_eq!(retimed.animation_time(2.0, 4.0, 1.0, 0.0), 1.0);
    // Speed scales before the stretch, offset shifts the start.
    assert_eq!(retimed.animation_time(1.0, 4.0, 2.0, 0.0), 1.0);
    assert_eq!(retimed.animation_time(0.0, 4.0, 1.0, 2.0), 1.0);

    animation.retime_to_integer_slices = false;
    let nominal = AnimationBlender::new(&animation).unwrap();
    assert_eq!(nominal.animation_time(2.0, 4.0, 1.0, 0.0), 2.0);
    // Past the last keyframe the tail holds.
    let params = AnimateParams::default();
    assert_eq!(nominal.sample_move(3.0, 4.0, 0.0, &params).gripper, Some(1.0));
}

#[test]
fn test_multipliers_apply_before_offsets() {
    let animation = Animation::new(
        "scale",
        60.0,
        vec![gripper_key(0.0, 0.0), gripper_key(1.0, 1.0)],
    );
    let blender = AnimationBlender::new(&animation).unwrap();
    let params = AnimateParams {
        gripper_multiplier: Some(2.0),
        gripper_offset: Some(0.1),
        ..Default::default()
    };
    let pose = blender.sample_move(0.5, 1.0, 0.0, &params);
    assert!(close(pose.gripper.unwrap(), 1.1));
}

#[test]
fn test_body_transform_scales_then_offsets() {
    let animation = Animation::new(
        "lean",
        60.0,
        vec![
            AnimationKeyframe {
                body_position: Some(Vec3::ZERO),
                body_rotation: Some(Quat::IDENTITY),
                ..AnimationKeyframe::at(0.0)
            },
            AnimationKeyframe {
                body_position: Some(Vec3::new(0.1, 0.2, 0.0)),
                body_rotation: Some(Quat::from_rotation_z(0.2)),
                ..AnimationKeyframe::at(1.0)
            },
        ],
    );
    let blender = AnimationBlender::new(&animation).unwrap();
    let params = AnimateParams {
        translation_multiplier: Some(Vec3::new(2.0, 1.0, 1.0)),
        translation_offset: Some(Vec3::new(0.0, 0.0, 0.05)),
        rotation_multiplier: Some(Vec3::new(0.5, 1.0, 1.0)),
        ..Default::default()
    };

    let pose = blender.sample_move(1.0, 1.0, 0.0, &params);
    let position = pose.body_position.unwrap();
    assert!((position - Vec3::new(0.2, 0.2, 0.05)).length() < 1e-5, "{position}");
    let (yaw, pitch, roll) = pose.body_rotation.unwrap().to_euler(EulerRot::ZYX);
    assert!(close(yaw, 0.1), "yaw {yaw}");
    assert!(close(pitch, 0.0) && close(roll, 0.0));

    // Unset multipliers and offsets leave the pose untouched.
    let plain = blender.sample_move(1.0, 1.0, 0.0, &AnimateParams::default());
    assert!((plain.body_position.unwrap() - Vec3::new(0.1, 0.2, 0.0)).length() < 1e-5);
}

fn gripper_catalog() -> MoveCatalog {
    let mut catalog = MoveCatalog::standard();
    // One second at 60 bpm is four slices.
    catalog
        .register_animation(
            Animation::new("clap", 60.0, vec![gripper_key(0.0, 0.0), gripper_key(1.0, 1.0)]),
            ValidationMode::Strict,
        )
        .unwrap();
    catalog
}

#[test]
fn test_animate_move_plays_and_settles() {
    let catalog = gripper_catalog();
    let mut sequence = Sequence::new("clap", 240.0);
    sequence
        .push(MoveInstance::new(
            "clap",
            0,
            4,
            MoveParams::Animate(AnimateParams::default()),
        ))
        .push(MoveInstance::new(
            "set_color",
            4,
            4,
            MoveParams::defaults(MoveKind::SetColor),
        ));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let composition = Compositor::new(&validated, &catalog, CommandFrame::default(), 4.0)
        .unwrap()
        .compose();

    assert!(composition.faults.is_empty());
    let grippers: Vec<f32> = composition.frames.iter().map(|f| f.gripper).collect();
    let expected = [0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0];
    assert_eq!(grippers.len(), expected.len());
    for (got, want) in grippers.iter().zip(expected) {
        assert!(close(*got, want), "{grippers:?}");
    }
    // The animation drives only the gripper.
    assert_eq!(composition.frames[2].body, CommandFrame::default().body);
}

#[test]
fn test_speed_scales_playback() {
    let catalog = gripper_catalog();
    let mut sequence = Sequence::new("fast clap", 240.0);
    sequence.push(MoveInstance::new(
        "clap",
        0,
        4,
        MoveParams::Animate(AnimateParams {
            speed: Some(2.0),
            ..Default::default()
        }),
    ));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let frames = Compositor::new(&validated, &catalog, CommandFrame::default(), 4.0)
        .unwrap()
        .compose()
        .frames;
    let grippers: Vec<f32> = frames.iter().map(|f| f.gripper).collect();
    for (got, want) in grippers.iter().zip([0.0, 0.5, 1.0, 1.0]) {
        assert!(close(*got, want), "{grippers:?}");
    }
}

#[test]
fn test_evaluation_fault_holds_last_state() {
    let mut catalog = MoveCatalog::standard();
    // An animate move type with no animation data behind it.
    catalog
        .insert(MoveType::new("ghost", MoveKind::Animate, 4, ControlFlags::GRIPPER))
        .unwrap();

    let mut sequence = Sequence::new("ghost", 240.0);
    sequence
        .push(MoveInstance::new(
            "gripper",
            0,
            4,
            MoveParams::Gripper(GripperParams {
                angle: Some(0.5),
                easing: None,
            }),
        ))
        .push(MoveInstance::new(
            "ghost",
            4,
            4,
            MoveParams::Animate(AnimateParams::default()),
        ));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let composition = Compositor::new(&validated, &catalog, CommandFrame::default(), 4.0)
        .unwrap()
        .compose();

    assert_eq!(composition.frames.len(), 8, "playback continues past the fault");
    assert_eq!(composition.faults.len(), 1, "reported once per move");
    assert!(matches!(
        &composition.faults[0],
        Error::MoveEvaluation { index: 1, name, .. } if name == "ghost"
    ));
    assert!(close(composition.frames[2].gripper, 0.25));
    for frame in &composition.frames[4..] {
        assert!(close(frame.gripper, 0.5), "{frame:?}");
    }
}

#[test]
fn test_duplicate_move_type_rejected() {
    let mut catalog = MoveCatalog::standard();
    let err = catalog
        .insert(MoveType::new("sway", MoveKind::Sway, 8, ControlFlags::BODY))
        .unwrap_err();
    assert_eq!(err, Error::DuplicateMoveType("sway".into()));
}

#[test]
fn test_entry_blend_only_touches_the_body() {
    let mut catalog = MoveCatalog::standard();
    // Gripper 0 to 1 and a 10 cm rise over four slices.
    catalog
        .register_animation(
            Animation::new(
                "rise",
                60.0,
                vec![
                    AnimationKeyframe {
                        body_position: Some(Vec3::ZERO),
                        ..gripper_key(0.0, 0.0)
                    },
                    AnimationKeyframe {
                        body_position: Some(Vec3::new(0.0, 0.0, 0.1)),
                        ..gripper_key(1.0, 1.0)
                    },
                ],
            ),
            ValidationMode::Strict,
        )
        .unwrap();

    let mut sequence = Sequence::new("rise", 240.0);
    sequence.push(MoveInstance::new(
        "rise",
        0,
        4,
        MoveParams::Animate(AnimateParams {
            body_entry_slices: Some(4.0),
            ..Default::default()
        }),
    ));
    let validated = Validator::new(&catalog, ValidationMode::Strict)
        .validate(&sequence)
        .unwrap();
    let frames = Compositor::new(&validated, &catalog, CommandFrame::default(), 4.0)
        .unwrap()
        .compose()
        .frames;
    assert_eq!(frames.len(), 4);

    for (k, frame) in frames.iter().enumerate() {
        let p = k as f32 / 4.0;
        // The gripper plays unblended while the body ramps in with weight p.
        assert!(close(frame.gripper, p), "tick {k}: gripper {}", frame.gripper);
        let rise = frame.body.position.z - NOMINAL_BODY_HEIGHT;
        assert!(close(rise, 0.1 * p * p), "tick {k}: rise {rise}");
    }
}
