//! Motion functions: what each move kind contributes to the channels it drives,
//! at a given point in its progress.

use crate::animation::AnimationBlender;
use crate::catalog::MoveType;
use crate::clock::{SLICES_PER_BEAT, SliceClock};
use crate::easing::ease;
use crate::error::{Error, Result};
use crate::frame::{
    ArmTarget, BodyPose, BodyState, CommandFrame, FRONT_LEFT, FRONT_RIGHT, HIND_LEFT, HIND_RIGHT,
    Legs, LightColor, NOMINAL_BODY_HEIGHT, lerp_legs, standing_legs,
};
use crate::moves::{
    AnimateParams, ArmMoveParams, BodyHeightParams, ButtCircleParams, GripperParams, JumpParams,
    LeadLegPair, MotionFrame, MoveParams, RotateBodyParams, SetColorParams, SwayParams,
};
use crate::sequence::MoveInstance;
use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::{PI, TAU};

/// Slices per full sway cycle (two beats).
const SWAY_CYCLE_SLICES: f32 = 8.0;
const DEFAULT_SWAY_HORIZONTAL: f32 = 0.05;
const DEFAULT_CIRCLE_RADIUS: f32 = 0.05;
const DEFAULT_BEATS_PER_CIRCLE: f32 = 4.0;
const DEFAULT_JUMP_HEIGHT: f32 = 0.1;
/// Part of a jump spent on the ground before liftoff and after touchdown.
const JUMP_GROUND_FRACTION: f32 = 0.2;
const JUMP_FOOT_TUCK: f32 = 0.06;

/// Everything a motion function may read.
pub struct MotionContext<'a> {
    /// Index of the move in the submitted sequence.
    pub index: usize,
    pub move_type: &'a MoveType,
    pub instance: &'a MoveInstance,
    pub clock: &'a SliceClock,
    /// Channel state when the move became active.
    pub start: &'a CommandFrame,
    /// State at the start of the choreography.
    pub origin: &'a CommandFrame,
    /// Slices elapsed since `instance.start_slice`.
    pub local_slices: f64,
    pub animation: Option<&'a AnimationBlender>,
}

impl MotionContext<'_> {
    /// Un-eased progress through the move, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let length = f64::from(self.instance.requested_slices.max(1));
        (self.local_slices / length).clamp(0.0, 1.0)
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::MoveEvaluation {
            index: self.index,
            name: self.move_type.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Per-channel output of one move at one instant. `None` leaves the channel alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contribution {
    pub body: Option<BodyPose>,
    pub legs: Option<Legs>,
    pub arm: Option<ArmTarget>,
    pub gripper: Option<f32>,
    pub lights: Option<LightColor>,
}

impl Contribution {
    pub fn is_finite(&self) -> bool {
        self.body.is_none_or(|b| b.is_finite())
            && self
                .legs
                .is_none_or(|legs| legs.iter().all(|l| l.position.is_finite()))
            && self
                .arm
                .is_none_or(|a| a.joint_angles.iter().all(|j| j.is_finite()))
            && self.gripper.is_none_or(f32::is_finite)
            && self.lights.is_none_or(|c| c.0.is_finite())
    }

    /// Writes the contribution into `frame`.
    pub fn apply_to(&self, frame: &mut CommandFrame) {
        if let Some(body) = self.body {
            frame.body = body;
        }
        if let Some(legs) = self.legs {
            frame.legs = legs;
        }
        if let Some(arm) = self.arm {
            frame.arm = arm;
        }
        if let Some(gripper) = self.gripper {
            frame.gripper = gripper;
        }
        if let Some(lights) = self.lights {
            frame.lights = lights;
        }
    }
}

/// Evaluates the move described by `ctx`.
///
/// Fails with [`Error::MoveEvaluation`] when the move cannot produce a finite
/// pose; the caller is expected to hold the previous state in that case.
pub fn evaluate(ctx: &MotionContext<'_>) -> Result<Contribution> {
    let p = ctx.progress();
    let eased = ease(ctx.instance.params.easing(), p) as f32;
    let contribution = match &ctx.instance.params {
        MoveParams::BodyHeight(params) => body_height(ctx, params, eased),
        MoveParams::Sway(params) => sway(ctx, params, eased),
        MoveParams::ButtCircle(params) => butt_circle(ctx, params, p as f32),
        MoveParams::RotateBody(params) => rotate_body(ctx, params, p),
        MoveParams::Jump(params) => jump(ctx, params, p as f32),
        MoveParams::Posture(_) => posture(ctx, eased),
        MoveParams::ArmMove(params) => arm_move(ctx, params, eased),
        MoveParams::Gripper(params) => gripper(ctx, params, eased),
        MoveParams::SetColor(params) => set_color(ctx, params, eased),
        MoveParams::Animate(params) => animate(ctx, params)?,
    };
    if !contribution.is_finite() {
        return Err(ctx.fail("motion produced a non-finite pose"));
    }
    Ok(contribution)
}

fn body_height(ctx: &MotionContext<'_>, params: &BodyHeightParams, p: f32) -> Contribution {
    let start = ctx.start.body;
    let target = params
        .height
        .map_or(start.position.z, |h| NOMINAL_BODY_HEIGHT + h);
    let mut body = start;
    body.position.z = start.position.z + (target - start.position.z) * p;
    Contribution {
        body: Some(body),
        ..Default::default()
    }
}

fn sway(ctx: &MotionContext<'_>, params: &SwayParams, p: f32) -> Contribution {
    let slices = p * ctx.instance.requested_slices as f32;
    let wave = (TAU * slices / SWAY_CYCLE_SLICES).sin();
    let sharpness = 1.0 - 0.8 * params.pronounced.unwrap_or(0.0).clamp(0.0, 1.0);
    let w = wave.signum() * wave.abs().powf(sharpness);

    let horizontal = params.horizontal.unwrap_or(DEFAULT_SWAY_HORIZONTAL);
    let vertical = params.vertical.unwrap_or(0.0);
    let roll = params.roll.unwrap_or(0.0);

    let start = ctx.start.body;
    let offset = Vec3::new(0.0, horizontal * w, vertical * w);
    Contribution {
        body: Some(BodyPose {
            position: start.position + start.rotation * offset,
            rotation: start.rotation * Quat::from_rotation_x(roll * w),
        }),
        ..Default::default()
    }
}

/// Number of circles for a butt-circle move. `number_of_circles` wins over
/// `beats_per_circle` when both are given.
pub fn circle_count(params: &ButtCircleParams, requested_slices: u32) -> f32 {
    match params.number_of_circles {
        Some(n) => n as f32,
        None => {
            let beats = params.beats_per_circle.unwrap_or(DEFAULT_BEATS_PER_CIRCLE);
            requested_slices as f32 / (beats * SLICES_PER_BEAT as f32)
        }
    }
}

fn butt_circle(ctx: &MotionContext<'_>, params: &ButtCircleParams, p: f32) -> Contribution {
    let radius = params.radius.unwrap_or(DEFAULT_CIRCLE_RADIUS);
    let circles = circle_count(params, ctx.instance.requested_slices);
    let direction = if params.clockwise.unwrap_or(false) {
        -1.0
    } else {
        1.0
    };
    let theta0 = params.starting_angle.unwrap_or(0.0);
    let theta = theta0 + direction * TAU * circles * p;

    let start = ctx.start.body;
    let offset = radius * Vec3::new(theta.cos() - theta0.cos(), theta.sin() - theta0.sin(), 0.0);
    Contribution {
        body: Some(BodyPose {
            position: start.position + start.rotation * offset,
            rotation: start.rotation,
        }),
        ..Default::default()
    }
}

fn rotate_body(ctx: &MotionContext<'_>, params: &RotateBodyParams, p: f64) -> Contribution {
    let euler = params.rotation.unwrap_or(Vec3::ZERO);
    let start = ctx.start.body;
    let target = start.rotation * Quat::from_euler(EulerRot::ZYX, euler.x, euler.y, euler.z);
    let progress = if params.return_to_start_pose.unwrap_or(false) {
        // Out over the first half, back over the second.
        if p < 0.5 { 2.0 * p } else { 2.0 - 2.0 * p }
    } else {
        p
    };
    let amount = ease(params.easing, progress) as f32;
    Contribution {
        body: Some(BodyPose {
            position: start.position,
            rotation: start.rotation.slerp(target, amount),
        }),
        ..Default::default()
    }
}

/// Legs of the pair that leaves the ground first.
fn lead_legs(params: &JumpParams) -> [usize; 2] {
    let pair = match params.lead_leg_pair {
        LeadLegPair::Auto => {
            let forward = params.translation.is_none_or(|t| t.x >= 0.0);
            if forward {
                LeadLegPair::Front
            } else {
                LeadLegPair::Hind
            }
        }
        pair => pair,
    };
    match pair {
        LeadLegPair::Front | LeadLegPair::Auto => [FRONT_LEFT, FRONT_RIGHT],
        LeadLegPair::Hind => [HIND_LEFT, HIND_RIGHT],
        LeadLegPair::Left => [FRONT_LEFT, HIND_LEFT],
        LeadLegPair::Right => [FRONT_RIGHT, HIND_RIGHT],
    }
}

fn jump(ctx: &MotionContext<'_>, params: &JumpParams, p: f32) -> Contribution {
    let start = ctx.start.body;
    let origin = ctx.origin.body;

    let target_rotation = match (params.yaw, params.yaw_frame) {
        (None, _) => start.rotation,
        (Some(yaw), MotionFrame::Relative) => start.rotation * Quat::from_rotation_z(yaw),
        (Some(yaw), MotionFrame::Absolute) => origin.rotation * Quat::from_rotation_z(yaw),
    };
    let target_position = match (params.translation, params.translation_frame) {
        (None, _) => start.position,
        (Some(t), MotionFrame::Relative) => {
            start.position + start.rotation * Vec3::new(t.x, t.y, 0.0)
        }
        (Some(t), MotionFrame::Absolute) => {
            let point = origin.position + origin.rotation * Vec3::new(t.x, t.y, 0.0);
            Vec3::new(point.x, point.y, start.position.z)
        }
    };

    let height = params.height.unwrap_or(DEFAULT_JUMP_HEIGHT);
    let mut position = start.position.lerp(target_position, p);
    position.z = start.position.z + height * 4.0 * p * (1.0 - p);
    let body = BodyPose {
        position,
        rotation: start.rotation.slerp(target_rotation, p),
    };

    // The lead pair is only consulted for a split jump.
    let split = params.split_fraction.unwrap_or(0.0).max(0.0);
    let lead = (split > 0.0).then(|| lead_legs(params));
    let liftoff = JUMP_GROUND_FRACTION;
    let touchdown = 1.0 - JUMP_GROUND_FRACTION;
    let mut legs = ctx.start.legs;
    for (i, leg) in legs.iter_mut().enumerate() {
        let (up, down) = match lead {
            None => (liftoff, touchdown),
            Some(pair) if pair.contains(&i) => (liftoff, touchdown - split),
            Some(_) => (liftoff + split, touchdown),
        };
        if p >= up && p < down {
            let phase = (p - up) / (down - up);
            leg.stance = false;
            leg.position.z += JUMP_FOOT_TUCK * (PI * phase).sin();
        } else {
            leg.stance = true;
        }
    }

    Contribution {
        body: Some(body),
        legs: Some(legs),
        ..Default::default()
    }
}

/// Body height, pitch and feet for a resting posture.
pub fn posture_pose(state: BodyState) -> (f32, f32, Legs) {
    let mut legs = standing_legs();
    match state {
        BodyState::Stand => (NOMINAL_BODY_HEIGHT, 0.0, legs),
        BodyState::Sit => {
            let h = 0.30;
            legs[FRONT_LEFT].position.z = -h - 0.12;
            legs[FRONT_RIGHT].position.z = -h - 0.12;
            for i in [HIND_LEFT, HIND_RIGHT] {
                legs[i].position = Vec3::new(-0.10, legs[i].position.y, -0.18);
            }
            (h, -0.35, legs)
        }
        BodyState::Kneel => {
            let h = 0.30;
            for i in [FRONT_LEFT, FRONT_RIGHT] {
                legs[i].position = Vec3::new(0.12, legs[i].position.y, -h);
            }
            for i in [HIND_LEFT, HIND_RIGHT] {
                legs[i].position.z = -h;
            }
            (h, 0.0, legs)
        }
        BodyState::Sprawl => {
            let h = 0.12;
            for leg in legs.iter_mut() {
                leg.position = Vec3::new(leg.position.x * 1.3, leg.position.y * 2.0, -h);
            }
            (h, 0.0, legs)
        }
    }
}

fn posture(ctx: &MotionContext<'_>, p: f32) -> Contribution {
    let target_state = ctx.move_type.exit_state.unwrap_or(BodyState::Stand);
    let (height, pitch, target_legs) = posture_pose(target_state);
    let start = ctx.start.body;
    let (yaw, _, _) = start.rotation.to_euler(EulerRot::ZYX);
    let target = BodyPose {
        position: Vec3::new(start.position.x, start.position.y, height),
        rotation: Quat::from_euler(EulerRot::ZYX, yaw, pitch, 0.0),
    };
    Contribution {
        body: Some(start.lerp(&target, p)),
        legs: Some(lerp_legs(&ctx.start.legs, &target_legs, p)),
        ..Default::default()
    }
}

fn arm_move(ctx: &MotionContext<'_>, params: &ArmMoveParams, p: f32) -> Contribution {
    let start = ctx.start.arm;
    let targets = params.joints.as_array();
    let target = ArmTarget {
        joint_angles: std::array::from_fn(|i| targets[i].unwrap_or(start.joint_angles[i])),
    };
    Contribution {
        arm: Some(start.lerp(&target, p)),
        ..Default::default()
    }
}

fn gripper(ctx: &MotionContext<'_>, params: &GripperParams, p: f32) -> Contribution {
    let start = ctx.start.gripper;
    let target = params.angle.unwrap_or(start);
    Contribution {
        gripper: Some(start + (target - start) * p),
        ..Default::default()
    }
}

fn set_color(ctx: &MotionContext<'_>, params: &SetColorParams, p: f32) -> Contribution {
    let start = ctx.start.lights;
    let target = params.color.map_or(start, LightColor);
    let color = if params.fade.unwrap_or(false) {
        start.lerp(&target, p)
    } else {
        target
    };
    Contribution {
        lights: Some(color),
        ..Default::default()
    }
}

fn animate(ctx: &MotionContext<'_>, params: &AnimateParams) -> Result<Contribution> {
    let blender = ctx
        .animation
        .ok_or_else(|| ctx.fail(format!("no animation data for '{}'", ctx.move_type.name)))?;
    let move_seconds = ctx
        .clock
        .slice_to_seconds(f64::from(ctx.instance.requested_slices));
    let local_seconds = ctx.clock.slice_to_seconds(ctx.local_slices);
    let offset_seconds = ctx
        .clock
        .slice_to_seconds(params.offset_slices.map_or(0.0, f64::from));
    let pose = blender.sample_move(local_seconds, move_seconds, offset_seconds, params);

    let controls = ctx.move_type.controls;
    let start = ctx.start;
    let body = controls.body.then(|| BodyPose {
        position: start.body.position
            + start.body.rotation * pose.body_position.unwrap_or(Vec3::ZERO),
        rotation: start.body.rotation * pose.body_rotation.unwrap_or(Quat::IDENTITY),
    });
    let legs = controls.legs.then(|| {
        std::array::from_fn(|i| pose.legs[i].unwrap_or(start.legs[i]))
    });
    let arm = controls.arm.then(|| ArmTarget {
        joint_angles: std::array::from_fn(|i| pose.arm[i].unwrap_or(start.arm.joint_angles[i])),
    });
    let gripper = controls
        .gripper
        .then(|| pose.gripper.unwrap_or(start.gripper));

    Ok(Contribution {
        body,
        legs,
        arm,
        gripper,
        lights: None,
    })
}
